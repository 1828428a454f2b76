#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = slimtls_pki::x509::Certificate::from_der(data);
    let _ = slimtls_pki::keys::parse_rsa_private_key_der(data);
});
