#![no_main]
use libfuzzer_sys::fuzz_target;

// The DER decoder is the hardening boundary: it must never read past
// its input or panic, whatever the tag/length bytes claim.
fuzz_target!(|data: &[u8]| {
    let mut decoder = slimtls_utils::asn1::Decoder::new(data);
    while !decoder.is_empty() {
        if decoder.read_tlv().is_err() {
            break;
        }
    }
});
