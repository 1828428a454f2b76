#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut layer = slimtls_tls::record::RecordLayer::new();
    let _ = layer.open_record(data);
});
