#![no_main]
use libfuzzer_sys::fuzz_target;

use slimtls_tls::handshake::codec;
use slimtls_tls::handshake::HandshakeType;

fuzz_target!(|data: &[u8]| {
    let Ok((msg_type, body, _)) = codec::parse_handshake_header(data) else {
        return;
    };
    match msg_type {
        HandshakeType::ClientHello => {
            let _ = codec::decode_client_hello(body);
        }
        HandshakeType::ServerHello => {
            let _ = codec::decode_server_hello(body);
        }
        HandshakeType::Certificate => {
            let _ = codec::decode_certificate(body);
        }
        HandshakeType::ClientKeyExchange => {
            let _ = codec::decode_client_key_exchange(body);
        }
        HandshakeType::Finished => {
            let _ = codec::decode_finished(body);
        }
        _ => {}
    }
});
