//! TLS 1.2 handshake: message codec and the client/server sessions.

pub mod client;
pub mod codec;
pub mod server;

/// Handshake message types (RFC 5246 §7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    HelloRequest = 0,
    ClientHello = 1,
    ServerHello = 2,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    ClientKeyExchange = 16,
    Finished = 20,
}

impl HandshakeType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(HandshakeType::HelloRequest),
            1 => Some(HandshakeType::ClientHello),
            2 => Some(HandshakeType::ServerHello),
            11 => Some(HandshakeType::Certificate),
            12 => Some(HandshakeType::ServerKeyExchange),
            13 => Some(HandshakeType::CertificateRequest),
            14 => Some(HandshakeType::ServerHelloDone),
            16 => Some(HandshakeType::ClientKeyExchange),
            20 => Some(HandshakeType::Finished),
            _ => None,
        }
    }
}

/// Connection handshake states. Client and server traverse different
/// subsets of the same enum; `advance` on the connection performs one
/// transition per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Before any message has been sent or received.
    Initial,
    /// Client: ClientHello queued, awaiting ServerHello.
    ClientHelloSent,
    /// Server: awaiting ClientHello.
    ClientHelloWait,
    /// Server: ClientHello processed, server flight not yet built.
    ClientHelloRcvd,
    /// Server: flight sent, awaiting ClientKeyExchange.
    ServerHelloSent,
    /// Client: ServerHello processed, awaiting Certificate.
    ServerHelloRcvd,
    /// Client: certificate chain verified, awaiting ServerHelloDone.
    ServerCertRcvd,
    /// Client: ServerHelloDone processed (client flight goes out next).
    ServerDoneRcvd,
    /// Client: own Finished sent, awaiting the server's.
    /// Server: client Finished verified, own flight not yet sent.
    ClientFinished,
    /// Handshake complete; application data flows.
    Established,
    /// close_notify sent or received.
    Closing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_type_wire_values() {
        assert_eq!(HandshakeType::ClientHello as u8, 1);
        assert_eq!(HandshakeType::ServerHello as u8, 2);
        assert_eq!(HandshakeType::Certificate as u8, 11);
        assert_eq!(HandshakeType::ServerHelloDone as u8, 14);
        assert_eq!(HandshakeType::ClientKeyExchange as u8, 16);
        assert_eq!(HandshakeType::Finished as u8, 20);
    }

    #[test]
    fn test_handshake_type_from_u8() {
        for v in [0u8, 1, 2, 11, 12, 13, 14, 16, 20] {
            assert_eq!(HandshakeType::from_u8(v).unwrap() as u8, v);
        }
        assert!(HandshakeType::from_u8(3).is_none());
        assert!(HandshakeType::from_u8(255).is_none());
    }
}
