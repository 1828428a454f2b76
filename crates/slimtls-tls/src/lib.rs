#![forbid(unsafe_code)]
#![doc = "TLS 1.2 client and server for slimtls: RSA key exchange, RC4 + HMAC-MD5 record protection."]

pub mod alert;
pub mod config;
pub mod connection;
pub mod crypt;
pub mod extensions;
pub mod handshake;
pub mod record;

pub use config::{TlsConfig, TlsConfigBuilder};
pub use connection::{TlsClientConnection, TlsConnection, TlsServerConnection};
pub use handshake::HandshakeState;
pub use slimtls_types::TlsError;

/// TLS cipher suite identifier (IANA registry value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuite(pub u16);

impl CipherSuite {
    /// TLS_RSA_WITH_RC4_128_MD5, the one real suite this stack speaks.
    pub const RSA_WITH_RC4_128_MD5: Self = Self(0x0004);
    /// TLS_RSA_WITH_NULL_MD5. Compiled only for record-layer tests.
    #[cfg(feature = "null-cipher")]
    pub const RSA_WITH_NULL_MD5: Self = Self(0x0001);
    /// TLS_EMPTY_RENEGOTIATION_INFO_SCSV (RFC 5746).
    pub const EMPTY_RENEGOTIATION_INFO_SCSV: Self = Self(0x00FF);
}

/// The protocol version this stack implements (TLS 1.2).
pub const TLS12_VERSION: u16 = 0x0303;

/// The null compression method, the only one supported.
pub const COMPRESSION_NULL: u8 = 0;

/// Connection role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRole {
    Client,
    Server,
}
