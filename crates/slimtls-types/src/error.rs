/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    // General errors
    #[error("null or empty input")]
    NullInput,
    #[error("invalid argument")]
    InvalidArg,
    #[error("operation not supported")]
    NotSupported,
    #[error("invalid key")]
    InvalidKey,

    // Buffer errors
    #[error("buffer length not enough: need {need}, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("input data too long")]
    InputOverflow,

    // BigNum errors
    #[error("big number: division by zero")]
    BnDivisionByZero,
    #[error("big number: value out of range")]
    BnOutOfRange,
    #[error("big number: random generation failed")]
    BnRandGenFail,

    // RSA errors
    #[error("rsa: verification failed")]
    RsaVerifyFail,
    #[error("rsa: invalid padding")]
    RsaInvalidPadding,
    #[error("rsa: missing key info")]
    RsaNoKeyInfo,

    // Encoding/Decoding errors
    #[error("decode: asn1 buffer failed")]
    DecodeAsn1Fail,
    #[error("decode: unknown oid")]
    DecodeUnknownOid,
}

/// PKI certificate errors.
#[derive(Debug, thiserror::Error)]
pub enum PkiError {
    #[error("invalid certificate: {0}")]
    InvalidCert(String),
    #[error("certificate expired")]
    CertExpired,
    #[error("certificate not yet valid")]
    CertNotYetValid,
    #[error("certificate chain verification failed: {0}")]
    ChainVerifyFailed(String),
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("asn1 parse error: {0}")]
    Asn1Error(String),
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// TLS protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("malformed message: {0}")]
    DecodeError(String),
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
    #[error("bad record mac")]
    BadRecordMac,
    #[error("finished verification failed")]
    DecryptError,
    #[error("alert received: {0}")]
    AlertReceived(String),
    #[error("record layer error: {0}")]
    RecordError(String),
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("no shared cipher suite or compressor")]
    NoSharedCipherSuite,
    #[error("certificate verification failed: {0}")]
    CertVerifyFailed(String),
    #[error("transport not ready for reading")]
    WantRead,
    #[error("transport not ready for writing")]
    WantWrite,
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("connection is in the fatal state")]
    ConnectionFailed,
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
    #[error("pki error: {0}")]
    PkiError(#[from] PkiError),
}

impl TlsError {
    /// Returns true if the caller should retry the same call after the
    /// transport becomes ready. All other errors are terminal for the
    /// operation (and usually for the connection).
    pub fn is_retryable(&self) -> bool {
        matches!(self, TlsError::WantRead | TlsError::WantWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TlsError::WantRead.is_retryable());
        assert!(TlsError::WantWrite.is_retryable());
        assert!(!TlsError::BadRecordMac.is_retryable());
        assert!(!TlsError::PeerClosed.is_retryable());
        assert!(!TlsError::DecodeError("x".into()).is_retryable());
    }

    #[test]
    fn test_error_bridging() {
        let e: TlsError = CryptoError::RsaInvalidPadding.into();
        assert!(matches!(e, TlsError::CryptoError(_)));

        let e: PkiError = CryptoError::DecodeAsn1Fail.into();
        assert!(matches!(e, PkiError::CryptoError(_)));

        let e: TlsError = PkiError::ChainVerifyFailed("no anchor".into()).into();
        assert!(matches!(e, TlsError::PkiError(_)));
    }
}
