//! TLS alert protocol.

use slimtls_types::TlsError;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

/// Alert description codes (RFC 5246 §7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    RecordOverflow = 22,
    DecompressionFailure = 30,
    HandshakeFailure = 40,
    BadCertificate = 42,
    UnsupportedCertificate = 43,
    CertificateExpired = 45,
    CertificateUnknown = 46,
    IllegalParameter = 47,
    UnknownCa = 48,
    DecodeError = 50,
    DecryptError = 51,
    ProtocolVersion = 70,
    InternalError = 80,
    NoRenegotiation = 100,
}

/// A TLS alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub const CLOSE_NOTIFY: Alert = Alert {
        level: AlertLevel::Warning,
        description: AlertDescription::CloseNotify,
    };

    pub fn fatal(description: AlertDescription) -> Self {
        Alert {
            level: AlertLevel::Fatal,
            description,
        }
    }

    /// Encode to the 2-byte wire form.
    pub fn encode(&self) -> [u8; 2] {
        [self.level as u8, self.description as u8]
    }

    /// Decode from a record payload.
    pub fn decode(payload: &[u8]) -> Result<Self, TlsError> {
        if payload.len() != 2 {
            return Err(TlsError::DecodeError("malformed alert record".into()));
        }
        let level = AlertLevel::from_u8(payload[0])
            .ok_or_else(|| TlsError::DecodeError("unknown alert level".into()))?;
        let description = AlertDescription::from_u8(payload[1])
            .ok_or_else(|| TlsError::DecodeError("unknown alert description".into()))?;
        Ok(Alert { level, description })
    }

    pub fn is_close_notify(&self) -> bool {
        self.description == AlertDescription::CloseNotify
    }

    pub fn is_fatal(&self) -> bool {
        self.level == AlertLevel::Fatal
    }
}

impl AlertLevel {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(AlertLevel::Warning),
            2 => Some(AlertLevel::Fatal),
            _ => None,
        }
    }
}

impl AlertDescription {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(AlertDescription::CloseNotify),
            10 => Some(AlertDescription::UnexpectedMessage),
            20 => Some(AlertDescription::BadRecordMac),
            22 => Some(AlertDescription::RecordOverflow),
            30 => Some(AlertDescription::DecompressionFailure),
            40 => Some(AlertDescription::HandshakeFailure),
            42 => Some(AlertDescription::BadCertificate),
            43 => Some(AlertDescription::UnsupportedCertificate),
            45 => Some(AlertDescription::CertificateExpired),
            46 => Some(AlertDescription::CertificateUnknown),
            47 => Some(AlertDescription::IllegalParameter),
            48 => Some(AlertDescription::UnknownCa),
            50 => Some(AlertDescription::DecodeError),
            51 => Some(AlertDescription::DecryptError),
            70 => Some(AlertDescription::ProtocolVersion),
            80 => Some(AlertDescription::InternalError),
            100 => Some(AlertDescription::NoRenegotiation),
            _ => None,
        }
    }
}

/// Pick the alert a fatal error maps to when notifying the peer.
pub fn alert_for_error(err: &TlsError) -> AlertDescription {
    match err {
        TlsError::BadRecordMac => AlertDescription::BadRecordMac,
        TlsError::DecryptError => AlertDescription::DecryptError,
        TlsError::DecodeError(_) | TlsError::RecordError(_) => AlertDescription::DecodeError,
        TlsError::NoSharedCipherSuite | TlsError::HandshakeFailed(_) => {
            AlertDescription::HandshakeFailure
        }
        TlsError::UnsupportedVersion => AlertDescription::ProtocolVersion,
        TlsError::CertVerifyFailed(_) | TlsError::PkiError(_) => AlertDescription::BadCertificate,
        _ => AlertDescription::InternalError,
    }
}
