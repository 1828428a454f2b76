//! TLS hello extensions.
//!
//! Only `renegotiation_info` (RFC 5746) is emitted and understood; every
//! other extension is decoded for framing and ignored. Renegotiation
//! itself is unsupported, so the payload this stack ever produces or
//! accepts is the empty one.

use slimtls_types::TlsError;

/// TLS extension type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionType(pub u16);

impl ExtensionType {
    pub const RENEGOTIATION_INFO: Self = Self(0xFF01);
}

/// A raw TLS extension.
#[derive(Debug, Clone)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub data: Vec<u8>,
}

impl Extension {
    /// The empty `renegotiation_info` extension: a zero-length
    /// renegotiated_connection field.
    pub fn empty_renegotiation_info() -> Self {
        Extension {
            extension_type: ExtensionType::RENEGOTIATION_INFO,
            data: vec![0x00],
        }
    }

    /// True for a `renegotiation_info` carrying no prior verify_data.
    pub fn is_empty_renegotiation_info(&self) -> bool {
        self.extension_type == ExtensionType::RENEGOTIATION_INFO && self.data == [0x00]
    }
}

/// Find an extension by type.
pub fn find(extensions: &[Extension], ty: ExtensionType) -> Option<&Extension> {
    extensions.iter().find(|e| e.extension_type == ty)
}

/// Encode an extension block: 2-byte total length followed by
/// `type(2) || len(2) || data` entries.
pub fn encode_extension_block(extensions: &[Extension]) -> Vec<u8> {
    let total: usize = extensions.iter().map(|e| 4 + e.data.len()).sum();
    let mut out = Vec::with_capacity(2 + total);
    out.extend_from_slice(&(total as u16).to_be_bytes());
    for ext in extensions {
        out.extend_from_slice(&ext.extension_type.0.to_be_bytes());
        out.extend_from_slice(&(ext.data.len() as u16).to_be_bytes());
        out.extend_from_slice(&ext.data);
    }
    out
}

/// Decode an extension block (including its leading 2-byte length).
/// The block must fill `data` exactly; trailing bytes are an error.
pub fn decode_extension_block(data: &[u8]) -> Result<Vec<Extension>, TlsError> {
    if data.len() < 2 {
        return Err(TlsError::DecodeError("extension block truncated".into()));
    }
    let total = u16::from_be_bytes([data[0], data[1]]) as usize;
    if data.len() != 2 + total {
        return Err(TlsError::DecodeError(
            "extension block length mismatch".into(),
        ));
    }

    let mut extensions = Vec::new();
    let mut pos = 2;
    while pos < data.len() {
        if pos + 4 > data.len() {
            return Err(TlsError::DecodeError("extension entry truncated".into()));
        }
        let ty = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;
        if pos + len > data.len() {
            return Err(TlsError::DecodeError("extension data truncated".into()));
        }
        extensions.push(Extension {
            extension_type: ExtensionType(ty),
            data: data[pos..pos + len].to_vec(),
        });
        pos += len;
    }
    Ok(extensions)
}
