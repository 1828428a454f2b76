//! Algorithm identifiers shared across the stack.

/// Hash algorithm identifier.
///
/// The set is exactly what the certificate and record layers consume:
/// MD5 and SHA-1 appear in legacy certificate signatures, SHA-256 in
/// modern ones and in the TLS 1.2 PRF/transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgId {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgId {
    /// Digest output size in bytes.
    pub fn output_size(&self) -> usize {
        match self {
            HashAlgId::Md5 => 16,
            HashAlgId::Sha1 => 20,
            HashAlgId::Sha256 => 32,
        }
    }
}
