//! Running SHA-256 hash over handshake messages in wire order.
//!
//! ChangeCipherSpec and alerts are never fed in; both Finished messages
//! need intermediate hashes, so the transcript buffers messages and
//! replays them through a fresh hasher on each query.

use slimtls_crypto::sha2::Sha256;
use slimtls_types::TlsError;

/// Handshake transcript hash.
pub struct TranscriptHash {
    message_buffer: Vec<u8>,
}

impl TranscriptHash {
    pub fn new() -> Self {
        Self {
            message_buffer: Vec::new(),
        }
    }

    /// Feed one complete handshake message (header included).
    pub fn update(&mut self, data: &[u8]) {
        self.message_buffer.extend_from_slice(data);
    }

    /// The SHA-256 hash of everything fed so far. Non-destructive.
    pub fn current_hash(&self) -> Result<[u8; 32], TlsError> {
        Sha256::digest(&self.message_buffer).map_err(TlsError::CryptoError)
    }
}

impl Default for TranscriptHash {
    fn default() -> Self {
        Self::new()
    }
}
