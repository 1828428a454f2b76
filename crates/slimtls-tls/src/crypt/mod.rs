//! Key derivation and transcript hashing for the TLS 1.2 handshake.

pub mod key_schedule;
pub mod prf;
pub mod transcript;

use crate::CipherSuite;
use slimtls_types::TlsError;

/// Per-suite key material sizes.
///
/// RC4 has no IV, so the key block is MAC keys and cipher keys only.
#[derive(Debug, Clone, Copy)]
pub struct CipherSuiteParams {
    pub suite: CipherSuite,
    /// MAC key length (MD5: 16).
    pub mac_key_len: usize,
    /// Cipher key length (RC4-128: 16, null: 0).
    pub key_len: usize,
}

impl CipherSuiteParams {
    pub fn from_suite(suite: CipherSuite) -> Result<Self, TlsError> {
        match suite {
            CipherSuite::RSA_WITH_RC4_128_MD5 => Ok(CipherSuiteParams {
                suite,
                mac_key_len: 16,
                key_len: 16,
            }),
            #[cfg(feature = "null-cipher")]
            CipherSuite::RSA_WITH_NULL_MD5 => Ok(CipherSuiteParams {
                suite,
                mac_key_len: 16,
                key_len: 0,
            }),
            _ => Err(TlsError::NoSharedCipherSuite),
        }
    }

    /// Total key block length: client/server MAC keys + client/server keys.
    pub fn key_block_len(&self) -> usize {
        2 * self.mac_key_len + 2 * self.key_len
    }
}
