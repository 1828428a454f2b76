//! Symmetric record protection: RC4 stream encryption with HMAC-MD5
//! record authentication (RFC 5246 §6.2.3.1).
//!
//! The MAC covers a synthetic header followed by the plaintext:
//!
//! ```text
//! HMAC_MD5(mac_key, seq(8) || type(1) || version(2) || length(2) || fragment)
//! ```
//!
//! The wire fragment is `RC4(plaintext || MAC)`. Sequence numbers are
//! 64-bit and advance exactly once per protected or verified record,
//! independently per direction.

use crate::crypt::CipherSuiteParams;
use crate::record::ContentType;
use slimtls_crypto::hmac::Hmac;
use slimtls_crypto::md5::Md5;
use slimtls_crypto::provider::Digest;
use slimtls_crypto::rc4::Rc4;
use slimtls_types::TlsError;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// HMAC-MD5 output size.
pub const MAC_LEN: usize = 16;

fn md5_factory() -> Box<dyn Digest> {
    Box::new(Md5::new())
}

/// Cipher half of a security context. RC4 keystream state, or a
/// pass-through for the debug-only null cipher.
enum CipherState {
    Rc4(Rc4),
    #[cfg(feature = "null-cipher")]
    Null,
}

impl CipherState {
    fn new(params: &CipherSuiteParams, key: &[u8]) -> Result<Self, TlsError> {
        #[cfg(feature = "null-cipher")]
        if params.key_len == 0 {
            return Ok(CipherState::Null);
        }
        let _ = params;
        Ok(CipherState::Rc4(Rc4::new(key).map_err(TlsError::CryptoError)?))
    }

    fn apply(&mut self, data: &mut [u8]) {
        match self {
            CipherState::Rc4(rc4) => rc4.apply_keystream(data),
            #[cfg(feature = "null-cipher")]
            CipherState::Null => {}
        }
    }
}

/// Compute the record MAC over the synthetic header and fragment.
fn record_mac(
    mac_key: &[u8],
    seq: u64,
    content_type: ContentType,
    version: u16,
    fragment: &[u8],
) -> Result<Vec<u8>, TlsError> {
    let mut mac = Hmac::new(md5_factory, mac_key).map_err(TlsError::CryptoError)?;
    let mut header = [0u8; 13];
    header[..8].copy_from_slice(&seq.to_be_bytes());
    header[8] = content_type as u8;
    header[9..11].copy_from_slice(&version.to_be_bytes());
    header[11..13].copy_from_slice(&(fragment.len() as u16).to_be_bytes());
    mac.update(&header).map_err(TlsError::CryptoError)?;
    mac.update(fragment).map_err(TlsError::CryptoError)?;
    let mut out = vec![0u8; MAC_LEN];
    mac.finish(&mut out).map_err(TlsError::CryptoError)?;
    Ok(out)
}

/// Write-direction security context: encrypts and authenticates
/// outgoing record fragments.
pub struct RecordProtector {
    cipher: CipherState,
    mac_key: Vec<u8>,
    seq: u64,
}

impl Drop for RecordProtector {
    fn drop(&mut self) {
        self.mac_key.zeroize();
    }
}

impl RecordProtector {
    pub fn new(
        params: &CipherSuiteParams,
        mac_key: &[u8],
        cipher_key: &[u8],
    ) -> Result<Self, TlsError> {
        Ok(Self {
            cipher: CipherState::new(params, cipher_key)?,
            mac_key: mac_key.to_vec(),
            seq: 0,
        })
    }

    /// Protect a plaintext fragment: append the MAC, encrypt in place,
    /// advance the sequence number.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        version: u16,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let mac = record_mac(&self.mac_key, self.seq, content_type, version, plaintext)?;

        let mut fragment = Vec::with_capacity(plaintext.len() + MAC_LEN);
        fragment.extend_from_slice(plaintext);
        fragment.extend_from_slice(&mac);
        self.cipher.apply(&mut fragment);

        self.seq = self
            .seq
            .checked_add(1)
            .ok_or_else(|| TlsError::RecordError("write sequence number overflow".into()))?;
        Ok(fragment)
    }

    #[cfg(test)]
    pub(crate) fn sequence_number(&self) -> u64 {
        self.seq
    }
}

/// Read-direction security context: decrypts incoming fragments and
/// verifies their MAC before anything else sees the plaintext.
pub struct RecordOpener {
    cipher: CipherState,
    mac_key: Vec<u8>,
    seq: u64,
}

impl Drop for RecordOpener {
    fn drop(&mut self) {
        self.mac_key.zeroize();
    }
}

impl RecordOpener {
    pub fn new(
        params: &CipherSuiteParams,
        mac_key: &[u8],
        cipher_key: &[u8],
    ) -> Result<Self, TlsError> {
        Ok(Self {
            cipher: CipherState::new(params, cipher_key)?,
            mac_key: mac_key.to_vec(),
            seq: 0,
        })
    }

    /// Decrypt a fragment and verify its MAC. The sequence number only
    /// advances on success; a mismatch is `BadRecordMac` and the caller
    /// must treat the connection as dead.
    pub fn open(
        &mut self,
        content_type: ContentType,
        version: u16,
        fragment: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if fragment.len() < MAC_LEN {
            return Err(TlsError::BadRecordMac);
        }

        let mut decrypted = fragment.to_vec();
        self.cipher.apply(&mut decrypted);

        let mac_offset = decrypted.len() - MAC_LEN;
        let (plaintext, received_mac) = decrypted.split_at(mac_offset);

        let expected = record_mac(&self.mac_key, self.seq, content_type, version, plaintext)?;
        if !bool::from(received_mac.ct_eq(&expected)) {
            return Err(TlsError::BadRecordMac);
        }

        self.seq = self
            .seq
            .checked_add(1)
            .ok_or_else(|| TlsError::RecordError("read sequence number overflow".into()))?;
        Ok(plaintext.to_vec())
    }

    #[cfg(test)]
    pub(crate) fn sequence_number(&self) -> u64 {
        self.seq
    }
}
