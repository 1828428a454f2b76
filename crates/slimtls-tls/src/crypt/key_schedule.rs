//! TLS 1.2 key derivation (RFC 5246 §6.3, §8.1).
//!
//! The pre-master secret becomes the 48-byte master secret, which is
//! expanded into the key block and later into the Finished verify_data.

use super::prf::prf;
use super::CipherSuiteParams;
use slimtls_types::TlsError;
use zeroize::Zeroize;

/// Master secret length (fixed by RFC 5246).
pub const MASTER_SECRET_LEN: usize = 48;

/// Finished verify_data length.
pub const VERIFY_DATA_LEN: usize = 12;

/// Pre-master secret length for the RSA key exchange.
pub const PRE_MASTER_SECRET_LEN: usize = 48;

/// TLS 1.2 key block, sliced in RFC order: client MAC, server MAC,
/// client key, server key.
pub struct KeyBlock {
    pub client_write_mac_key: Vec<u8>,
    pub server_write_mac_key: Vec<u8>,
    pub client_write_key: Vec<u8>,
    pub server_write_key: Vec<u8>,
}

impl Drop for KeyBlock {
    fn drop(&mut self) {
        self.client_write_mac_key.zeroize();
        self.server_write_mac_key.zeroize();
        self.client_write_key.zeroize();
        self.server_write_key.zeroize();
    }
}

/// Derive the 48-byte master secret.
///
/// ```text
/// master_secret = PRF(pre_master_secret, "master secret",
///                     client_random + server_random)[0..47]
/// ```
pub fn derive_master_secret(
    pre_master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<Vec<u8>, TlsError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);
    prf(pre_master_secret, "master secret", &seed, MASTER_SECRET_LEN)
}

/// Derive the key block from the master secret.
///
/// The seed order is reversed relative to the master secret derivation:
/// ```text
/// key_block = PRF(master_secret, "key expansion",
///                 server_random + client_random)
/// ```
pub fn derive_key_block(
    master_secret: &[u8],
    server_random: &[u8; 32],
    client_random: &[u8; 32],
    params: &CipherSuiteParams,
) -> Result<KeyBlock, TlsError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let mut key_block = prf(master_secret, "key expansion", &seed, params.key_block_len())?;

    let mut offset = 0;
    let mut take = |len: usize| {
        let slice = key_block[offset..offset + len].to_vec();
        offset += len;
        slice
    };

    let client_write_mac_key = take(params.mac_key_len);
    let server_write_mac_key = take(params.mac_key_len);
    let client_write_key = take(params.key_len);
    let server_write_key = take(params.key_len);
    key_block.zeroize();

    Ok(KeyBlock {
        client_write_mac_key,
        server_write_mac_key,
        client_write_key,
        server_write_key,
    })
}

/// Compute Finished verify_data (RFC 5246 §7.4.9).
///
/// `label` is `"client finished"` or `"server finished"`,
/// `handshake_hash` the SHA-256 transcript hash at this point.
pub fn compute_verify_data(
    master_secret: &[u8],
    label: &str,
    handshake_hash: &[u8],
) -> Result<Vec<u8>, TlsError> {
    prf(master_secret, label, handshake_hash, VERIFY_DATA_LEN)
}
