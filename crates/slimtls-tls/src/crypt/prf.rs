//! TLS 1.2 PRF (RFC 5246 §5), HMAC-SHA256 based.
//!
//! ```text
//! PRF(secret, label, seed) = P_SHA256(secret, label + seed)
//!
//! P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) ||
//!                        HMAC_hash(secret, A(2) + seed) || ...
//! A(0) = seed
//! A(i) = HMAC_hash(secret, A(i-1))
//! ```

use slimtls_crypto::hmac::Hmac;
use slimtls_crypto::provider::Digest;
use slimtls_crypto::sha2::Sha256;
use slimtls_types::TlsError;

fn sha256_factory() -> Box<dyn Digest> {
    Box::new(Sha256::new())
}

fn hmac_sha256(secret: &[u8], data: &[u8]) -> Result<Vec<u8>, TlsError> {
    Hmac::mac(sha256_factory, secret, data).map_err(TlsError::CryptoError)
}

/// Derive `output_len` bytes from `secret`, `label`, and `seed`.
pub fn prf(
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, TlsError> {
    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label.as_bytes());
    label_seed.extend_from_slice(seed);

    p_hash(secret, &label_seed, output_len)
}

/// P_SHA256 expansion.
fn p_hash(secret: &[u8], seed: &[u8], output_len: usize) -> Result<Vec<u8>, TlsError> {
    let mut result = Vec::with_capacity(output_len);

    // A(0) = seed
    let mut a = seed.to_vec();

    while result.len() < output_len {
        // A(i) = HMAC(secret, A(i-1))
        a = hmac_sha256(secret, &a)?;

        let mut ai_seed = Vec::with_capacity(a.len() + seed.len());
        ai_seed.extend_from_slice(&a);
        ai_seed.extend_from_slice(seed);
        let block = hmac_sha256(secret, &ai_seed)?;

        result.extend_from_slice(&block);
    }

    result.truncate(output_len);
    Ok(result)
}
