//! RSA private key import (RFC 8017 `RSAPrivateKey`).
//!
//! ```text
//! RSAPrivateKey ::= SEQUENCE {
//!     version           INTEGER,
//!     modulus           INTEGER,  -- n
//!     publicExponent    INTEGER,  -- e
//!     privateExponent   INTEGER,  -- d
//!     prime1            INTEGER,  -- p
//!     prime2            INTEGER,  -- q
//!     exponent1         INTEGER,  -- dP
//!     exponent2         INTEGER,  -- dQ
//!     coefficient       INTEGER   -- qInv
//! }
//! ```
//!
//! All CRT parameters are taken from the encoding as-is; the key object
//! validates n == p * q on import.

use slimtls_crypto::rsa::RsaPrivateKey;
use slimtls_types::PkiError;
use slimtls_utils::asn1::Decoder;

use crate::x509::certificate::strip_leading_zero;

/// Parse a DER-encoded RSAPrivateKey.
pub fn parse_rsa_private_key_der(der: &[u8]) -> Result<RsaPrivateKey, PkiError> {
    let mut dec = Decoder::new(der);
    let mut seq = dec
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;

    let version = seq
        .read_integer()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    // version 0 = two-prime; multi-prime keys (version 1) are not supported
    if version != [0x00] {
        return Err(PkiError::InvalidKey("unsupported RSA key version".into()));
    }

    let mut field = || -> Result<Vec<u8>, PkiError> {
        seq.read_integer()
            .map(|v| strip_leading_zero(v).to_vec())
            .map_err(|e| PkiError::Asn1Error(e.to_string()))
    };

    let n = field()?;
    let e = field()?;
    let d = field()?;
    let p = field()?;
    let q = field()?;
    let dp = field()?;
    let dq = field()?;
    let qinv = field()?;

    RsaPrivateKey::new(&n, &e, &d, &p, &q, &dp, &dq, &qinv)
        .map_err(|e| PkiError::InvalidKey(e.to_string()))
}

/// Parse the first private-key block from a PEM string.
///
/// Accepts the PKCS#1 "RSA PRIVATE KEY" label; the PKCS#8 "PRIVATE KEY"
/// wrapper is unwrapped first when present.
pub fn parse_rsa_private_key_pem(pem: &str) -> Result<RsaPrivateKey, PkiError> {
    let blocks = slimtls_utils::pem::parse_kind(pem, slimtls_utils::pem::PemKind::PrivateKey)
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let block = blocks
        .first()
        .ok_or_else(|| PkiError::InvalidKey("no private key block found".into()))?;

    if block.label == "RSA PRIVATE KEY" {
        parse_rsa_private_key_der(&block.data)
    } else {
        parse_rsa_private_key_der(&unwrap_pkcs8(&block.data)?)
    }
}

/// Strip a PKCS#8 PrivateKeyInfo wrapper, returning the inner
/// RSAPrivateKey DER.
fn unwrap_pkcs8(der: &[u8]) -> Result<Vec<u8>, PkiError> {
    let mut dec = Decoder::new(der);
    let mut seq = dec
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let _version = seq
        .read_integer()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let mut alg = seq
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let oid_bytes = alg
        .read_oid()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let oid = slimtls_utils::oid::Oid::from_der_value(oid_bytes)
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    if oid != slimtls_utils::oid::known::rsa_encryption() {
        return Err(PkiError::InvalidKey(format!(
            "unsupported key algorithm: {oid}"
        )));
    }
    let inner = seq
        .read_octet_string()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    Ok(inner.to_vec())
}
