#![forbid(unsafe_code)]
#![doc = "X.509 certificate decoding, chain verification, and RSA key import for slimtls."]

pub mod keys;
pub mod x509;

#[cfg(test)]
pub(crate) mod testutil;
