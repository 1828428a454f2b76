#![forbid(unsafe_code)]
#![doc = "ASN.1, Base64, PEM, and OID utilities for slimtls."]

pub mod asn1;
pub mod base64;
pub mod oid;
pub mod pem;
