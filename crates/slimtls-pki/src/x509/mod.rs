//! X.509 certificate parsing and chain verification.

mod builder;
pub(crate) mod certificate;
mod verify;

pub use builder::CertificateBuilder;
pub use certificate::{Certificate, DistinguishedName, SignatureAlg};
pub use verify::{parse_certs_pem, verify_chain, TrustStore};
