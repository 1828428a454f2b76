//! Minimal X.509 v3 certificate construction.
//!
//! Enough to provision device identities and to generate the chains the
//! verifier tests run against. Signatures are always SHA-256 with RSA.

use slimtls_crypto::rsa::{RsaPrivateKey, RsaPublicKey};
use slimtls_crypto::sha2::Sha256;
use slimtls_types::PkiError;
use slimtls_utils::asn1::Encoder;
use slimtls_utils::oid::known;

use super::certificate::{Certificate, DistinguishedName};

/// Builder for X.509 v3 certificates.
pub struct CertificateBuilder {
    serial_number: Vec<u8>,
    issuer: DistinguishedName,
    subject: DistinguishedName,
    not_before: i64,
    not_after: i64,
    subject_key: Option<RsaPublicKey>,
    basic_constraints_ca: Option<bool>,
}

impl CertificateBuilder {
    pub fn new() -> Self {
        Self {
            serial_number: vec![0x01],
            issuer: DistinguishedName {
                entries: Vec::new(),
            },
            subject: DistinguishedName {
                entries: Vec::new(),
            },
            not_before: 0,
            not_after: 0,
            subject_key: None,
            basic_constraints_ca: None,
        }
    }

    /// Set the serial number (big-endian content bytes).
    pub fn serial_number(mut self, serial: &[u8]) -> Self {
        self.serial_number = serial.to_vec();
        self
    }

    /// Set the issuer DN.
    pub fn issuer(mut self, dn: DistinguishedName) -> Self {
        self.issuer = dn;
        self
    }

    /// Set the subject DN.
    pub fn subject(mut self, dn: DistinguishedName) -> Self {
        self.subject = dn;
        self
    }

    /// Set the validity period (UNIX timestamps).
    pub fn validity(mut self, not_before: i64, not_after: i64) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    /// Set the subject public key.
    pub fn subject_public_key(mut self, key: RsaPublicKey) -> Self {
        self.subject_key = Some(key);
        self
    }

    /// Add a critical BasicConstraints extension.
    pub fn basic_constraints(mut self, is_ca: bool) -> Self {
        self.basic_constraints_ca = Some(is_ca);
        self
    }

    /// Build the certificate, signing the TBS with the given key.
    pub fn build(self, signing_key: &RsaPrivateKey) -> Result<Certificate, PkiError> {
        let spki = self
            .subject_key
            .ok_or_else(|| PkiError::InvalidCert("subject public key not set".into()))?;

        let sig_alg = encode_sha256_rsa_algorithm();

        // TBSCertificate
        let mut tbs = Encoder::new();

        // version [0] EXPLICIT INTEGER v3 (2)
        let mut ver_int = Encoder::new();
        ver_int.write_integer(&[0x02]);
        tbs.write_context_specific(0, true, &ver_int.finish());

        tbs.write_integer(&self.serial_number);
        tbs.write_raw(&sig_alg);
        tbs.write_raw(&encode_distinguished_name(&self.issuer));
        tbs.write_raw(&encode_validity(self.not_before, self.not_after));
        tbs.write_raw(&encode_distinguished_name(&self.subject));
        tbs.write_raw(&encode_rsa_spki(&spki));

        if let Some(is_ca) = self.basic_constraints_ca {
            tbs.write_context_specific(3, true, &encode_basic_constraints(is_ca));
        }

        let mut tbs_seq = Encoder::new();
        tbs_seq.write_sequence(&tbs.finish());
        let tbs_raw = tbs_seq.finish();

        let digest = Sha256::digest(&tbs_raw).map_err(PkiError::CryptoError)?;
        let signature = signing_key.sign(&digest).map_err(PkiError::CryptoError)?;

        let mut outer = Encoder::new();
        outer.write_raw(&tbs_raw);
        outer.write_raw(&sig_alg);
        outer.write_bit_string(0, &signature);
        let mut result = Encoder::new();
        result.write_sequence(&outer.finish());
        let raw = result.finish();

        // Re-parse so every derived field (TBS digest included) is exactly
        // what a peer would compute.
        Certificate::from_der(&raw)
    }

    /// Build the certificate and encode it as a PEM string.
    pub fn build_pem(self, signing_key: &RsaPrivateKey) -> Result<String, PkiError> {
        let cert = self.build(signing_key)?;
        Ok(slimtls_utils::pem::encode("CERTIFICATE", &cert.raw))
    }
}

impl Default for CertificateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// AlgorithmIdentifier for sha256WithRSAEncryption (params NULL).
fn encode_sha256_rsa_algorithm() -> Vec<u8> {
    let mut inner = Encoder::new();
    inner.write_oid(&known::sha256_with_rsa_encryption().to_der_value());
    inner.write_null();
    let mut outer = Encoder::new();
    outer.write_sequence(&inner.finish());
    outer.finish()
}

/// Name ::= SEQUENCE of SET of SEQUENCE { OID, string }.
fn encode_distinguished_name(dn: &DistinguishedName) -> Vec<u8> {
    let mut rdns = Encoder::new();
    for (attr_name, value) in &dn.entries {
        let mut atav = Encoder::new();
        let oid = known::dn_short_name_to_oid(attr_name).unwrap_or_else(known::common_name);
        atav.write_oid(&oid.to_der_value());
        // Country name uses PrintableString per RFC 5280
        if attr_name == "C" {
            atav.write_printable_string(value);
        } else {
            atav.write_utf8_string(value);
        }
        let mut seq = Encoder::new();
        seq.write_sequence(&atav.finish());
        let mut set = Encoder::new();
        set.write_set(&seq.finish());
        rdns.write_raw(&set.finish());
    }
    let mut outer = Encoder::new();
    outer.write_sequence(&rdns.finish());
    outer.finish()
}

fn encode_validity(not_before: i64, not_after: i64) -> Vec<u8> {
    let mut inner = Encoder::new();
    inner.write_time(not_before);
    inner.write_time(not_after);
    let mut outer = Encoder::new();
    outer.write_sequence(&inner.finish());
    outer.finish()
}

/// SubjectPublicKeyInfo wrapping RSAPublicKey ::= SEQUENCE { n, e }.
fn encode_rsa_spki(key: &RsaPublicKey) -> Vec<u8> {
    let mut key_inner = Encoder::new();
    key_inner.write_integer(&key.n_bytes());
    key_inner.write_integer(&key.e_bytes());
    let mut key_seq = Encoder::new();
    key_seq.write_sequence(&key_inner.finish());

    let mut alg = Encoder::new();
    alg.write_oid(&known::rsa_encryption().to_der_value());
    alg.write_null();
    let mut alg_seq = Encoder::new();
    alg_seq.write_sequence(&alg.finish());

    let mut inner = Encoder::new();
    inner.write_raw(&alg_seq.finish());
    inner.write_bit_string(0, &key_seq.finish());
    let mut outer = Encoder::new();
    outer.write_sequence(&inner.finish());
    outer.finish()
}

/// Extensions [3]: one critical BasicConstraints entry.
fn encode_basic_constraints(is_ca: bool) -> Vec<u8> {
    let mut bc_inner = Encoder::new();
    if is_ca {
        bc_inner.write_boolean(true);
    }
    let mut bc_seq = Encoder::new();
    bc_seq.write_sequence(&bc_inner.finish());

    let mut ext_inner = Encoder::new();
    ext_inner.write_oid(&known::basic_constraints().to_der_value());
    ext_inner.write_boolean(true);
    ext_inner.write_octet_string(&bc_seq.finish());
    let mut ext_seq = Encoder::new();
    ext_seq.write_sequence(&ext_inner.finish());

    let mut list = Encoder::new();
    list.write_sequence(&ext_seq.finish());
    list.finish()
}
