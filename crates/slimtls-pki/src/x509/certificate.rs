//! X.509 certificate type and DER/PEM parsing.
//!
//! Parsing walks the full tbsCertificate and computes the digest of the
//! TBS span at parse time, selected by the declared signature-hash OID.
//! Later chain verification only compares that digest against the value
//! recovered from the issuer's signature.

use slimtls_crypto::md5::Md5;
use slimtls_crypto::rsa::RsaPublicKey;
use slimtls_crypto::sha1::Sha1;
use slimtls_crypto::sha2::Sha256;
use slimtls_types::{HashAlgId, PkiError};
use slimtls_utils::asn1::{tags, Decoder, TagClass};
use slimtls_utils::oid::{known, Oid};

/// A distinguished name (DN): ordered attribute/value pairs.
#[derive(Debug, Clone)]
pub struct DistinguishedName {
    pub entries: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Get the value for a given attribute short name (e.g., "CN").
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == attr)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for DistinguishedName {}

/// Supported certificate signature algorithms (RSA with MD5/SHA-1/SHA-256).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlg {
    Md5WithRsa,
    Sha1WithRsa,
    Sha256WithRsa,
}

impl SignatureAlg {
    /// The hash this signature algorithm digests the TBS with.
    pub fn hash(&self) -> HashAlgId {
        match self {
            SignatureAlg::Md5WithRsa => HashAlgId::Md5,
            SignatureAlg::Sha1WithRsa => HashAlgId::Sha1,
            SignatureAlg::Sha256WithRsa => HashAlgId::Sha256,
        }
    }

    fn from_oid(oid: &Oid) -> Result<Self, PkiError> {
        if *oid == known::sha256_with_rsa_encryption() {
            Ok(SignatureAlg::Sha256WithRsa)
        } else if *oid == known::sha1_with_rsa_encryption() {
            Ok(SignatureAlg::Sha1WithRsa)
        } else if *oid == known::md5_with_rsa_encryption() {
            Ok(SignatureAlg::Md5WithRsa)
        } else {
            Err(PkiError::InvalidCert(format!(
                "unsupported signature algorithm: {oid}"
            )))
        }
    }
}

/// An X.509 certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// DER-encoded certificate data.
    pub raw: Vec<u8>,
    /// Certificate version (1..=3).
    pub version: u8,
    /// Serial number content bytes.
    pub serial_number: Vec<u8>,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Not-before validity time (UNIX timestamp).
    pub not_before: i64,
    /// Not-after validity time (UNIX timestamp).
    pub not_after: i64,
    /// Subject RSA public key, owned by this certificate.
    pub public_key: RsaPublicKey,
    /// Signature algorithm (outer signatureAlgorithm field).
    pub signature_algorithm: SignatureAlg,
    /// Signature value bytes.
    pub signature_value: Vec<u8>,
    /// Digest of the raw tbsCertificate span, computed at parse with the
    /// hash the signature algorithm declares.
    pub tbs_digest: Vec<u8>,
    /// BasicConstraints CA flag (false when the extension is absent).
    pub is_ca: bool,
}

impl Certificate {
    /// Parse a certificate from DER-encoded bytes.
    pub fn from_der(data: &[u8]) -> Result<Self, PkiError> {
        let mut outer = Decoder::new(data)
            .read_sequence()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;

        // Capture the raw TBS span (tag + length + value) for digesting;
        // remaining() before/after brackets the exact bytes.
        let remaining_before = outer.remaining();
        let tbs_tlv = outer
            .read_tlv()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
        let tbs_consumed = remaining_before.len() - outer.remaining().len();
        let tbs_raw = &remaining_before[..tbs_consumed];

        let mut tbs_dec = Decoder::new(tbs_tlv.value);

        // version [0] EXPLICIT INTEGER DEFAULT v1
        let version = {
            let v_tlv = tbs_dec
                .try_read_context_specific(0, true)
                .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            if let Some(v_tlv) = v_tlv {
                let mut v_dec = Decoder::new(v_tlv.value);
                let ver_bytes = v_dec
                    .read_integer()
                    .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
                ver_bytes.last().copied().unwrap_or(0) + 1
            } else {
                1
            }
        };

        // serialNumber INTEGER
        let serial_number = tbs_dec
            .read_integer()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?
            .to_vec();

        // signature AlgorithmIdentifier (inner)
        let inner_sig_oid = parse_algorithm_identifier(&mut tbs_dec)?;
        let inner_alg = SignatureAlg::from_oid(&inner_sig_oid)?;

        // issuer Name
        let issuer = parse_name(&mut tbs_dec)?;

        // validity Validity
        let (not_before, not_after) = parse_validity(&mut tbs_dec)?;

        // subject Name
        let subject = parse_name(&mut tbs_dec)?;

        // subjectPublicKeyInfo
        let public_key = parse_rsa_spki(&mut tbs_dec)?;

        // issuerUniqueID [1] / subjectUniqueID [2] IMPLICIT BIT STRING OPTIONAL
        let _ = tbs_dec
            .try_read_context_specific(1, false)
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
        let _ = tbs_dec
            .try_read_context_specific(2, false)
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;

        // extensions [3] EXPLICIT Extensions OPTIONAL
        let is_ca = {
            let ext_tlv = tbs_dec
                .try_read_context_specific(3, true)
                .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            match ext_tlv {
                Some(ext_tlv) => parse_extensions_ca_flag(ext_tlv.value)?,
                None => false,
            }
        };

        // signatureAlgorithm AlgorithmIdentifier (outer, must match inner)
        let outer_sig_oid = parse_algorithm_identifier(&mut outer)?;
        let signature_algorithm = SignatureAlg::from_oid(&outer_sig_oid)?;
        if signature_algorithm != inner_alg {
            return Err(PkiError::InvalidCert(
                "signature algorithm mismatch between TBS and outer field".into(),
            ));
        }

        // signatureValue BIT STRING
        let (unused, sig_bytes) = outer
            .read_bit_string()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
        if unused != 0 {
            return Err(PkiError::InvalidCert(
                "signature bit string has unused bits".into(),
            ));
        }

        let tbs_digest = digest_tbs(signature_algorithm, tbs_raw)?;

        Ok(Certificate {
            raw: data.to_vec(),
            version,
            serial_number,
            issuer,
            subject,
            not_before,
            not_after,
            public_key,
            signature_algorithm,
            signature_value: sig_bytes.to_vec(),
            tbs_digest,
            is_ca,
        })
    }

    /// Parse the first CERTIFICATE block from a PEM-encoded string.
    pub fn from_pem(pem: &str) -> Result<Self, PkiError> {
        let blocks = slimtls_utils::pem::parse_kind(pem, slimtls_utils::pem::PemKind::Certificate)
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
        let block = blocks
            .first()
            .ok_or_else(|| PkiError::InvalidCert("no CERTIFICATE block found".into()))?;
        Self::from_der(&block.data)
    }

    /// Returns true if issuer DN equals subject DN.
    pub fn is_self_signed(&self) -> bool {
        self.issuer == self.subject
    }

    /// Verify this certificate's signature against the issuer's public key.
    ///
    /// The issuer's RSA key recovers the signed DigestInfo block and the
    /// embedded digest is compared against `tbs_digest` in constant time.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<bool, PkiError> {
        issuer
            .public_key
            .verify(&self.tbs_digest, &self.signature_value)
            .map_err(PkiError::CryptoError)
    }

    /// Check the validity window against a UNIX timestamp.
    pub fn check_validity(&self, now: i64) -> Result<(), PkiError> {
        if now < self.not_before {
            return Err(PkiError::CertNotYetValid);
        }
        if now > self.not_after {
            return Err(PkiError::CertExpired);
        }
        Ok(())
    }
}

/// Digest a TBS span with the hash the signature algorithm declares.
fn digest_tbs(alg: SignatureAlg, tbs: &[u8]) -> Result<Vec<u8>, PkiError> {
    let digest = match alg {
        SignatureAlg::Md5WithRsa => Md5::digest(tbs).map(|d| d.to_vec()),
        SignatureAlg::Sha1WithRsa => Sha1::digest(tbs).map(|d| d.to_vec()),
        SignatureAlg::Sha256WithRsa => Sha256::digest(tbs).map(|d| d.to_vec()),
    };
    digest.map_err(PkiError::CryptoError)
}

/// Parse an AlgorithmIdentifier SEQUENCE, returning the OID. Parameters
/// (NULL for every algorithm this stack knows) are skipped.
pub(crate) fn parse_algorithm_identifier(dec: &mut Decoder) -> Result<Oid, PkiError> {
    let mut alg_dec = dec
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let oid_bytes = alg_dec
        .read_oid()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let oid = Oid::from_der_value(oid_bytes).map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    if !alg_dec.is_empty() {
        alg_dec
            .read_tlv()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    }
    Ok(oid)
}

/// Parse a Name (SEQUENCE of SET of SEQUENCE { OID, string }).
pub(crate) fn parse_name(dec: &mut Decoder) -> Result<DistinguishedName, PkiError> {
    let mut name_dec = dec
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let mut entries = Vec::new();
    while !name_dec.is_empty() {
        let mut rdn_dec = name_dec
            .read_set()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
        while !rdn_dec.is_empty() {
            let mut atav_dec = rdn_dec
                .read_sequence()
                .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            let oid_bytes = atav_dec
                .read_oid()
                .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            let oid =
                Oid::from_der_value(oid_bytes).map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            let attr_name = known::oid_to_dn_short_name(&oid)
                .map(|s| s.to_string())
                .unwrap_or_else(|| oid.to_dot_string());
            let value = atav_dec
                .read_string()
                .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            entries.push((attr_name, value));
        }
    }
    Ok(DistinguishedName { entries })
}

fn parse_validity(dec: &mut Decoder) -> Result<(i64, i64), PkiError> {
    let mut val_dec = dec
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let not_before = val_dec
        .read_time()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let not_after = val_dec
        .read_time()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    Ok((not_before, not_after))
}

/// Parse a SubjectPublicKeyInfo holding an RSA key.
///
/// The BIT STRING wraps a DER `RSAPublicKey ::= SEQUENCE { n, e }`.
pub(crate) fn parse_rsa_spki(dec: &mut Decoder) -> Result<RsaPublicKey, PkiError> {
    let mut spki_dec = dec
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let alg_oid = parse_algorithm_identifier(&mut spki_dec)?;
    if alg_oid != known::rsa_encryption() {
        return Err(PkiError::InvalidCert(format!(
            "unsupported public key algorithm: {alg_oid}"
        )));
    }
    let (_, key_bytes) = spki_dec
        .read_bit_string()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;

    let mut key_dec = Decoder::new(key_bytes)
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let n = strip_leading_zero(
        key_dec
            .read_integer()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?,
    );
    let e = strip_leading_zero(
        key_dec
            .read_integer()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?,
    );

    RsaPublicKey::new(n, e).map_err(PkiError::CryptoError)
}

/// Walk the extension list and extract the BasicConstraints CA flag.
/// Unknown extensions are decoded and ignored.
fn parse_extensions_ca_flag(ext_data: &[u8]) -> Result<bool, PkiError> {
    let mut ext_seq = Decoder::new(ext_data)
        .read_sequence()
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    let mut is_ca = false;
    while !ext_seq.is_empty() {
        let mut ext_dec = ext_seq
            .read_sequence()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
        let oid_bytes = ext_dec
            .read_oid()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
        let oid = Oid::from_der_value(oid_bytes).map_err(|e| PkiError::Asn1Error(e.to_string()))?;

        // critical BOOLEAN DEFAULT FALSE
        if !ext_dec.is_empty() {
            let tag = ext_dec
                .peek_tag()
                .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            if tag.class == TagClass::Universal && tag.number == tags::BOOLEAN {
                ext_dec
                    .read_boolean()
                    .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            }
        }

        let value = ext_dec
            .read_octet_string()
            .map_err(|e| PkiError::Asn1Error(e.to_string()))?;

        if oid == known::basic_constraints() {
            // BasicConstraints ::= SEQUENCE { cA BOOLEAN DEFAULT FALSE, ... }
            let mut bc_dec = Decoder::new(value)
                .read_sequence()
                .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
            if !bc_dec.is_empty() {
                let tag = bc_dec
                    .peek_tag()
                    .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
                if tag.class == TagClass::Universal && tag.number == tags::BOOLEAN {
                    is_ca = bc_dec
                        .read_boolean()
                        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
                }
            }
        }
    }
    Ok(is_ca)
}

/// Strip the sign-forcing leading zero from a DER INTEGER's content.
pub(crate) fn strip_leading_zero(bytes: &[u8]) -> &[u8] {
    if bytes.len() > 1 && bytes[0] == 0 {
        &bytes[1..]
    } else {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_zero() {
        assert_eq!(strip_leading_zero(&[0x00, 0x80]), &[0x80]);
        assert_eq!(strip_leading_zero(&[0x7F]), &[0x7F]);
        assert_eq!(strip_leading_zero(&[0x00]), &[0x00]);
    }

    #[test]
    fn test_dn_display_and_get() {
        let dn = DistinguishedName {
            entries: vec![
                ("CN".into(), "device.local".into()),
                ("O".into(), "Example".into()),
            ],
        };
        assert_eq!(dn.to_string(), "CN=device.local, O=Example");
        assert_eq!(dn.get("CN"), Some("device.local"));
        assert_eq!(dn.get("C"), None);
    }

    #[test]
    fn test_signature_alg_hash_mapping() {
        assert_eq!(SignatureAlg::Md5WithRsa.hash(), HashAlgId::Md5);
        assert_eq!(SignatureAlg::Sha1WithRsa.hash(), HashAlgId::Sha1);
        assert_eq!(SignatureAlg::Sha256WithRsa.hash(), HashAlgId::Sha256);
    }

    #[test]
    fn test_garbage_der_rejected() {
        assert!(Certificate::from_der(&[]).is_err());
        assert!(Certificate::from_der(&[0x30, 0x82, 0xFF, 0xFF, 0x00]).is_err());
        assert!(Certificate::from_der(&[0x02, 0x01, 0x05]).is_err());
    }
}
