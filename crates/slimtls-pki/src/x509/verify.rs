//! Certificate chain verification against a trust-anchor store.
//!
//! Chains are leaf-first vectors. Verification walks adjacent pairs and
//! finishes with a single-hop anchor search: the outermost certificate
//! must be issued by (or be) a certificate in the store. There is no
//! deeper path building and no name-constraint processing.

use slimtls_types::PkiError;

use super::certificate::Certificate;

/// A store of trust-anchor certificates.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    anchors: Vec<Certificate>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self {
            anchors: Vec::new(),
        }
    }

    /// Add a trust anchor.
    pub fn add(&mut self, cert: Certificate) {
        self.anchors.push(cert);
    }

    /// Parse and add every CERTIFICATE block from a PEM string.
    pub fn add_pem(&mut self, pem: &str) -> Result<(), PkiError> {
        for cert in parse_certs_pem(pem)? {
            self.anchors.push(cert);
        }
        Ok(())
    }

    /// Number of anchors in the store.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Returns true if the exact certificate (byte-identical DER) is an
    /// anchor.
    fn contains(&self, cert: &Certificate) -> bool {
        self.anchors.iter().any(|a| a.raw == cert.raw)
    }

    /// Find an anchor whose subject matches the certificate's issuer.
    fn find_issuer_of(&self, cert: &Certificate) -> Option<&Certificate> {
        self.anchors.iter().find(|a| a.subject == cert.issuer)
    }
}

/// Verify a leaf-first certificate chain against the trust store.
///
/// Each certificate must be signed by the next one in the chain; the
/// outermost must chain to a store anchor (or itself be an anchor).
/// Every signer must carry the CA flag. When `now` is given, every
/// certificate's validity window is checked against it; embedded targets
/// without a clock pass `None` to skip the check.
pub fn verify_chain(
    store: &TrustStore,
    chain: &[Certificate],
    now: Option<i64>,
) -> Result<(), PkiError> {
    if chain.is_empty() {
        return Err(PkiError::ChainVerifyFailed("empty certificate chain".into()));
    }

    if let Some(now) = now {
        for cert in chain {
            cert.check_validity(now)?;
        }
    }

    // Adjacent pairs: chain[i] is signed by chain[i + 1]
    for pair in chain.windows(2) {
        let (signed, signer) = (&pair[0], &pair[1]);
        if signed.issuer != signer.subject {
            return Err(PkiError::ChainVerifyFailed(format!(
                "issuer '{}' does not match next subject '{}'",
                signed.issuer, signer.subject
            )));
        }
        if !signer.is_ca {
            return Err(PkiError::ChainVerifyFailed(format!(
                "signing certificate '{}' is not a CA",
                signer.subject
            )));
        }
        if !signed.verify_signed_by(signer)? {
            return Err(PkiError::ChainVerifyFailed(format!(
                "bad signature on '{}'",
                signed.subject
            )));
        }
    }

    // Anchor the outermost certificate in the store
    let outer = chain.last().unwrap();
    if store.contains(outer) {
        return Ok(());
    }
    let anchor = store.find_issuer_of(outer).ok_or_else(|| {
        PkiError::ChainVerifyFailed(format!("no trust anchor for issuer '{}'", outer.issuer))
    })?;
    if !anchor.is_ca {
        return Err(PkiError::ChainVerifyFailed(format!(
            "trust anchor '{}' is not a CA",
            anchor.subject
        )));
    }
    if let Some(now) = now {
        anchor.check_validity(now)?;
    }
    if !outer.verify_signed_by(anchor)? {
        return Err(PkiError::ChainVerifyFailed(format!(
            "bad signature on '{}' by trust anchor",
            outer.subject
        )));
    }

    Ok(())
}

/// Parse every CERTIFICATE block from a PEM string.
pub fn parse_certs_pem(pem: &str) -> Result<Vec<Certificate>, PkiError> {
    let blocks = slimtls_utils::pem::parse_kind(pem, slimtls_utils::pem::PemKind::Certificate)
        .map_err(|e| PkiError::Asn1Error(e.to_string()))?;
    blocks
        .iter()
        .map(|b| Certificate::from_der(&b.data))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dn, test_chain, test_rsa_key_pair};
    use crate::x509::CertificateBuilder;

    #[test]
    fn test_verify_two_cert_chain() {
        let (root, chain) = test_chain();
        let mut store = TrustStore::new();
        store.add(root);
        verify_chain(&store, &chain, None).unwrap();
    }

    #[test]
    fn test_verify_chain_with_time() {
        let (root, chain) = test_chain();
        let mut store = TrustStore::new();
        store.add(root);
        verify_chain(&store, &chain, Some(1_800_000_000)).unwrap();
    }

    #[test]
    fn test_expired_chain_rejected() {
        let (root, chain) = test_chain();
        let mut store = TrustStore::new();
        store.add(root);
        let result = verify_chain(&store, &chain, Some(3_000_000_000));
        assert!(matches!(result, Err(PkiError::CertExpired)));
    }

    #[test]
    fn test_not_yet_valid_chain_rejected() {
        let (root, chain) = test_chain();
        let mut store = TrustStore::new();
        store.add(root);
        let result = verify_chain(&store, &chain, Some(1_000_000_000));
        assert!(matches!(result, Err(PkiError::CertNotYetValid)));
    }

    #[test]
    fn test_flipped_signature_byte_rejected() {
        let (root, mut chain) = test_chain();
        let mut store = TrustStore::new();
        store.add(root);

        chain[0].signature_value[10] ^= 0x01;
        let result = verify_chain(&store, &chain, None);
        assert!(matches!(result, Err(PkiError::ChainVerifyFailed(_))));
    }

    #[test]
    fn test_empty_trust_store_rejected() {
        let (_, chain) = test_chain();
        let store = TrustStore::new();
        let result = verify_chain(&store, &chain, None);
        assert!(matches!(result, Err(PkiError::ChainVerifyFailed(_))));
    }

    #[test]
    fn test_empty_chain_rejected() {
        let (root, _) = test_chain();
        let mut store = TrustStore::new();
        store.add(root);
        assert!(verify_chain(&store, &[], None).is_err());
    }

    #[test]
    fn test_self_signed_anchor_in_chain() {
        // A chain consisting of just the trusted root verifies directly
        let (root, _) = test_chain();
        let mut store = TrustStore::new();
        store.add(root.clone());
        verify_chain(&store, &[root], None).unwrap();
    }

    #[test]
    fn test_non_ca_signer_rejected() {
        // Leaf "signed" by another end-entity certificate
        let (pub_key, priv_key) = test_rsa_key_pair();

        let fake_issuer = CertificateBuilder::new()
            .issuer(dn("not a ca"))
            .subject(dn("not a ca"))
            .validity(1_600_000_000, 2_500_000_000)
            .subject_public_key(pub_key.clone())
            .build(&priv_key)
            .unwrap();

        let leaf = CertificateBuilder::new()
            .issuer(dn("not a ca"))
            .subject(dn("victim"))
            .validity(1_600_000_000, 2_500_000_000)
            .subject_public_key(pub_key)
            .build(&priv_key)
            .unwrap();

        let mut store = TrustStore::new();
        store.add(fake_issuer.clone());
        let result = verify_chain(&store, &[leaf, fake_issuer], None);
        assert!(matches!(result, Err(PkiError::ChainVerifyFailed(_))));
    }

    #[test]
    fn test_issuer_subject_mismatch_rejected() {
        let (root, chain) = test_chain();
        let mut store = TrustStore::new();
        store.add(root.clone());

        // Swap the order: intermediate "signed by" leaf
        let swapped = vec![chain[1].clone(), chain[0].clone()];
        let result = verify_chain(&store, &swapped, None);
        assert!(matches!(result, Err(PkiError::ChainVerifyFailed(_))));
    }

    #[test]
    fn test_trust_store_pem_loading() {
        let (pub_key, priv_key) = test_rsa_key_pair();
        let pem = CertificateBuilder::new()
            .issuer(dn("pem anchor"))
            .subject(dn("pem anchor"))
            .validity(1_600_000_000, 2_500_000_000)
            .subject_public_key(pub_key)
            .basic_constraints(true)
            .build_pem(&priv_key)
            .unwrap();

        let mut store = TrustStore::new();
        store.add_pem(&pem).unwrap();
        assert_eq!(store.len(), 1);
    }
}
