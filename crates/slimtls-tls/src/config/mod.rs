//! TLS configuration with builder pattern.

use std::fmt;
use std::sync::Arc;

use slimtls_crypto::rsa::RsaPrivateKey;
use slimtls_pki::x509::TrustStore;
use slimtls_types::TlsError;

use crate::{CipherSuite, TlsRole};

/// TLS configuration shared by every connection created from it.
#[derive(Clone)]
pub struct TlsConfig {
    /// The role (client or server).
    pub role: TlsRole,
    /// Enabled cipher suites in preference order. The server picks the
    /// first of its own entries the client also offers.
    pub cipher_suites: Vec<CipherSuite>,
    /// Certificate chain (DER, leaf first). Required for servers.
    pub certificate_chain: Vec<Vec<u8>>,
    /// Private key matching the leaf certificate. Required for servers.
    pub private_key: Option<Arc<RsaPrivateKey>>,
    /// Trust anchors for peer certificate verification.
    pub trust_store: TrustStore,
    /// Whether to verify the peer's certificate chain (client side).
    pub verify_peer: bool,
    /// UNIX timestamp for certificate validity checks. `None` skips the
    /// window check; embedded targets often have no clock.
    pub verification_time: Option<i64>,
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("role", &self.role)
            .field("cipher_suites", &self.cipher_suites)
            .field("certificate_chain_len", &self.certificate_chain.len())
            .field("has_private_key", &self.private_key.is_some())
            .field("trust_anchors", &self.trust_store.len())
            .field("verify_peer", &self.verify_peer)
            .finish()
    }
}

impl TlsConfig {
    /// Create a builder preset for the given role.
    pub fn builder(role: TlsRole) -> TlsConfigBuilder {
        TlsConfigBuilder::new(role)
    }
}

/// Builder for `TlsConfig`.
pub struct TlsConfigBuilder {
    role: TlsRole,
    cipher_suites: Vec<CipherSuite>,
    certificate_chain: Vec<Vec<u8>>,
    private_key: Option<Arc<RsaPrivateKey>>,
    trust_store: TrustStore,
    verify_peer: bool,
    verification_time: Option<i64>,
}

impl TlsConfigBuilder {
    pub fn new(role: TlsRole) -> Self {
        Self {
            role,
            cipher_suites: vec![CipherSuite::RSA_WITH_RC4_128_MD5],
            certificate_chain: Vec::new(),
            private_key: None,
            trust_store: TrustStore::new(),
            verify_peer: role == TlsRole::Client,
            verification_time: None,
        }
    }

    /// Replace the cipher suite preference list.
    pub fn cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.cipher_suites = suites.to_vec();
        self
    }

    /// Set the certificate chain (DER blobs, leaf first).
    pub fn certificate_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.certificate_chain = chain;
        self
    }

    /// Load the certificate chain from a PEM string.
    pub fn certificate_chain_pem(mut self, pem: &str) -> Result<Self, TlsError> {
        let certs = slimtls_pki::x509::parse_certs_pem(pem)
            .map_err(TlsError::PkiError)?;
        self.certificate_chain = certs.into_iter().map(|c| c.raw).collect();
        Ok(self)
    }

    /// Set the private key for the leaf certificate.
    pub fn private_key(mut self, key: RsaPrivateKey) -> Self {
        self.private_key = Some(Arc::new(key));
        self
    }

    /// Load the private key from a PEM string.
    pub fn private_key_pem(mut self, pem: &str) -> Result<Self, TlsError> {
        let key = slimtls_pki::keys::parse_rsa_private_key_pem(pem)
            .map_err(TlsError::PkiError)?;
        self.private_key = Some(Arc::new(key));
        Ok(self)
    }

    /// Replace the trust store.
    pub fn trust_store(mut self, store: TrustStore) -> Self {
        self.trust_store = store;
        self
    }

    /// Add trust anchors from a PEM string.
    pub fn trusted_certs_pem(mut self, pem: &str) -> Result<Self, TlsError> {
        self.trust_store.add_pem(pem).map_err(TlsError::PkiError)?;
        Ok(self)
    }

    /// Enable or disable peer certificate verification.
    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    /// Set the time used for certificate validity checks.
    pub fn verification_time(mut self, unix_time: i64) -> Self {
        self.verification_time = Some(unix_time);
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<TlsConfig, TlsError> {
        if self.cipher_suites.is_empty() {
            return Err(TlsError::HandshakeFailed("no cipher suites enabled".into()));
        }
        match self.role {
            TlsRole::Server => {
                if self.certificate_chain.is_empty() {
                    return Err(TlsError::HandshakeFailed(
                        "server requires a certificate chain".into(),
                    ));
                }
                if self.private_key.is_none() {
                    return Err(TlsError::HandshakeFailed(
                        "server requires a private key".into(),
                    ));
                }
            }
            TlsRole::Client => {
                if self.verify_peer && self.trust_store.is_empty() {
                    return Err(TlsError::HandshakeFailed(
                        "peer verification enabled with empty trust store".into(),
                    ));
                }
            }
        }
        Ok(TlsConfig {
            role: self.role,
            cipher_suites: self.cipher_suites,
            certificate_chain: self.certificate_chain,
            private_key: self.private_key,
            trust_store: self.trust_store,
            verify_peer: self.verify_peer,
            verification_time: self.verification_time,
        })
    }
}
