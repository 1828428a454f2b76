//! Client-side handshake session for the RSA key exchange.
//!
//! The session validates message order and content and produces the
//! outgoing flight; record I/O and ChangeCipherSpec handling belong to
//! the connection driver. The pre-master secret is generated here,
//! encrypted to the server's leaf certificate key, and never leaves the
//! session unencrypted.

use slimtls_pki::x509::{verify_chain, Certificate};
use slimtls_types::TlsError;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::config::TlsConfig;
use crate::crypt::key_schedule::{
    compute_verify_data, derive_key_block, derive_master_secret, KeyBlock, PRE_MASTER_SECRET_LEN,
};
use crate::crypt::transcript::TranscriptHash;
use crate::crypt::CipherSuiteParams;
use crate::extensions::{self, ExtensionType};
use crate::handshake::codec::{
    decode_certificate, decode_finished, decode_server_hello, decode_server_hello_done,
    encode_client_hello, encode_client_key_exchange, encode_finished, parse_handshake_header,
    ClientHello,
};
use crate::handshake::HandshakeType;
use crate::{CipherSuite, COMPRESSION_NULL, TLS12_VERSION};

/// Client session states, advanced one message at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSessionState {
    Idle,
    WaitServerHello,
    WaitCertificate,
    WaitServerHelloDone,
    WaitServerFinished,
    Connected,
}

/// The client flight produced after ServerHelloDone: ClientKeyExchange
/// and Finished messages plus the record keys to install between them.
pub struct ClientFlight {
    pub client_key_exchange: Vec<u8>,
    pub finished: Vec<u8>,
    pub key_block: KeyBlock,
    pub params: CipherSuiteParams,
}

/// Client handshake session.
pub struct ClientSession {
    config: TlsConfig,
    state: ClientSessionState,
    transcript: TranscriptHash,
    client_random: [u8; 32],
    server_random: [u8; 32],
    params: Option<CipherSuiteParams>,
    master_secret: Vec<u8>,
    server_chain: Vec<Certificate>,
    server_verify_data: Vec<u8>,
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.master_secret.zeroize();
    }
}

impl ClientSession {
    pub fn new(config: TlsConfig) -> Self {
        Self {
            config,
            state: ClientSessionState::Idle,
            transcript: TranscriptHash::new(),
            client_random: [0u8; 32],
            server_random: [0u8; 32],
            params: None,
            master_secret: Vec::new(),
            server_chain: Vec::new(),
            server_verify_data: Vec::new(),
        }
    }

    pub fn state(&self) -> ClientSessionState {
        self.state
    }

    /// Build the ClientHello: the configured suites plus the
    /// renegotiation SCSV, the null compressor, and an empty
    /// `renegotiation_info` extension.
    pub fn build_client_hello(&mut self) -> Result<Vec<u8>, TlsError> {
        if self.state != ClientSessionState::Idle {
            return Err(TlsError::HandshakeFailed("unexpected ClientHello".into()));
        }

        getrandom::getrandom(&mut self.client_random)
            .map_err(|e| TlsError::HandshakeFailed(format!("random gen failed: {e}")))?;

        let mut cipher_suites = self.config.cipher_suites.clone();
        if !cipher_suites.contains(&CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV) {
            cipher_suites.push(CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV);
        }

        let ch = ClientHello {
            client_version: TLS12_VERSION,
            random: self.client_random,
            session_id: Vec::new(),
            cipher_suites,
            compression_methods: vec![COMPRESSION_NULL],
            extensions: vec![extensions::Extension::empty_renegotiation_info()],
        };
        let msg = encode_client_hello(&ch);
        self.transcript.update(&msg);

        self.state = ClientSessionState::WaitServerHello;
        Ok(msg)
    }

    /// Process the ServerHello: the selected suite must be one we
    /// offered, the compressor null, and the version exactly TLS 1.2.
    pub fn process_server_hello(&mut self, msg: &[u8]) -> Result<CipherSuite, TlsError> {
        if self.state != ClientSessionState::WaitServerHello {
            return Err(TlsError::HandshakeFailed("unexpected ServerHello".into()));
        }

        let (_, body, _) = parse_handshake_header(msg)?;
        let sh = decode_server_hello(body)?;

        if sh.server_version != TLS12_VERSION {
            return Err(TlsError::UnsupportedVersion);
        }
        if !self.config.cipher_suites.contains(&sh.cipher_suite) {
            return Err(TlsError::HandshakeFailed(format!(
                "server selected unoffered cipher suite {:#06x}",
                sh.cipher_suite.0
            )));
        }
        let params = CipherSuiteParams::from_suite(sh.cipher_suite)?;
        if sh.compression_method != COMPRESSION_NULL {
            return Err(TlsError::HandshakeFailed(
                "server selected unoffered compressor".into(),
            ));
        }
        // We never renegotiate, so the echoed verify_data must be empty
        if let Some(ext) = extensions::find(&sh.extensions, ExtensionType::RENEGOTIATION_INFO) {
            if !ext.is_empty_renegotiation_info() {
                return Err(TlsError::HandshakeFailed(
                    "non-empty renegotiation_info".into(),
                ));
            }
        }

        self.server_random = sh.random;
        self.params = Some(params);
        self.transcript.update(msg);
        self.state = ClientSessionState::WaitCertificate;
        Ok(sh.cipher_suite)
    }

    /// Process the server Certificate: parse the chain and, unless peer
    /// verification is disabled, verify it against the trust store.
    pub fn process_certificate(&mut self, msg: &[u8]) -> Result<(), TlsError> {
        if self.state != ClientSessionState::WaitCertificate {
            return Err(TlsError::HandshakeFailed("unexpected Certificate".into()));
        }

        let (_, body, _) = parse_handshake_header(msg)?;
        let ders = decode_certificate(body)?;
        if ders.is_empty() {
            return Err(TlsError::CertVerifyFailed("empty certificate chain".into()));
        }

        let mut chain = Vec::with_capacity(ders.len());
        for der in &ders {
            let cert = Certificate::from_der(der)
                .map_err(|e| TlsError::CertVerifyFailed(e.to_string()))?;
            chain.push(cert);
        }

        if self.config.verify_peer {
            verify_chain(&self.config.trust_store, &chain, self.config.verification_time)
                .map_err(|e| TlsError::CertVerifyFailed(e.to_string()))?;
        }

        self.server_chain = chain;
        self.transcript.update(msg);
        self.state = ClientSessionState::WaitServerHelloDone;
        Ok(())
    }

    /// Process ServerHelloDone and build the client flight: generate and
    /// encrypt the pre-master secret, derive the key material, and
    /// compute the client Finished over the transcript so far.
    pub fn process_server_hello_done(&mut self, msg: &[u8]) -> Result<ClientFlight, TlsError> {
        if self.state != ClientSessionState::WaitServerHelloDone {
            return Err(TlsError::HandshakeFailed("unexpected ServerHelloDone".into()));
        }

        let (_, body, _) = parse_handshake_header(msg)?;
        decode_server_hello_done(body)?;
        self.transcript.update(msg);

        let params = self
            .params
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated cipher suite".into()))?;
        let leaf = self
            .server_chain
            .first()
            .ok_or_else(|| TlsError::HandshakeFailed("no server certificate".into()))?;

        // pre_master_secret = offered client_version || 46 random bytes
        let mut pms = [0u8; PRE_MASTER_SECRET_LEN];
        pms[..2].copy_from_slice(&TLS12_VERSION.to_be_bytes());
        getrandom::getrandom(&mut pms[2..])
            .map_err(|e| TlsError::HandshakeFailed(format!("random gen failed: {e}")))?;

        let encrypted_pms = leaf
            .public_key
            .encrypt(&pms)
            .map_err(TlsError::CryptoError)?;

        let master_secret =
            derive_master_secret(&pms, &self.client_random, &self.server_random)?;
        pms.zeroize();
        let key_block = derive_key_block(
            &master_secret,
            &self.server_random,
            &self.client_random,
            &params,
        )?;
        self.master_secret = master_secret;

        let cke_msg = encode_client_key_exchange(&encrypted_pms);
        self.transcript.update(&cke_msg);

        let transcript_hash = self.transcript.current_hash()?;
        let verify_data =
            compute_verify_data(&self.master_secret, "client finished", &transcript_hash)?;
        let finished_msg = encode_finished(&verify_data);
        self.transcript.update(&finished_msg);

        self.state = ClientSessionState::WaitServerFinished;
        Ok(ClientFlight {
            client_key_exchange: cke_msg,
            finished: finished_msg,
            key_block,
            params,
        })
    }

    /// Verify the server Finished against the full transcript.
    pub fn process_server_finished(&mut self, msg: &[u8]) -> Result<(), TlsError> {
        if self.state != ClientSessionState::WaitServerFinished {
            return Err(TlsError::HandshakeFailed("unexpected Finished".into()));
        }

        let (msg_type, body, _) = parse_handshake_header(msg)?;
        if msg_type != HandshakeType::Finished {
            return Err(TlsError::HandshakeFailed(format!(
                "expected Finished, got {msg_type:?}"
            )));
        }
        let received = decode_finished(body)?;

        let transcript_hash = self.transcript.current_hash()?;
        let expected =
            compute_verify_data(&self.master_secret, "server finished", &transcript_hash)?;
        if !bool::from(received.ct_eq(&expected)) {
            return Err(TlsError::DecryptError);
        }

        self.transcript.update(msg);
        self.server_verify_data = received;
        self.state = ClientSessionState::Connected;
        Ok(())
    }

    /// The server's certificate chain (leaf first), available once the
    /// Certificate message has been processed.
    pub fn peer_chain(&self) -> &[Certificate] {
        &self.server_chain
    }

    #[cfg(test)]
    pub(crate) fn master_secret(&self) -> &[u8] {
        &self.master_secret
    }
}
