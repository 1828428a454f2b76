//! Server-side handshake session for the RSA key exchange.
//!
//! Suite selection follows the server's own preference order, not the
//! client's. The RSA pre-master decryption applies the RFC 5246
//! §7.4.7.1 countermeasure: padding or version failures substitute a
//! random secret instead of aborting, so a padding oracle never learns
//! which path was taken before the Finished check fails.

use std::sync::Arc;

use slimtls_crypto::rsa::RsaPrivateKey;
use slimtls_types::TlsError;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::config::TlsConfig;
use crate::crypt::key_schedule::{
    compute_verify_data, derive_key_block, derive_master_secret, KeyBlock, PRE_MASTER_SECRET_LEN,
};
use crate::crypt::transcript::TranscriptHash;
use crate::crypt::CipherSuiteParams;
use crate::extensions::{self, Extension, ExtensionType};
use crate::handshake::codec::{
    decode_client_hello, decode_client_key_exchange, decode_finished, encode_certificate,
    encode_finished, encode_server_hello, encode_server_hello_done, parse_handshake_header,
    ClientHello, ServerHello,
};
use crate::handshake::HandshakeType;
use crate::{CipherSuite, COMPRESSION_NULL, TLS12_VERSION};

/// Server session states, advanced one message at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSessionState {
    Idle,
    WaitClientKeyExchange,
    WaitChangeCipherSpec,
    WaitFinished,
    Connected,
}

/// The server flight built from a ClientHello.
pub struct ServerFlight {
    pub server_hello: Vec<u8>,
    pub certificate: Vec<u8>,
    pub server_hello_done: Vec<u8>,
    pub suite: CipherSuite,
}

/// Record key material derived after ClientKeyExchange.
pub struct DerivedKeys {
    pub key_block: KeyBlock,
    pub params: CipherSuiteParams,
}

/// Server handshake session.
pub struct ServerSession {
    config: TlsConfig,
    state: ServerSessionState,
    transcript: TranscriptHash,
    client_random: [u8; 32],
    server_random: [u8; 32],
    params: Option<CipherSuiteParams>,
    master_secret: Vec<u8>,
}

impl Drop for ServerSession {
    fn drop(&mut self) {
        self.master_secret.zeroize();
    }
}

impl ServerSession {
    pub fn new(config: TlsConfig) -> Self {
        Self {
            config,
            state: ServerSessionState::Idle,
            transcript: TranscriptHash::new(),
            client_random: [0u8; 32],
            server_random: [0u8; 32],
            params: None,
            master_secret: Vec::new(),
        }
    }

    pub fn state(&self) -> ServerSessionState {
        self.state
    }

    /// Process a ClientHello and build the server flight:
    /// ServerHello + Certificate + ServerHelloDone.
    pub fn process_client_hello(&mut self, msg: &[u8]) -> Result<ServerFlight, TlsError> {
        if self.state != ServerSessionState::Idle {
            return Err(TlsError::HandshakeFailed("unexpected ClientHello".into()));
        }

        let (_, body, _) = parse_handshake_header(msg)?;
        let ch = decode_client_hello(body)?;

        // The client's highest version must reach TLS 1.2; we always
        // answer with exactly 1.2.
        if ch.client_version < TLS12_VERSION {
            return Err(TlsError::UnsupportedVersion);
        }

        let suite = negotiate_cipher_suite(&ch, &self.config)?;
        let params = CipherSuiteParams::from_suite(suite)?;
        if !ch.compression_methods.contains(&COMPRESSION_NULL) {
            return Err(TlsError::NoSharedCipherSuite);
        }
        let secure_renegotiation = secure_renegotiation_offered(&ch)?;

        self.client_random = ch.random;
        self.transcript.update(msg);

        getrandom::getrandom(&mut self.server_random)
            .map_err(|e| TlsError::HandshakeFailed(format!("random gen failed: {e}")))?;

        let sh = ServerHello {
            server_version: TLS12_VERSION,
            random: self.server_random,
            session_id: Vec::new(),
            cipher_suite: suite,
            compression_method: COMPRESSION_NULL,
            extensions: if secure_renegotiation {
                vec![Extension::empty_renegotiation_info()]
            } else {
                Vec::new()
            },
        };
        let sh_msg = encode_server_hello(&sh);
        self.transcript.update(&sh_msg);

        let cert_msg = encode_certificate(&self.config.certificate_chain);
        self.transcript.update(&cert_msg);

        let shd_msg = encode_server_hello_done();
        self.transcript.update(&shd_msg);

        self.params = Some(params);
        self.state = ServerSessionState::WaitClientKeyExchange;

        Ok(ServerFlight {
            server_hello: sh_msg,
            certificate: cert_msg,
            server_hello_done: shd_msg,
            suite,
        })
    }

    /// Process a ClientKeyExchange: decrypt the pre-master secret and
    /// derive the master secret and record keys.
    pub fn process_client_key_exchange(&mut self, msg: &[u8]) -> Result<DerivedKeys, TlsError> {
        if self.state != ServerSessionState::WaitClientKeyExchange {
            return Err(TlsError::HandshakeFailed(
                "unexpected ClientKeyExchange".into(),
            ));
        }

        let (_, body, _) = parse_handshake_header(msg)?;
        let encrypted_pms = decode_client_key_exchange(body)?;
        self.transcript.update(msg);

        let private_key: &Arc<RsaPrivateKey> = self
            .config
            .private_key
            .as_ref()
            .ok_or_else(|| TlsError::HandshakeFailed("no server private key".into()))?;

        // Start from a random secret; only a well-formed decryption
        // replaces it. A bad-padding abort here would be the classic
        // Bleichenbacher oracle.
        let mut pms = [0u8; PRE_MASTER_SECRET_LEN];
        getrandom::getrandom(&mut pms)
            .map_err(|e| TlsError::HandshakeFailed(format!("random gen failed: {e}")))?;
        if let Ok(mut decrypted) = private_key.decrypt(&encrypted_pms) {
            if decrypted.len() == PRE_MASTER_SECRET_LEN
                && decrypted[..2] == TLS12_VERSION.to_be_bytes()
            {
                pms.copy_from_slice(&decrypted);
            }
            decrypted.zeroize();
        }

        let params = self
            .params
            .ok_or_else(|| TlsError::HandshakeFailed("no negotiated cipher suite".into()))?;

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

        self.state = ServerSessionState::WaitChangeCipherSpec;
        Ok(DerivedKeys { key_block, params })
    }

    /// Process the client's ChangeCipherSpec. Not a handshake message,
    /// so the transcript is untouched.
    pub fn process_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        if self.state != ServerSessionState::WaitChangeCipherSpec {
            return Err(TlsError::HandshakeFailed(
                "unexpected ChangeCipherSpec".into(),
            ));
        }
        self.state = ServerSessionState::WaitFinished;
        Ok(())
    }

    /// Verify the client Finished and build the server's own.
    pub fn process_finished(&mut self, msg: &[u8]) -> Result<Vec<u8>, TlsError> {
        if self.state != ServerSessionState::WaitFinished {
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
            compute_verify_data(&self.master_secret, "client finished", &transcript_hash)?;
        if !bool::from(received.ct_eq(&expected)) {
            return Err(TlsError::DecryptError);
        }

        self.transcript.update(msg);

        let transcript_hash = self.transcript.current_hash()?;
        let verify_data =
            compute_verify_data(&self.master_secret, "server finished", &transcript_hash)?;
        let finished_msg = encode_finished(&verify_data);
        self.transcript.update(&finished_msg);

        self.state = ServerSessionState::Connected;
        Ok(finished_msg)
    }

    #[cfg(test)]
    pub(crate) fn master_secret(&self) -> &[u8] {
        &self.master_secret
    }
}

/// Pick the first suite in the server's preference order the client
/// also offered. The SCSV is a signal, never a suite, and the debug
/// null cipher is excluded even when compiled in.
fn negotiate_cipher_suite(ch: &ClientHello, config: &TlsConfig) -> Result<CipherSuite, TlsError> {
    for &candidate in &config.cipher_suites {
        if candidate == CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV {
            continue;
        }
        #[cfg(feature = "null-cipher")]
        if candidate == CipherSuite::RSA_WITH_NULL_MD5 {
            continue;
        }
        if CipherSuiteParams::from_suite(candidate).is_err() {
            continue;
        }
        if ch.cipher_suites.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(TlsError::NoSharedCipherSuite)
}

/// Did the client signal secure renegotiation support, via either the
/// SCSV or the (necessarily empty) extension?
fn secure_renegotiation_offered(ch: &ClientHello) -> Result<bool, TlsError> {
    if let Some(ext) = extensions::find(&ch.extensions, ExtensionType::RENEGOTIATION_INFO) {
        if !ext.is_empty_renegotiation_info() {
            return Err(TlsError::HandshakeFailed(
                "non-empty renegotiation_info".into(),
            ));
        }
        return Ok(true);
    }
    Ok(ch
        .cipher_suites
        .contains(&CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::codec::encode_client_hello;

    // A tiny self-signed setup is enough for session-level tests; the
    // full chain path is exercised by the connection tests.
    fn server_config() -> TlsConfig {
        let key = test_private_key();
        TlsConfig::builder(crate::TlsRole::Server)
            .certificate_chain(vec![vec![0x30, 0x03, 0x02, 0x01, 0x00]])
            .private_key(key)
            .build()
            .unwrap()
    }

    fn test_private_key() -> RsaPrivateKey {
        let hex = |s: &str| ::hex::decode(s).unwrap();
        let n = hex(
            "00d531c26a4cc6443cca66325ba2746a7eaf0423112d1aa222c8a89f5bb8d12c\
             3dccf8386a53b9aa4d1cfbe5b17ddb8a329732110aa1dd06c55dccb849e5ffc8\
             b2c213bdc95d8fe28e4b75b483b95b7d4cde85ab58dd9cc2b741b79b74c0d09c\
             df85612ca1793d16e28e8d98af311ac3b242c074e551767d0659e9fbaae940c091",
        );
        let e = hex("010001");
        let d = hex(
            "0df14923a68db8dcb8e7e2173812a0fc53f9d3494647dd9ea4bcd25f2f410ec1\
             a3ebffd484513a1ffceb44644d34d45ee6a07198de69140e484a212b440d6c54\
             95e905a5294f7f30066100900603b9f68d2c23d149bb3a09393bca9b09a6d479\
             dd953b76884fb7127db6d169fd7bbdfa5fcd8047876d965d936e819232622cb9",
        );
        let p = hex(
            "00ed8bdd1da05a922e09eae43fc535ba4c0fb7315dab0b6a24136a7ddc0803c1\
             6426f829298419218307822335145a1dc864e3e165a09444fc6106f93809bb934f",
        );
        let q = hex(
            "00e5c19a4c79326ace1080b907791eb70a6a8a164473e18445193743a784f68a\
             72867b962d8c5c42a68ef865c79660a2ae63a9ae8dec8bdcd28e348a3b3544f61f",
        );

        // Derive the CRT parameters the way provisioning tooling would
        use slimtls_bignum::{BarrettCtx, BigNum};
        let one = BigNum::from_u64(1);
        let d_bn = BigNum::from_bytes_be(&d);
        let p_bn = BigNum::from_bytes_be(&p);
        let q_bn = BigNum::from_bytes_be(&q);
        let (p1, _) = p_bn.sub(&one);
        let (q1, _) = q_bn.sub(&one);
        let dp = d_bn.mod_reduce(&p1).unwrap().to_bytes_be();
        let dq = d_bn.mod_reduce(&q1).unwrap().to_bytes_be();
        let p_ctx = BarrettCtx::new(&p_bn).unwrap();
        let (p2, _) = p_bn.sub(&BigNum::from_u64(2));
        let qinv = p_ctx.mod_exp(&q_bn, &p2).unwrap().to_bytes_be();

        RsaPrivateKey::new(&n, &e, &d, &p, &q, &dp, &dq, &qinv).unwrap()
    }

    fn client_hello(suites: Vec<CipherSuite>, compressions: Vec<u8>) -> Vec<u8> {
        encode_client_hello(&ClientHello {
            client_version: TLS12_VERSION,
            random: [0x33; 32],
            session_id: Vec::new(),
            cipher_suites: suites,
            compression_methods: compressions,
            extensions: Vec::new(),
        })
    }

    #[test]
    fn test_server_flight_from_client_hello() {
        let mut session = ServerSession::new(server_config());
        let ch = client_hello(
            vec![
                CipherSuite::RSA_WITH_RC4_128_MD5,
                CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV,
            ],
            vec![0],
        );
        let flight = session.process_client_hello(&ch).unwrap();
        assert_eq!(flight.suite, CipherSuite::RSA_WITH_RC4_128_MD5);
        assert_eq!(session.state(), ServerSessionState::WaitClientKeyExchange);

        let (ty, body, _) = parse_handshake_header(&flight.server_hello).unwrap();
        assert_eq!(ty, HandshakeType::ServerHello);
        let sh = crate::handshake::codec::decode_server_hello(body).unwrap();
        assert_eq!(sh.cipher_suite, CipherSuite::RSA_WITH_RC4_128_MD5);
        // SCSV in the hello earns the empty extension back
        assert!(sh.extensions[0].is_empty_renegotiation_info());
    }

    #[test]
    fn test_no_shared_suite_fails() {
        let mut session = ServerSession::new(server_config());
        let ch = client_hello(vec![CipherSuite(0x1301), CipherSuite(0x002F)], vec![0]);
        assert!(matches!(
            session.process_client_hello(&ch),
            Err(TlsError::NoSharedCipherSuite)
        ));
    }

    #[test]
    fn test_no_null_compressor_fails() {
        let mut session = ServerSession::new(server_config());
        let ch = client_hello(vec![CipherSuite::RSA_WITH_RC4_128_MD5], vec![1]);
        assert!(matches!(
            session.process_client_hello(&ch),
            Err(TlsError::NoSharedCipherSuite)
        ));
    }

    #[test]
    fn test_scsv_alone_never_selected() {
        let mut session = ServerSession::new(server_config());
        let ch = client_hello(vec![CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV], vec![0]);
        assert!(matches!(
            session.process_client_hello(&ch),
            Err(TlsError::NoSharedCipherSuite)
        ));
    }

    #[test]
    fn test_old_client_version_rejected() {
        let mut session = ServerSession::new(server_config());
        let ch = encode_client_hello(&ClientHello {
            client_version: 0x0301,
            random: [0x33; 32],
            session_id: Vec::new(),
            cipher_suites: vec![CipherSuite::RSA_WITH_RC4_128_MD5],
            compression_methods: vec![0],
            extensions: Vec::new(),
        });
        assert!(matches!(
            session.process_client_hello(&ch),
            Err(TlsError::UnsupportedVersion)
        ));
    }

    #[test]
    fn test_reneg_ext_without_scsv_echoed() {
        let mut session = ServerSession::new(server_config());
        let ch = encode_client_hello(&ClientHello {
            client_version: TLS12_VERSION,
            random: [0x33; 32],
            session_id: Vec::new(),
            cipher_suites: vec![CipherSuite::RSA_WITH_RC4_128_MD5],
            compression_methods: vec![0],
            extensions: vec![Extension::empty_renegotiation_info()],
        });
        let flight = session.process_client_hello(&ch).unwrap();
        let (_, body, _) = parse_handshake_header(&flight.server_hello).unwrap();
        let sh = crate::handshake::codec::decode_server_hello(body).unwrap();
        assert!(sh.extensions[0].is_empty_renegotiation_info());
    }

    #[test]
    fn test_nonempty_reneg_ext_rejected() {
        let mut session = ServerSession::new(server_config());
        let ch = encode_client_hello(&ClientHello {
            client_version: TLS12_VERSION,
            random: [0x33; 32],
            session_id: Vec::new(),
            cipher_suites: vec![CipherSuite::RSA_WITH_RC4_128_MD5],
            compression_methods: vec![0],
            extensions: vec![Extension {
                extension_type: ExtensionType::RENEGOTIATION_INFO,
                data: vec![0x0C, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            }],
        });
        assert!(session.process_client_hello(&ch).is_err());
    }

    #[test]
    fn test_bad_pre_master_padding_defers_failure() {
        // Garbage in the ClientKeyExchange must not error here; the
        // random substitute surfaces only as a Finished mismatch later.
        let mut session = ServerSession::new(server_config());
        let ch = client_hello(vec![CipherSuite::RSA_WITH_RC4_128_MD5], vec![0]);
        session.process_client_hello(&ch).unwrap();

        let bogus = vec![0x5Au8; 128];
        let cke = crate::handshake::codec::encode_client_key_exchange(&bogus);
        let keys = session.process_client_key_exchange(&cke).unwrap();
        assert_eq!(keys.key_block.client_write_key.len(), 16);
        assert_eq!(session.state(), ServerSessionState::WaitChangeCipherSpec);
    }

    #[test]
    fn test_ccs_ordering_enforced() {
        let mut session = ServerSession::new(server_config());
        assert!(session.process_change_cipher_spec().is_err());
        let ch = client_hello(vec![CipherSuite::RSA_WITH_RC4_128_MD5], vec![0]);
        session.process_client_hello(&ch).unwrap();
        // CCS before ClientKeyExchange is out of order
        assert!(session.process_change_cipher_spec().is_err());
    }
}
