//! Non-blocking TLS client connection.

use std::io::{Read, Write};

use log::debug;
use slimtls_types::TlsError;

use crate::alert::Alert;
use crate::config::TlsConfig;
use crate::handshake::client::ClientSession;
use crate::handshake::codec::encode_change_cipher_spec;
use crate::handshake::{HandshakeState, HandshakeType};
use crate::record::protection::{RecordOpener, RecordProtector};
use crate::record::ContentType;
use crate::{CipherSuite, TlsRole};

use super::{
    check_established, unexpected_event, ConnectionCore, HandshakeEvent, TlsConnection,
};

/// A TLS 1.2 client connection over a `Read + Write` transport.
pub struct TlsClientConnection<S: Read + Write> {
    core: ConnectionCore<S>,
    session: ClientSession,
    state: HandshakeState,
    negotiated: Option<CipherSuite>,
}

impl<S: Read + Write> TlsClientConnection<S> {
    /// Bind a client connection to a transport. The configuration must
    /// carry a trust store unless peer verification was disabled.
    pub fn new(stream: S, config: TlsConfig) -> Result<Self, TlsError> {
        if config.role != TlsRole::Client {
            return Err(TlsError::HandshakeFailed(
                "client connection requires a client configuration".into(),
            ));
        }
        Ok(Self {
            core: ConnectionCore::new(stream),
            session: ClientSession::new(config),
            state: HandshakeState::Initial,
            negotiated: None,
        })
    }

    fn set_state(&mut self, next: HandshakeState) {
        debug!("client state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn drive_handshake(&mut self) -> Result<(), TlsError> {
        loop {
            self.core.flush_send()?;
            match self.state {
                HandshakeState::Initial => {
                    let hello = self.session.build_client_hello()?;
                    self.core.queue_handshake(&hello)?;
                    self.set_state(HandshakeState::ClientHelloSent);
                }
                HandshakeState::ClientHelloSent => match self.core.next_handshake_event()? {
                    HandshakeEvent::Message(HandshakeType::HelloRequest, _) => {}
                    HandshakeEvent::Message(HandshakeType::ServerHello, msg) => {
                        self.negotiated = Some(self.session.process_server_hello(&msg)?);
                        self.set_state(HandshakeState::ServerHelloRcvd);
                    }
                    event => return Err(unexpected_event(event, "ServerHello")),
                },
                HandshakeState::ServerHelloRcvd => match self.core.next_handshake_event()? {
                    HandshakeEvent::Message(HandshakeType::Certificate, msg) => {
                        self.session.process_certificate(&msg)?;
                        self.set_state(HandshakeState::ServerCertRcvd);
                    }
                    event => return Err(unexpected_event(event, "Certificate")),
                },
                HandshakeState::ServerCertRcvd => match self.core.next_handshake_event()? {
                    HandshakeEvent::Message(HandshakeType::ServerHelloDone, msg) => {
                        let flight = self.session.process_server_hello_done(&msg)?;
                        self.core.queue_handshake(&flight.client_key_exchange)?;
                        self.core.queue_record(
                            ContentType::ChangeCipherSpec,
                            &encode_change_cipher_spec(),
                        )?;
                        let kb = &flight.key_block;
                        self.core.record_layer.install_pending(
                            RecordProtector::new(
                                &flight.params,
                                &kb.client_write_mac_key,
                                &kb.client_write_key,
                            )?,
                            RecordOpener::new(
                                &flight.params,
                                &kb.server_write_mac_key,
                                &kb.server_write_key,
                            )?,
                        );
                        self.core.record_layer.activate_pending_write()?;
                        self.core.queue_handshake(&flight.finished)?;
                        self.set_state(HandshakeState::ServerDoneRcvd);
                    }
                    HandshakeEvent::Message(HandshakeType::ServerKeyExchange, _) => {
                        return Err(TlsError::HandshakeFailed(
                            "ServerKeyExchange not used by the RSA key exchange".into(),
                        ));
                    }
                    HandshakeEvent::Message(HandshakeType::CertificateRequest, _) => {
                        return Err(TlsError::HandshakeFailed(
                            "client certificates not supported".into(),
                        ));
                    }
                    event => return Err(unexpected_event(event, "ServerHelloDone")),
                },
                // The client flight is queued; once flushed, wait for
                // the server to switch ciphers and finish.
                HandshakeState::ServerDoneRcvd => {
                    self.set_state(HandshakeState::ClientFinished);
                }
                HandshakeState::ClientFinished => match self.core.next_handshake_event()? {
                    HandshakeEvent::ChangeCipherSpec => {
                        self.core.record_layer.activate_pending_read()?;
                    }
                    HandshakeEvent::Message(HandshakeType::Finished, msg) => {
                        if !self.core.record_layer.is_decrypting() {
                            return Err(TlsError::HandshakeFailed(
                                "Finished before ChangeCipherSpec".into(),
                            ));
                        }
                        self.session.process_server_finished(&msg)?;
                        self.set_state(HandshakeState::Established);
                        debug!("client handshake complete");
                    }
                    event => return Err(unexpected_event(event, "ChangeCipherSpec or Finished")),
                },
                HandshakeState::Established => {
                    self.core.flush_send()?;
                    return Ok(());
                }
                HandshakeState::Closing => return Err(TlsError::PeerClosed),
                _ => {
                    return Err(TlsError::HandshakeFailed(
                        "invalid client handshake state".into(),
                    ))
                }
            }
        }
    }

    /// The verified server certificate chain (leaf first).
    pub fn peer_chain(&self) -> &[slimtls_pki::x509::Certificate] {
        self.session.peer_chain()
    }

    #[cfg(test)]
    pub(crate) fn master_secret(&self) -> &[u8] {
        self.session.master_secret()
    }
}

impl<S: Read + Write> TlsConnection for TlsClientConnection<S> {
    fn handshake(&mut self) -> Result<(), TlsError> {
        if self.core.fatal {
            return Err(TlsError::ConnectionFailed);
        }
        match self.drive_handshake() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.core.fail(e)),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        check_established(self.state, self.core.fatal)?;
        match self.core.read_app_data(buf) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.core.fail(e)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TlsError> {
        check_established(self.state, self.core.fatal)?;
        if self.core.close_notify_sent() {
            return Err(TlsError::RecordError("write after close_notify".into()));
        }
        match self.core.write_app_data(buf) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.core.fail(e)),
        }
    }

    fn shutdown(&mut self) -> Result<(), TlsError> {
        if self.core.fatal {
            return Err(TlsError::ConnectionFailed);
        }
        match self.core.send_close_notify() {
            Ok(()) => {
                self.set_state(HandshakeState::Closing);
                Ok(())
            }
            Err(e) => Err(self.core.fail(e)),
        }
    }

    fn state(&self) -> HandshakeState {
        self.state
    }

    fn cipher_suite(&self) -> Option<CipherSuite> {
        self.negotiated
    }

    fn last_alert(&self) -> Option<Alert> {
        self.core.last_alert()
    }

    fn is_fatal(&self) -> bool {
        self.core.fatal
    }
}
