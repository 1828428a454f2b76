//! Non-blocking TLS server connection.

use std::io::{Read, Write};

use log::debug;
use slimtls_types::TlsError;

use crate::alert::Alert;
use crate::config::TlsConfig;
use crate::handshake::codec::encode_change_cipher_spec;
use crate::handshake::server::{ServerFlight, ServerSession};
use crate::handshake::{HandshakeState, HandshakeType};
use crate::record::protection::{RecordOpener, RecordProtector};
use crate::record::ContentType;
use crate::{CipherSuite, TlsRole};

use super::{
    check_established, unexpected_event, ConnectionCore, HandshakeEvent, TlsConnection,
};

/// A TLS 1.2 server connection over a `Read + Write` transport.
pub struct TlsServerConnection<S: Read + Write> {
    core: ConnectionCore<S>,
    session: ServerSession,
    state: HandshakeState,
    negotiated: Option<CipherSuite>,
    /// Flight built from the ClientHello, queued on the next pass.
    pending_flight: Option<ServerFlight>,
    /// Finished message built after the client's verified.
    pending_finished: Option<Vec<u8>>,
}

impl<S: Read + Write> TlsServerConnection<S> {
    /// Bind a server connection to a transport. The configuration must
    /// carry a certificate chain and matching private key.
    pub fn new(stream: S, config: TlsConfig) -> Result<Self, TlsError> {
        if config.role != TlsRole::Server {
            return Err(TlsError::HandshakeFailed(
                "server connection requires a server configuration".into(),
            ));
        }
        Ok(Self {
            core: ConnectionCore::new(stream),
            session: ServerSession::new(config),
            state: HandshakeState::Initial,
            negotiated: None,
            pending_flight: None,
            pending_finished: None,
        })
    }

    fn set_state(&mut self, next: HandshakeState) {
        debug!("server state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn drive_handshake(&mut self) -> Result<(), TlsError> {
        loop {
            self.core.flush_send()?;
            match self.state {
                HandshakeState::Initial => {
                    self.set_state(HandshakeState::ClientHelloWait);
                }
                HandshakeState::ClientHelloWait => match self.core.next_handshake_event()? {
                    HandshakeEvent::Message(HandshakeType::ClientHello, msg) => {
                        let flight = self.session.process_client_hello(&msg)?;
                        debug!("negotiated cipher suite {:#06x}", flight.suite.0);
                        self.negotiated = Some(flight.suite);
                        self.pending_flight = Some(flight);
                        self.set_state(HandshakeState::ClientHelloRcvd);
                    }
                    event => return Err(unexpected_event(event, "ClientHello")),
                },
                HandshakeState::ClientHelloRcvd => {
                    let flight = self.pending_flight.take().ok_or_else(|| {
                        TlsError::HandshakeFailed("server flight missing".into())
                    })?;
                    self.core.queue_handshake(&flight.server_hello)?;
                    self.core.queue_handshake(&flight.certificate)?;
                    self.core.queue_handshake(&flight.server_hello_done)?;
                    self.set_state(HandshakeState::ServerHelloSent);
                }
                HandshakeState::ServerHelloSent => match self.core.next_handshake_event()? {
                    HandshakeEvent::Message(HandshakeType::ClientKeyExchange, msg) => {
                        let keys = self.session.process_client_key_exchange(&msg)?;
                        let kb = &keys.key_block;
                        self.core.record_layer.install_pending(
                            RecordProtector::new(
                                &keys.params,
                                &kb.server_write_mac_key,
                                &kb.server_write_key,
                            )?,
                            RecordOpener::new(
                                &keys.params,
                                &kb.client_write_mac_key,
                                &kb.client_write_key,
                            )?,
                        );
                    }
                    HandshakeEvent::ChangeCipherSpec => {
                        self.session.process_change_cipher_spec()?;
                        self.core.record_layer.activate_pending_read()?;
                    }
                    HandshakeEvent::Message(HandshakeType::Finished, msg) => {
                        if !self.core.record_layer.is_decrypting() {
                            return Err(TlsError::HandshakeFailed(
                                "Finished before ChangeCipherSpec".into(),
                            ));
                        }
                        let finished = self.session.process_finished(&msg)?;
                        self.pending_finished = Some(finished);
                        self.set_state(HandshakeState::ClientFinished);
                    }
                    event => return Err(unexpected_event(event, "ClientKeyExchange")),
                },
                HandshakeState::ClientFinished => {
                    let finished = self.pending_finished.take().ok_or_else(|| {
                        TlsError::HandshakeFailed("server Finished missing".into())
                    })?;
                    self.core
                        .queue_record(ContentType::ChangeCipherSpec, &encode_change_cipher_spec())?;
                    self.core.record_layer.activate_pending_write()?;
                    self.core.queue_handshake(&finished)?;
                    self.set_state(HandshakeState::Established);
                    debug!("server handshake complete");
                }
                HandshakeState::Established => {
                    self.core.flush_send()?;
                    return Ok(());
                }
                HandshakeState::Closing => return Err(TlsError::PeerClosed),
                _ => {
                    return Err(TlsError::HandshakeFailed(
                        "invalid server handshake state".into(),
                    ))
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn master_secret(&self) -> &[u8] {
        self.session.master_secret()
    }
}

impl<S: Read + Write> TlsConnection for TlsServerConnection<S> {
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
