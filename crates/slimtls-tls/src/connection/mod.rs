//! TLS connections over a `Read + Write` transport.
//!
//! The drivers are non-blocking: every entry point does as much work as
//! the buffered input allows and surfaces `WantRead`/`WantWrite` when
//! the transport stalls, so a caller's event loop simply retries after
//! I/O readiness. A transport signals "not ready" with
//! `io::ErrorKind::WouldBlock`; a blocking transport never produces it
//! and the same code runs to completion in one call.
//!
//! Fatal errors are sticky: the peer is notified with one fatal alert
//! and every later operation fails immediately. There is no reset path;
//! a failed connection is destroyed and a new one created.

mod client;
mod server;

pub use client::TlsClientConnection;
pub use server::TlsServerConnection;

use std::io::{self, Read, Write};

use log::{debug, trace};
use slimtls_types::TlsError;

use crate::alert::{alert_for_error, Alert};
use crate::handshake::codec::{parse_handshake_header, read_u24, MAX_HANDSHAKE_MESSAGE};
use crate::handshake::{HandshakeState, HandshakeType};
use crate::record::{ContentType, RecordLayer, MAX_PLAINTEXT_LENGTH};
use crate::CipherSuite;

/// Bound on each connection-owned buffer. Exceeding it is the fatal
/// resource error, not a recoverable condition.
pub(crate) const MAX_BUFFER: usize = 64 * 1024;

/// Transport read chunk size.
const READ_CHUNK: usize = 4096;

/// Common connection interface for both roles.
pub trait TlsConnection {
    /// Drive the handshake as far as buffered I/O allows. Returns
    /// `Ok(())` once established; `WantRead`/`WantWrite` ask the caller
    /// to retry after transport readiness.
    fn handshake(&mut self) -> Result<(), TlsError>;

    /// Read decrypted application data. Returns `Ok(0)` after the peer's
    /// close_notify.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError>;

    /// Encrypt and send application data, returning how many input
    /// bytes were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TlsError>;

    /// Send close_notify (exactly once) and flush it.
    fn shutdown(&mut self) -> Result<(), TlsError>;

    /// Current handshake state.
    fn state(&self) -> HandshakeState;

    /// Negotiated cipher suite, once the hellos have been exchanged.
    fn cipher_suite(&self) -> Option<CipherSuite>;

    /// The most recent alert sent or received, for error reporting.
    fn last_alert(&self) -> Option<Alert>;

    /// True once a fatal error has made the connection unusable.
    fn is_fatal(&self) -> bool;
}

/// One unit of handshake input: a complete message, or the (non-
/// handshake) ChangeCipherSpec signal.
pub(crate) enum HandshakeEvent {
    Message(HandshakeType, Vec<u8>),
    ChangeCipherSpec,
}

/// Transport plumbing and record buffering shared by both drivers.
///
/// Receive and transmit buffers are exclusively owned here; they grow
/// with demand up to `MAX_BUFFER` and are drained as records are
/// consumed or flushed.
pub(crate) struct ConnectionCore<S> {
    stream: S,
    pub(crate) record_layer: RecordLayer,
    recv_buf: Vec<u8>,
    send_buf: Vec<u8>,
    /// Reassembly buffer: handshake messages may be split across or
    /// coalesced within records.
    hs_buf: Vec<u8>,
    app_buf: Vec<u8>,
    pub(crate) fatal: bool,
    sent_close_notify: bool,
    received_close_notify: bool,
    last_alert: Option<Alert>,
}

impl<S: Read + Write> ConnectionCore<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            record_layer: RecordLayer::new(),
            recv_buf: Vec::with_capacity(READ_CHUNK),
            send_buf: Vec::new(),
            hs_buf: Vec::new(),
            app_buf: Vec::new(),
            fatal: false,
            sent_close_notify: false,
            received_close_notify: false,
            last_alert: None,
        }
    }

    pub(crate) fn last_alert(&self) -> Option<Alert> {
        self.last_alert
    }

    /// Pull more bytes from the transport. `WantRead` when it is not
    /// ready; transport EOF without close_notify is an error, never a
    /// clean end.
    fn fill_recv(&mut self) -> Result<(), TlsError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(TlsError::RecordError(
                        "transport closed without close_notify".into(),
                    ));
                }
                Ok(n) => {
                    if self.recv_buf.len() + n > MAX_BUFFER {
                        return Err(TlsError::ResourceLimit("receive buffer overflow".into()));
                    }
                    self.recv_buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Err(TlsError::WantRead),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TlsError::IoError(e)),
            }
        }
    }

    /// Drain the transmit buffer. `WantWrite` when the transport stalls
    /// with bytes still pending.
    pub(crate) fn flush_send(&mut self) -> Result<(), TlsError> {
        while !self.send_buf.is_empty() {
            match self.stream.write(&self.send_buf) {
                Ok(0) => return Err(TlsError::WantWrite),
                Ok(n) => {
                    self.send_buf.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(TlsError::WantWrite)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TlsError::IoError(e)),
            }
        }
        Ok(())
    }

    /// Seal a record into the transmit buffer.
    pub(crate) fn queue_record(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<(), TlsError> {
        let record = self.record_layer.seal_record(content_type, payload)?;
        if self.send_buf.len() + record.len() > MAX_BUFFER {
            return Err(TlsError::ResourceLimit("transmit buffer overflow".into()));
        }
        self.send_buf.extend_from_slice(&record);
        Ok(())
    }

    /// Queue one handshake message.
    pub(crate) fn queue_handshake(&mut self, msg: &[u8]) -> Result<(), TlsError> {
        trace!("queueing handshake message ({} bytes)", msg.len());
        self.queue_record(ContentType::Handshake, msg)
    }

    /// Produce the next handshake event, pulling records (and transport
    /// bytes) as needed. Warning alerts are skipped here; close_notify
    /// and fatal alerts surface as errors.
    pub(crate) fn next_handshake_event(&mut self) -> Result<HandshakeEvent, TlsError> {
        loop {
            if self.hs_buf.len() >= 4 {
                let declared = 4 + read_u24(&self.hs_buf[1..]) as usize;
                if declared > MAX_HANDSHAKE_MESSAGE {
                    return Err(TlsError::DecodeError("handshake message too large".into()));
                }
                if self.hs_buf.len() >= declared {
                    let msg: Vec<u8> = self.hs_buf.drain(..declared).collect();
                    let (msg_type, _, _) = parse_handshake_header(&msg)?;
                    trace!("handshake message {:?} ({} bytes)", msg_type, msg.len());
                    return Ok(HandshakeEvent::Message(msg_type, msg));
                }
            }
            match self.record_layer.open_record(&self.recv_buf)? {
                Some((ct, plaintext, consumed)) => {
                    self.recv_buf.drain(..consumed);
                    match ct {
                        ContentType::Handshake => {
                            if plaintext.is_empty() {
                                return Err(TlsError::DecodeError(
                                    "empty handshake record".into(),
                                ));
                            }
                            if self.hs_buf.len() + plaintext.len() > MAX_BUFFER {
                                return Err(TlsError::ResourceLimit(
                                    "handshake buffer overflow".into(),
                                ));
                            }
                            self.hs_buf.extend_from_slice(&plaintext);
                        }
                        ContentType::ChangeCipherSpec => {
                            if plaintext != [0x01] {
                                return Err(TlsError::DecodeError(
                                    "malformed ChangeCipherSpec".into(),
                                ));
                            }
                            if !self.hs_buf.is_empty() {
                                return Err(TlsError::DecodeError(
                                    "ChangeCipherSpec splits a handshake message".into(),
                                ));
                            }
                            return Ok(HandshakeEvent::ChangeCipherSpec);
                        }
                        ContentType::Alert => self.process_alert(&plaintext)?,
                        ContentType::ApplicationData => {
                            return Err(TlsError::DecodeError(
                                "application data during handshake".into(),
                            ));
                        }
                    }
                }
                None => self.fill_recv()?,
            }
        }
    }

    /// Read decrypted application bytes into `buf`.
    pub(crate) fn read_app_data(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        loop {
            if !self.app_buf.is_empty() {
                let n = buf.len().min(self.app_buf.len());
                buf[..n].copy_from_slice(&self.app_buf[..n]);
                self.app_buf.drain(..n);
                return Ok(n);
            }
            if self.received_close_notify {
                return Ok(0);
            }
            match self.record_layer.open_record(&self.recv_buf)? {
                Some((ct, plaintext, consumed)) => {
                    self.recv_buf.drain(..consumed);
                    match ct {
                        ContentType::ApplicationData => {
                            if self.app_buf.len() + plaintext.len() > MAX_BUFFER {
                                return Err(TlsError::ResourceLimit(
                                    "application buffer overflow".into(),
                                ));
                            }
                            self.app_buf.extend_from_slice(&plaintext);
                        }
                        ContentType::Alert => match self.process_alert(&plaintext) {
                            Ok(()) => {}
                            Err(TlsError::PeerClosed) => return Ok(0),
                            Err(e) => return Err(e),
                        },
                        ContentType::Handshake => {
                            // HelloRequest while established is legal;
                            // renegotiation is unsupported, so drop it
                            if plaintext.first() == Some(&(HandshakeType::HelloRequest as u8)) {
                                debug!("ignoring HelloRequest");
                            } else {
                                return Err(TlsError::DecodeError(
                                    "handshake message during application data".into(),
                                ));
                            }
                        }
                        ContentType::ChangeCipherSpec => {
                            return Err(TlsError::DecodeError(
                                "unexpected ChangeCipherSpec".into(),
                            ));
                        }
                    }
                }
                None => self.fill_recv()?,
            }
        }
    }

    /// Seal and send one fragment of application data, returning how
    /// many input bytes were accepted. A stalled transport leaves the
    /// sealed record queued; the next call drains it first.
    pub(crate) fn write_app_data(&mut self, buf: &[u8]) -> Result<usize, TlsError> {
        self.flush_send()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(MAX_PLAINTEXT_LENGTH);
        self.queue_record(ContentType::ApplicationData, &buf[..n])?;
        match self.flush_send() {
            Ok(()) | Err(TlsError::WantWrite) => Ok(n),
            Err(e) => Err(e),
        }
    }

    /// Queue close_notify exactly once and flush.
    pub(crate) fn send_close_notify(&mut self) -> Result<(), TlsError> {
        if !self.sent_close_notify {
            let alert = Alert::CLOSE_NOTIFY;
            self.queue_record(ContentType::Alert, &alert.encode())?;
            self.sent_close_notify = true;
            self.last_alert = Some(alert);
            debug!("close_notify sent");
        }
        self.flush_send()
    }

    pub(crate) fn close_notify_sent(&self) -> bool {
        self.sent_close_notify
    }

    /// Handle a received alert record. A warning is logged and skipped;
    /// close_notify gets the one symmetric reply and reads as
    /// `PeerClosed`; a fatal alert poisons the connection.
    fn process_alert(&mut self, payload: &[u8]) -> Result<(), TlsError> {
        let alert = Alert::decode(payload)?;
        self.last_alert = Some(alert);
        if alert.is_close_notify() {
            debug!("close_notify received");
            self.received_close_notify = true;
            if !self.sent_close_notify {
                if let Ok(record) = self
                    .record_layer
                    .seal_record(ContentType::Alert, &Alert::CLOSE_NOTIFY.encode())
                {
                    if self.send_buf.len() + record.len() <= MAX_BUFFER {
                        self.send_buf.extend_from_slice(&record);
                    }
                }
                self.sent_close_notify = true;
                let _ = self.flush_send();
            }
            return Err(TlsError::PeerClosed);
        }
        if alert.is_fatal() {
            debug!("fatal alert received: {:?}", alert.description);
            self.fatal = true;
            return Err(TlsError::AlertReceived(format!("{:?}", alert.description)));
        }
        debug!("warning alert ignored: {:?}", alert.description);
        Ok(())
    }

    /// Convert an error into its terminal form: retryable and clean-
    /// close results pass through; everything else sets the sticky
    /// fatal flag and notifies the peer with one best-effort alert.
    pub(crate) fn fail(&mut self, err: TlsError) -> TlsError {
        match &err {
            TlsError::WantRead | TlsError::WantWrite | TlsError::PeerClosed => return err,
            TlsError::AlertReceived(_) => {
                self.fatal = true;
                return err;
            }
            _ => {}
        }
        self.fatal = true;
        let alert = Alert::fatal(alert_for_error(&err));
        self.last_alert = Some(alert);
        debug!("sending fatal alert {:?}: {err}", alert.description);
        if let Ok(record) = self
            .record_layer
            .seal_record(ContentType::Alert, &alert.encode())
        {
            if self.send_buf.len() + record.len() <= MAX_BUFFER {
                self.send_buf.extend_from_slice(&record);
            }
            let _ = self.flush_send();
        }
        err
    }
}

/// The error for a handshake event that does not fit the current state.
pub(crate) fn unexpected_event(event: HandshakeEvent, wanted: &str) -> TlsError {
    match event {
        HandshakeEvent::Message(msg_type, _) => {
            TlsError::HandshakeFailed(format!("expected {wanted}, got {msg_type:?}"))
        }
        HandshakeEvent::ChangeCipherSpec => {
            TlsError::HandshakeFailed(format!("expected {wanted}, got ChangeCipherSpec"))
        }
    }
}

/// Common guard for the application-data entry points.
pub(crate) fn check_established(state: HandshakeState, fatal: bool) -> Result<(), TlsError> {
    if fatal {
        return Err(TlsError::ConnectionFailed);
    }
    match state {
        HandshakeState::Established | HandshakeState::Closing => Ok(()),
        _ => Err(TlsError::HandshakeFailed("handshake not complete".into())),
    }
}
