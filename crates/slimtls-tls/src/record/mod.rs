//! TLS record layer: framing and per-connection security contexts.
//!
//! The layer holds the active write/read contexts and at most one
//! pending context per direction. ChangeCipherSpec swaps pending for
//! active atomically; the new context starts at sequence number 0.

pub mod protection;

use protection::{RecordOpener, RecordProtector, MAC_LEN};
use slimtls_types::TlsError;

use crate::TLS12_VERSION;

/// Record header length: type(1) || version(2) || length(2).
pub const RECORD_HEADER_LEN: usize = 5;

/// Maximum plaintext fragment length (2^14).
pub const MAX_PLAINTEXT_LENGTH: usize = 16384;

/// Maximum protected fragment length we accept on the wire.
pub const MAX_FRAGMENT_LENGTH: usize = MAX_PLAINTEXT_LENGTH + MAC_LEN;

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            20 => Some(ContentType::ChangeCipherSpec),
            21 => Some(ContentType::Alert),
            22 => Some(ContentType::Handshake),
            23 => Some(ContentType::ApplicationData),
            _ => None,
        }
    }
}

/// Record layer state for one connection.
pub struct RecordLayer {
    write: Option<RecordProtector>,
    read: Option<RecordOpener>,
    pending_write: Option<RecordProtector>,
    pending_read: Option<RecordOpener>,
    /// True until the first record has been received. The first flight
    /// tolerates record versions 0x0301..=0x0303 from older stacks.
    first_record: bool,
}

impl RecordLayer {
    pub fn new() -> Self {
        Self {
            write: None,
            read: None,
            pending_write: None,
            pending_read: None,
            first_record: true,
        }
    }

    /// Returns true once outgoing records are encrypted.
    pub fn is_encrypting(&self) -> bool {
        self.write.is_some()
    }

    /// Returns true once incoming records are decrypted.
    pub fn is_decrypting(&self) -> bool {
        self.read.is_some()
    }

    /// Stage the next-epoch security contexts for both directions.
    pub fn install_pending(&mut self, write: RecordProtector, read: RecordOpener) {
        self.pending_write = Some(write);
        self.pending_read = Some(read);
    }

    /// Swap the pending write context in. Called when sending
    /// ChangeCipherSpec; everything sealed afterwards is protected.
    pub fn activate_pending_write(&mut self) -> Result<(), TlsError> {
        let pending = self
            .pending_write
            .take()
            .ok_or_else(|| TlsError::RecordError("no pending write keys".into()))?;
        self.write = Some(pending);
        Ok(())
    }

    /// Swap the pending read context in. Called on a received
    /// ChangeCipherSpec.
    pub fn activate_pending_read(&mut self) -> Result<(), TlsError> {
        let pending = self
            .pending_read
            .take()
            .ok_or_else(|| TlsError::RecordError("no pending read keys".into()))?;
        self.read = Some(pending);
        Ok(())
    }

    /// Protect (when keys are active) and frame a record, returning the
    /// full wire bytes.
    pub fn seal_record(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if payload.len() > MAX_PLAINTEXT_LENGTH {
            return Err(TlsError::RecordError(
                "plaintext exceeds maximum fragment length".into(),
            ));
        }

        let fragment = match &mut self.write {
            Some(protector) => protector.seal(content_type, TLS12_VERSION, payload)?,
            None => payload.to_vec(),
        };

        let mut out = Vec::with_capacity(RECORD_HEADER_LEN + fragment.len());
        out.push(content_type as u8);
        out.extend_from_slice(&TLS12_VERSION.to_be_bytes());
        out.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
        out.extend_from_slice(&fragment);
        Ok(out)
    }

    /// Parse and (when keys are active) verify/decrypt one record from
    /// the front of `data`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete
    /// record; the caller suspends until more bytes arrive. On success
    /// returns the content type, the plaintext, and the number of wire
    /// bytes consumed.
    pub fn open_record(
        &mut self,
        data: &[u8],
    ) -> Result<Option<(ContentType, Vec<u8>, usize)>, TlsError> {
        if data.len() < RECORD_HEADER_LEN {
            return Ok(None);
        }

        let content_type = ContentType::from_u8(data[0])
            .ok_or_else(|| TlsError::RecordError("unknown content type".into()))?;
        let version = u16::from_be_bytes([data[1], data[2]]);
        let length = u16::from_be_bytes([data[3], data[4]]) as usize;

        let version_ok = if self.first_record {
            (0x0301..=0x0303).contains(&version)
        } else {
            version == TLS12_VERSION
        };
        if !version_ok {
            return Err(TlsError::UnsupportedVersion);
        }

        if length > MAX_FRAGMENT_LENGTH {
            return Err(TlsError::RecordError("record overflow".into()));
        }
        if data.len() < RECORD_HEADER_LEN + length {
            return Ok(None);
        }

        let fragment = &data[RECORD_HEADER_LEN..RECORD_HEADER_LEN + length];
        let plaintext = match &mut self.read {
            Some(opener) => opener.open(content_type, version, fragment)?,
            None => fragment.to_vec(),
        };

        self.first_record = false;
        Ok(Some((content_type, plaintext, RECORD_HEADER_LEN + length)))
    }
}

impl Default for RecordLayer {
    fn default() -> Self {
        Self::new()
    }
}
