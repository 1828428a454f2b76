//! Handshake message encoding/decoding for the RSA key exchange
//! message set (RFC 5246 §7.4).
//!
//! Every decoder takes the message body (after the 4-byte header) and
//! checks declared lengths against the remaining input before slicing;
//! truncated or oversized fields are decode errors, never panics.

use slimtls_types::TlsError;

use crate::extensions::{decode_extension_block, encode_extension_block, Extension};
use crate::CipherSuite;

use super::HandshakeType;

/// Upper bound on a single handshake message (header + body) this stack
/// accepts. Far below the wire format's 2^24 limit; anything larger on
/// an embedded link is hostile.
pub const MAX_HANDSHAKE_MESSAGE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Handshake header
// ---------------------------------------------------------------------------

/// Parse a handshake header: msg_type(1) || length(3).
/// Returns (type, body, total bytes consumed).
pub fn parse_handshake_header(data: &[u8]) -> Result<(HandshakeType, &[u8], usize), TlsError> {
    if data.len() < 4 {
        return Err(TlsError::DecodeError("handshake header too short".into()));
    }
    let msg_type = HandshakeType::from_u8(data[0]).ok_or_else(|| {
        TlsError::DecodeError(format!("unknown handshake type: {}", data[0]))
    })?;
    let length = read_u24(&data[1..]) as usize;
    let total = 4 + length;
    if total > MAX_HANDSHAKE_MESSAGE {
        return Err(TlsError::DecodeError("handshake message too large".into()));
    }
    if data.len() < total {
        return Err(TlsError::DecodeError(
            "handshake message body truncated".into(),
        ));
    }
    Ok((msg_type, &data[4..total], total))
}

/// Wrap a handshake body with the 4-byte header.
pub fn wrap_handshake(msg_type: HandshakeType, body: &[u8]) -> Vec<u8> {
    let len = body.len();
    let mut out = Vec::with_capacity(4 + len);
    out.push(msg_type as u8);
    out.push((len >> 16) as u8);
    out.push((len >> 8) as u8);
    out.push(len as u8);
    out.extend_from_slice(body);
    out
}

/// Read a 3-byte big-endian length. The caller guarantees 3 bytes.
pub(crate) fn read_u24(data: &[u8]) -> u32 {
    ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32)
}

// ---------------------------------------------------------------------------
// ClientHello / ServerHello
// ---------------------------------------------------------------------------

/// ClientHello message.
#[derive(Debug, Clone)]
pub struct ClientHello {
    /// The highest version the client speaks.
    pub client_version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

/// ServerHello message.
#[derive(Debug, Clone)]
pub struct ServerHello {
    pub server_version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: CipherSuite,
    pub compression_method: u8,
    pub extensions: Vec<Extension>,
}

/// Encode a ClientHello as a complete handshake message.
pub fn encode_client_hello(ch: &ClientHello) -> Vec<u8> {
    let mut body = Vec::with_capacity(64);

    body.extend_from_slice(&ch.client_version.to_be_bytes());
    body.extend_from_slice(&ch.random);

    body.push(ch.session_id.len() as u8);
    body.extend_from_slice(&ch.session_id);

    let suites_len = (ch.cipher_suites.len() * 2) as u16;
    body.extend_from_slice(&suites_len.to_be_bytes());
    for s in &ch.cipher_suites {
        body.extend_from_slice(&s.0.to_be_bytes());
    }

    body.push(ch.compression_methods.len() as u8);
    body.extend_from_slice(&ch.compression_methods);

    if !ch.extensions.is_empty() {
        body.extend_from_slice(&encode_extension_block(&ch.extensions));
    }

    wrap_handshake(HandshakeType::ClientHello, &body)
}

/// Decode a ClientHello body.
pub fn decode_client_hello(body: &[u8]) -> Result<ClientHello, TlsError> {
    let err = |msg: &str| TlsError::DecodeError(format!("ClientHello: {msg}"));
    let mut pos = 0;

    if body.len() < pos + 2 {
        return Err(err("too short for version"));
    }
    let client_version = u16::from_be_bytes([body[pos], body[pos + 1]]);
    pos += 2;

    if body.len() < pos + 32 {
        return Err(err("too short for random"));
    }
    let mut random = [0u8; 32];
    random.copy_from_slice(&body[pos..pos + 32]);
    pos += 32;

    if body.len() < pos + 1 {
        return Err(err("too short for session_id length"));
    }
    let sid_len = body[pos] as usize;
    pos += 1;
    if sid_len > 32 {
        return Err(err("session_id too long"));
    }
    if body.len() < pos + sid_len {
        return Err(err("too short for session_id"));
    }
    let session_id = body[pos..pos + sid_len].to_vec();
    pos += sid_len;

    if body.len() < pos + 2 {
        return Err(err("too short for cipher suite length"));
    }
    let suites_len = u16::from_be_bytes([body[pos], body[pos + 1]]) as usize;
    pos += 2;
    if suites_len == 0 || suites_len % 2 != 0 || body.len() < pos + suites_len {
        return Err(err("malformed cipher suite list"));
    }
    let mut cipher_suites = Vec::with_capacity(suites_len / 2);
    for i in (0..suites_len).step_by(2) {
        cipher_suites.push(CipherSuite(u16::from_be_bytes([
            body[pos + i],
            body[pos + i + 1],
        ])));
    }
    pos += suites_len;

    if body.len() < pos + 1 {
        return Err(err("too short for compression length"));
    }
    let comp_len = body[pos] as usize;
    pos += 1;
    if comp_len == 0 || body.len() < pos + comp_len {
        return Err(err("malformed compression list"));
    }
    let compression_methods = body[pos..pos + comp_len].to_vec();
    pos += comp_len;

    // Extensions are optional; when present the block must fill the rest
    let extensions = if pos < body.len() {
        decode_extension_block(&body[pos..])?
    } else {
        Vec::new()
    };

    Ok(ClientHello {
        client_version,
        random,
        session_id,
        cipher_suites,
        compression_methods,
        extensions,
    })
}

/// Encode a ServerHello as a complete handshake message.
pub fn encode_server_hello(sh: &ServerHello) -> Vec<u8> {
    let mut body = Vec::with_capacity(48);

    body.extend_from_slice(&sh.server_version.to_be_bytes());
    body.extend_from_slice(&sh.random);

    body.push(sh.session_id.len() as u8);
    body.extend_from_slice(&sh.session_id);

    body.extend_from_slice(&sh.cipher_suite.0.to_be_bytes());
    body.push(sh.compression_method);

    if !sh.extensions.is_empty() {
        body.extend_from_slice(&encode_extension_block(&sh.extensions));
    }

    wrap_handshake(HandshakeType::ServerHello, &body)
}

/// Decode a ServerHello body.
pub fn decode_server_hello(body: &[u8]) -> Result<ServerHello, TlsError> {
    let err = |msg: &str| TlsError::DecodeError(format!("ServerHello: {msg}"));
    let mut pos = 0;

    if body.len() < pos + 2 {
        return Err(err("too short for version"));
    }
    let server_version = u16::from_be_bytes([body[pos], body[pos + 1]]);
    pos += 2;

    if body.len() < pos + 32 {
        return Err(err("too short for random"));
    }
    let mut random = [0u8; 32];
    random.copy_from_slice(&body[pos..pos + 32]);
    pos += 32;

    if body.len() < pos + 1 {
        return Err(err("too short for session_id length"));
    }
    let sid_len = body[pos] as usize;
    pos += 1;
    if sid_len > 32 {
        return Err(err("session_id too long"));
    }
    if body.len() < pos + sid_len {
        return Err(err("too short for session_id"));
    }
    let session_id = body[pos..pos + sid_len].to_vec();
    pos += sid_len;

    if body.len() < pos + 3 {
        return Err(err("too short for suite and compression"));
    }
    let cipher_suite = CipherSuite(u16::from_be_bytes([body[pos], body[pos + 1]]));
    let compression_method = body[pos + 2];
    pos += 3;

    let extensions = if pos < body.len() {
        decode_extension_block(&body[pos..])?
    } else {
        Vec::new()
    };

    Ok(ServerHello {
        server_version,
        random,
        session_id,
        cipher_suite,
        compression_method,
        extensions,
    })
}

// ---------------------------------------------------------------------------
// Certificate
// ---------------------------------------------------------------------------

/// Encode a Certificate message from DER blobs (leaf first).
pub fn encode_certificate(chain: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = chain.iter().map(|c| 3 + c.len()).sum();

    let mut body = Vec::with_capacity(3 + total);
    body.push((total >> 16) as u8);
    body.push((total >> 8) as u8);
    body.push(total as u8);

    for cert in chain {
        let len = cert.len();
        body.push((len >> 16) as u8);
        body.push((len >> 8) as u8);
        body.push(len as u8);
        body.extend_from_slice(cert);
    }

    wrap_handshake(HandshakeType::Certificate, &body)
}

/// Decode a Certificate body into DER blobs (leaf first).
pub fn decode_certificate(body: &[u8]) -> Result<Vec<Vec<u8>>, TlsError> {
    let err = |msg: &str| TlsError::DecodeError(format!("Certificate: {msg}"));

    if body.len() < 3 {
        return Err(err("too short"));
    }
    let total = read_u24(body) as usize;
    if body.len() != 3 + total {
        return Err(err("list length mismatch"));
    }

    let mut chain = Vec::new();
    let mut pos = 3;
    let end = 3 + total;
    while pos < end {
        if pos + 3 > end {
            return Err(err("entry length truncated"));
        }
        let cert_len = read_u24(&body[pos..]) as usize;
        pos += 3;
        if pos + cert_len > end {
            return Err(err("entry data truncated"));
        }
        chain.push(body[pos..pos + cert_len].to_vec());
        pos += cert_len;
    }
    Ok(chain)
}

// ---------------------------------------------------------------------------
// ServerHelloDone / ClientKeyExchange / Finished / ChangeCipherSpec
// ---------------------------------------------------------------------------

/// Encode a ServerHelloDone message (empty body).
pub fn encode_server_hello_done() -> Vec<u8> {
    wrap_handshake(HandshakeType::ServerHelloDone, &[])
}

/// Decode a ServerHelloDone body (must be empty).
pub fn decode_server_hello_done(body: &[u8]) -> Result<(), TlsError> {
    if !body.is_empty() {
        return Err(TlsError::DecodeError(
            "ServerHelloDone carries a non-empty body".into(),
        ));
    }
    Ok(())
}

/// Encode a ClientKeyExchange for the RSA key exchange: a 2-byte length
/// followed by the RSA-encrypted pre-master secret.
pub fn encode_client_key_exchange(encrypted_pms: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + encrypted_pms.len());
    body.extend_from_slice(&(encrypted_pms.len() as u16).to_be_bytes());
    body.extend_from_slice(encrypted_pms);
    wrap_handshake(HandshakeType::ClientKeyExchange, &body)
}

/// Decode a ClientKeyExchange body, returning the encrypted pre-master
/// secret.
pub fn decode_client_key_exchange(body: &[u8]) -> Result<Vec<u8>, TlsError> {
    if body.len() < 2 {
        return Err(TlsError::DecodeError("ClientKeyExchange too short".into()));
    }
    let len = u16::from_be_bytes([body[0], body[1]]) as usize;
    if body.len() != 2 + len {
        return Err(TlsError::DecodeError(
            "ClientKeyExchange length mismatch".into(),
        ));
    }
    Ok(body[2..].to_vec())
}

/// Encode a Finished message (12-byte verify_data).
pub fn encode_finished(verify_data: &[u8]) -> Vec<u8> {
    wrap_handshake(HandshakeType::Finished, verify_data)
}

/// Decode a Finished body.
pub fn decode_finished(body: &[u8]) -> Result<Vec<u8>, TlsError> {
    if body.len() != 12 {
        return Err(TlsError::DecodeError(format!(
            "Finished verify_data must be 12 bytes, got {}",
            body.len()
        )));
    }
    Ok(body.to_vec())
}

/// The ChangeCipherSpec record payload (content type 20, not a
/// handshake message).
pub fn encode_change_cipher_spec() -> Vec<u8> {
    vec![0x01]
}
