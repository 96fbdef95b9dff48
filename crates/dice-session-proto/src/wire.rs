// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON text framing for session messages.
//!
//! Decoding comes in two flavours: the strict decoders surface a
//! [`WireError`], while [`decode_client_lenient`] folds every failure into
//! [`ClientMessage::Unrecognized`] so a hub can drop bad frames without
//! special-casing them.

use thiserror::Error;

use crate::{ClientMessage, ServerMessage};

/// Reasons a frame could not be encoded or decoded.
#[derive(Debug, Error)]
pub enum WireError {
    /// The frame is larger than the caller allows.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge {
        /// Frame length in bytes.
        len: usize,
        /// Configured limit.
        max: usize,
    },
    /// The frame is not valid JSON for the expected message type.
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encodes a hub → viewer frame.
pub fn encode_server(msg: &ServerMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(msg)?)
}

/// Encodes a viewer → hub frame.
pub fn encode_client(msg: &ClientMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(msg)?)
}

/// Decodes a viewer → hub frame, rejecting frames longer than `max_len`
/// bytes.
pub fn decode_client(text: &str, max_len: usize) -> Result<ClientMessage, WireError> {
    if text.len() > max_len {
        return Err(WireError::TooLarge {
            len: text.len(),
            max: max_len,
        });
    }
    Ok(serde_json::from_str(text)?)
}

/// Like [`decode_client`], but any failure yields
/// [`ClientMessage::Unrecognized`].
pub fn decode_client_lenient(text: &str, max_len: usize) -> ClientMessage {
    decode_client(text, max_len).unwrap_or(ClientMessage::Unrecognized)
}

/// Decodes a hub → viewer frame.
pub fn decode_server(text: &str) -> Result<ServerMessage, WireError> {
    Ok(serde_json::from_str(text)?)
}
