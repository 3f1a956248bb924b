//!
//! MessagePack envelope codec. Handles any nested map/array/scalar payload,
//! including raw bytes and non-string map keys.

use std::io::Cursor;

use serde::Deserialize;

use crate::error::{LogError, LogResult};
use crate::primitives::WireEnvelope;
use super::EnvelopeCodec;

/// Default codec. Envelopes are written as named MessagePack maps so the wire
/// format is self-describing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackCodec;

impl EnvelopeCodec for MsgPackCodec {
    fn encode(&self, envelope: &WireEnvelope) -> LogResult<Vec<u8>> {
        envelope.payload.check_depth()?;
        Ok(rmp_serde::to_vec_named(envelope)?)
    }

    /// The whole input must be exactly one envelope.
    fn decode(&self, bytes: &[u8]) -> LogResult<WireEnvelope> {
        let mut cursor = Cursor::new(bytes);
        let envelope = WireEnvelope::deserialize(&mut rmp_serde::Deserializer::new(&mut cursor))?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(LogError::Decoding(format!(
                "{} trailing bytes after envelope",
                bytes.len() - consumed
            )));
        }
        Ok(envelope)
    }
}
