//!
//! JSON envelope codec. Human-readable on the wire, at the cost of a narrower
//! payload model: JSON has no byte strings, only string object keys and no
//! NaN/infinity, so such payloads are rejected up front instead of coming back
//! altered after a round-trip. Floats are parsed with `float_roundtrip`, so
//! every finite `f64` comes back bit-for-bit.

use crate::error::{LogError, LogResult};
use crate::primitives::{Payload, WireEnvelope};
use super::EnvelopeCodec;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    fn check(payload: &Payload) -> LogResult<()> {
        payload.check_depth()?;
        Self::check_values(payload)
    }

    fn check_values(payload: &Payload) -> LogResult<()> {
        match payload {
            Payload::Bytes(_) => {
                Err(LogError::Encoding("JSON codec cannot carry raw bytes".into()))
            }
            Payload::Float(f) if !f.is_finite() => {
                Err(LogError::Encoding(format!("JSON codec cannot carry non-finite float {}", f)))
            }
            Payload::Array(items) => items.iter().try_for_each(Self::check_values),
            Payload::Map(entries) => entries.iter().try_for_each(|(k, v)| match k {
                Payload::Str(_) => Self::check_values(v),
                other => Err(LogError::Encoding(format!(
                    "JSON object keys must be strings, found {}",
                    other.kind()
                ))),
            }),
            _ => Ok(()),
        }
    }
}

impl EnvelopeCodec for JsonCodec {
    fn encode(&self, envelope: &WireEnvelope) -> LogResult<Vec<u8>> {
        Self::check(&envelope.payload)?;
        serde_json::to_vec(envelope).map_err(|e| LogError::Encoding(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> LogResult<WireEnvelope> {
        serde_json::from_slice(bytes).map_err(|e| LogError::Decoding(e.to_string()))
    }
}
