//!
//! Envelope encoding abstraction.
//!
//! The logger never picks a byte layout itself: it hands a `WireEnvelope` to an
//! `EnvelopeCodec` and ships whatever bytes come back. Any codec that satisfies
//! `decode(encode(e)) == e` for the payloads it accepts can be swapped in.

use std::sync::Arc;

use crate::error::LogResult;
use crate::primitives::WireEnvelope;

/// Encode/decode strategy pair for wire envelopes.
pub trait EnvelopeCodec: Send + Sync + std::fmt::Debug {
    /// Serializes the envelope. Fails with `LogError::Encoding` when the payload
    /// holds something this codec cannot represent.
    fn encode(&self, envelope: &WireEnvelope) -> LogResult<Vec<u8>>;

    /// Inverse of `encode`. Fails with `LogError::Decoding` on malformed input.
    fn decode(&self, bytes: &[u8]) -> LogResult<WireEnvelope>;
}

// Module for the default binary codec (MessagePack)
pub mod msgpack;

// Re-export the concrete codec for easier access
pub use msgpack::MsgPackCodec;

// Module for the JSON text codec
pub mod json;

pub use json::JsonCodec;

/// The codec a logger uses when none is configured.
pub fn default_codec() -> Arc<dyn EnvelopeCodec> {
    Arc::new(MsgPackCodec)
}
