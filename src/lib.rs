#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Causelog-Core records events of a distributed program with vector-clock
//! timestamps, so the happened-before order across processes can be rebuilt
//! from the logs afterwards.
//!
//! Each process owns one `ClockedLogger`. Local events tick its clock; `send`
//! ticks and wraps the payload together with a clock snapshot for the wire;
//! `receive` unwraps a peer's message, ticks and merges the peer's clock. Every
//! event is written as a `<pid> <clock>` line followed by the message text.
//!
//! ```no_run
//! use causelog_core::{ClockedLogger, LoggerConfig};
//!
//! let a = ClockedLogger::new("node-a", "logs/node-a", LoggerConfig::default())?;
//! let b = ClockedLogger::new("node-b", "logs/node-b", LoggerConfig::default())?;
//!
//! let wire = a.send("ping", "hello")?;
//! let got: Option<String> = b.receive("got ping", &wire)?;
//! assert_eq!(got.as_deref(), Some("hello"));
//! # Ok::<(), causelog_core::LogError>(())
//! ```

// Shared identifiers and enums (ProcessId, Priority).
pub mod types;

// Wire envelope and payload value model.
pub mod primitives;

// Re-export all core primitives for easier access at the crate root.
pub use primitives::*;

// Vector clocks.
pub mod time;

// Pluggable envelope codecs.
pub mod codec;

// Persistence sinks.
pub mod sink;

// Console echo.
pub mod console;

// Logger configuration and TOML loading.
pub mod config;

// Error types.
pub mod error;

// The clocked logger itself.
pub mod logger;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use codec::{EnvelopeCodec, JsonCodec, MsgPackCodec};
pub use config::LoggerConfig;
pub use error::{LogError, LogResult};
pub use logger::ClockedLogger;
pub use sink::{FileSink, MemorySink, PersistenceSink};
pub use time::{PartialOrder, VectorClock};
pub use types::{Priority, ProcessId};
