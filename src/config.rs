//!
//! Logger configuration.
//!
//! Everything except the codec can be loaded from TOML, so deployments can
//! flip buffering or the priority threshold without recompiling:
//!
//! ```toml
//! buffered = true
//! priority = "WARNING"
//! ```

use std::sync::Arc;

use crate::codec::{default_codec, EnvelopeCodec};
use crate::error::LogResult;
use crate::types::Priority;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Hold records in memory until `flush` is called.
    pub buffered: bool,
    /// Echo every record to stdout.
    pub print_on_screen: bool,
    /// Keep the previous execution's log and add an execution header instead of truncating.
    pub append_log: bool,
    /// Prefix each record with the wall-clock time in nanoseconds.
    pub use_timestamps: bool,
    /// Write records to the sink at all.
    pub log_to_file: bool,
    /// Minimum priority an event needs to be recorded.
    pub priority: Priority,
    /// Envelope encode/decode strategy.
    #[serde(skip, default = "default_codec")]
    pub codec: Arc<dyn EnvelopeCodec>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            buffered: false,
            print_on_screen: false,
            append_log: false,
            use_timestamps: false,
            log_to_file: true,
            priority: Priority::Info,
            codec: default_codec(),
        }
    }
}

impl LoggerConfig {
    /// Parses a TOML document. Missing keys keep their defaults; the codec is
    /// always the default one and can be replaced with `with_codec`.
    pub fn from_toml_str(text: &str) -> LogResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_codec(mut self, codec: Arc<dyn EnvelopeCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}
