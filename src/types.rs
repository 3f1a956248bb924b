// Shared identifiers and enums used across the clock, codec and logger modules.
// The envelope and payload structures themselves live in `src/primitives.rs`.

use std::borrow::Borrow;
use std::fmt;

/// Identifier of a process taking part in the distributed computation.
///
/// Must be unique across the whole system: two processes sharing an id would
/// share a vector-clock component and the recorded causality would be wrong.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Self {
        ProcessId(id.into())
    }

    /// Generates a random, globally unique id (UUID v4) for hosts that have no
    /// natural process name.
    pub fn generate() -> Self {
        ProcessId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(value: &str) -> Self {
        ProcessId(value.to_string())
    }
}

impl From<String> for ProcessId {
    fn from(value: String) -> Self {
        ProcessId(value)
    }
}

// Lets `BTreeMap<ProcessId, _>` be queried with a plain `&str`.
impl Borrow<str> for ProcessId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Severity attached to every logged event.
/// Ordered low to high; an event is recorded only when its priority is at
/// least the logger's configured threshold.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Verbose diagnostics.
    Debug = 0,
    /// Normal operation. The default threshold.
    #[default]
    Info = 1,
    /// Something unexpected that the process recovered from.
    Warning = 2,
    /// A failed operation.
    Error = 3,
    /// The process cannot continue.
    Fatal = 4,
}

impl Priority {
    /// Label used in console output and in the text of local-event records.
    /// `Info` prints as `NORMAL` to keep traces readable next to older logs.
    pub fn prefix(self) -> &'static str {
        match self {
            Priority::Debug => "DEBUG",
            Priority::Info => "NORMAL",
            Priority::Warning => "WARNING",
            Priority::Error => "ERROR",
            Priority::Fatal => "FATAL",
        }
    }
}

impl TryFrom<u8> for Priority {
    // `Self::Error` would be ambiguous with `Priority::Error`.
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(Priority::Debug),
            1 => Ok(Priority::Info),
            2 => Ok(Priority::Warning),
            3 => Ok(Priority::Error),
            4 => Ok(Priority::Fatal),
            _ => Err(format!("Invalid Priority tag: {}", value)),
        }
    }
}
