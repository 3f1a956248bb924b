//!
//! Persistence sinks for formatted log records.
//!
//! The logger only needs two operations: write one record now (`append`) and
//! write a batch of buffered records (`flush_buffered`). Failures are reported
//! as `LogError::Sink` and treated as recoverable by the caller.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{LogError, LogResult};

/// Append-only text destination for log records.
pub trait PersistenceSink: Send {
    /// Writes one record immediately.
    fn append(&mut self, text: &str) -> LogResult<()>;

    /// Writes a batch of records that were held back in buffered mode.
    fn flush_buffered(&mut self, text: &str) -> LogResult<()> {
        self.append(text)
    }
}

/// Suffix appended to the log name given at logger initialisation.
pub const LOG_FILE_SUFFIX: &str = "-Log.txt";

/// Log file on disk.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Opens `<log_name>-Log.txt`.
    pub fn for_log_name(log_name: &str, append: bool) -> LogResult<Self> {
        Self::open(format!("{}{}", log_name, LOG_FILE_SUFFIX), append)
    }

    /// Opens `path`, creating missing parent directories. An existing file is
    /// truncated unless `append` is set.
    pub fn open(path: impl AsRef<Path>, append: bool) -> LogResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if !append {
            if path.exists() {
                tracing::debug!(path = %path.display(), "log file exists, truncating");
            }
            File::create(&path)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileSink { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceSink for FileSink {
    fn append(&mut self, text: &str) -> LogResult<()> {
        self.file.write_all(text.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// In-memory sink. Clones share the same buffer, so a host can keep one handle
/// and give the other to a logger.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    contents: Arc<Mutex<String>>,
    writes: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.contents.lock().clone()
    }

    /// Number of successful `append`/`flush_buffered` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every following write fail with `LogError::Sink`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PersistenceSink for MemorySink {
    fn append(&mut self, text: &str) -> LogResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LogError::Sink("memory sink set to fail".into()));
        }
        self.contents.lock().push_str(text);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
