//!
//! The clocked logger: one vector clock per process, ticked and merged around
//! local events, sends and receives, with every event written as a text record.
//!
//! All state lives behind a single mutex. Each event runs tick, merge, encode,
//! format and sink dispatch inside one critical section, so events on the same
//! logger are linearizable and the owner's clock component counts them in the
//! order they acquired the lock.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::EnvelopeCodec;
use crate::config::LoggerConfig;
use crate::console;
use crate::error::{LogError, LogResult};
use crate::primitives::{FromPayload, IntoPayload, WireEnvelope};
use crate::sink::{FileSink, PersistenceSink};
use crate::time::VectorClock;
use crate::types::{Priority, ProcessId};

/// Text of the record written once the logger is ready.
pub const INIT_MESSAGE: &str = "Initialization Complete";

/// Mutable part of the logger. Only reachable through `ClockedLogger`'s lock.
struct LoggerState {
    clock: VectorClock,
    priority: Priority,
    buffered: bool,
    /// Formatted records waiting for `flush`. Always empty while unbuffered.
    pending: String,
    /// `None` when writing to a sink is disabled.
    sink: Option<Box<dyn PersistenceSink>>,
}

impl LoggerState {
    /// Hands a formatted record to the sink, or queues it in buffered mode.
    /// Returns `false` only if the sink rejected the write.
    fn write(&mut self, text: String) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return true;
        };
        if self.buffered {
            self.pending.push_str(&text);
            return true;
        }
        match sink.append(&text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to write log record");
                false
            }
        }
    }

    /// Writes out everything queued. The queue is cleared even if the write fails.
    fn flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        let text = std::mem::take(&mut self.pending);
        let Some(sink) = self.sink.as_mut() else {
            return true;
        };
        match sink.flush_buffered(&text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bytes = text.len(),
                    "failed to flush buffered log records"
                );
                false
            }
        }
    }
}

/// Records causally-timestamped events for one process.
///
/// Share it between threads with `Arc<ClockedLogger>`.
pub struct ClockedLogger {
    pid: ProcessId,
    use_timestamps: bool,
    print_on_screen: bool,
    codec: Arc<dyn EnvelopeCodec>,
    state: Mutex<LoggerState>,
}

impl ClockedLogger {
    /// Creates a logger writing to `<log_name>-Log.txt`.
    ///
    /// `pid` must be unique across the distributed system. Fails only if the
    /// log file cannot be created.
    pub fn new(pid: impl Into<ProcessId>, log_name: &str, config: LoggerConfig) -> LogResult<Self> {
        let sink: Option<Box<dyn PersistenceSink>> = if config.log_to_file {
            Some(Box::new(FileSink::for_log_name(log_name, config.append_log)?))
        } else {
            None
        };
        Ok(Self::init(pid.into(), config, sink))
    }

    /// Creates a logger writing to a caller-provided sink.
    /// The sink is ignored when `config.log_to_file` is false.
    pub fn with_sink(
        pid: impl Into<ProcessId>,
        config: LoggerConfig,
        sink: impl PersistenceSink + 'static,
    ) -> Self {
        let sink: Option<Box<dyn PersistenceSink>> = if config.log_to_file {
            Some(Box::new(sink))
        } else {
            None
        };
        Self::init(pid.into(), config, sink)
    }

    fn init(pid: ProcessId, config: LoggerConfig, sink: Option<Box<dyn PersistenceSink>>) -> Self {
        let logger = ClockedLogger {
            use_timestamps: config.use_timestamps,
            print_on_screen: config.print_on_screen,
            codec: config.codec,
            state: Mutex::new(LoggerState {
                clock: VectorClock::for_process(&pid),
                priority: config.priority,
                buffered: config.buffered,
                pending: String::new(),
                sink,
            }),
            pid,
        };

        {
            let mut state = logger.state.lock();
            if config.append_log {
                let header = format!(
                    "=== Execution #{}  ===",
                    chrono::Utc::now().format(console::UNIX_DATE_FORMAT)
                );
                tracing::debug!(pid = %logger.pid, %header, "appending to existing log");
                let text = logger.format_record("", "", &header);
                if !state.write(text) {
                    tracing::warn!(pid = %logger.pid, "could not write execution header");
                }
            }
            let priority = state.priority;
            if !logger.log_record(&mut state, INIT_MESSAGE, priority) {
                tracing::warn!(pid = %logger.pid, "could not write initialization record");
            }
        }
        logger
    }

    pub fn pid(&self) -> &ProcessId {
        &self.pid
    }

    /// Copy of the current clock.
    pub fn current_clock(&self) -> VectorClock {
        self.state.lock().clock.clone()
    }

    pub fn priority(&self) -> Priority {
        self.state.lock().priority
    }

    pub fn set_priority(&self, priority: Priority) {
        self.state.lock().priority = priority;
    }

    /// Records a local event at the logger's own threshold priority.
    pub fn local_event(&self, message: &str) -> bool {
        self.local_event_at(message, None)
    }

    /// Records a local event. Events below the threshold are dropped without
    /// touching the clock and count as success.
    ///
    /// Returns `false` if the record could not be written; the tick still happened.
    pub fn local_event_with_priority(&self, message: &str, priority: Priority) -> bool {
        self.local_event_at(message, Some(priority))
    }

    fn local_event_at(&self, message: &str, priority: Option<Priority>) -> bool {
        let mut state = self.state.lock();
        let priority = priority.unwrap_or(state.priority);
        if priority < state.priority {
            return true;
        }
        self.tick_own(&mut state.clock);
        let text = format!("{} - {}", priority.prefix(), message);
        self.log_record(&mut state, &text, priority)
    }

    /// Stamps an outgoing message at the logger's threshold priority.
    pub fn send<P: IntoPayload>(&self, message: &str, payload: P) -> LogResult<Vec<u8>> {
        self.send_at(message, payload, None)
    }

    /// Ticks the clock, wraps `payload` in an envelope carrying the ticked clock
    /// and returns the encoded bytes for the caller to transmit.
    ///
    /// Returns an empty vector when the priority is below the threshold. On an
    /// encoding error the clock keeps its pre-call value and nothing is logged.
    pub fn send_with_priority<P: IntoPayload>(
        &self,
        message: &str,
        payload: P,
        priority: Priority,
    ) -> LogResult<Vec<u8>> {
        self.send_at(message, payload, Some(priority))
    }

    fn send_at<P: IntoPayload>(
        &self,
        message: &str,
        payload: P,
        priority: Option<Priority>,
    ) -> LogResult<Vec<u8>> {
        let mut state = self.state.lock();
        let priority = priority.unwrap_or(state.priority);
        if priority < state.priority {
            return Ok(Vec::new());
        }

        let payload = payload.into_payload()?;
        let mut clock = state.clock.clone();
        self.tick_own(&mut clock);
        let envelope = WireEnvelope { sender: self.pid.clone(), clock, payload };
        let bytes = self.codec.encode(&envelope)?;

        state.clock = envelope.clock;
        self.log_record(&mut state, message, priority);
        Ok(bytes)
    }

    /// Unpacks a message at the logger's threshold priority.
    pub fn receive<T: FromPayload>(&self, message: &str, bytes: &[u8]) -> LogResult<Option<T>> {
        self.receive_at(message, bytes, None)
    }

    /// Decodes bytes produced by a peer's `send`, ticks the local clock, merges
    /// the sender's clock and returns the payload as `T`.
    ///
    /// Below the threshold this returns `Ok(None)` and the sender's clock is
    /// not merged. Decoding failures, including a payload that does not fit
    /// `T`, leave the clock untouched.
    pub fn receive_with_priority<T: FromPayload>(
        &self,
        message: &str,
        bytes: &[u8],
        priority: Priority,
    ) -> LogResult<Option<T>> {
        self.receive_at(message, bytes, Some(priority))
    }

    fn receive_at<T: FromPayload>(
        &self,
        message: &str,
        bytes: &[u8],
        priority: Option<Priority>,
    ) -> LogResult<Option<T>> {
        let mut state = self.state.lock();
        let priority = priority.unwrap_or(state.priority);
        if priority < state.priority {
            return Ok(None);
        }

        let envelope = self.codec.decode(bytes)?;
        let value = T::from_payload(envelope.payload)?;

        self.tick_own(&mut state.clock);
        state.clock.merge(&envelope.clock);
        tracing::debug!(
            pid = %self.pid,
            from = %envelope.sender,
            clock = %state.clock,
            "merged incoming clock"
        );

        self.log_record(&mut state, message, priority);
        Ok(Some(value))
    }

    /// Queue records in memory until `flush`.
    pub fn enable_buffered_writes(&self) {
        self.state.lock().buffered = true;
    }

    /// Back to immediate writes; anything still queued is flushed first.
    pub fn disable_buffered_writes(&self) -> bool {
        let mut state = self.state.lock();
        state.buffered = false;
        state.flush()
    }

    /// Writes queued records to the sink. A no-op returning `true` when
    /// nothing is queued. Hosts that need durability call this from their
    /// shutdown path; dropping the logger does not flush.
    pub fn flush(&self) -> bool {
        self.state.lock().flush()
    }

    fn tick_own(&self, clock: &mut VectorClock) {
        if clock.find_ticks(self.pid.as_str()).is_none() {
            let warning = LogError::ConsistencyWarning { pid: self.pid.clone() };
            tracing::warn!(%warning, "own process id missing from clock");
        }
        clock.tick(&self.pid);
    }

    fn log_record(&self, state: &mut LoggerState, message: &str, priority: Priority) -> bool {
        if self.print_on_screen {
            console::echo(message, priority);
        }
        let clock = state.clock.serialize_canonical();
        let text = self.format_record(self.pid.as_str(), &clock, message);
        state.write(text)
    }

    /// `[<unix-nanos> ]<pid> <clock>\n<message>\n`
    fn format_record(&self, pid: &str, clock: &str, message: &str) -> String {
        let mut out = String::with_capacity(pid.len() + clock.len() + message.len() + 24);
        if self.use_timestamps {
            let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
            let _ = write!(out, "{} ", nanos);
        }
        let _ = writeln!(out, "{} {}\n{}", pid, clock, message);
        out
    }
}

impl std::fmt::Debug for ClockedLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockedLogger")
            .field("pid", &self.pid)
            .field("clock", &self.current_clock())
            .field("codec", &self.codec)
            .finish()
    }
}

impl Drop for ClockedLogger {
    fn drop(&mut self) {
        let pending = self.state.get_mut().pending.len();
        if pending > 0 {
            tracing::warn!(
                pid = %self.pid,
                bytes = pending,
                "logger dropped with unflushed records"
            );
        }
    }
}
