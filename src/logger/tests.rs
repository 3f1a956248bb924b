#![cfg(test)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use serde_bytes::ByteBuf;

use crate::codec::{EnvelopeCodec, JsonCodec, MsgPackCodec};
use crate::config::LoggerConfig;
use crate::error::LogError;
use crate::logger::core::{ClockedLogger, INIT_MESSAGE};
use crate::primitives::{Payload, MAX_PAYLOAD_DEPTH};
use crate::sink::MemorySink;
use crate::time::{PartialOrder, VectorClock};
use crate::types::{Priority, ProcessId};

// --- Test Utilities ---

fn create_test_logger(pid: &str, config: LoggerConfig) -> (ClockedLogger, MemorySink) {
    let sink = MemorySink::new();
    let logger = ClockedLogger::with_sink(pid, config, sink.clone());
    (logger, sink)
}

fn vc(entries: &[(&str, u64)]) -> VectorClock {
    entries.iter().map(|(p, t)| (ProcessId::from(*p), *t)).collect()
}

// --- Test Cases ---

#[test]
fn test_logger_new_writes_init_record() {
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    assert_eq!(logger.pid().as_str(), "P1");
    assert_eq!(logger.current_clock(), vc(&[("P1", 1)]), "Initial clock should be seeded at 1");
    assert_eq!(sink.contents(), format!("P1 {{\"P1\":1}}\n{}\n", INIT_MESSAGE));
}

#[test]
fn test_local_event_ticks_and_logs() {
    // Scenario A
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    assert!(logger.local_event("start"));
    assert_eq!(logger.current_clock(), vc(&[("P1", 2)]));
    assert!(sink.contents().ends_with("P1 {\"P1\":2}\nNORMAL - start\n"));
}

#[test]
fn test_local_event_accepts_empty_message() {
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    assert!(logger.local_event_with_priority("", Priority::Fatal));
    assert!(sink.contents().ends_with("P1 {\"P1\":2}\nFATAL - \n"));
}

#[test]
fn test_send_wraps_ticked_clock() {
    // Scenario B
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    let bytes = logger.send("go", "hello").expect("send failed");

    let envelope = MsgPackCodec.decode(&bytes).expect("decode failed");
    assert_eq!(envelope.sender, ProcessId::from("P1"));
    assert_eq!(envelope.clock, vc(&[("P1", 2)]), "Snapshot must be taken after the send's tick");
    assert_eq!(envelope.payload, Payload::Str("hello".into()));

    assert_eq!(logger.current_clock(), vc(&[("P1", 2)]));
    assert!(sink.contents().ends_with("P1 {\"P1\":2}\ngo\n"));
}

#[test]
fn test_receive_ticks_then_merges() {
    // Scenario C
    let (p1, _) = create_test_logger("P1", LoggerConfig::default());
    let (p2, sink) = create_test_logger("P2", LoggerConfig::default());

    let bytes = p1.send("go", "hello").unwrap();
    let payload: Option<String> = p2.receive("got it", &bytes).expect("receive failed");

    assert_eq!(payload.as_deref(), Some("hello"));
    assert_eq!(p2.current_clock(), vc(&[("P1", 2), ("P2", 2)]));
    assert!(sink.contents().ends_with("P2 {\"P1\":2, \"P2\":2}\ngot it\n"));
}

#[test]
fn test_priority_filter_leaves_everything_untouched() {
    // Scenario D
    let config = LoggerConfig::default().with_priority(Priority::Error);
    let (logger, sink) = create_test_logger("P1", config);
    let before = sink.contents();

    assert!(
        logger.local_event_with_priority("noise", Priority::Debug),
        "Suppressed events count as success"
    );
    assert_eq!(logger.current_clock(), vc(&[("P1", 1)]));
    assert_eq!(sink.write_count(), 1, "Only the init record should have been written");
    assert_eq!(sink.contents(), before);

    assert!(logger.local_event_with_priority("boom", Priority::Error));
    assert_eq!(logger.current_clock(), vc(&[("P1", 2)]));
}

#[test]
fn test_send_unsupported_payload_fails_without_tick() {
    // Scenario E
    let config = LoggerConfig::default().with_codec(Arc::new(JsonCodec));
    let (logger, sink) = create_test_logger("P1", config);

    let result = logger.send("raw", ByteBuf::from(vec![1u8, 2, 3]));
    assert!(matches!(result, Err(LogError::Encoding(_))));
    assert_eq!(logger.current_clock(), vc(&[("P1", 1)]), "Clock must keep its pre-call value");
    assert_eq!(sink.write_count(), 1, "Nothing should be logged for a failed send");
}

#[test]
fn test_suppressed_send_returns_empty() {
    let config = LoggerConfig::default().with_priority(Priority::Warning);
    let (logger, sink) = create_test_logger("P1", config);
    let before = sink.contents();

    let bytes = logger.send_with_priority("quiet", 7u64, Priority::Info).unwrap();
    assert!(bytes.is_empty());
    assert_eq!(logger.current_clock(), vc(&[("P1", 1)]));
    assert_eq!(sink.write_count(), 1, "Suppressed send must not reach the sink");
    assert_eq!(sink.contents(), before);
}

#[test]
fn test_suppressed_receive_skips_merge() {
    let (p1, _) = create_test_logger("P1", LoggerConfig::default());
    let (p2, sink) =
        create_test_logger("P2", LoggerConfig::default().with_priority(Priority::Error));
    let before = sink.contents();

    let bytes = p1.send_with_priority("go", 1u64, Priority::Fatal).unwrap();
    let got: Option<u64> = p2.receive_with_priority("ignored", &bytes, Priority::Info).unwrap();

    assert_eq!(got, None);
    assert_eq!(
        p2.current_clock(),
        vc(&[("P2", 1)]),
        "Causal information is dropped when filtered"
    );
    assert_eq!(sink.write_count(), 1, "Suppressed receive must not reach the sink");
    assert_eq!(sink.contents(), before);
}

#[test]
fn test_suppressed_events_leave_buffer_empty() {
    let config = LoggerConfig {
        buffered: true,
        ..LoggerConfig::default().with_priority(Priority::Error)
    };
    let (peer, _) = create_test_logger("P0", LoggerConfig::default());
    let (logger, sink) = create_test_logger("P1", config);
    assert!(logger.flush());
    let flushed = sink.write_count();
    let before = sink.contents();

    let bytes = peer.send("go", 1u64).unwrap();
    assert!(logger.local_event_with_priority("quiet", Priority::Info));
    assert!(logger.send_with_priority("quiet", 2u64, Priority::Warning).unwrap().is_empty());
    let got: Option<u64> = logger.receive_with_priority("quiet", &bytes, Priority::Debug).unwrap();
    assert_eq!(got, None);

    assert!(logger.flush(), "Flushing an empty queue succeeds");
    assert_eq!(sink.write_count(), flushed, "Nothing was queued by suppressed events");
    assert_eq!(sink.contents(), before);
    assert_eq!(logger.current_clock(), vc(&[("P1", 1)]));
}

#[test]
fn test_receive_malformed_bytes_leaves_clock() {
    let (logger, sink) = create_test_logger("P2", LoggerConfig::default());
    let result: Result<Option<Payload>, _> = logger.receive("bad", &[0xc1, 0xff, 0x00]);
    assert!(matches!(result, Err(LogError::Decoding(_))));
    assert_eq!(logger.current_clock(), vc(&[("P2", 1)]));
    assert_eq!(sink.write_count(), 1);
}

/// A MessagePack envelope whose payload is `depth` nested one-element arrays.
fn deeply_nested_frame(depth: usize) -> Vec<u8> {
    let mut bytes = vec![0x83];
    bytes.push(0xa6);
    bytes.extend_from_slice(b"sender");
    bytes.push(0xa2);
    bytes.extend_from_slice(b"P1");
    bytes.push(0xa5);
    bytes.extend_from_slice(b"clock");
    bytes.extend_from_slice(&[0x81, 0xa2, b'P', b'1', 0x01]);
    bytes.push(0xa7);
    bytes.extend_from_slice(b"payload");
    bytes.resize(bytes.len() + depth, 0x91);
    bytes.push(0xc0);
    bytes
}

#[test]
fn test_receive_rejects_deeply_nested_frame() {
    let (logger, sink) = create_test_logger("P2", LoggerConfig::default());

    let shallow: Option<Payload> = logger.receive("ok", &deeply_nested_frame(10)).unwrap();
    assert!(shallow.is_some());
    assert_eq!(logger.current_clock(), vc(&[("P1", 1), ("P2", 2)]));

    let result: Result<Option<Payload>, _> = logger.receive("hostile", &deeply_nested_frame(1000));
    assert!(matches!(result, Err(LogError::Decoding(_))));
    assert_eq!(logger.current_clock(), vc(&[("P1", 1), ("P2", 2)]));
    assert_eq!(sink.write_count(), 2);
}

#[test]
fn test_send_too_deep_payload_fails_without_tick() {
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    let nested = (0..=MAX_PAYLOAD_DEPTH).fold(Payload::Nil, |inner, _| Payload::Array(vec![inner]));

    assert!(matches!(logger.send("deep", nested), Err(LogError::Encoding(_))));
    assert_eq!(logger.current_clock(), vc(&[("P1", 1)]));
    assert_eq!(sink.write_count(), 1);
}

#[test]
fn test_receive_type_mismatch_leaves_clock() {
    let (p1, _) = create_test_logger("P1", LoggerConfig::default());
    let (p2, _) = create_test_logger("P2", LoggerConfig::default());
    let bytes = p1.send("go", "not a number").unwrap();

    let result: Result<Option<u64>, _> = p2.receive("want number", &bytes);
    assert!(matches!(result, Err(LogError::Decoding(_))));
    assert_eq!(p2.current_clock(), vc(&[("P2", 1)]));
}

#[test]
fn test_nested_payload_roundtrip_through_loggers() {
    let (p1, _) = create_test_logger("P1", LoggerConfig::default());
    let (p2, _) = create_test_logger("P2", LoggerConfig::default());

    let mut table = BTreeMap::new();
    table.insert("alpha".to_string(), vec![1i64, -1]);
    table.insert("beta".to_string(), vec![]);

    let bytes = p1.send("table", table.clone()).unwrap();
    let got: Option<BTreeMap<String, Vec<i64>>> = p2.receive("table", &bytes).unwrap();
    assert_eq!(got, Some(table));
}

#[test]
fn test_buffered_writes_wait_for_flush() {
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    logger.enable_buffered_writes();

    assert!(logger.local_event("a"));
    assert!(logger.local_event("b"));
    assert_eq!(sink.write_count(), 1, "Buffered records must not reach the sink yet");

    assert!(logger.flush());
    assert_eq!(sink.write_count(), 2, "One batch write per flush");
    assert!(sink.contents().ends_with("P1 {\"P1\":2}\nNORMAL - a\nP1 {\"P1\":3}\nNORMAL - b\n"));

    assert!(logger.flush(), "Flushing with nothing queued is a no-op");
    assert_eq!(sink.write_count(), 2);
}

#[test]
fn test_disable_buffered_writes_flushes_pending() {
    let config = LoggerConfig { buffered: true, ..LoggerConfig::default() };
    let (logger, sink) = create_test_logger("P1", config);
    assert_eq!(sink.write_count(), 0, "Init record is buffered too");

    logger.local_event("queued");
    assert!(logger.disable_buffered_writes());
    assert!(sink.contents().contains(INIT_MESSAGE));
    assert!(sink.contents().ends_with("NORMAL - queued\n"));

    logger.local_event("direct");
    assert!(sink.contents().ends_with("NORMAL - direct\n"));
}

#[test]
fn test_sink_failure_is_reported_but_clock_advances() {
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    sink.set_failing(true);

    assert!(!logger.local_event("lost"));
    assert_eq!(logger.current_clock(), vc(&[("P1", 2)]));

    let bytes = logger.send("still sent", "x").expect("sink failures do not fail a send");
    assert!(!bytes.is_empty());
    assert_eq!(logger.current_clock(), vc(&[("P1", 3)]));

    sink.set_failing(false);
    assert!(logger.local_event("back"));
}

#[test]
fn test_failed_flush_drops_queue() {
    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    logger.enable_buffered_writes();
    logger.local_event("gone");
    sink.set_failing(true);
    assert!(!logger.flush());

    sink.set_failing(false);
    assert!(logger.flush());
    assert!(!sink.contents().contains("gone"));
}

#[test]
fn test_logging_disabled_still_ticks() {
    let config = LoggerConfig { log_to_file: false, ..LoggerConfig::default() };
    let (logger, sink) = create_test_logger("P1", config);

    assert!(logger.local_event("x"));
    assert_eq!(logger.current_clock(), vc(&[("P1", 2)]));
    assert_eq!(sink.write_count(), 0);
}

#[test]
fn test_timestamps_prefix_clock_line() {
    let config = LoggerConfig { use_timestamps: true, ..LoggerConfig::default() };
    let (_logger, sink) = create_test_logger("P1", config);

    let contents = sink.contents();
    let first = contents.lines().next().unwrap();
    let (nanos, rest) = first.split_once(' ').unwrap();
    assert!(nanos.parse::<i64>().is_ok(), "Expected a nanosecond timestamp, got {:?}", nanos);
    assert_eq!(rest, "P1 {\"P1\":1}");
}

#[test]
fn test_append_log_writes_execution_header() {
    let config = LoggerConfig { append_log: true, ..LoggerConfig::default() };
    let (_logger, sink) = create_test_logger("P1", config);

    let contents = sink.contents();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some(" "));
    assert!(lines.next().unwrap().starts_with("=== Execution #"));
    assert_eq!(lines.next(), Some("P1 {\"P1\":1}"));
}

#[test]
fn test_set_priority_changes_threshold() {
    let (logger, _) = create_test_logger("P1", LoggerConfig::default());
    logger.set_priority(Priority::Fatal);
    assert_eq!(logger.priority(), Priority::Fatal);

    logger.local_event_with_priority("dropped", Priority::Error);
    assert_eq!(logger.current_clock(), vc(&[("P1", 1)]));

    logger.local_event("at threshold");
    assert_eq!(logger.current_clock(), vc(&[("P1", 2)]));
}

#[test]
fn test_concurrent_events_are_all_counted() {
    const THREADS: u64 = 8;
    const EVENTS: u64 = 100;

    let (logger, sink) = create_test_logger("P1", LoggerConfig::default());
    let logger = Arc::new(logger);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..EVENTS {
                    if i % 2 == 0 {
                        assert!(logger.local_event(&format!("t{} e{}", t, i)));
                    } else {
                        logger.send("s", i).unwrap();
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(logger.current_clock().find_ticks("P1"), Some(1 + THREADS * EVENTS));
    assert_eq!(sink.write_count() as u64, 1 + THREADS * EVENTS);

    // Records never interleave: every block is a clock line followed by a message line.
    let contents = sink.contents();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len() as u64, 2 * (1 + THREADS * EVENTS));
    for pair in lines.chunks(2) {
        assert!(pair[0].starts_with("P1 {\"P1\":"), "Bad clock line {:?}", pair[0]);
    }
}

#[test]
fn test_causality_chain_across_three_processes() {
    let (p1, _) = create_test_logger("P1", LoggerConfig::default());
    let (p2, _) = create_test_logger("P2", LoggerConfig::default());
    let (p3, _) = create_test_logger("P3", LoggerConfig::default());

    p1.local_event("work");
    let m1 = p1.send("to p2", Payload::Nil).unwrap();
    let after_send = p1.current_clock();

    let _: Option<Payload> = p2.receive("from p1", &m1).unwrap();
    let m2 = p2.send("to p3", Payload::Nil).unwrap();

    p3.local_event("independent");
    let before_receive = p3.current_clock();
    assert_eq!(after_send.compare(&before_receive), PartialOrder::Concurrent);

    let _: Option<Payload> = p3.receive("from p2", &m2).unwrap();
    let end = p3.current_clock();

    assert!(after_send.happened_before(&end));
    assert!(p2.current_clock().happened_before(&end));
    assert_eq!(end, vc(&[("P1", 3), ("P2", 3), ("P3", 3)]));
}

#[test]
fn test_logger_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClockedLogger>();
}
