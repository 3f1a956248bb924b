#![no_main]

// Harness: receive_causality – after a receive the local clock dominates the
// incoming snapshot and the local component advanced by exactly one.

use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use causelog_core::{
    codec::{EnvelopeCodec, MsgPackCodec},
    ClockedLogger, LoggerConfig, Payload, ProcessId, VectorClock, WireEnvelope,
};

#[derive(Arbitrary, Debug, Clone)]
struct IncomingFrame {
    sender: String,
    entries: Vec<(String, u64)>,
    local_events: u8,
}

fuzz_target!(|frame: IncomingFrame| {
    let config = LoggerConfig { log_to_file: false, ..LoggerConfig::default() };
    let logger = ClockedLogger::with_sink("local", config, causelog_core::MemorySink::new());
    for _ in 0..frame.local_events % 16 {
        logger.local_event("tick");
    }
    let before = logger.current_clock().find_ticks("local").unwrap_or(0);

    let clock: VectorClock =
        frame.entries.iter().cloned().map(|(k, v)| (ProcessId(k), v)).collect();
    let envelope = WireEnvelope {
        sender: ProcessId(frame.sender),
        clock: clock.clone(),
        payload: Payload::Nil,
    };
    let bytes = MsgPackCodec.encode(&envelope).expect("encode");

    let _: Option<Payload> = logger.receive("fuzz", &bytes).expect("receive");
    let after = logger.current_clock();

    for (pid, ticks) in clock.iter() {
        assert!(after.find_ticks(pid.as_str()).unwrap_or(0) >= *ticks);
    }
    let own_incoming = clock.find_ticks("local").unwrap_or(0);
    assert_eq!(after.find_ticks("local"), Some((before + 1).max(own_incoming)));
});
