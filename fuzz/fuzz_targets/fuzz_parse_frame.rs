//! Fuzz target: `wire::parse_frame`
//!
//! Throws arbitrary byte sequences at the frame parser and asserts that
//! it never panics, never over-consumes, and that anything it accepts
//! re-encodes into a frame the parser accepts again.
//!
//! cargo fuzz run fuzz_parse_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use surveyrig::link::wire::{parse_frame, FRAME_HEADER_SIZE, MAX_FRAME_LEN};

fuzz_target!(|data: &[u8]| {
    if let Ok((frame, consumed)) = parse_frame(data) {
        assert!(consumed <= data.len(), "parser consumed beyond its input");
        assert!(
            (FRAME_HEADER_SIZE..=MAX_FRAME_LEN).contains(&consumed),
            "consumed length outside the frame envelope"
        );

        // Accepted input must survive a re-encode/re-parse cycle. The
        // bytes themselves may differ (JSON bodies re-serialise), but
        // the decoded frame must be stable.
        let reencoded = frame.to_bytes();
        let (reparsed, _) = parse_frame(&reencoded).expect("re-encoded frame must parse");
        assert_eq!(reparsed, frame);
    }
});
