#![cfg(feature = "serde")]

use arbor_tools::{tags, TraceEvent, TraceLog};

#[test]
fn trace_log_json_roundtrip() {
    let log = TraceLog {
        events: vec![
            TraceEvent::new(1, tags::RESULT_CHANGED).with_a(10).with_b(1),
            TraceEvent::new(2, tags::TIMEOUT).with_a(4),
            TraceEvent::new(3, "game.custom").with_a(3).with_b(4),
        ],
    };

    let json = serde_json::to_string(&log).expect("serialize");
    let roundtrip: TraceLog = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, log);
}

#[test]
fn trace_event_json_uses_plain_fields() {
    let event = TraceEvent::new(7, tags::WEIGHTED_SELECT).with_a(2);
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(value["tick"], 7);
    assert_eq!(value["tag"], "bt.weighted.select");
    assert_eq!(value["a"], 2);
}
