use std::cell::RefCell;
use std::rc::Rc;

use arbor_core::Blackboard;
use arbor_tools::{emit, tags, TraceEvent, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK};

fn shared_sink() -> (Rc<RefCell<Vec<TraceEvent>>>, Box<dyn TraceSink>) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let handle = Rc::clone(&events);
    let sink: Box<dyn TraceSink> = Box::new(move |e: TraceEvent| handle.borrow_mut().push(e));
    (events, sink)
}

#[test]
fn emit_appends_to_installed_log() {
    let mut bb = Blackboard::new();
    bb.set(TRACE_LOG, TraceLog::default());

    emit(&mut bb, TraceEvent::new(1, tags::TIMEOUT).with_a(10).with_b(20));

    let log = bb.get(TRACE_LOG).unwrap();
    assert_eq!(
        log.events,
        vec![TraceEvent {
            tick: 1,
            tag: tags::TIMEOUT.into(),
            a: 10,
            b: 20,
        }]
    );
}

#[test]
fn emit_streams_into_closure_sink() {
    let mut bb = Blackboard::new();
    let (events, sink) = shared_sink();
    bb.set(TRACE_SINK, sink);

    emit(&mut bb, TraceEvent::new(2, tags::WATCH_FIRED).with_a(4));

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tag, tags::WATCH_FIRED);
    assert_eq!(events[0].a, 4);
}

#[test]
fn emit_feeds_log_and_sink_together() {
    let mut bb = Blackboard::new();
    bb.set(TRACE_LOG, TraceLog::default());
    let (events, sink) = shared_sink();
    bb.set(TRACE_SINK, sink);

    emit(&mut bb, TraceEvent::new(3, tags::RESULT_CHANGED).with_b(1));

    assert_eq!(bb.get(TRACE_LOG).map(TraceLog::len), Some(1));
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(bb.get(TRACE_LOG).unwrap().events[0], events.borrow()[0]);
}

#[test]
fn emit_without_log_or_sink_records_nothing() {
    let mut bb = Blackboard::new();
    emit(&mut bb, TraceEvent::new(4, "dropped"));
    assert!(bb.is_empty());
}

#[test]
fn log_filters_by_tag_and_tick() {
    let mut log = TraceLog::default();
    log.record(TraceEvent::new(1, tags::TIMEOUT).with_a(3));
    log.record(TraceEvent::new(1, tags::RESULT_CHANGED));
    log.record(TraceEvent::new(2, tags::TIMEOUT).with_a(5));

    let timeouts: Vec<u64> = log.with_tag(tags::TIMEOUT).map(|e| e.a).collect();
    assert_eq!(timeouts, vec![3, 5]);
    assert_eq!(log.at_tick(1).count(), 2);

    log.clear();
    assert!(log.is_empty());
}
