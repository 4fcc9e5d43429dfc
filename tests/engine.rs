//! End-to-end flows through the supervisor: admission, gating, processing,
//! wrapping, cancellation, rate limiting, and shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::time;

use logicvisor::{
    Bus, Context, DispatchValue, Dispatcher, Event, Gate, InterceptFn, LogicDef, LogicError,
    MonitorNote, MonitorOp, ProcessFn, RuntimeError, Store, Supervisor, SupervisorConfig,
    UNHANDLED_ERROR_TAG,
};

/// Store that records every dispatched event.
struct RecordingStore {
    dispatched: Mutex<Vec<Event>>,
    state: Value,
}

impl RecordingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            dispatched: Mutex::new(Vec::new()),
            state: json!({ "ready": true }),
        })
    }

    fn events(&self) -> Vec<Event> {
        self.dispatched.lock().unwrap().clone()
    }

    fn tags(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.tag).collect()
    }
}

impl Store for RecordingStore {
    fn dispatch(&self, event: Event) {
        self.dispatched.lock().unwrap().push(event);
    }

    fn state(&self) -> Value {
        self.state.clone()
    }
}

fn drain_notes(rx: &mut broadcast::Receiver<MonitorNote>) -> Vec<MonitorNote> {
    let mut notes = Vec::new();
    while let Ok(note) = rx.try_recv() {
        notes.push(note);
    }
    notes
}

fn ops(notes: &[MonitorNote]) -> Vec<MonitorOp> {
    notes.iter().map(|n| n.op).collect()
}

fn count(notes: &[MonitorNote], op: MonitorOp) -> usize {
    notes.iter().filter(|n| n.op == op).count()
}

/// Let spawned tasks quiesce; paused time auto-advances past timers.
async fn settle() {
    time::sleep(Duration::from_millis(250)).await;
}

#[tokio::test(start_paused = true)]
async fn success_path_wraps_and_dispatches_once() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let fetch = LogicDef::new(
        "fetch",
        "FETCH",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!(42));
            Ok(None)
        }),
    )
    .with_success_tag("FETCH_OK");

    let mut out = sup.run(vec![fetch], &bus);
    bus.publish(Event::new("FETCH"));
    settle().await;

    assert_eq!(
        store.events(),
        vec![Event::new("FETCH_OK").with_payload(json!(42))]
    );
    let notes = drain_notes(&mut mon);
    assert_eq!(
        ops(&notes),
        vec![MonitorOp::Begin, MonitorOp::Dispatch, MonitorOp::End]
    );
    // the matched event itself continues down the pipeline
    assert_eq!(out.try_recv().unwrap(), Event::new("FETCH"));
}

#[tokio::test(start_paused = true)]
async fn take_latest_cancels_in_flight() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let fetch = LogicDef::new(
        "fetch",
        "FETCH",
        ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
            time::sleep(Duration::from_millis(20)).await;
            out.dispatch(ctx.event().payload.clone());
            Ok(None)
        }),
    )
    .with_take_latest(true)
    .with_success_tag("FETCH_OK");

    let _out = sup.run(vec![fetch], &bus);
    bus.publish(Event::new("FETCH").with_payload(json!(1)));
    bus.publish(Event::new("FETCH").with_payload(json!(2)));
    settle().await;

    assert_eq!(
        store.events(),
        vec![Event::new("FETCH_OK").with_payload(json!(2))]
    );
    let notes = drain_notes(&mut mon);
    assert_eq!(count(&notes, MonitorOp::Cancelled), 1);
    assert_eq!(count(&notes, MonitorOp::Dispatch), 1);
    assert_eq!(count(&notes, MonitorOp::End), 2);
    // the cancelled actor is the one that carried payload 1
    let cancelled = notes
        .iter()
        .find(|n| n.op == MonitorOp::Cancelled)
        .unwrap();
    assert_eq!(cancelled.source.payload, json!(1));
}

#[tokio::test(start_paused = true)]
async fn reject_suppresses_processing() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let ran = Arc::new(AtomicBool::new(false));
    let ran_probe = ran.clone();

    let guarded = LogicDef::new(
        "guarded",
        "SUBMIT",
        ProcessFn::arc(move |_ctx: Context, out: Dispatcher| {
            let ran = ran_probe.clone();
            async move {
                ran.store(true, Ordering::SeqCst);
                out.dispatch(json!("processed"));
                Ok(None)
            }
        }),
    )
    .with_validate(InterceptFn::arc(|_ctx: Context, gate: Gate| async move {
        gate.reject(None);
    }));

    let mut out = sup.run(vec![guarded], &bus);
    bus.publish(Event::new("SUBMIT"));
    settle().await;

    assert!(!ran.load(Ordering::SeqCst));
    assert!(store.events().is_empty());
    assert!(out.try_recv().is_err());
    let notes = drain_notes(&mut mon);
    assert_eq!(
        ops(&notes),
        vec![MonitorOp::Begin, MonitorOp::Filtered, MonitorOp::End]
    );
    assert_eq!(notes[1].should_process, Some(false));
}

#[tokio::test(start_paused = true)]
async fn debounce_collapses_bursts() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let search = LogicDef::new(
        "search",
        "SEARCH",
        ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
            out.dispatch(ctx.event().payload.clone());
            Ok(None)
        }),
    )
    .with_debounce(Duration::from_millis(100))
    .with_success_tag("SEARCH_OK");

    let _out = sup.run(vec![search], &bus);
    for n in 1..=3 {
        bus.publish(Event::new("SEARCH").with_payload(json!(n)));
        time::sleep(Duration::from_millis(10)).await;
    }
    settle().await;

    assert_eq!(
        store.events(),
        vec![Event::new("SEARCH_OK").with_payload(json!(3))]
    );
    let notes = drain_notes(&mut mon);
    assert_eq!(count(&notes, MonitorOp::Begin), 1);
}

#[tokio::test(start_paused = true)]
async fn end_note_exactly_once_on_every_path() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    // success, reject, and error logic side by side
    let ok = LogicDef::new(
        "ok",
        "OK",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!(1));
            Ok(None)
        }),
    )
    .with_success_tag("OK_DONE");

    let rejected = LogicDef::new(
        "rejected",
        "REJECTED",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!(2));
            Ok(None)
        }),
    )
    .with_validate(InterceptFn::arc(|_ctx: Context, gate: Gate| async move {
        gate.reject(None);
    }));

    let failing = LogicDef::new(
        "failing",
        "FAILING",
        ProcessFn::arc(|_ctx: Context, _out: Dispatcher| async move { Err(LogicError::from("boom")) }),
    );

    let _out = sup.run(vec![ok, rejected, failing], &bus);
    bus.publish(Event::new("OK"));
    bus.publish(Event::new("REJECTED"));
    bus.publish(Event::new("FAILING"));
    settle().await;

    let notes = drain_notes(&mut mon);
    for logic in ["ok", "rejected", "failing"] {
        let ends = notes
            .iter()
            .filter(|n| n.op == MonitorOp::End && &*n.logic == logic)
            .count();
        assert_eq!(ends, 1, "logic {logic} must end exactly once");
    }
}

#[tokio::test(start_paused = true)]
async fn dispatch_multiple_preserves_order() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);

    let multi = LogicDef::new(
        "multi",
        "MULTI",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!("a"));
            out.dispatch(json!("b"));
            out.done();
            out.dispatch(json!("c")); // after done: dropped
            Ok(None)
        }),
    )
    .with_dispatch_multiple(true)
    .with_success_tag("ITEM");

    let _out = sup.run(vec![multi], &bus);
    bus.publish(Event::new("MULTI"));
    settle().await;

    assert_eq!(
        store.events(),
        vec![
            Event::new("ITEM").with_payload(json!("a")),
            Event::new("ITEM").with_payload(json!("b")),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unhandled_error_gets_generic_wrapper() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);

    let failing = LogicDef::new(
        "failing",
        "GO",
        ProcessFn::arc(|_ctx: Context, _out: Dispatcher| async move { Err(LogicError::Payload(json!("boom"))) }),
    );

    let _out = sup.run(vec![failing], &bus);
    bus.publish(Event::new("GO"));
    settle().await;

    let events = store.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tag, UNHANDLED_ERROR_TAG);
    assert_eq!(events[0].payload, json!("boom"));
    assert!(events[0].error);
}

#[tokio::test(start_paused = true)]
async fn cancel_tag_aborts_and_passes_through() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let fetch = LogicDef::new(
        "fetch",
        "FETCH",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            time::sleep(Duration::from_millis(50)).await;
            out.dispatch(json!("late"));
            Ok(None)
        }),
    )
    .with_cancel_tag("FETCH_CANCEL")
    .with_success_tag("FETCH_OK");

    let mut out = sup.run(vec![fetch], &bus);
    bus.publish(Event::new("FETCH"));
    bus.publish(Event::new("FETCH_CANCEL"));
    settle().await;

    assert!(store.events().is_empty());
    let notes = drain_notes(&mut mon);
    assert_eq!(count(&notes, MonitorOp::Cancelled), 1);
    assert_eq!(count(&notes, MonitorOp::End), 1);

    // the canceling event itself passes through unmatched
    let mut passed = Vec::new();
    while let Ok(ev) = out.try_recv() {
        passed.push(ev.tag);
    }
    assert!(passed.contains(&"FETCH_CANCEL".to_string()));
}

#[tokio::test(start_paused = true)]
async fn transform_redirect_bypasses_wrapping() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let audit = LogicDef::new(
        "audit",
        "SAVE",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!("saved"));
            Ok(None)
        }),
    )
    .with_transform(InterceptFn::arc(|ctx: Context, gate: Gate| async move {
        let redirected = Event::new("SAVE_AUDITED").with_payload(ctx.event().payload.clone());
        gate.allow(Some(redirected));
    }))
    .with_success_tag("SAVE_OK");

    let _out = sup.run(vec![audit], &bus);
    bus.publish(Event::new("SAVE").with_payload(json!({ "id": 1 })));
    settle().await;

    // redirect is delivered as-is, then processing still ran and wrapped
    assert_eq!(store.tags(), vec!["SAVE_AUDITED", "SAVE_OK"]);
    let notes = drain_notes(&mut mon);
    assert_eq!(count(&notes, MonitorOp::NextDisp), 1);
    let nd = notes.iter().find(|n| n.op == MonitorOp::NextDisp).unwrap();
    assert_eq!(nd.should_process, Some(true));
}

#[tokio::test(start_paused = true)]
async fn fail_tag_constructor_suppresses() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let quiet = LogicDef::new(
        "quiet",
        "GO",
        ProcessFn::arc(|_ctx: Context, _out: Dispatcher| async move { Err(LogicError::from("swallowed")) }),
    )
    .with_fail_tag(logicvisor::WrapTag::with(|_| None));

    let _out = sup.run(vec![quiet], &bus);
    bus.publish(Event::new("GO"));
    settle().await;

    assert!(store.events().is_empty());
    let notes = drain_notes(&mut mon);
    assert_eq!(count(&notes, MonitorOp::Dispatch), 0);
    assert_eq!(count(&notes, MonitorOp::End), 1);
}

#[tokio::test(start_paused = true)]
async fn fail_tag_wraps_error_with_marker() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);

    let failing = LogicDef::new(
        "failing",
        "GO",
        ProcessFn::arc(|_ctx: Context, _out: Dispatcher| async move { Err(LogicError::from("no luck")) }),
    )
    .with_fail_tag("GO_FAILED");

    let _out = sup.run(vec![failing], &bus);
    bus.publish(Event::new("GO"));
    settle().await;

    assert_eq!(
        store.events(),
        vec![Event::error("GO_FAILED", json!("no luck"))]
    );
}

#[tokio::test(start_paused = true)]
async fn unmatched_events_pass_through_in_order() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let fetch = LogicDef::new(
        "fetch",
        "FETCH",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!(1));
            Ok(None)
        }),
    )
    .with_success_tag("FETCH_OK");

    let mut out = sup.run(vec![fetch], &bus);
    bus.publish(Event::new("ALPHA"));
    bus.publish(Event::new("BETA"));
    bus.publish(Event::new("GAMMA"));
    settle().await;

    let mut passed = Vec::new();
    while let Ok(ev) = out.try_recv() {
        passed.push(ev.tag);
    }
    assert_eq!(passed, vec!["ALPHA", "BETA", "GAMMA"]);
    assert!(store.events().is_empty());
    assert_eq!(count(&drain_notes(&mut mon), MonitorOp::Begin), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_stuck_logic() {
    let store = RecordingStore::new();
    let cfg = SupervisorConfig {
        grace: Duration::from_millis(100),
        ..SupervisorConfig::default()
    };
    let sup = Supervisor::new(cfg, store.clone());
    let bus = Bus::new(64);

    let stuck = LogicDef::new(
        "stuck",
        "HANG",
        ProcessFn::arc(|_ctx: Context, _out: Dispatcher| async move {
            // ignores cancellation on purpose
            futures::future::pending::<()>().await;
            Ok(None)
        }),
    )
    .with_warn_timeout(None);

    let _out = sup.run(vec![stuck], &bus);
    bus.publish(Event::new("HANG"));
    settle().await;

    match sup.shutdown().await {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec!["stuck".to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_succeeds_with_cooperative_hooks() {
    let store = RecordingStore::new();
    let cfg = SupervisorConfig {
        grace: Duration::from_millis(100),
        ..SupervisorConfig::default()
    };
    let sup = Supervisor::new(cfg, store.clone());
    let bus = Bus::new(64);

    let polite = LogicDef::new(
        "polite",
        "WORK",
        ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
            ctx.cancelled().cancelled().await;
            out.done();
            Ok(None)
        }),
    );

    let _out = sup.run(vec![polite], &bus);
    bus.publish(Event::new("WORK"));
    settle().await;

    assert!(sup.shutdown().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn dispatch_return_behaves_like_dispatch() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);

    let returning = LogicDef::new(
        "returning",
        "CALC",
        ProcessFn::arc(|_ctx: Context, _out: Dispatcher| async move { Ok(Some(DispatchValue::Value(json!(7)))) }),
    )
    .with_dispatch_return(true)
    .with_success_tag("CALC_OK");

    let _out = sup.run(vec![returning], &bus);
    bus.publish(Event::new("CALC"));
    settle().await;

    assert_eq!(
        store.events(),
        vec![Event::new("CALC_OK").with_payload(json!(7))]
    );
}

#[tokio::test(start_paused = true)]
async fn validate_filtered_processes_original_event() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let silent = LogicDef::new(
        "silent",
        "PING",
        ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
            // the original event must still be visible here
            out.dispatch(ctx.event().payload.clone());
            Ok(None)
        }),
    )
    .with_validate(InterceptFn::arc(|_ctx: Context, gate: Gate| async move {
        gate.allow(None); // swallow the event, still process
    }))
    .with_success_tag("PONG");

    let mut out = sup.run(vec![silent], &bus);
    bus.publish(Event::new("PING").with_payload(json!("hello")));
    settle().await;

    assert_eq!(
        store.events(),
        vec![Event::new("PONG").with_payload(json!("hello"))]
    );
    // nothing forwarded down the pipeline
    assert!(out.try_recv().is_err());
    let notes = drain_notes(&mut mon);
    assert_eq!(count(&notes, MonitorOp::Filtered), 1);
}

#[tokio::test(start_paused = true)]
async fn chained_definitions_share_the_stream() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);

    let first = LogicDef::new(
        "first",
        "A",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!("from-a"));
            Ok(None)
        }),
    )
    .with_success_tag("A_OK");

    let second = LogicDef::new(
        "second",
        "B",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!("from-b"));
            Ok(None)
        }),
    )
    .with_success_tag("B_OK");

    let mut out = sup.run(vec![first, second], &bus);
    bus.publish(Event::new("A"));
    bus.publish(Event::new("B"));
    settle().await;

    let mut tags = store.tags();
    tags.sort();
    assert_eq!(tags, vec!["A_OK", "B_OK"]);

    // both matched events traverse the whole chain
    let mut passed = Vec::new();
    while let Ok(ev) = out.try_recv() {
        passed.push(ev.tag);
    }
    passed.sort();
    assert_eq!(passed, vec!["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn stream_dispatch_merges_items_in_order() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);

    let paged = LogicDef::new(
        "paged",
        "LOAD",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(DispatchValue::stream(futures::stream::iter(vec![
                Ok(json!("page-1")),
                Ok(json!("page-2")),
            ])));
            Ok(None)
        }),
    )
    .with_success_tag("PAGE");

    let _out = sup.run(vec![paged], &bus);
    bus.publish(Event::new("LOAD"));
    settle().await;

    assert_eq!(
        store.events(),
        vec![
            Event::new("PAGE").with_payload(json!("page-1")),
            Event::new("PAGE").with_payload(json!("page-2")),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn process_reads_host_state() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);

    let snap = LogicDef::new(
        "snap",
        "SNAPSHOT",
        ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
            out.dispatch(ctx.state());
            Ok(None)
        }),
    )
    .with_success_tag("SNAPSHOT_OK");

    let _out = sup.run(vec![snap], &bus);
    bus.publish(Event::new("SNAPSHOT"));
    settle().await;

    assert_eq!(
        store.events(),
        vec![Event::new("SNAPSHOT_OK").with_payload(json!({ "ready": true }))]
    );
}

#[tokio::test(start_paused = true)]
async fn dropped_gate_ends_actor_without_processing() {
    let store = RecordingStore::new();
    let sup = Supervisor::new(SupervisorConfig::default(), store.clone());
    let bus = Bus::new(64);
    let mut mon = sup.monitor();

    let broken = LogicDef::new(
        "broken",
        "OOPS",
        ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
            out.dispatch(json!("never"));
            Ok(None)
        }),
    )
    .with_validate(InterceptFn::arc(|_ctx: Context, gate: Gate| async move {
        drop(gate); // resolves neither allow nor reject
    }));

    let _out = sup.run(vec![broken], &bus);
    bus.publish(Event::new("OOPS"));
    settle().await;

    assert!(store.events().is_empty());
    let notes = drain_notes(&mut mon);
    assert_eq!(ops(&notes), vec![MonitorOp::Begin, MonitorOp::End]);
}
