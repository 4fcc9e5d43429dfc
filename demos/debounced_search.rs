//! # Example: debounced_search
//!
//! A search-as-you-type logic: keystrokes arrive as SEARCH events, the
//! debounce window collapses bursts, a validate hook drops empty queries,
//! and only the last query of a burst reaches the (simulated) backend.
//!
//! ## Flow
//! ```text
//! keystrokes ─► SEARCH events ─► debounce(300ms) ─► validate ─► process
//!                                                       │
//!                                              reject empty queries
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example debounced_search
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use logicvisor::{
    Bus, Context, Dispatcher, Event, Gate, InterceptFn, LogicDef, ProcessFn, Store, Supervisor,
    SupervisorConfig,
};

struct PrintStore;

impl Store for PrintStore {
    fn dispatch(&self, event: Event) {
        println!("[store] <- {} {}", event.tag, event.payload);
    }

    fn state(&self) -> Value {
        Value::Null
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().init();

    println!("=== debounced_search example ===\n");

    let search = LogicDef::new(
        "search",
        "SEARCH",
        ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
            let query = ctx.event().payload.clone();
            println!("[process] querying backend for {query}");
            tokio::time::sleep(Duration::from_millis(50)).await;
            out.dispatch(json!({ "query": query, "hits": 3 }));
            Ok(None)
        }),
    )
    .with_debounce(Duration::from_millis(300))
    .with_take_latest(true)
    .with_validate(InterceptFn::arc(|ctx: Context, gate: Gate| async move {
        let empty = ctx
            .event()
            .payload
            .as_str()
            .map(str::is_empty)
            .unwrap_or(true);
        if empty {
            println!("[validate] empty query rejected");
            gate.reject(None);
        } else {
            let ev = ctx.event().clone();
            gate.allow(Some(ev));
        }
    }))
    .with_success_tag("SEARCH_OK")
    .with_fail_tag("SEARCH_FAILED");

    let sup = Supervisor::new(SupervisorConfig::default(), Arc::new(PrintStore));
    let bus = Bus::new(256);
    let mut output = sup.run(vec![search], &bus);

    tokio::spawn(async move { while output.recv().await.is_some() {} });

    // a user typing "tokio", one keystroke every 100ms: only the final
    // query survives the debounce window
    for prefix in ["t", "to", "tok", "toki", "tokio"] {
        bus.publish(Event::new("SEARCH").with_payload(json!(prefix)));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    // an empty query is filtered out by the validate hook
    bus.publish(Event::new("SEARCH").with_payload(json!("")));
    tokio::time::sleep(Duration::from_millis(600)).await;

    let _ = sup.shutdown().await;
    println!("\n=== example completed successfully ===");
}
