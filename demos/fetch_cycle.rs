//! # Example: fetch_cycle
//!
//! Demonstrates the full fetch/cancel cycle of one logic definition.
//!
//! Shows how to:
//! - Register a logic with take-latest and an explicit cancel tag
//! - Dispatch derived events through `success_tag` / `fail_tag`
//! - Observe the lifecycle via [`LogWriter`] and the monitor channel
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Supervisor::run(vec![fetch_logic], &bus)
//!   ├─► publish USERS_FETCH        (first request, will be superseded)
//!   ├─► publish USERS_FETCH        (take-latest cancels the first)
//!   ├─► wait; the survivor dispatches USERS_FETCH_OK
//!   ├─► publish USERS_FETCH + USERS_FETCH_CANCEL (explicit cancellation)
//!   └─► shutdown with grace
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example fetch_cycle
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use logicvisor::{
    Bus, Context, Dispatcher, Event, LogWriter, LogicDef, ProcessFn, Store, Subscribe, Supervisor,
    SupervisorConfig,
};

/// Minimal host pipeline: prints whatever the engine dispatches.
struct PrintStore;

impl Store for PrintStore {
    fn dispatch(&self, event: Event) {
        println!("[store] <- {} {}", event.tag, event.payload);
    }

    fn state(&self) -> Value {
        json!({ "users": [] })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== fetch_cycle example ===\n");

    // 1. A fetch logic: newer requests win, an explicit tag aborts
    let fetch = LogicDef::new(
        "fetch-users",
        "USERS_FETCH",
        ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
            println!("[process] fetching (request {})", ctx.event().payload);
            // simulated network latency; a newer request or a cancel tag
            // arriving during this wait suppresses the dispatch below
            tokio::time::sleep(Duration::from_millis(300)).await;
            out.dispatch(json!({ "users": ["alice", "bob"], "request": ctx.event().payload }));
            Ok(None)
        }),
    )
    .with_take_latest(true)
    .with_cancel_tag("USERS_FETCH_CANCEL")
    .with_success_tag("USERS_FETCH_OK")
    .with_fail_tag("USERS_FETCH_FAILED");

    // 2. Supervisor with the reference monitor subscriber
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let sup = Supervisor::new(SupervisorConfig::default(), Arc::new(PrintStore))
        .with_subscribers(subs);

    let bus = Bus::new(256);
    let mut output = sup.run(vec![fetch], &bus);

    // drain pass-through events so the pipeline keeps moving
    tokio::spawn(async move { while output.recv().await.is_some() {} });

    // 3. Two quick requests: take-latest cancels the first
    println!("--- take-latest ---");
    bus.publish(Event::new("USERS_FETCH").with_payload(json!(1)));
    bus.publish(Event::new("USERS_FETCH").with_payload(json!(2)));
    tokio::time::sleep(Duration::from_millis(500)).await;

    // 4. Explicit cancellation
    println!("--- explicit cancel ---");
    bus.publish(Event::new("USERS_FETCH").with_payload(json!(3)));
    tokio::time::sleep(Duration::from_millis(100)).await;
    bus.publish(Event::new("USERS_FETCH_CANCEL"));
    tokio::time::sleep(Duration::from_millis(500)).await;

    // 5. Graceful shutdown
    match sup.shutdown().await {
        Ok(()) => println!("\n=== example completed successfully ==="),
        Err(e) => eprintln!("\nshutdown: {}", e.as_message()),
    }
}
