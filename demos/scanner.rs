//! Scanner Repository
//!
//! This example demonstrates an observable repository driven by a monitor.
//!
//! Key concepts:
//! - Pure transition functions applied one at a time
//! - Lifecycle hooks on entering and leaving states
//! - A monitor that only runs while someone is subscribed
//! - Suspending until the machine settles with `await_until`
//!
//! Run with: cargo run --example scanner

use statecell::{state_enum, AwaitOutcome, RepositoryBuilder, Resolver, TransitionOutcome};
use std::time::Duration;

state_enum! {
    enum Scanner {
        Idle,
        Scanning,
        Found,
    }
    edges: {
        Idle => [Scanning],
        Scanning => [Idle, Found],
        Found => [Idle],
    }
}

#[tokio::main]
async fn main() {
    println!("=== Scanner Repository Example ===\n");

    let scanner = RepositoryBuilder::new()
        .name("scanner")
        .initial(Scanner::Idle)
        .on_enter(|state, ctx| println!("  enter {state:?} (commit #{})", ctx.sequence()))
        .on_exit(|state, _| println!("  exit  {state:?}"))
        // The "radio" only runs while someone is watching.
        .on_first_subscriber(|dispatcher| {
            println!("  radio on");
            let runtime = dispatcher.runtime().clone();
            runtime.spawn(async move {
                let _ = dispatcher.dispatch(|_| TransitionOutcome::To(Scanner::Scanning));
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = dispatcher.dispatch(|state: &Scanner| match state {
                    Scanner::Scanning => TransitionOutcome::To(Scanner::Found),
                    _ => TransitionOutcome::Remain,
                });
            });
        })
        .on_last_unsubscribed(|| println!("  radio off"))
        .build()
        .unwrap();

    println!("Waiting for a device:");
    let found = scanner
        .await_until_timeout(
            &[Resolver::when(|s: &Scanner| *s == Scanner::Found, "device found")],
            Duration::from_secs(1),
        )
        .await;

    match found {
        AwaitOutcome::Resolved(message) => println!("\nResult: {message}"),
        AwaitOutcome::Cancelled(reason) => println!("\nGave up: {reason}"),
    }

    scanner
        .transition(|_| TransitionOutcome::To(Scanner::Idle))
        .await
        .unwrap();

    println!("\nPath taken:");
    for state in scanner.history().get_path() {
        println!("  {state:?}");
    }

    scanner.close();
    println!("\n=== Example Complete ===");
}
