//! Read-through caching demo: a two-link chain over the in-memory store.
//!
//! Run with: `cargo run --example readthrough`

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use swr_link::{CacheLink, Chain, Link, MemoryStore, Next, Operation, QueryResult, ResultStream};

/// Stand-in for a real backend transport: counts calls, answers slowly.
struct Transport {
    calls: AtomicUsize,
}

impl Link for Transport {
    fn handle(&self, _operation: Operation, _next: Next) -> ResultStream {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, receiver) = tokio::sync::mpsc::channel(1);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = sender
                .send(QueryResult::ok(serde_json::json!({ "answer": 42, "backend_call": call })))
                .await;
        });
        receiver
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let transport = Arc::new(Transport {
        calls: AtomicUsize::new(0),
    });
    let cache = CacheLink::new(Arc::new(MemoryStore::new()))
        .freshness_window(Duration::from_millis(200));
    let chain = Chain::new(vec![Arc::new(cache) as Arc<dyn Link>, transport.clone()]);

    let operation = Operation::new("query Answer { answer }");

    // First request misses and pays the backend latency.
    run("miss", &chain, operation.clone()).await;

    // Second request is served straight from the store.
    run("hit", &chain, operation.clone()).await;

    // After the freshness window elapses the entry is still served from the
    // store, and a miss would refresh it in the background.
    tokio::time::sleep(Duration::from_millis(250)).await;
    run("hit (stale, trusted anyway)", &chain, operation).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("backend calls total: {}", transport.calls.load(Ordering::SeqCst));
}

async fn run(label: &str, chain: &Chain, operation: Operation) {
    let started = std::time::Instant::now();
    let mut results = chain.execute(operation);
    while let Some(result) = results.recv().await {
        println!("{label}: {result:?} ({:?})", started.elapsed());
    }
}
