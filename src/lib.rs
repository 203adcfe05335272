//! # swr-link
//!
//! A stale-while-revalidate caching link for composable query middleware
//! chains.
//!
//! The [`CacheLink`] sits anywhere in a linear [`Chain`] of request
//! handlers. Read-only queries are fingerprinted and served straight from a
//! pluggable key-value [`CacheStore`] when possible; misses pass through to
//! the downstream link once, populate the cache, and schedule a deferred
//! freshness check that refreshes stale entries in the background without
//! ever delaying the caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swr_link::{CacheLink, Chain, Link, MemoryStore, Next, Operation, QueryResult};
//!
//! fn transport(_operation: Operation, _next: Next) -> swr_link::ResultStream {
//!     let (sender, receiver) = tokio::sync::mpsc::channel(1);
//!     tokio::spawn(async move {
//!         let _ = sender.send(QueryResult::ok(serde_json::json!({ "ping": "pong" }))).await;
//!     });
//!     receiver
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let chain = Chain::new(vec![
//!         Arc::new(CacheLink::new(Arc::new(MemoryStore::new()))) as Arc<dyn Link>,
//!         Arc::new(transport),
//!     ]);
//!
//!     let mut results = chain.execute(Operation::new("query Ping { ping }"));
//!     while let Some(result) = results.recv().await {
//!         println!("{result:?}");
//!     }
//! }
//! ```

pub mod cache;
pub mod fingerprint;
pub mod link;
pub mod operation;
pub mod store;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheLink, DEFAULT_FRESHNESS_WINDOW, FreshnessMarker};
pub use fingerprint::Fingerprint;
pub use link::{Chain, Link, Next, ResultStream};
pub use operation::{Operation, OperationKind, QueryResult, ResultError};
pub use store::{CacheStore, MemoryStore, StoreError};
