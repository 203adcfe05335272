//! The caching link: serve from cache, populate on miss, revalidate in the
//! background.
//!
//! [`CacheLink`] intercepts read-only query operations. Control flow per
//! operation:
//!
//! 1. Non-query kinds forward unconditionally — no store traffic.
//! 2. The operation is fingerprinted and looked up in the store.
//! 3. Hit: the cached result is emitted as the sole result and the stream
//!    completes. The downstream continuation is never invoked.
//! 4. Miss: the continuation runs once; its first result is persisted when
//!    error-free, emitted either way, and the stream completes. A deferred
//!    freshness check then decides whether to refresh the entry in the
//!    background — those results are never emitted to any caller.
//!
//! Error-bearing results are never written to the store. Store failures
//! degrade to pass-through behavior instead of surfacing to the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task;
use tracing::{Instrument, Span, debug, info_span, warn};

use crate::fingerprint::Fingerprint;
use crate::link::{Link, Next, RESULT_BUFFER, ResultStream};
use crate::operation::{Operation, QueryResult};
use crate::store::CacheStore;

mod freshness;

pub use freshness::FreshnessMarker;

use freshness::epoch_millis;

/// How long a populated entry is trusted before a background refresh
/// becomes due (one minute).
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_millis(60_000);

/// A [`Link`] that serves cached query results and keeps them warm with a
/// stale-while-revalidate refresh.
///
/// Each instance owns its store handle, freshness window, and a
/// [`tracing::Span`] that scopes every diagnostic the link emits — no
/// global logger state.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use swr_link::{CacheLink, MemoryStore};
///
/// let link = CacheLink::new(Arc::new(MemoryStore::new()))
///     .freshness_window(Duration::from_secs(30));
/// # let _ = link;
/// ```
pub struct CacheLink {
    store: Arc<dyn CacheStore>,
    freshness_window: Duration,
    span: Span,
}

impl CacheLink {
    /// Creates a cache link over `store` with the default freshness window.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            span: info_span!("cache_link"),
        }
    }

    /// Overrides the freshness window.
    #[must_use]
    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }
}

impl Link for CacheLink {
    fn handle(&self, operation: Operation, next: Next) -> ResultStream {
        let kind = operation.kind();
        if !kind.is_cacheable() {
            debug!(parent: &self.span, %kind, "not a query, forwarding");
            return next.run(operation);
        }

        let (sender, receiver) = mpsc::channel(RESULT_BUFFER);
        let exchange = Exchange {
            store: Arc::clone(&self.store),
            window: self.freshness_window,
            fingerprint: Fingerprint::of(&operation),
            operation,
            next,
        };
        tokio::spawn(exchange.serve(sender).instrument(self.span.clone()));
        receiver
    }
}

/// Per-operation state moved onto the serving task.
struct Exchange {
    store: Arc<dyn CacheStore>,
    window: Duration,
    fingerprint: Fingerprint,
    operation: Operation,
    next: Next,
}

impl Exchange {
    /// Resolves one intercepted query: hit short-circuit, or miss
    /// pass-through with population and a deferred revalidation.
    async fn serve(self, sender: mpsc::Sender<QueryResult>) {
        let cached = match self.store.get(self.fingerprint.key()).await {
            Ok(value) => value,
            Err(error) => {
                warn!(key = %self.fingerprint, %error, "cache read failed, falling back to the backend");
                None
            }
        };

        if let Some(raw) = cached.as_deref() {
            match serde_json::from_str::<QueryResult>(raw) {
                Ok(result) => {
                    debug!(key = %self.fingerprint, "cache hit");
                    let _ = sender.send(result).await;
                    return;
                }
                Err(error) => {
                    warn!(key = %self.fingerprint, %error, "cached payload is malformed, treating as a miss");
                }
            }
        }

        // Snapshot the marker before populating: the deferred check decides
        // against the pre-population state, never the one it just wrote.
        let marker = self.read_marker().await;

        let mut populated = false;
        if !self.next.is_terminal() {
            debug!(key = %self.fingerprint, "cache miss, forwarding");
            let mut results = self.next.clone().run(self.operation.clone());
            if let Some(result) = results.recv().await {
                populated = self.persist(&result).await;
                let _ = sender.send(result).await;
            }
        }

        // Complete the caller's stream before any revalidation work.
        drop(sender);

        tokio::spawn(self.revalidate(marker, populated).in_current_span());
    }

    /// Deferred freshness check. Runs after the serving turn yields; the
    /// emitted response is never delayed by it.
    ///
    /// A stale marker triggers one background pass-through even though the
    /// synchronous population has just refreshed the entry; an absent marker
    /// suppresses the refresh when that same population succeeded, since a
    /// first population is current by definition.
    async fn revalidate(self, marker: Option<FreshnessMarker>, populated: bool) {
        task::yield_now().await;

        if self.next.is_terminal() {
            debug!(key = %self.fingerprint, "no downstream link, skipping revalidation");
            return;
        }

        let due = match marker {
            Some(marker) => marker.is_stale(self.window, epoch_millis()),
            None => !populated,
        };
        if !due {
            debug!(key = %self.fingerprint, "entry is fresh, skipping revalidation");
            return;
        }

        debug!(key = %self.fingerprint, "revalidating in the background");
        let mut results = self.next.clone().run(self.operation.clone());
        while let Some(result) = results.recv().await {
            self.persist(&result).await;
        }
    }

    /// Reads the freshness marker; absent, unreadable, and failed reads all
    /// collapse to `None` (maximally stale).
    async fn read_marker(&self) -> Option<FreshnessMarker> {
        match self.store.get(&self.fingerprint.marker_key()).await {
            Ok(Some(raw)) => FreshnessMarker::parse(&raw),
            Ok(None) => None,
            Err(error) => {
                warn!(key = %self.fingerprint, %error, "freshness marker read failed");
                None
            }
        }
    }

    /// Persists an error-free result and stamps the freshness marker.
    ///
    /// Returns `true` when the response entry landed. Error-bearing results
    /// are never written; a failed response write also skips the marker, so
    /// the marker never claims a population that did not happen.
    async fn persist(&self, result: &QueryResult) -> bool {
        if result.has_errors() {
            debug!(key = %self.fingerprint, "result carries errors, not cached");
            return false;
        }
        let payload = match serde_json::to_string(result) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(key = %self.fingerprint, %error, "result serialization failed, not cached");
                return false;
            }
        };
        if let Err(error) = self.store.set(self.fingerprint.key(), &payload).await {
            warn!(key = %self.fingerprint, %error, "cache write failed");
            return false;
        }
        let marker = FreshnessMarker::now();
        if let Err(error) = self
            .store
            .set(&self.fingerprint.marker_key(), &marker.to_json())
            .await
        {
            warn!(key = %self.fingerprint, %error, "freshness marker write failed");
        }
        true
    }
}
