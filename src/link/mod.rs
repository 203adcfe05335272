//! Composable request links.
//!
//! A [`Chain`] is an ordered stack of [`Link`]s sharing one interception
//! signature: take an [`Operation`] and a [`Next`] cursor, return a
//! [`ResultStream`]. Each link may short-circuit (emit without calling
//! `next`), pass through (`next.run(operation)`), or do work on both sides
//! of the forward. Links can therefore be positioned before or after one
//! another transparently.
//!
//! Results flow back as a bounded mpsc stream: a link emits by sending into
//! the channel and completes the stream by dropping its sender. An exhausted
//! cursor (terminal position) completes immediately with no results.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::operation::{Operation, QueryResult};

/// Buffered results per in-flight stream; senders back-pressure beyond this.
pub(crate) const RESULT_BUFFER: usize = 8;

/// The stream of results an operation produces.
///
/// Receive until `recv` returns `None`; that is the completion signal.
pub type ResultStream = mpsc::Receiver<QueryResult>;

/// One handler in a chain.
///
/// `handle` returns its stream synchronously; any asynchronous work runs on
/// spawned tasks that feed the stream, so a link must be called from within
/// a Tokio runtime. Implementations are shared across tasks and must be
/// `Send + Sync`.
///
/// Plain functions and closures with the matching signature are links too:
///
/// ```
/// use swr_link::{Link, Next, Operation, QueryResult, ResultStream};
///
/// fn echo(operation: Operation, _next: Next) -> ResultStream {
///     let (sender, receiver) = tokio::sync::mpsc::channel(1);
///     tokio::spawn(async move {
///         let _ = sender
///             .send(QueryResult::ok(serde_json::json!({ "echo": operation.document() })))
///             .await;
///     });
///     receiver
/// }
///
/// let link: &dyn Link = &echo;
/// # let _ = link;
/// ```
pub trait Link: Send + Sync {
    /// Handles `operation`, optionally delegating to the rest of the chain.
    fn handle(&self, operation: Operation, next: Next) -> ResultStream;
}

impl<F> Link for F
where
    F: Fn(Operation, Next) -> ResultStream + Send + Sync,
{
    fn handle(&self, operation: Operation, next: Next) -> ResultStream {
        self(operation, next)
    }
}

/// A cursor into the remaining links of a chain.
///
/// Passed to every [`Link::handle`] call. [`run`](Self::run) consumes the
/// cursor, advances one position, and invokes the link there. Cloning the
/// cursor lets a link invoke its continuation more than once (the cache
/// link does, for background revalidation).
#[derive(Clone)]
pub struct Next {
    links: Arc<[Arc<dyn Link>]>,
    index: usize,
}

impl Next {
    /// A cursor with no remaining links.
    pub fn terminal() -> Self {
        Self {
            links: Vec::new().into(),
            index: 0,
        }
    }

    /// Returns `true` if no downstream link remains.
    pub fn is_terminal(&self) -> bool {
        self.index >= self.links.len()
    }

    /// Invokes the next link and returns its result stream.
    ///
    /// When the cursor is exhausted there is nothing to forward to: the
    /// returned stream completes immediately with no results.
    pub fn run(self, operation: Operation) -> ResultStream {
        let Some(link) = self.links.get(self.index).cloned() else {
            let (_sender, receiver) = mpsc::channel(1);
            return receiver;
        };
        let next = Self {
            links: self.links,
            index: self.index + 1,
        };
        link.handle(operation, next)
    }
}

/// An ordered, reusable stack of links.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use swr_link::{Chain, Link, Next, Operation, ResultStream};
///
/// # fn transport(_: Operation, _: Next) -> ResultStream { unimplemented!() }
/// let chain = Chain::new(vec![Arc::new(transport) as Arc<dyn Link>]);
/// let results = chain.execute(Operation::new("{ ping }"));
/// # let _ = results;
/// ```
pub struct Chain {
    links: Arc<[Arc<dyn Link>]>,
}

impl Chain {
    /// Builds a chain from links in interception order.
    pub fn new(links: Vec<Arc<dyn Link>>) -> Self {
        Self {
            links: links.into(),
        }
    }

    /// Runs `operation` through the chain from the first link.
    pub fn execute(&self, operation: Operation) -> ResultStream {
        let next = Next {
            links: Arc::clone(&self.links),
            index: 0,
        };
        next.run(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emitting(value: serde_json::Value) -> Arc<dyn Link> {
        Arc::new(move |_operation: Operation, _next: Next| {
            let (sender, receiver) = mpsc::channel(RESULT_BUFFER);
            let result = QueryResult::ok(value.clone());
            tokio::spawn(async move {
                let _ = sender.send(result).await;
            });
            receiver
        })
    }

    fn passthrough() -> Arc<dyn Link> {
        Arc::new(|operation: Operation, next: Next| next.run(operation))
    }

    async fn collect(mut stream: ResultStream) -> Vec<QueryResult> {
        let mut results = Vec::new();
        while let Some(result) = stream.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test]
    async fn chain_reaches_the_last_link() {
        let chain = Chain::new(vec![passthrough(), passthrough(), emitting(json!({"x": 1}))]);
        let results = collect(chain.execute(Operation::new("{ x }"))).await;
        assert_eq!(results, vec![QueryResult::ok(json!({"x": 1}))]);
    }

    #[tokio::test]
    async fn empty_chain_completes_without_results() {
        let chain = Chain::new(Vec::new());
        let results = collect(chain.execute(Operation::new("{ x }"))).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn exhausted_cursor_completes_without_results() {
        assert!(Next::terminal().is_terminal());
        let results = collect(Next::terminal().run(Operation::new("{ x }"))).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn terminal_cursor_reports_itself() {
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let probe = {
            let seen = Arc::clone(&seen);
            Arc::new(move |operation: Operation, next: Next| {
                seen.store(next.is_terminal(), std::sync::atomic::Ordering::SeqCst);
                next.run(operation)
            }) as Arc<dyn Link>
        };
        let chain = Chain::new(vec![probe]);
        let _ = collect(chain.execute(Operation::new("{ x }"))).await;
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn multiple_results_are_relayed_in_order() {
        let multi = Arc::new(|_operation: Operation, _next: Next| {
            let (sender, receiver) = mpsc::channel(RESULT_BUFFER);
            tokio::spawn(async move {
                for i in 0..3 {
                    let _ = sender.send(QueryResult::ok(json!({ "i": i }))).await;
                }
            });
            receiver
        }) as Arc<dyn Link>;
        let chain = Chain::new(vec![passthrough(), multi]);
        let results = collect(chain.execute(Operation::new("{ x }"))).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[2], QueryResult::ok(json!({"i": 2})));
    }
}
