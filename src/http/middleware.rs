//! Error Middleware
//!
//! Ordered chain of classifiers turning a raw [`RequestFailure`] into a typed
//! [`MinimaxError`]. Each classifier either answers directly or hands the
//! failure to the rest of the chain through [`Next`]; the built-in default
//! classifier always terminates the chain.

use std::sync::Arc;
use tracing::trace;

use crate::core::RequestFailure;
use crate::error::{extract_row_version, mentions_concurrency, response_message, MinimaxError};

/// Error classifier.
pub trait ErrorMiddleware: Send + Sync {
    /// Classify `failure`, or delegate with `next.run(failure)`.
    fn handle(&self, failure: RequestFailure, next: Next<'_>) -> MinimaxError;

    /// Name used to locate the classifier in a chain.
    fn name(&self) -> &str;
}

/// Remaining classifiers of a chain.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn ErrorMiddleware>],
}

impl<'a> Next<'a> {
    /// Continue with the next classifier, or the default one when none is left.
    pub fn run(self, failure: RequestFailure) -> MinimaxError {
        match self.remaining.split_first() {
            Some((current, rest)) => {
                trace!(middleware = current.name(), "Classifying request failure");
                current.handle(failure, Next { remaining: rest })
            }
            None => classify_default(failure),
        }
    }
}

/// Built-in terminal classifier.
///
/// Typed errors pass through unchanged, so classifying twice is a no-op.
pub fn classify_default(failure: RequestFailure) -> MinimaxError {
    match failure {
        RequestFailure::Typed(error) => error,
        RequestFailure::Response(response) => {
            MinimaxError::from_response(response.status, response.retry_after(), &response.body)
        }
        RequestFailure::NoResponse {
            message,
            timed_out: true,
        } => MinimaxError::timeout(message),
        RequestFailure::NoResponse {
            message,
            timed_out: false,
        } => MinimaxError::network(message),
        RequestFailure::Other { message } => MinimaxError::api(message),
    }
}

/// Recognizes optimistic concurrency conflicts.
///
/// Matches status 409 or any failure whose message mentions concurrency or a
/// RowVersion. The server's current RowVersion is extracted from the message
/// when it can be; the kind does not depend on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConcurrencyClassifier;

impl ConcurrencyClassifier {
    pub const NAME: &'static str = "concurrency";
}

impl ErrorMiddleware for ConcurrencyClassifier {
    fn handle(&self, failure: RequestFailure, next: Next<'_>) -> MinimaxError {
        match &failure {
            RequestFailure::Response(response) => {
                let message = response_message(response.status, &response.body);
                if response.status == 409 || mentions_concurrency(&message) {
                    let current = extract_row_version(&message)
                        .or_else(|| extract_row_version(&response.body));
                    return MinimaxError::concurrency(message, current)
                        .with_status(response.status);
                }
            }
            RequestFailure::Other { message } if mentions_concurrency(message) => {
                return MinimaxError::concurrency(message.clone(), extract_row_version(message));
            }
            _ => {}
        }
        next.run(failure)
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

/// Ordered, mutable list of classifiers.
#[derive(Clone)]
pub struct ErrorMiddlewareChain {
    middlewares: Vec<Arc<dyn ErrorMiddleware>>,
}

impl Default for ErrorMiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorMiddlewareChain {
    /// Chain with the built-in [`ConcurrencyClassifier`] installed first.
    pub fn new() -> Self {
        Self {
            middlewares: vec![Arc::new(ConcurrencyClassifier)],
        }
    }

    /// Chain with only the default classifier.
    pub fn empty() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Append a classifier; it runs after those already registered.
    pub fn push(&mut self, middleware: Arc<dyn ErrorMiddleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Insert a classifier at `index` (clamped to the chain length).
    pub fn insert(&mut self, index: usize, middleware: Arc<dyn ErrorMiddleware>) -> &mut Self {
        let index = index.min(self.middlewares.len());
        self.middlewares.insert(index, middleware);
        self
    }

    /// Remove every classifier with the given name. Returns whether any was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.middlewares.len();
        self.middlewares.retain(|m| m.name() != name);
        self.middlewares.len() != before
    }

    pub fn clear(&mut self) {
        self.middlewares.clear();
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.middlewares.iter().map(|m| m.name().to_string()).collect()
    }

    /// Run the chain.
    pub fn classify(&self, failure: RequestFailure) -> MinimaxError {
        Next {
            remaining: &self.middlewares,
        }
        .run(failure)
    }
}
