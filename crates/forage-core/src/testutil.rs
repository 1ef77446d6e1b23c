//! Test utilities: mock implementations of the transport and reporter seams.
//!
//! Handwritten mocks for dependency injection in unit tests. All mocks use
//! `Arc<Mutex<_>>` for interior mutability, allowing test assertions on
//! recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fetch::{FetchEvent, FetchReporter, Reply, TransportError};
use crate::traits::Transport;

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Mock transport that plays back a scripted sequence of replies.
///
/// Each call pops the first element of the queue. When the queue is empty,
/// the configured fallback (default: HTTP 200 with a stub body) is returned.
/// The total number of calls is recorded for attempt-count assertions.
#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<Vec<Result<Reply, TransportError>>>>,
    fallback: Arc<Result<Reply, TransportError>>,
    calls: Arc<Mutex<u32>>,
}

impl MockTransport {
    pub fn with_replies(replies: Vec<Result<Reply, TransportError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies)),
            fallback: Arc::new(Ok(Reply {
                status: 200,
                body: "default".to_string(),
            })),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Transport that answers every call with the given status and an empty
    /// body, forever.
    pub fn always_status(status: u16) -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            fallback: Arc::new(Ok(Reply {
                status,
                body: String::new(),
            })),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Transport that fails every call with the given transport error.
    pub fn always_error(error: TransportError) -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            fallback: Arc::new(Err(error)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of attempts issued so far.
    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl Transport for MockTransport {
    async fn get(&self, _url: &str, _timeout: Duration) -> Result<Reply, TransportError> {
        *self.calls.lock().unwrap() += 1;
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            self.fallback.as_ref().clone()
        } else {
            replies.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records the debug rendering of every event it receives.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl FetchReporter for RecordingReporter {
    fn report(&self, event: FetchEvent<'_>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}
