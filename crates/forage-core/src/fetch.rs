//! Resilient fetch protocol: bounded retries with exponential backoff.
//!
//! A fetch is a loop of single-attempt GETs issued through a [`Transport`].
//! Each failed attempt is classified by retryability: timeouts, connection
//! failures, and 5xx responses are worth retrying; 4xx responses and
//! malformed-transport errors are not, and abort immediately.
//!
//! The delay before retrying the attempt at zero-based index `n` is
//! `backoff_factor * 2^n` seconds, so a factor of `0.3` waits 0.3 s, 0.6 s,
//! 1.2 s, ... and a factor of `0` retries without delay.

use std::time::Duration;

use crate::traits::Transport;

/// Parameters for one logical fetch. Immutable for the duration of the call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff_factor: f64,
}

impl FetchRequest {
    /// Create a request with the default budget: 3 attempts, 10 s timeout,
    /// 0.3 backoff factor.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_attempts: 3,
            timeout: Duration::from_secs(10),
            backoff_factor: 0.3,
        }
    }

    /// Set the attempt budget. Values below 1 are clamped to 1.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the backoff multiplier. Negative values are clamped to 0.
    pub fn backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor.max(0.0);
        self
    }
}

/// Terminal value of a fetch. Every code path converges here; the engine
/// never returns an error to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { content: String, status: u16 },
    Failure { kind: FailureKind, attempts: u32 },
}

impl FetchOutcome {
    /// Collapse to the fetched text, discarding failure detail.
    pub fn into_content(self) -> Option<String> {
        match self {
            FetchOutcome::Success { content, .. } => Some(content),
            FetchOutcome::Failure { .. } => None,
        }
    }
}

/// Classification of a failed attempt. Retryability is fixed per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response within the request timeout.
    Timeout,
    /// DNS failure, connection refused, or connection reset.
    ConnectionFailed,
    /// HTTP 400-499. The request is presumed fundamentally wrong, so
    /// retrying cannot help.
    ClientError(u16),
    /// HTTP 500-599.
    ServerError(u16),
    /// Any transport-level error not covered above (bad URL, redirect loop,
    /// body decode failure, residual status class).
    OtherTransport,
}

impl FailureKind {
    /// Returns true if re-issuing the same request stands a reasonable
    /// chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::ConnectionFailed | FailureKind::ServerError(_)
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ConnectionFailed => write!(f, "connection failed"),
            FailureKind::ClientError(status) => write!(f, "client error (HTTP {status})"),
            FailureKind::ServerError(status) => write!(f, "server error (HTTP {status})"),
            FailureKind::OtherTransport => write!(f, "transport error"),
        }
    }
}

/// Raw result of one successful round-trip through a [`Transport`], before
/// status classification.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

/// A single attempt that never produced an HTTP status line.
#[derive(Debug, Clone)]
pub enum TransportError {
    Timeout,
    Connect(String),
    Other(String),
}

/// Delay before retrying the zero-based attempt index that just failed.
///
/// Negative factors (possible when the request struct is built literally
/// instead of through the builder) are clamped to zero; overflow saturates.
pub fn backoff_delay(backoff_factor: f64, attempt: u32) -> Duration {
    let secs = backoff_factor.max(0.0) * 2f64.powi(attempt as i32);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Events emitted by the fetch engine for monitoring/logging.
#[derive(Debug, Clone)]
pub enum FetchEvent<'a> {
    AttemptStarted {
        url: &'a str,
        attempt: u32,
        max_attempts: u32,
    },
    Succeeded {
        url: &'a str,
        status: u16,
        attempts: u32,
    },
    RetryScheduled {
        url: &'a str,
        kind: FailureKind,
        detail: &'a str,
        attempt: u32,
        delay: Duration,
    },
    Failed {
        url: &'a str,
        kind: FailureKind,
        detail: &'a str,
        attempts: u32,
    },
}

/// Trait for receiving fetch events (decoupled logging).
///
/// Injected at construction; the engine performs no process-wide logging
/// configuration of its own.
pub trait FetchReporter: Send + Sync {
    fn report(&self, event: FetchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFetchReporter;

impl FetchReporter for TracingFetchReporter {
    fn report(&self, event: FetchEvent<'_>) {
        match event {
            FetchEvent::AttemptStarted {
                url,
                attempt,
                max_attempts,
            } => {
                tracing::info!(%url, attempt, max_attempts, "Fetching");
            }
            FetchEvent::Succeeded {
                url,
                status,
                attempts,
            } => {
                tracing::info!(%url, status, attempts, "Fetch succeeded");
            }
            FetchEvent::RetryScheduled {
                url,
                kind,
                detail,
                attempt,
                delay,
            } => {
                tracing::warn!(%url, %kind, detail, attempt, ?delay, "Attempt failed, retrying");
            }
            FetchEvent::Failed {
                url,
                kind,
                detail,
                attempts,
            } => {
                tracing::error!(%url, %kind, detail, attempts, "Fetch failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Retry engine driving a [`Transport`] under a [`FetchRequest`] budget.
///
/// Each call to [`fetch`](Self::fetch) owns its attempt counter; the service
/// holds no mutable state and may be cloned freely across tasks.
#[derive(Clone)]
pub struct FetchService<T: Transport, R: FetchReporter = TracingFetchReporter> {
    transport: T,
    reporter: R,
}

impl<T: Transport> FetchService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reporter: TracingFetchReporter,
        }
    }
}

impl<T: Transport, R: FetchReporter> FetchService<T, R> {
    pub fn with_reporter(transport: T, reporter: R) -> Self {
        Self { transport, reporter }
    }

    /// Fetch the content at `request.url`, retrying retryable failures up to
    /// the attempt budget.
    ///
    /// A 2xx response returns [`FetchOutcome::Success`] immediately. A 4xx
    /// response or a non-HTTP transport error aborts immediately with no
    /// retry. Timeouts, connection failures, and 5xx responses are retried
    /// after an exponential backoff delay until the budget is exhausted.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let max_attempts = request.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            self.reporter.report(FetchEvent::AttemptStarted {
                url: &request.url,
                attempt: attempt + 1,
                max_attempts,
            });

            let (kind, detail) = match self.transport.get(&request.url, request.timeout).await {
                Ok(reply) if (200..300).contains(&reply.status) => {
                    self.reporter.report(FetchEvent::Succeeded {
                        url: &request.url,
                        status: reply.status,
                        attempts: attempt + 1,
                    });
                    return FetchOutcome::Success {
                        content: reply.body,
                        status: reply.status,
                    };
                }
                Ok(reply) => (classify_status(reply.status), format!("HTTP {}", reply.status)),
                Err(TransportError::Timeout) => (
                    FailureKind::Timeout,
                    format!("no response within {:?}", request.timeout),
                ),
                Err(TransportError::Connect(msg)) => (FailureKind::ConnectionFailed, msg),
                Err(TransportError::Other(msg)) => (FailureKind::OtherTransport, msg),
            };

            let attempts_made = attempt + 1;
            if kind.is_retryable() && attempts_made < max_attempts {
                let delay = backoff_delay(request.backoff_factor, attempt);
                self.reporter.report(FetchEvent::RetryScheduled {
                    url: &request.url,
                    kind,
                    detail: &detail,
                    attempt: attempts_made,
                    delay,
                });
                tokio::time::sleep(delay).await;
                attempt = attempts_made;
            } else {
                self.reporter.report(FetchEvent::Failed {
                    url: &request.url,
                    kind,
                    detail: &detail,
                    attempts: attempts_made,
                });
                return FetchOutcome::Failure {
                    kind,
                    attempts: attempts_made,
                };
            }
        }
    }
}

/// Map a non-2xx status to its failure classification.
///
/// Residual classes (1xx, stray 3xx after redirect following) are treated as
/// malformed transport, which is terminal.
fn classify_status(status: u16) -> FailureKind {
    match status {
        400..=499 => FailureKind::ClientError(status),
        500..=599 => FailureKind::ServerError(status),
        _ => FailureKind::OtherTransport,
    }
}
