use std::time::Duration;

use forage_core::error::AppError;
use forage_core::fetch::{FetchOutcome, FetchRequest, FetchService, backoff_delay};
use forage_core::traits::Transport;

use crate::transport::HttpTransport;

/// HTTP fetcher with bounded retries and exponential backoff.
///
/// Cheap to clone; each [`fetch`](Self::fetch) call owns its own attempt
/// counter, so one fetcher may serve many tasks concurrently.
#[derive(Clone)]
pub struct HttpFetcher {
    service: FetchService<HttpTransport>,
}

impl HttpFetcher {
    /// Building the underlying client is the only fallible step.
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            service: FetchService::new(HttpTransport::new()?),
        })
    }

    /// Full-fidelity entry point: returns the classified outcome, never an
    /// error.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        self.service.fetch(request).await
    }

    /// Fetch with the default budget (3 attempts, 10 s timeout, 0.3 backoff
    /// factor), collapsing any failure to `None`. Callers that need the
    /// failure reason use [`fetch`](Self::fetch).
    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        self.fetch(&FetchRequest::new(url)).await.into_content()
    }
}

const SESSION_BACKOFF_FACTOR: f64 = 0.3;

/// Fetch through a caller-supplied [`reqwest::Client`], reusing its
/// connection pool across many calls.
///
/// Unlike [`HttpFetcher::fetch`], every failure on this path is retried up
/// to `max_attempts` — including 4xx responses, which the primary path
/// aborts on immediately. That asymmetry is deliberate; callers that need
/// client/server error distinction must use [`HttpFetcher`]. The handle is
/// safe for sequential reuse by one logical caller; concurrent callers need
/// separate clients or external synchronization.
pub async fn fetch_with_client(
    client: &reqwest::Client,
    url: &str,
    max_attempts: u32,
    timeout: Duration,
) -> Option<String> {
    let transport = HttpTransport::from_client(client.clone());
    let max_attempts = max_attempts.max(1);

    for attempt in 0..max_attempts {
        match transport.get(url, timeout).await {
            Ok(reply) if (200..300).contains(&reply.status) => return Some(reply.body),
            Ok(reply) => {
                tracing::warn!(%url, status = reply.status, attempt = attempt + 1, "Attempt failed");
            }
            Err(error) => {
                tracing::warn!(%url, ?error, attempt = attempt + 1, "Attempt failed");
            }
        }
        if attempt + 1 < max_attempts {
            tokio::time::sleep(backoff_delay(SESSION_BACKOFF_FACTOR, attempt)).await;
        }
    }

    tracing::error!(%url, max_attempts, "All attempts failed");
    None
}
