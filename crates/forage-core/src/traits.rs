use std::future::Future;
use std::time::Duration;

use crate::fetch::{Reply, TransportError};

/// Issues a single HTTP GET attempt.
///
/// Implementations perform exactly one request per call. Retry policy and
/// failure classification live in [`FetchService`](crate::fetch::FetchService),
/// which is generic over this trait for dependency injection and testability
/// without real network calls.
pub trait Transport: Send + Sync + Clone {
    fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Reply, TransportError>> + Send;
}
