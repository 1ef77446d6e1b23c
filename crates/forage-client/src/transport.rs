use std::time::Duration;

use forage_core::error::AppError;
use forage_core::fetch::{Reply, TransportError};
use forage_core::traits::Transport;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;

/// Single-attempt HTTP transport using reqwest.
///
/// Issues one GET per call with the descriptive header set, TLS certificate
/// verification enabled, and redirects followed (up to 10 hops). Retry
/// policy lives in [`FetchService`](forage_core::fetch::FetchService).
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    /// Headers attached per request when the client was supplied by the
    /// caller and may lack the descriptive set.
    request_headers: Option<HeaderMap>,
}

impl HttpTransport {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(default_headers())
            .redirect(Policy::limited(10))
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self {
            client,
            request_headers: None,
        })
    }

    /// Wrap a caller-supplied client, reusing its connection pool across
    /// calls. The descriptive header set is applied to every request so the
    /// outgoing shape matches [`new`](Self::new) even on a bare client; the
    /// caller keeps ownership of TLS and redirect configuration.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            request_headers: Some(default_headers()),
        }
    }
}

/// Descriptive headers sent with every request.
///
/// `Accept-Encoding: gzip, deflate` is contributed by the client's enabled
/// decompression features rather than set here, so response bodies are
/// decoded transparently.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (compatible; Forage/0.1)"),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Reply, TransportError> {
        let mut request = self.client.get(url).timeout(timeout);
        if let Some(headers) = &self.request_headers {
            request = request.headers(headers.clone());
        }
        let response = request.send().await.map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(Reply { status, body })
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
