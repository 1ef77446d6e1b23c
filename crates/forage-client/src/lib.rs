pub mod fetcher;
pub mod transport;

pub use fetcher::{HttpFetcher, fetch_with_client};
pub use transport::HttpTransport;
