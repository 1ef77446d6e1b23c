pub mod error;
pub mod fetch;
pub mod schema;
pub mod testutil;
pub mod traits;
pub mod validate;

pub use error::AppError;
pub use fetch::{FailureKind, FetchOutcome, FetchRequest, FetchService};
pub use schema::RecordSchema;
pub use traits::Transport;
pub use validate::{RawRecord, ValidatedRecord, ValidationPipeline, validate_records};
