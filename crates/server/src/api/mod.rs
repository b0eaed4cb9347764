mod entries;
mod handlers;
mod jobs;
mod routes;

pub use routes::create_router;

use serde::Serialize;

/// Error body returned by every failing API endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
