use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response whose body was not a valid API envelope.
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The exchange reported a failure; the message is the server's
    /// error string, verbatim.
    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Invalid API response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rejected before any network call was made.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The trade history loop hit its safety bound without the server
    /// ever returning a short or empty page.
    #[error("Pagination did not terminate after {pages} pages")]
    PaginationExhausted { pages: usize },
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}
