use thiserror::Error;

/// Transport-level error taxonomy.
///
/// Application-level errors embedded in a 2xx body (an `errorMessage`
/// field) are NOT represented here; callers inspect the decoded payload
/// for those, and the retry pipeline treats both kinds identically.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response; `detail` is the best-effort extracted message
    /// (JSON `detail`/`errorMessage`/`message` field, else the raw body).
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 2xx response whose body could not be decoded as the expected
    /// JSON shape; carries the raw response text.
    #[error("Failed to decode response: {detail}")]
    Decode { detail: String },
}

pub type Result<T> = std::result::Result<T, ApiError>;
