use thiserror::Error;

/// Errors raised by the core write/read path.
///
/// HTTP-facing mapping lives in `dp1_api::AppError`; this type only carries
/// enough structure for that mapping to reconstruct the right error tag.
#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot update protected fields: {}", .0.join(", "))]
    ProtectedFields(Vec<String>),

    #[error("kv error: {0}")]
    Kv(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("url resolution failed: {0}")]
    UrlResolution(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    #[must_use]
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{resource} not found"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("invalid json: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
