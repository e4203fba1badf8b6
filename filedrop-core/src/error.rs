use thiserror::Error;

/// Errors surfaced by filedrop operations.
///
/// The first four variants form the user-facing taxonomy; the rest are
/// ambient failures that always present as a server error.
#[derive(Error, Debug)]
pub enum FileDropError {
    #[error("payload exceeds maximum size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("size mismatch: hashed {hashed} bytes but stored {stored} bytes")]
    SizeMismatch { hashed: u64, stored: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FileDropError>;

impl FileDropError {
    /// HTTP status code this error presents as.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PayloadTooLarge { .. } => 413,
            Self::NotFound(_) => 404,
            Self::InvalidRequest(_) => 422,
            Self::StorageUnavailable(_)
            | Self::SizeMismatch { .. }
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Detail string safe to hand back to a client.
    ///
    /// Backend error text is never included; `action` names the failed
    /// operation for server-side failures (e.g. `"Upload file"`).
    pub fn public_detail(&self, action: &str) -> String {
        match self {
            Self::PayloadTooLarge { limit } => format!(
                "File size exceeds maximum limit of {}MB.",
                limit / (1024 * 1024)
            ),
            Self::NotFound(_) => "File not found".to_string(),
            Self::InvalidRequest(message) => message.clone(),
            _ => format!("{} failed due to unexpected error.", action),
        }
    }
}

impl From<rusqlite::Error> for FileDropError {
    fn from(error: rusqlite::Error) -> Self {
        Self::StorageUnavailable(format!("sqlite: {}", error))
    }
}

impl From<object_store::Error> for FileDropError {
    fn from(error: object_store::Error) -> Self {
        Self::StorageUnavailable(format!("object store: {}", error))
    }
}
