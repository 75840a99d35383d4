use thiserror::Error;

/// Failures inside the logging pipeline.
///
/// These never leave a log call: the emitter turns them into diagnostic
/// output and returns normally.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("param {key} is not serializable: {reason}")]
    Unserializable { key: String, reason: String },
}

impl LogError {
    pub fn code(&self) -> &'static str {
        match self {
            LogError::Io(_) => "IO_ERROR",
            LogError::Json(_) => "JSON_ERROR",
            LogError::Format(_) => "FORMAT_ERROR",
            LogError::Unserializable { .. } => "UNSERIALIZABLE_PARAM",
        }
    }
}

pub type LogResult<T> = Result<T, LogError>;
