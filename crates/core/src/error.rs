use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("input {path:?} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("input {path:?} line {line}: {fields} fields but only {columns} columns")]
    RaggedRow {
        path: PathBuf,
        line: u64,
        fields: usize,
        columns: usize,
    },
    #[error("corrupt cache {path:?}: {reason}")]
    CorruptCache { path: PathBuf, reason: String },
    #[error("llm client error: {0}")]
    Llm(#[from] feedback_llm::LlmError),
    #[error("worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, InsightError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote rejected request (status {status}): {body}")]
    RemoteRejected { status: u16, body: String },
    #[error("unparseable insight reply: {0}")]
    Parse(String),
}

impl From<feedback_llm::LlmError> for FetchError {
    fn from(value: feedback_llm::LlmError) -> Self {
        use feedback_llm::LlmError;
        match value {
            LlmError::Rejected { status, body } => FetchError::RemoteRejected { status, body },
            LlmError::Decode(reason) => FetchError::Parse(reason),
            LlmError::Transport(err) => FetchError::Transport(err.to_string()),
            LlmError::MissingApiKey(var) => FetchError::Transport(format!("{var} is not set")),
        }
    }
}
