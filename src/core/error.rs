use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0} not found in PATH")]
    NotFound(String),
    #[error("adb command failed (exit code {code:?}): {stderr}")]
    ExecutionFailed { code: Option<i32>, stderr: String },
    #[error("adb timeout after {0}s")]
    TimedOut(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("adb pull failed: {0}")]
    PullFailed(String),
    #[error("could not stream staged file: {0}")]
    StreamingFailed(#[source] std::io::Error),
    #[error("could not create staging directory: {0}")]
    Staging(#[source] std::io::Error),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid resolve override {0:?}")]
    BadOverride(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ToolError>;
