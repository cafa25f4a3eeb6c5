use thiserror::Error;

/// Failures that end a run. Each variant names the phase that failed;
/// row and chunk problems never surface here.
#[derive(Debug, Error)]
pub enum CollateError {
    #[error("input phase: cannot read {path}: {source:#}")]
    InputUnreadable {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("connect phase: {store} store unreachable: {source:#}")]
    StoreUnreachable {
        store: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("existing-record phase: catalogue lookup failed: {0:#}")]
    ExistingCheckFailed(#[source] anyhow::Error),

    #[error("configuration: {0}")]
    Config(String),
}

impl CollateError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CollateError::Config(_) => 2,
            _ => 1,
        }
    }
}
