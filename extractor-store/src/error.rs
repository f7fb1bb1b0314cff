use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Create-new write hit an existing entry.
    #[error("working-state entry '{key}' already exists; the working directory is not clean")]
    AlreadyExists { key: String },

    /// Metadata a prior pass should have written is absent or empty.
    #[error("working-state entry '{key}' is missing or empty; run the '{pass}' pass first")]
    MissingPriorPass { key: String, pass: &'static str },

    #[error("working-state entry '{key}' is malformed: {message}")]
    Malformed { key: String, message: String },

    #[error("{0:#}")]
    Io(#[from] anyhow::Error),
}

impl StoreError {
    /// True for failures caused by invocation order or a dirty directory
    /// rather than by I/O.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyExists { .. } | StoreError::MissingPriorPass { .. }
        )
    }
}
