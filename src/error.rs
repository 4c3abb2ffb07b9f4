use thiserror::Error;

/// Failures while loading the configuration document. These end the run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found at {path}")]
    NotFound { path: String },

    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration {path} is not valid: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Rejected roster edits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("student ID cannot be empty")]
    EmptyId,

    #[error("student ID {0} already exists")]
    DuplicateId(String),

    #[error("student ID {0} not found")]
    NotFound(String),
}
