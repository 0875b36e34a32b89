use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Main library error type that encompasses all possible failure modes of a pass
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Malformed event stream: exit of <{tag}> with no open element")]
    UnbalancedExit { tag: String },

    #[error("Malformed event stream: expected exit of <{expected}>, found </{found}>")]
    MismatchedExit { expected: String, found: String },

    #[error("Malformed event stream: document ended with {open} unclosed element(s)")]
    UnclosedElements { open: usize },

    #[error("Unknown event kind: {kind}")]
    UnknownEvent { kind: String },

    #[error("DTD error: {path} - {details}")]
    Dtd { path: PathBuf, details: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ConfigError> for ShapeError {
    fn from(err: ConfigError) -> Self {
        ShapeError::Config(err.to_string())
    }
}

impl ShapeError {
    /// Wrap a reader error together with the byte offset it occurred at
    pub fn xml(position: u64, source: impl Into<quick_xml::Error>) -> Self {
        ShapeError::Xml {
            position,
            source: source.into(),
        }
    }

    /// Whether the error signals a malformed enter/exit stream
    pub fn is_malformed_stream(&self) -> bool {
        matches!(
            self,
            ShapeError::UnbalancedExit { .. }
                | ShapeError::MismatchedExit { .. }
                | ShapeError::UnclosedElements { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ShapeError>;
