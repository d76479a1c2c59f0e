use std::io;
use thiserror::Error;

/// Errors raised while compiling a pattern or generating a word
#[derive(Error, Debug)]
pub enum RegGenError {
    #[error("Lex error at position {position}: {reason}")]
    Lex { position: usize, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported feature at position {position}: {feature}")]
    UnsupportedFeature { position: usize, feature: String },

    #[error("Build error: {0}")]
    Build(String),

    #[error("Pattern is too complex: more than {0} states")]
    TooComplex(usize),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegGenError {
    pub(crate) fn lex(position: usize, reason: impl Into<String>) -> Self {
        RegGenError::Lex {
            position,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(position: usize, feature: impl Into<String>) -> Self {
        RegGenError::UnsupportedFeature {
            position,
            feature: feature.into(),
        }
    }
}

/// Result type for compilation and generation
pub type Result<T> = std::result::Result<T, RegGenError>;

/// Trait extension for Option<T> to convert to RegGenError
pub trait OptionExt<T> {
    fn ok_or_build_err<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_build_err<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| RegGenError::Build(f()))
    }
}
