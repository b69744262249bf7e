use crate::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum YamlError {
    #[error("{message}")]
    Validation { message: String },

    #[error("invalid YAML at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("tag not found at path: {path}{}", did_you_mean(.suggestion))]
    NotFound {
        path: String,
        suggestion: Option<String>,
    },

    #[error("{feature} is not implemented yet")]
    NotImplemented { feature: &'static str },

    #[error("node reference does not belong to this document")]
    StaleReference,
}

impl YamlError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        YamlError::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            YamlError::Validation { .. }
            | YamlError::NotImplemented { .. }
            | YamlError::StaleReference => ErrorKind::Validation,
            YamlError::Syntax { .. } => ErrorKind::Syntax,
            YamlError::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(path) => format!(" (did you mean '{path}'?)"),
        None => String::new(),
    }
}
