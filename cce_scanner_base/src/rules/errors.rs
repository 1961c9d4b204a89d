//! Error types for the rule registry and rule evaluators

use cce_parser::logging::{codes, Code};

/// Registration and lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid rule id '{id}': {reason}")]
    InvalidRuleId { id: String, reason: String },

    #[error("Duplicate rule registration: {id}")]
    DuplicateRule { id: String },

    #[error("Unknown rule: {id}")]
    UnknownRule { id: String },

    #[error("Rule '{id}' has an empty title")]
    EmptyTitle { id: String },
}

impl RegistryError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::InvalidRuleId { .. } | Self::EmptyTitle { .. } => codes::rules::INVALID_RULE_ID,
            Self::DuplicateRule { .. } => codes::rules::DUPLICATE_RULE,
            Self::UnknownRule { .. } => codes::rules::INVALID_RULE_ID,
        }
    }
}

/// Why an evaluator could not reach a verdict. Always converted to a
/// `NotReviewed` verdict by the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleFault {
    #[error("unexpected value at '{path}': {detail}")]
    UnexpectedShape { path: String, detail: String },

    #[error("rule parameters invalid: {reason}")]
    InvalidParameters { reason: String },

    #[error("evaluator panicked: {message}")]
    Panicked { message: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl RuleFault {
    pub fn unexpected_shape(path: &str, detail: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            path: path.to_string(),
            detail: detail.into(),
        }
    }

    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::Panicked { .. } => codes::rules::RULE_PANIC,
            _ => codes::rules::RULE_FAULT,
        }
    }
}
