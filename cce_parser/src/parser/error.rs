//! Parse failures with stable reason codes

use crate::logging::{codes, Code};
use serde::Serialize;
use std::fmt;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseErrorReason {
    EmptyDocument,
    InvalidEncoding,
    Malformed,
    ForbiddenDtd,
    SizeExceeded,
    DepthExceeded,
    NodeLimitExceeded,
    UnexpectedRoot,
}

impl ParseErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyDocument => "empty-document",
            Self::InvalidEncoding => "invalid-encoding",
            Self::Malformed => "malformed",
            Self::ForbiddenDtd => "forbidden-dtd",
            Self::SizeExceeded => "size-exceeded",
            Self::DepthExceeded => "depth-exceeded",
            Self::NodeLimitExceeded => "node-limit-exceeded",
            Self::UnexpectedRoot => "unexpected-root",
        }
    }

    pub fn log_code(&self) -> Code {
        match self {
            Self::EmptyDocument => codes::parse::EMPTY_DOCUMENT,
            Self::InvalidEncoding => codes::parse::INVALID_ENCODING,
            Self::Malformed => codes::parse::MALFORMED_DOCUMENT,
            Self::ForbiddenDtd => codes::parse::FORBIDDEN_DTD,
            Self::SizeExceeded => codes::parse::SIZE_EXCEEDED,
            Self::DepthExceeded => codes::parse::DEPTH_EXCEEDED,
            Self::NodeLimitExceeded => codes::parse::NODE_LIMIT_EXCEEDED,
            Self::UnexpectedRoot => codes::parse::UNEXPECTED_ROOT,
        }
    }

    /// Reasons caused by resource caps rather than syntax
    pub fn is_resource_limit(&self) -> bool {
        matches!(
            self,
            Self::SizeExceeded | Self::DepthExceeded | Self::NodeLimitExceeded
        )
    }
}

impl fmt::Display for ParseErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error ({reason}): {detail}")]
pub struct ParseError {
    pub reason: ParseErrorReason,
    pub detail: String,
}

impl ParseError {
    pub fn new(reason: ParseErrorReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn empty_document() -> Self {
        Self::new(ParseErrorReason::EmptyDocument, "document contains no data")
    }

    pub fn size_exceeded(len: usize, limit: usize) -> Self {
        Self::new(
            ParseErrorReason::SizeExceeded,
            format!("document is {} bytes, limit is {}", len, limit),
        )
    }

    pub fn depth_exceeded(limit: usize) -> Self {
        Self::new(
            ParseErrorReason::DepthExceeded,
            format!("nesting deeper than {} levels", limit),
        )
    }

    pub fn node_limit_exceeded(limit: u32) -> Self {
        Self::new(
            ParseErrorReason::NodeLimitExceeded,
            format!("more than {} nodes", limit),
        )
    }

    pub fn forbidden_dtd() -> Self {
        Self::new(
            ParseErrorReason::ForbiddenDtd,
            "document type or entity declarations are not accepted",
        )
    }

    pub fn unexpected_root(found: &str, expected: &str) -> Self {
        Self::new(
            ParseErrorReason::UnexpectedRoot,
            format!("root element is '{}', expected '{}'", found, expected),
        )
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ParseErrorReason::Malformed, detail)
    }

    pub fn error_code(&self) -> Code {
        self.reason.log_code()
    }

    pub fn description(&self) -> &'static str {
        codes::get_description(self.error_code().as_str())
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_stable() {
        assert_eq!(ParseErrorReason::ForbiddenDtd.as_str(), "forbidden-dtd");
        assert_eq!(
            serde_json::to_string(&ParseErrorReason::NodeLimitExceeded).unwrap(),
            "\"node-limit-exceeded\""
        );
        assert_eq!(ParseErrorReason::DepthExceeded.log_code().as_str(), "E205");
    }

    #[test]
    fn test_display_includes_reason() {
        let err = ParseError::size_exceeded(20, 10);
        assert_eq!(
            err.to_string(),
            "parse error (size-exceeded): document is 20 bytes, limit is 10"
        );
        assert!(err.reason.is_resource_limit());
        assert!(!ParseError::forbidden_dtd().reason.is_resource_limit());
    }
}
