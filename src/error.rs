//! Error types for template parsing and configuration.
//!
//! Three kinds are distinguished: configuration errors (caller misused a
//! fixed parser/mode combination), template input errors (the lexer or the
//! underlying resource failed), and contract violations (caller bugs caught
//! before the lexer is touched). A parse produces at most one terminal
//! failure; there is no partial-result mode.

use std::fmt;

use thiserror::Error;

/// A failure while reading or lexing template input.
///
/// Carries the resource name and, when the lexer supplied them, the
/// 1-based line/col of the offending position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    /// Name of the resource being parsed, for diagnostics
    pub template: String,
    /// 1-based line, when known
    pub line: Option<u32>,
    /// 1-based column, when known
    pub col: Option<u32>,
    /// Human-readable description of the failure
    pub message: String,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template input error in \"{}\"", self.template)?;
        if let (Some(line), Some(col)) = (self.line, self.col) {
            write!(f, " (line {line}, col {col})")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for InputError {}

/// Terminal failure of a parse call or a configuration operation.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Parser/mode combination is internally inconsistent, or an immutable
    /// configuration object was misused. Always fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The underlying lexer or resource read failed.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Caller bug (bad slice bounds, empty selector, matcher with no
    /// constraints). Fails fast before touching the lexer.
    #[error("contract violation: {0}")]
    Contract(String),
}

impl TemplateError {
    /// Get the failure position, when the input error carried one.
    pub fn position(&self) -> Option<(u32, u32)> {
        match self {
            TemplateError::Input(e) => e.line.zip(e.col),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate. The error type defaults to
/// [`TemplateError`] but stays overridable, so importing the alias does
/// not conflict with signatures using other error types.
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display_with_position() {
        let err = InputError {
            template: "home.html".to_string(),
            line: Some(3),
            col: Some(14),
            message: "unclosed comment".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "template input error in \"home.html\" (line 3, col 14): unclosed comment"
        );
    }

    #[test]
    fn test_input_error_display_without_position() {
        let err = InputError {
            template: "home.html".to_string(),
            line: None,
            col: None,
            message: "read failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "template input error in \"home.html\": read failed"
        );
    }

    #[test]
    fn test_result_alias_default_and_override() {
        fn defaulted() -> Result<u32> {
            Err(TemplateError::Contract("x".to_string()))
        }
        fn overridden() -> Result<u32, crate::lexer::ParseError> {
            Ok(7)
        }
        assert!(defaulted().is_err());
        assert_eq!(overridden(), Ok(7));
    }

    #[test]
    fn test_position_accessor() {
        let err = TemplateError::Input(InputError {
            template: "t".to_string(),
            line: Some(1),
            col: Some(2),
            message: "x".to_string(),
        });
        assert_eq!(err.position(), Some((1, 2)));
        assert_eq!(TemplateError::Configuration("x".to_string()).position(), None);
    }
}
