use chumsky::error::SimpleReason;
use thiserror::Error;

use crate::prelude::*;

/// A malformed line. `span` is a char range into the line that was parsed.
#[derive(Error, PartialEq, Eq, Clone, Debug)]
#[error("{message} at {}..{}", .span.start, .span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// The offending token, `None` when the input ended early.
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            found: None,
        }
    }
}

impl From<Error<String>> for ParseError {
    fn from(e: Error<String>) -> Self {
        let found = e.found().cloned();
        let message = match e.reason() {
            SimpleReason::Unexpected => {
                let what = found.as_deref().unwrap_or("end of input");
                let mut expected = e
                    .expected()
                    .map(|t| t.as_deref().unwrap_or("end of input"))
                    .collect::<Vec<_>>();
                expected.sort_unstable();
                expected.dedup();
                if expected.is_empty() {
                    format!("unexpected {what}")
                } else {
                    format!("unexpected {what}, expected {}", expected.join(", "))
                }
            }
            SimpleReason::Unclosed { delimiter, .. } => format!("unclosed delimiter {delimiter}"),
            SimpleReason::Custom(msg) => msg.clone(),
        };
        Self {
            message,
            span: e.span(),
            found,
        }
    }
}

#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no normal form within {limit} steps, stopped at {partial}")]
    StepLimitExceeded { partial: String, limit: usize },
}

#[cfg(test)]
mod test {
    use chumsky::error::Error as _;

    use super::*;

    #[test]
    fn test_unexpected_message_is_sorted() {
        let e = Error::expected_input_found(
            3..4,
            vec![Some(")".to_string()), None, Some("(".to_string())],
            Some(":".to_string()),
        );
        let e = ParseError::from(e);
        assert_eq!(e.message, "unexpected :, expected (, ), end of input");
        assert_eq!(e.span, 3..4);
        assert_eq!(e.found.as_deref(), Some(":"));
    }

    #[test]
    fn test_custom_message() {
        let e = ParseError::from(Error::custom(0..5, "abstraction is missing a body"));
        assert_eq!(e.message, "abstraction is missing a body");
        assert_eq!(e.found, None);
        assert_eq!(e.to_string(), "abstraction is missing a body at 0..5");
    }
}
