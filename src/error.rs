//! Error taxonomy for deep-link dispatch.
//!
//! Every failure a caller of the dispatcher can observe is one of four
//! variants. All of them are per-request and recoverable.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

/// Reason a raw URI was rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    TooLong,
    InvalidScheme,
    UnknownAction,
    TooManyParams,
    MalformedEncoding,
    MalformedQuery,
}

#[derive(Debug, thiserror::Error)]
pub enum DeepLinkError {
    /// Malformed or out-of-range input. The caller can fix it and retry.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// Grammar violation, or the size/parameter limits were exceeded.
    #[error("{message}")]
    Parse {
        kind: ParseErrorKind,
        message: String,
        details: Value,
    },

    /// A downstream capability such as the payment gateway failed.
    #[error("{message}")]
    Handler { message: String, details: Value },

    /// Quota exhausted for the caller key.
    #[error("Rate limit exceeded, retry after {reset_at}")]
    RateLimit {
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
}

impl DeepLinkError {
    pub fn validation(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn parse(kind: ParseErrorKind, message: impl Into<String>, details: Value) -> Self {
        Self::Parse {
            kind,
            message: message.into(),
            details,
        }
    }

    pub fn handler(message: impl Into<String>, details: Value) -> Self {
        Self::Handler {
            message: message.into(),
            details,
        }
    }

    pub fn rate_limited(remaining: u32, reset_at: DateTime<Utc>) -> Self {
        Self::RateLimit {
            remaining,
            reset_at,
        }
    }

    /// Stable machine-readable code for this error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Parse { .. } => "parse_error",
            Self::Handler { .. } => "handler_error",
            Self::RateLimit { .. } => "rate_limit_exceeded",
        }
    }

    /// Structured details for logging or client display.
    pub fn details(&self) -> Value {
        match self {
            Self::Validation { details, .. }
            | Self::Parse { details, .. }
            | Self::Handler { details, .. } => details.clone(),
            Self::RateLimit {
                remaining,
                reset_at,
            } => json!({ "remaining": remaining, "reset_at": reset_at.to_rfc3339() }),
        }
    }

    /// Parser failure reason, if this is a parse error.
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Self::Parse { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for DeepLinkError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
        fields.sort_unstable();

        let reason = |field: &str| {
            field_errors
                .get(field)
                .and_then(|errs| errs.first())
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
        };

        let message = match fields.first() {
            None => "Invalid parameters".to_string(),
            Some(&"__all__") => reason("__all__").unwrap_or_else(|| "Invalid parameters".into()),
            Some(first) => match reason(first) {
                Some(reason) => format!("Invalid parameter {first}: {reason}"),
                None => format!("Invalid parameter: {first}"),
            },
        };

        Self::validation(message, json!({ "fields": fields }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(range(min = 1, max = 480))]
        duration: u32,
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            DeepLinkError::validation("x", json!({})).code(),
            "validation_error"
        );
        assert_eq!(
            DeepLinkError::parse(ParseErrorKind::TooLong, "x", json!({})).code(),
            "parse_error"
        );
        assert_eq!(
            DeepLinkError::handler("x", json!({})).code(),
            "handler_error"
        );
        assert_eq!(
            DeepLinkError::rate_limited(0, Utc::now()).code(),
            "rate_limit_exceeded"
        );
    }

    #[test]
    fn test_display_uses_message() {
        let err = DeepLinkError::validation("Invalid parameter: duration", json!({}));
        assert_eq!(err.to_string(), "Invalid parameter: duration");
    }

    #[test]
    fn test_rate_limit_details_carry_backoff() {
        let reset = Utc::now();
        let details = DeepLinkError::rate_limited(2, reset).details();
        assert_eq!(details["remaining"], 2);
        assert_eq!(details["reset_at"], reset.to_rfc3339());
    }

    #[test]
    fn test_from_validation_errors_lists_fields() {
        let err: DeepLinkError = Probe { duration: 500 }.validate().unwrap_err().into();

        assert!(matches!(err, DeepLinkError::Validation { .. }));
        assert!(err.to_string().contains("duration"));
        assert_eq!(err.details()["fields"][0], "duration");
    }

    #[test]
    fn test_parse_kind_only_for_parse_errors() {
        let err = DeepLinkError::parse(ParseErrorKind::UnknownAction, "x", json!({}));
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnknownAction));
        assert_eq!(DeepLinkError::handler("x", json!({})).parse_kind(), None);
    }
}
