//! Sanitizers for untrusted deep-link fields.
//!
//! One function per field class. Each either returns a cleaned value or a
//! [`DeepLinkError::Validation`]. None of them perform I/O.

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::LazyLock;
use url::Url;

use crate::domain::entities::deep_link::SCHEME;
use crate::error::DeepLinkError;

/// Markup-like sequences such as `<script>` or `</b>`.
static MARKUP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

pub const MAX_ID_LENGTH: usize = 64;
pub const MAX_TEXT_LENGTH: usize = 280;
pub const MAX_SERVICE_NAME_LENGTH: usize = 80;

/// Cleans an identifier (shop, barber, user, promo code...).
///
/// Every character outside `[A-Za-z0-9_-]` is removed.
///
/// # Errors
///
/// Returns [`DeepLinkError::Validation`] if nothing survives or the result is
/// longer than [`MAX_ID_LENGTH`].
///
/// # Examples
///
/// ```ignore
/// assert_eq!(id("shop_123<script>").unwrap(), "shop_123script");
/// ```
pub fn id(input: &str) -> Result<String, DeepLinkError> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return Err(DeepLinkError::validation(
            "Identifier is empty after sanitization",
            json!({ "input_length": input.len() }),
        ));
    }

    if cleaned.len() > MAX_ID_LENGTH {
        return Err(DeepLinkError::validation(
            format!("Identifier must be at most {MAX_ID_LENGTH} characters"),
            json!({ "length": cleaned.len() }),
        ));
    }

    Ok(cleaned)
}

/// Parses a monetary amount as a decimal.
///
/// Surrounding whitespace is ignored. The value is normalized, so `45.00`
/// becomes `45`.
///
/// # Errors
///
/// Returns [`DeepLinkError::Validation`] for anything that is not a finite,
/// non-negative decimal (`NaN`, `inf`, `-5`, `1,000`...).
pub fn amount(input: &str) -> Result<Decimal, DeepLinkError> {
    let trimmed = input.trim();

    let value = Decimal::from_str(trimmed).map_err(|_| {
        DeepLinkError::validation("Amount is not a valid decimal", json!({ "amount": trimmed }))
    })?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(DeepLinkError::validation(
            "Amount must not be negative",
            json!({ "amount": trimmed }),
        ));
    }

    Ok(value.normalize())
}

/// Cleans free text such as descriptions and notes.
///
/// Markup-like `<...>` sequences are removed, then any stray angle brackets
/// and control characters. The result is trimmed and capped at
/// [`MAX_TEXT_LENGTH`] characters.
pub fn text(input: &str) -> String {
    let without_markup = MARKUP_REGEX.replace_all(input, "");

    let cleaned: String = without_markup
        .chars()
        .filter(|c| *c != '<' && *c != '>' && !c.is_control())
        .collect();

    cleaned.trim().chars().take(MAX_TEXT_LENGTH).collect()
}

/// Re-validates a raw deep-link URI.
///
/// # Errors
///
/// Returns [`DeepLinkError::Validation`] if the URI contains control
/// characters, does not use the `freshcuts` scheme, or is not a well-formed URL.
pub fn uri(input: &str) -> Result<String, DeepLinkError> {
    let trimmed = input.trim();

    if let Some(position) = trimmed.find(|c: char| c.is_control()) {
        return Err(DeepLinkError::validation(
            "URI contains control characters",
            json!({ "position": position }),
        ));
    }

    let prefix = format!("{SCHEME}://");
    if !trimmed.starts_with(&prefix) {
        return Err(DeepLinkError::validation(
            "URI must use the freshcuts:// scheme",
            json!({ "expected_scheme": SCHEME }),
        ));
    }

    Url::parse(trimmed).map_err(|e| {
        DeepLinkError::validation("URI is not well-formed", json!({ "reason": e.to_string() }))
    })?;

    Ok(trimmed.to_string())
}

/// Cleans a human-readable service name, e.g. `Fade & Beard`.
///
/// Letters, digits, spaces, `-`, `&` and `'` are kept. Runs of whitespace collapse
/// to a single space.
///
/// # Errors
///
/// Returns [`DeepLinkError::Validation`] if the result is empty or longer than
/// [`MAX_SERVICE_NAME_LENGTH`] characters.
pub fn service_name(input: &str) -> Result<String, DeepLinkError> {
    let kept: String = input
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '&' | '\''))
        .collect();
    let cleaned = kept.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() {
        return Err(DeepLinkError::validation(
            "Service name is empty after sanitization",
            json!({}),
        ));
    }

    let length = cleaned.chars().count();
    if length > MAX_SERVICE_NAME_LENGTH {
        return Err(DeepLinkError::validation(
            format!("Service name must be at most {MAX_SERVICE_NAME_LENGTH} characters"),
            json!({ "length": length }),
        ));
    }

    Ok(cleaned)
}
