//! Parser for `freshcuts://<action>?<key>=<value>&...` URIs.
//!
//! The grammar is deliberately small: no userinfo, port, path segments or
//! fragments. Keys and values are percent-decoded independently, `+` decodes
//! to a space, and the last occurrence of a duplicate key wins.

use serde_json::json;

use crate::domain::entities::{DeepLink, LinkAction, LinkParams, SCHEME, UnknownAction};
use crate::error::{DeepLinkError, ParseErrorKind};

/// Longest accepted URI, in characters.
pub const MAX_URL_LENGTH: usize = 2048;

/// Most query pairs a single link may carry.
pub const MAX_QUERY_PARAMS: usize = 50;

/// Rejects input longer than [`MAX_URL_LENGTH`] characters.
///
/// Runs before any other inspection of the input, so oversized strings never
/// reach sanitization or decoding.
///
/// # Errors
///
/// Returns [`DeepLinkError::Parse`] with [`ParseErrorKind::TooLong`].
pub fn ensure_length(raw: &str) -> Result<(), DeepLinkError> {
    // byte length bounds the char count from above, skip counting for short input
    if raw.len() <= MAX_URL_LENGTH {
        return Ok(());
    }

    let length = raw.chars().count();
    if length > MAX_URL_LENGTH {
        return Err(DeepLinkError::parse(
            ParseErrorKind::TooLong,
            format!("URL exceeds maximum length of {MAX_URL_LENGTH} characters"),
            json!({ "length": length, "max_length": MAX_URL_LENGTH }),
        ));
    }

    Ok(())
}

/// Parses a raw URI into a [`DeepLink`].
///
/// # Errors
///
/// Returns [`DeepLinkError::Parse`] when the input is too long, the scheme is
/// not exactly `freshcuts`, the action is unknown, there are more than
/// [`MAX_QUERY_PARAMS`] pairs, a pair has an empty key, or percent-encoding
/// is malformed.
///
/// # Examples
///
/// ```ignore
/// let link = parse("freshcuts://shop?shop=a&shop=b")?;
/// assert_eq!(link.param("shop"), Some("b"));
/// ```
pub fn parse(raw: &str) -> Result<DeepLink, DeepLinkError> {
    ensure_length(raw)?;

    let (scheme, rest) = raw.split_once("://").ok_or_else(|| invalid_scheme(raw))?;
    if scheme != SCHEME {
        return Err(invalid_scheme(scheme));
    }

    let (action_segment, query) = match rest.split_once('?') {
        Some((action, query)) => (action, Some(query)),
        None => (rest, None),
    };

    let action_segment = action_segment.strip_suffix('/').unwrap_or(action_segment);
    let action: LinkAction = action_segment.parse().map_err(|e: UnknownAction| {
        DeepLinkError::parse(
            ParseErrorKind::UnknownAction,
            e.to_string(),
            json!({ "action": action_segment }),
        )
    })?;

    let params = match query {
        Some(query) => parse_query(query)?,
        None => LinkParams::new(),
    };

    Ok(DeepLink::new(action, params, raw.to_string()))
}

fn parse_query(query: &str) -> Result<LinkParams, DeepLinkError> {
    let pairs: Vec<&str> = query.split('&').filter(|pair| !pair.is_empty()).collect();

    if pairs.len() > MAX_QUERY_PARAMS {
        return Err(DeepLinkError::parse(
            ParseErrorKind::TooManyParams,
            format!("Too many parameters (max {MAX_QUERY_PARAMS})"),
            json!({ "count": pairs.len(), "max_params": MAX_QUERY_PARAMS }),
        ));
    }

    let mut params = LinkParams::new();
    for pair in pairs {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));

        let key = percent_decode(raw_key)?;
        if key.is_empty() {
            return Err(DeepLinkError::parse(
                ParseErrorKind::MalformedQuery,
                "Query parameter has an empty name",
                json!({ "pair": pair }),
            ));
        }

        let value = percent_decode(raw_value)?;
        params.insert(key, value);
    }

    Ok(params)
}

/// Strict `application/x-www-form-urlencoded` decoding of one component.
///
/// Every `%` must be followed by two hex digits and the decoded bytes must be
/// valid UTF-8.
fn percent_decode(input: &str) -> Result<String, DeepLinkError> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16));
                let lo = bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16));

                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        decoded.push((hi * 16 + lo) as u8);
                        i += 3;
                    }
                    _ => {
                        return Err(DeepLinkError::parse(
                            ParseErrorKind::MalformedEncoding,
                            "Malformed percent-encoding in query",
                            json!({ "position": i, "component": input }),
                        ));
                    }
                }
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8(decoded).map_err(|_| {
        DeepLinkError::parse(
            ParseErrorKind::MalformedEncoding,
            "Percent-encoded query is not valid UTF-8",
            json!({ "component": input }),
        )
    })
}

fn invalid_scheme(found: &str) -> DeepLinkError {
    DeepLinkError::parse(
        ParseErrorKind::InvalidScheme,
        format!("Invalid scheme, expected {SCHEME}://"),
        json!({ "found": found.chars().take(32).collect::<String>() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(raw: &str) -> Option<ParseErrorKind> {
        parse(raw).unwrap_err().parse_kind()
    }

    fn padded(len: usize) -> String {
        let prefix = "freshcuts://shop?shop=";
        format!("{prefix}{}", "a".repeat(len - prefix.len()))
    }

    #[test]
    fn test_parse_basic_link() {
        let link = parse("freshcuts://payment?amount=45&shop=nyc_01").unwrap();

        assert_eq!(link.scheme(), "freshcuts");
        assert_eq!(link.action(), LinkAction::Payment);
        assert_eq!(link.param("amount"), Some("45"));
        assert_eq!(link.param("shop"), Some("nyc_01"));
        assert_eq!(link.original_url(), "freshcuts://payment?amount=45&shop=nyc_01");
    }

    #[test]
    fn test_length_limit() {
        assert!(parse(&padded(MAX_URL_LENGTH)).is_ok());
        assert_eq!(kind(&padded(MAX_URL_LENGTH + 1)), Some(ParseErrorKind::TooLong));
    }

    #[test]
    fn test_length_checked_before_anything_else() {
        let junk = "x".repeat(MAX_URL_LENGTH + 1);
        assert_eq!(kind(&junk), Some(ParseErrorKind::TooLong));
    }

    #[test]
    fn test_length_counts_characters() {
        let prefix = "freshcuts://shop?shop=";
        let raw = format!("{prefix}{}", "é".repeat(MAX_URL_LENGTH - prefix.len()));
        assert!(raw.len() > MAX_URL_LENGTH);
        assert!(ensure_length(&raw).is_ok());
    }

    #[test]
    fn test_param_count_limit() {
        let query = |n: usize| {
            (0..n)
                .map(|i| format!("k{i}=v"))
                .collect::<Vec<_>>()
                .join("&")
        };

        assert_eq!(parse(&format!("freshcuts://shop?{}", query(50))).unwrap().params().len(), 50);
        assert_eq!(
            kind(&format!("freshcuts://shop?{}", query(51))),
            Some(ParseErrorKind::TooManyParams)
        );
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let link = parse("freshcuts://shop?shop=a&shop=b").unwrap();
        assert_eq!(link.params().len(), 1);
        assert_eq!(link.param("shop"), Some("b"));
    }

    #[test]
    fn test_key_without_value_is_empty() {
        let link = parse("freshcuts://profile?tab").unwrap();
        assert_eq!(link.params().get("tab").map(String::as_str), Some(""));
    }

    #[test]
    fn test_empty_and_missing_query() {
        assert!(parse("freshcuts://profile").unwrap().params().is_empty());
        assert!(parse("freshcuts://profile?").unwrap().params().is_empty());
        assert!(parse("freshcuts://profile?&&").unwrap().params().is_empty());
    }

    #[test]
    fn test_trailing_slash_on_action() {
        assert_eq!(parse("freshcuts://shop/?shop=a").unwrap().action(), LinkAction::Shop);
    }

    #[test]
    fn test_percent_decoding() {
        let link = parse("freshcuts://payment?note=Thanks%21+See%20you&plus=%2B").unwrap();
        assert_eq!(link.param("note"), Some("Thanks! See you"));
        assert_eq!(link.param("plus"), Some("+"));

        let link = parse("freshcuts://shop?na%6De=caf%C3%A9").unwrap();
        assert_eq!(link.param("name"), Some("café"));
    }

    #[test]
    fn test_malformed_encoding() {
        assert_eq!(kind("freshcuts://shop?shop=%ZZ"), Some(ParseErrorKind::MalformedEncoding));
        assert_eq!(kind("freshcuts://shop?shop=%4"), Some(ParseErrorKind::MalformedEncoding));
        assert_eq!(kind("freshcuts://shop?shop=%+1"), Some(ParseErrorKind::MalformedEncoding));
        assert_eq!(kind("freshcuts://shop?shop=%FF"), Some(ParseErrorKind::MalformedEncoding));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert_eq!(kind("freshcuts://shop?=a"), Some(ParseErrorKind::MalformedQuery));
    }

    #[test]
    fn test_scheme_must_match_exactly() {
        for raw in [
            "https://shop?shop=a",
            "FreshCuts://shop",
            "freshcuts:shop",
            "freshcuts//shop",
            " freshcuts://shop",
        ] {
            assert_eq!(kind(raw), Some(ParseErrorKind::InvalidScheme), "{raw}");
        }
    }

    #[test]
    fn test_unknown_action() {
        assert_eq!(kind("freshcuts://haircut"), Some(ParseErrorKind::UnknownAction));
        assert_eq!(kind("freshcuts://Shop"), Some(ParseErrorKind::UnknownAction));
        assert_eq!(kind("freshcuts://"), Some(ParseErrorKind::UnknownAction));
        assert_eq!(kind("freshcuts://shop/extra"), Some(ParseErrorKind::UnknownAction));
    }
}
