//! Canonical URI generation.
//!
//! Output always parses back to the same action and parameters. Values are
//! form-urlencoded, so a space becomes `+` and a literal `+` becomes `%2B`.

use serde_json::json;
use url::form_urlencoded;

use crate::domain::params::{
    ActionParams, BarberParams, BookingParams, PaymentParams, ProfileParams, PromotionParams,
    ReviewParams, ShopParams, TipParams,
};
use crate::domain::entities::SCHEME;
use crate::error::DeepLinkError;
use crate::utils::deep_link_parser::ensure_length;

/// Builds the canonical URI for any action's parameters.
///
/// # Errors
///
/// Returns [`DeepLinkError::Validation`] if `params` violate their schema or
/// would not read back unchanged (see [`ActionParams::canonical`]), or
/// [`DeepLinkError::Parse`] if the resulting URI would exceed the length limit.
pub fn generate<P: ActionParams>(params: &P) -> Result<String, DeepLinkError> {
    params.validate()?;

    let canonical = params.canonical()?;
    if canonical != *params {
        return Err(DeepLinkError::validation(
            "Parameters are not in canonical form",
            json!({ "action": P::ACTION, "canonical": canonical.to_params() }),
        ));
    }

    let pairs = params.to_pairs();
    let mut uri = format!("{SCHEME}://{}", P::ACTION);

    if !pairs.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        uri.push('?');
        uri.push_str(&query);
    }

    ensure_length(&uri)?;
    Ok(uri)
}

pub fn payment(params: &PaymentParams) -> Result<String, DeepLinkError> {
    generate(params)
}

pub fn booking(params: &BookingParams) -> Result<String, DeepLinkError> {
    generate(params)
}

pub fn tip(params: &TipParams) -> Result<String, DeepLinkError> {
    generate(params)
}

pub fn shop(params: &ShopParams) -> Result<String, DeepLinkError> {
    generate(params)
}

pub fn barber(params: &BarberParams) -> Result<String, DeepLinkError> {
    generate(params)
}

pub fn profile(params: &ProfileParams) -> Result<String, DeepLinkError> {
    generate(params)
}

pub fn review(params: &ReviewParams) -> Result<String, DeepLinkError> {
    generate(params)
}

pub fn promotions(params: &PromotionParams) -> Result<String, DeepLinkError> {
    generate(params)
}
