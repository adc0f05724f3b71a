//! Typed parameter schemas, one per action.
//!
//! Each schema reads a [`DeepLink`]'s raw parameters through the sanitizers,
//! converts them to typed fields and validates the bounds. The link generator
//! writes the same structs back out, so parsing and generating share a single
//! definition of every field.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::domain::entities::{DeepLink, LinkAction, LinkParams};
use crate::error::DeepLinkError;
use crate::utils::sanitize_input;

/// Largest amount a single link may charge: 10000.00.
pub const MAX_PAYMENT_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 2);
pub const MAX_SPLIT_PARTICIPANTS: u64 = 10;
pub const DEFAULT_BOOKING_MINUTES: u32 = 30;
pub const SUGGESTED_TIP_PERCENTAGES: [u8; 4] = [15, 18, 20, 25];
pub const DEFAULT_TIP_PERCENTAGE: u8 = 20;

/// Schema shared by the parser side and the generator side of an action.
pub trait ActionParams: Validate + PartialEq + Sized {
    const ACTION: LinkAction;

    /// Reads raw fields without checking bounds.
    fn read(link: &DeepLink) -> Result<Self, DeepLinkError>;

    /// Canonical key/value pairs, in generation order, absent fields omitted.
    fn to_pairs(&self) -> Vec<(&'static str, String)>;

    /// Reads, sanitizes and validates the parameters of `link`.
    ///
    /// # Errors
    ///
    /// Returns [`DeepLinkError::Validation`] if the link belongs to another
    /// action, a field cannot be converted, or a bound is violated.
    fn from_link(link: &DeepLink) -> Result<Self, DeepLinkError> {
        if link.action() != Self::ACTION {
            return Err(DeepLinkError::validation(
                "Link action does not match parameter schema",
                json!({ "expected": Self::ACTION, "actual": link.action() }),
            ));
        }

        let params = Self::read(link)?;
        params.validate()?;
        Ok(params)
    }

    /// The parameters as a link would carry them once read back: every field
    /// passed through its sanitizer, empty optional values dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DeepLinkError::Validation`] if a field sanitizes to nothing
    /// or the sanitized values violate a bound.
    fn canonical(&self) -> Result<Self, DeepLinkError> {
        let link = DeepLink::new(Self::ACTION, self.to_params(), String::new());
        Self::from_link(&link)
    }

    fn to_params(&self) -> LinkParams {
        self.to_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

/// In-app route a navigation link resolves to.
pub trait NavigationTarget {
    fn route(&self) -> String;
}

/// Services that can be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Haircut,
    BeardTrim,
    Shave,
    Fade,
    Lineup,
    Color,
    Kids,
    Combo,
}

impl ServiceType {
    pub const ALL: [ServiceType; 8] = [
        ServiceType::Haircut,
        ServiceType::BeardTrim,
        ServiceType::Shave,
        ServiceType::Fade,
        ServiceType::Lineup,
        ServiceType::Color,
        ServiceType::Kids,
        ServiceType::Combo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Haircut => "haircut",
            Self::BeardTrim => "beard_trim",
            Self::Shave => "shave",
            Self::Fade => "fade",
            Self::Lineup => "lineup",
            Self::Color => "color",
            Self::Kids => "kids",
            Self::Combo => "combo",
        }
    }

    /// Slot length used when a booking link carries no explicit duration.
    pub fn default_duration_minutes(&self) -> u32 {
        match self {
            Self::BeardTrim | Self::Lineup => 15,
            Self::Kids => 20,
            Self::Haircut | Self::Shave => 30,
            Self::Fade => 45,
            Self::Combo => 60,
            Self::Color => 90,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = DeepLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|service| service.as_str() == wanted)
            .ok_or_else(|| {
                DeepLinkError::validation("unknown service type", json!({ "service": s }))
            })
    }
}

/// Converts a decimal amount to minor units (cents).
///
/// # Errors
///
/// Returns [`DeepLinkError::Validation`] if the amount does not fit in `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, DeepLinkError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            DeepLinkError::validation(
                "Amount out of range",
                json!({ "amount": amount.to_string() }),
            )
        })
}

// ── Payment ─────────────────────────────────────────────────────────────────

/// `freshcuts://payment?amount=45&shop=nyc_01`
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct PaymentParams {
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    pub shop: Option<String>,
    pub barber: Option<String>,
    pub service: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub private: Option<bool>,
    #[validate(length(min = 1, max = MAX_SPLIT_PARTICIPANTS))]
    pub split: Option<Vec<String>>,
}

impl PaymentParams {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    /// Description sent to the payment gateway.
    pub fn payment_description(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }

        match (&self.service, &self.shop) {
            (Some(service), Some(shop)) => format!("FreshCuts {service} at {shop}"),
            (Some(service), None) => format!("FreshCuts {service}"),
            (None, Some(shop)) => format!("FreshCuts payment at {shop}"),
            (None, None) => "FreshCuts payment".to_string(),
        }
    }
}

impl ActionParams for PaymentParams {
    const ACTION: LinkAction = LinkAction::Payment;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        Ok(Self {
            amount: required(link, "amount", sanitize_input::amount)?,
            shop: optional(link, "shop", sanitize_input::id)?,
            barber: optional(link, "barber", sanitize_input::id)?,
            service: optional(link, "service", sanitize_input::service_name)?,
            description: optional_text(link, "description"),
            note: optional_text(link, "note"),
            private: optional(link, "private", boolean)?,
            split: optional(link, "split", id_list)?,
        })
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("amount", self.amount.normalize().to_string())];
        push(&mut pairs, "shop", self.shop.as_ref());
        push(&mut pairs, "barber", self.barber.as_ref());
        push(&mut pairs, "service", self.service.as_ref());
        push(&mut pairs, "description", self.description.as_ref());
        push(&mut pairs, "note", self.note.as_ref());
        push(&mut pairs, "private", self.private);
        push(&mut pairs, "split", self.split.as_ref().map(|p| p.join(",")));
        pairs
    }
}

// ── Booking ─────────────────────────────────────────────────────────────────

/// `freshcuts://booking?shop=nyc_01&service=fade&datetime=...&duration=45`
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct BookingParams {
    pub shop: Option<String>,
    pub barber: Option<String>,
    pub service: Option<ServiceType>,
    pub datetime: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 480))]
    pub duration: Option<u32>,
}

impl BookingParams {
    /// Explicit duration, else the service default, else 30 minutes.
    pub fn effective_duration(&self) -> u32 {
        self.duration
            .or_else(|| self.service.map(|s| s.default_duration_minutes()))
            .unwrap_or(DEFAULT_BOOKING_MINUTES)
    }
}

impl ActionParams for BookingParams {
    const ACTION: LinkAction = LinkAction::Booking;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        Ok(Self {
            shop: optional(link, "shop", sanitize_input::id)?,
            barber: optional(link, "barber", sanitize_input::id)?,
            service: optional(link, "service", ServiceType::from_str)?,
            datetime: optional(link, "datetime", instant)?,
            duration: optional(link, "duration", integer::<u32>)?,
        })
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "shop", self.shop.as_ref());
        push(&mut pairs, "barber", self.barber.as_ref());
        push(&mut pairs, "service", self.service);
        push(&mut pairs, "datetime", self.datetime.as_ref().map(format_instant));
        push(&mut pairs, "duration", self.duration);
        pairs
    }
}

// ── Tip ─────────────────────────────────────────────────────────────────────

/// `freshcuts://tip?barber=jb&amount=10` or `freshcuts://tip?barber=jb&percentage=20&subtotal=45`
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct TipParams {
    pub barber: Option<String>,
    pub appointment: Option<String>,
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Option<Decimal>,
    #[validate(range(min = 0, max = 100))]
    pub percentage: Option<u8>,
    #[validate(custom(function = "validate_positive_amount"))]
    pub subtotal: Option<Decimal>,
}

impl TipParams {
    /// Amount to charge, if the link determines one.
    ///
    /// An explicit amount wins. A percentage needs a subtotal to apply to;
    /// without one the tip stays unresolved.
    pub fn resolved_amount(&self) -> Option<Decimal> {
        if let Some(amount) = self.amount {
            return Some(amount);
        }

        match (self.percentage, self.subtotal) {
            (Some(pct), Some(subtotal)) => Some(percent_of(subtotal, pct)),
            _ => None,
        }
    }

    /// Amount to pre-fill in an interactive prompt.
    pub fn suggested_amount(&self) -> Option<Decimal> {
        self.subtotal
            .map(|subtotal| percent_of(subtotal, self.percentage.unwrap_or(DEFAULT_TIP_PERCENTAGE)))
    }

    pub fn payment_description(&self) -> String {
        match &self.barber {
            Some(barber) => format!("FreshCuts tip for {barber}"),
            None => "FreshCuts tip".to_string(),
        }
    }
}

impl ActionParams for TipParams {
    const ACTION: LinkAction = LinkAction::Tip;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        Ok(Self {
            barber: optional(link, "barber", sanitize_input::id)?,
            appointment: optional(link, "appointment", sanitize_input::id)?,
            amount: optional(link, "amount", sanitize_input::amount)?,
            percentage: optional(link, "percentage", integer::<u8>)?,
            subtotal: optional(link, "subtotal", sanitize_input::amount)?,
        })
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "barber", self.barber.as_ref());
        push(&mut pairs, "appointment", self.appointment.as_ref());
        push(&mut pairs, "amount", self.amount.map(|a| a.normalize()));
        push(&mut pairs, "percentage", self.percentage);
        push(&mut pairs, "subtotal", self.subtotal.map(|s| s.normalize()));
        pairs
    }
}

// ── Navigation actions ──────────────────────────────────────────────────────

/// `freshcuts://shop?shop=nyc_01&section=services`
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct ShopParams {
    pub shop: String,
    pub section: Option<String>,
}

impl ActionParams for ShopParams {
    const ACTION: LinkAction = LinkAction::Shop;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        Ok(Self {
            shop: required(link, "shop", sanitize_input::id)?,
            section: optional(link, "section", sanitize_input::id)?,
        })
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("shop", self.shop.clone())];
        push(&mut pairs, "section", self.section.as_ref());
        pairs
    }
}

impl NavigationTarget for ShopParams {
    fn route(&self) -> String {
        match &self.section {
            Some(section) => format!("/shops/{}/{section}", self.shop),
            None => format!("/shops/{}", self.shop),
        }
    }
}

/// `freshcuts://barber?barber=jb&shop=nyc_01`
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct BarberParams {
    pub barber: String,
    pub shop: Option<String>,
}

impl ActionParams for BarberParams {
    const ACTION: LinkAction = LinkAction::Barber;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        Ok(Self {
            barber: required(link, "barber", sanitize_input::id)?,
            shop: optional(link, "shop", sanitize_input::id)?,
        })
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("barber", self.barber.clone())];
        push(&mut pairs, "shop", self.shop.as_ref());
        pairs
    }
}

impl NavigationTarget for BarberParams {
    fn route(&self) -> String {
        format!("/barbers/{}", self.barber)
    }
}

/// `freshcuts://profile?user=u_42&tab=history`. Without `user` the link opens
/// the caller's own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct ProfileParams {
    pub user: Option<String>,
    pub tab: Option<String>,
}

impl ActionParams for ProfileParams {
    const ACTION: LinkAction = LinkAction::Profile;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        Ok(Self {
            user: optional(link, "user", sanitize_input::id)?,
            tab: optional(link, "tab", sanitize_input::id)?,
        })
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "user", self.user.as_ref());
        push(&mut pairs, "tab", self.tab.as_ref());
        pairs
    }
}

impl NavigationTarget for ProfileParams {
    fn route(&self) -> String {
        match &self.user {
            Some(user) => format!("/profile/{user}"),
            None => "/profile".to_string(),
        }
    }
}

/// `freshcuts://review?barber=jb&appointment=apt_9&rating=5`
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct ReviewParams {
    pub shop: Option<String>,
    pub barber: Option<String>,
    pub appointment: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<u8>,
}

impl ActionParams for ReviewParams {
    const ACTION: LinkAction = LinkAction::Review;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        let params = Self {
            shop: optional(link, "shop", sanitize_input::id)?,
            barber: optional(link, "barber", sanitize_input::id)?,
            appointment: optional(link, "appointment", sanitize_input::id)?,
            rating: optional(link, "rating", integer::<u8>)?,
        };

        // a review needs something to review
        if params.shop.is_none() && params.barber.is_none() {
            return Err(DeepLinkError::validation(
                "Missing required parameter: shop or barber",
                json!({ "field": "shop" }),
            ));
        }

        Ok(params)
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "shop", self.shop.as_ref());
        push(&mut pairs, "barber", self.barber.as_ref());
        push(&mut pairs, "appointment", self.appointment.as_ref());
        push(&mut pairs, "rating", self.rating);
        pairs
    }
}

impl NavigationTarget for ReviewParams {
    fn route(&self) -> String {
        match (&self.barber, &self.shop) {
            (Some(barber), _) => format!("/barbers/{barber}/reviews/new"),
            (None, Some(shop)) => format!("/shops/{shop}/reviews/new"),
            (None, None) => "/reviews/new".to_string(),
        }
    }
}

/// `freshcuts://promotions?code=FRESH20&shop=nyc_01`
///
/// Codes are upper-cased so links differing only in case apply the same promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct PromotionParams {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    pub shop: Option<String>,
}

impl ActionParams for PromotionParams {
    const ACTION: LinkAction = LinkAction::Promotions;

    fn read(link: &DeepLink) -> Result<Self, DeepLinkError> {
        Ok(Self {
            code: required(link, "code", |raw| {
                sanitize_input::id(raw).map(|code| code.to_ascii_uppercase())
            })?,
            shop: optional(link, "shop", sanitize_input::id)?,
        })
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("code", self.code.clone())];
        push(&mut pairs, "shop", self.shop.as_ref());
        pairs
    }
}

// ── Field readers ───────────────────────────────────────────────────────────

fn optional<T>(
    link: &DeepLink,
    key: &'static str,
    read: impl FnOnce(&str) -> Result<T, DeepLinkError>,
) -> Result<Option<T>, DeepLinkError> {
    link.param(key)
        .map(|raw| read(raw).map_err(|e| in_field(key, e)))
        .transpose()
}

fn required<T>(
    link: &DeepLink,
    key: &'static str,
    read: impl FnOnce(&str) -> Result<T, DeepLinkError>,
) -> Result<T, DeepLinkError> {
    optional(link, key, read)?.ok_or_else(|| {
        DeepLinkError::validation(
            format!("Missing required parameter: {key}"),
            json!({ "field": key }),
        )
    })
}

/// Free text that sanitizes down to nothing is treated as absent.
fn optional_text(link: &DeepLink, key: &str) -> Option<String> {
    link.param(key)
        .map(sanitize_input::text)
        .filter(|text| !text.is_empty())
}

fn in_field(key: &str, error: DeepLinkError) -> DeepLinkError {
    match error {
        DeepLinkError::Validation { message, details } => DeepLinkError::validation(
            format!("Invalid parameter {key}: {message}"),
            json!({ "field": key, "reason": details }),
        ),
        other => other,
    }
}

fn integer<T: FromStr>(raw: &str) -> Result<T, DeepLinkError> {
    raw.trim().parse().map_err(|_| {
        DeepLinkError::validation("must be a whole number in range", json!({ "value": raw }))
    })
}

fn boolean(raw: &str) -> Result<bool, DeepLinkError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(DeepLinkError::validation(
            "must be true or false",
            json!({ "value": raw }),
        )),
    }
}

fn instant(raw: &str) -> Result<DateTime<Utc>, DeepLinkError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| {
            DeepLinkError::validation(
                "must be an RFC 3339 timestamp",
                json!({ "reason": e.to_string() }),
            )
        })
}

fn id_list(raw: &str) -> Result<Vec<String>, DeepLinkError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(sanitize_input::id)
        .collect()
}

fn format_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn push<V: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<V>) {
    if let Some(value) = value {
        pairs.push((key, value.to_string()));
    }
}

fn percent_of(base: Decimal, percentage: u8) -> Decimal {
    (base * Decimal::from(percentage) / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_zero() || amount.is_sign_negative() {
        return Err(amount_error("amount_not_positive", "must be greater than zero"));
    }

    if *amount > MAX_PAYMENT_AMOUNT {
        return Err(amount_error("amount_too_large", "must not exceed 10000"));
    }

    if amount.normalize().scale() > 2 {
        return Err(amount_error(
            "amount_precision",
            "must have at most two decimal places",
        ));
    }

    Ok(())
}

fn amount_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}
