//! Results returned by the dispatcher, one data variant per action family.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_with::skip_serializing_none;

use super::action::LinkAction;
use super::deep_link::{DeepLink, LinkParams};
use crate::domain::gateways::PaymentResponse;
use crate::domain::params::ServiceType;

/// What the dispatcher did with a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchAction {
    /// A payment was created through the gateway.
    Created,
    /// The caller must finish the action interactively.
    Prompt,
    Book,
    Navigate,
    Apply,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub payment: PaymentResponse,
    pub shop: Option<String>,
    pub barber: Option<String>,
    pub service: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    pub shop: Option<String>,
    pub barber: Option<String>,
    pub service: Option<ServiceType>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    pub ends_at: Option<DateTime<Utc>>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TipData {
    #[serde(rename_all = "camelCase")]
    Created {
        payment: PaymentResponse,
        barber: Option<String>,
        appointment: Option<String>,
        amount: Decimal,
        percentage: Option<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Prompt {
        barber: Option<String>,
        appointment: Option<String>,
        suggested_amount: Option<Decimal>,
        suggested_percentages: Vec<u8>,
        percentage: Option<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationData {
    pub route: String,
    pub params: LinkParams,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionData {
    pub code: String,
    pub shop: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchData {
    Payment(PaymentData),
    Booking(BookingData),
    Tip(TipData),
    Navigation(NavigationData),
    Promotion(PromotionData),
}

impl DispatchData {
    /// Returns true if this data variant may be produced for `action`.
    pub fn fits(&self, action: LinkAction) -> bool {
        match self {
            Self::Payment(_) => action == LinkAction::Payment,
            Self::Booking(_) => action == LinkAction::Booking,
            Self::Tip(_) => action == LinkAction::Tip,
            Self::Navigation(_) => matches!(
                action,
                LinkAction::Shop | LinkAction::Barber | LinkAction::Profile | LinkAction::Review
            ),
            Self::Promotion(_) => action == LinkAction::Promotions,
        }
    }
}

/// Successful outcome of one dispatch.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    #[serde(rename = "type")]
    pub result_type: LinkAction,
    pub action: DispatchAction,
    pub data: DispatchData,
    /// Sanitized parameters the handler acted on.
    pub params: LinkParams,
    pub deep_link: Option<DeepLink>,
}

impl DispatchResult {
    /// Builds a result whose `type` is taken from the originating link.
    pub fn new(
        link: DeepLink,
        action: DispatchAction,
        data: DispatchData,
        params: LinkParams,
    ) -> Self {
        debug_assert!(
            data.fits(link.action()),
            "dispatch data does not match link action"
        );

        Self {
            result_type: link.action(),
            action,
            data,
            params,
            deep_link: Some(link),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::deep_link_parser::parse;

    #[test]
    fn test_result_type_follows_link() {
        let link = parse("freshcuts://shop?shop=nyc_01").unwrap();
        let data = DispatchData::Navigation(NavigationData {
            route: "/shops/nyc_01".into(),
            params: link.params().clone(),
        });

        let result = DispatchResult::new(
            link.clone(),
            DispatchAction::Navigate,
            data,
            link.params().clone(),
        );

        assert_eq!(result.result_type, LinkAction::Shop);
        assert_eq!(result.deep_link.as_ref(), Some(&link));
    }

    #[test]
    fn test_result_serializes_type_and_action() {
        let link = parse("freshcuts://promotions?code=FRESH20").unwrap();
        let data = DispatchData::Promotion(PromotionData {
            code: "FRESH20".into(),
            shop: None,
        });
        let result = DispatchResult::new(link, DispatchAction::Apply, data, LinkParams::new());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "promotions");
        assert_eq!(json["action"], "apply");
        assert_eq!(json["data"]["code"], "FRESH20");
        assert!(json["data"].get("shop").is_none());
        assert_eq!(json["deepLink"]["scheme"], "freshcuts");
    }

    #[test]
    fn test_tip_prompt_serialization() {
        let data = TipData::Prompt {
            barber: Some("jb".into()),
            appointment: None,
            suggested_amount: None,
            suggested_percentages: vec![15, 18, 20, 25],
            percentage: None,
        };

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["kind"], "prompt");
        assert_eq!(json["suggestedPercentages"][3], 25);
        assert!(json.get("appointment").is_none());
    }

    #[test]
    fn test_data_fits_action() {
        let nav = DispatchData::Navigation(NavigationData {
            route: "/profile".into(),
            params: LinkParams::new(),
        });
        assert!(nav.fits(LinkAction::Profile));
        assert!(!nav.fits(LinkAction::Payment));
    }
}
