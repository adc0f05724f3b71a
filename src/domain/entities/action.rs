//! The closed set of deep-link actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Intent encoded in the authority segment of a `freshcuts://` URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAction {
    Payment,
    Booking,
    Tip,
    Shop,
    Barber,
    Profile,
    Review,
    Promotions,
}

impl LinkAction {
    pub const ALL: [LinkAction; 8] = [
        LinkAction::Payment,
        LinkAction::Booking,
        LinkAction::Tip,
        LinkAction::Shop,
        LinkAction::Barber,
        LinkAction::Profile,
        LinkAction::Review,
        LinkAction::Promotions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Booking => "booking",
            Self::Tip => "tip",
            Self::Shop => "shop",
            Self::Barber => "barber",
            Self::Profile => "profile",
            Self::Review => "review",
            Self::Promotions => "promotions",
        }
    }
}

impl fmt::Display for LinkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an action segment outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for LinkAction {
    type Err = UnknownAction;

    /// Matching is exact and case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_round_trips_through_str() {
        for action in LinkAction::ALL {
            assert_eq!(action.as_str().parse::<LinkAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = "refund".parse::<LinkAction>().unwrap_err();
        assert_eq!(err, UnknownAction("refund".to_string()));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!("Payment".parse::<LinkAction>().is_err());
        assert!("promotion".parse::<LinkAction>().is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&LinkAction::Promotions).unwrap(),
            "\"promotions\""
        );
    }
}
