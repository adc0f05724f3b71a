//! DeepLink entity produced by the parser.

use serde::Serialize;
use std::collections::BTreeMap;

use super::action::LinkAction;

/// The only scheme this engine accepts or produces.
pub const SCHEME: &str = "freshcuts";

/// Query parameters of a link, keyed and ordered by name.
pub type LinkParams = BTreeMap<String, String>;

/// A parsed `freshcuts://` URI.
///
/// Only the parser constructs links, so a `DeepLink` always carries an action
/// from the closed set and decoded parameters. It is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLink {
    scheme: &'static str,
    action: LinkAction,
    params: LinkParams,
    original_url: String,
}

impl DeepLink {
    pub(crate) fn new(action: LinkAction, params: LinkParams, original_url: String) -> Self {
        Self {
            scheme: SCHEME,
            action,
            params,
            original_url,
        }
    }

    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    pub fn action(&self) -> LinkAction {
        self.action
    }

    pub fn params(&self) -> &LinkParams {
        &self.params
    }

    /// Returns a parameter value, treating an empty value as absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// Action-scoped URL prefix, e.g. `freshcuts://payment`.
    ///
    /// Used as the default rate-limit identity when the caller supplies none.
    pub fn scope_prefix(&self) -> String {
        format!("{}://{}", SCHEME, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(params: &[(&str, &str)]) -> DeepLink {
        let params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeepLink::new(
            LinkAction::Shop,
            params,
            "freshcuts://shop?shop=nyc_01".to_string(),
        )
    }

    #[test]
    fn test_deep_link_accessors() {
        let link = link(&[("shop", "nyc_01")]);

        assert_eq!(link.scheme(), "freshcuts");
        assert_eq!(link.action(), LinkAction::Shop);
        assert_eq!(link.param("shop"), Some("nyc_01"));
        assert_eq!(link.original_url(), "freshcuts://shop?shop=nyc_01");
    }

    #[test]
    fn test_empty_param_reads_as_absent() {
        let link = link(&[("shop", "")]);

        assert!(link.params().contains_key("shop"));
        assert_eq!(link.param("shop"), None);
    }

    #[test]
    fn test_scope_prefix() {
        assert_eq!(link(&[]).scope_prefix(), "freshcuts://shop");
    }
}
