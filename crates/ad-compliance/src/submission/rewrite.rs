use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Copy suggested by the rewrite endpoint. Unknown fields are kept so newer engine
/// builds can add output without breaking older clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewrittenAd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_text: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RewrittenAd {
    pub fn is_empty(&self) -> bool {
        self.headline.is_none()
            && self.description.is_none()
            && self.primary_text.is_none()
            && self.extra.is_empty()
    }
}
