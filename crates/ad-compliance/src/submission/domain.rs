use std::fmt;
use std::str::FromStr;

use mime::Mime;
use serde::{Deserialize, Serialize};

use super::fields::FieldArray;

/// Legacy single-field engines, each served by its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Fast,
    Gpt,
    Gemini,
}

impl Engine {
    pub const fn ordered() -> [Self; 3] {
        [Self::Fast, Self::Gpt, Self::Gemini]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Gpt => "gpt",
            Self::Gemini => "gemini",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Fast => "Fast AI",
            Self::Gpt => "GPT",
            Self::Gemini => "Gemini",
        }
    }
}

impl FromStr for Engine {
    type Err = UnknownSelector;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|engine| engine.as_str() == normalized)
            .ok_or_else(|| UnknownSelector {
                kind: "engine",
                value: value.to_string(),
            })
    }
}

/// Ad platform profile applied server-side by the unified analysis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Adsense,
    Facebook,
    GoogleAds,
    Native,
    Performance,
}

impl Destination {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Adsense,
            Self::Facebook,
            Self::GoogleAds,
            Self::Native,
            Self::Performance,
        ]
    }

    /// Wire value sent in the `source` multipart field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adsense => "adsense",
            Self::Facebook => "facebook",
            Self::GoogleAds => "google_ads",
            Self::Native => "native",
            Self::Performance => "performance",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Adsense => "AdSense",
            Self::Facebook => "Facebook",
            Self::GoogleAds => "Google Ads",
            Self::Native => "Native",
            Self::Performance => "Performance",
        }
    }
}

impl FromStr for Destination {
    type Err = UnknownSelector;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ordered()
            .into_iter()
            .find(|destination| destination.as_str() == normalized)
            .ok_or_else(|| UnknownSelector {
                kind: "destination",
                value: value.to_string(),
            })
    }
}

/// Chooses how a payload is routed. Engine and destination selectors never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Engine(Engine),
    Destination(Destination),
}

impl Selector {
    pub const fn destination(self) -> Option<Destination> {
        match self {
            Self::Engine(_) => None,
            Self::Destination(destination) => Some(destination),
        }
    }

    /// Destination selectors submit every headline and description.
    pub const fn is_multi_field(self) -> bool {
        matches!(self, Self::Destination(_))
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::Engine(Engine::Fast)
    }
}

impl From<Engine> for Selector {
    fn from(value: Engine) -> Self {
        Self::Engine(value)
    }
}

impl From<Destination> for Selector {
    fn from(value: Destination) -> Self {
        Self::Destination(value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(engine) => write!(f, "engine:{}", engine.as_str()),
            Self::Destination(destination) => write!(f, "destination:{}", destination.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownSelector {
    pub kind: &'static str,
    pub value: String,
}

/// Uploaded creative, forwarded to the engine byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdImage {
    pub file_name: String,
    pub content_type: Option<Mime>,
    pub bytes: Vec<u8>,
}

impl AdImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// Editable form state. Rebuilt into a payload on every submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub url: String,
    pub headlines: FieldArray,
    pub descriptions: FieldArray,
    pub primary_text: String,
    /// Free-text description of the creative, sent as `keywords`.
    pub keywords: String,
    pub images: Vec<AdImage>,
}

/// Addresses one of the variable-arity field arrays on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Headline,
    Description,
}

impl FieldKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Headline => "headline",
            Self::Description => "description",
        }
    }
}

impl FormState {
    pub fn field(&self, kind: FieldKind) -> &FieldArray {
        match kind {
            FieldKind::Headline => &self.headlines,
            FieldKind::Description => &self.descriptions,
        }
    }

    pub fn field_mut(&mut self, kind: FieldKind) -> &mut FieldArray {
        match kind {
            FieldKind::Headline => &mut self.headlines,
            FieldKind::Description => &mut self.descriptions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selectors_case_insensitively() {
        assert_eq!("GPT".parse::<Engine>(), Ok(Engine::Gpt));
        assert_eq!(
            "google-ads".parse::<Destination>(),
            Ok(Destination::GoogleAds)
        );
        let err = "tiktok".parse::<Destination>().expect_err("unknown destination");
        assert_eq!(err.to_string(), "unknown destination 'tiktok'");
    }

    #[test]
    fn only_destinations_are_multi_field() {
        assert!(!Selector::from(Engine::Gemini).is_multi_field());
        assert!(Selector::from(Destination::Native).is_multi_field());
        assert_eq!(Selector::default(), Selector::Engine(Engine::Fast));
        assert_eq!(
            Selector::from(Destination::GoogleAds).to_string(),
            "destination:google_ads"
        );
    }
}
