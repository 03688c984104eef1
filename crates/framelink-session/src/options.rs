//! Checkout options and their two URL partitions.
//!
//! Options split into a routing partition (`ui`, `language`) sent as the
//! query string, and a public partition (`styles`, `labels`, `demo`,
//! `version`) sent base64-encoded in the fragment so it never reaches the
//! server.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default checkout endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://v1.checkout.bambora.com";

/// Default checkout language.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The checkout user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ui {
    #[default]
    Fullscreen,
    Modal,
    Inline,
}

impl Ui {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ui::Fullscreen => "fullscreen",
            Ui::Modal => "modal",
            Ui::Inline => "inline",
        }
    }
}

impl fmt::Display for Ui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ui {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fullscreen" => Ok(Ui::Fullscreen),
            "modal" => Ok(Ui::Modal),
            "inline" => Ok(Ui::Inline),
            other => Err(format!(
                "unknown ui '{other}' (expected fullscreen, modal or inline)"
            )),
        }
    }
}

/// Options common to every checkout variant.
///
/// `ui` left unset takes the variant's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutOptions {
    pub endpoint: String,
    pub ui: Option<Ui>,
    pub language: String,
    pub styles: Option<Value>,
    pub labels: Option<BTreeMap<String, String>>,
    pub demo: Option<bool>,
    /// Client version tag.
    pub version: Option<String>,
    /// Embedding system name, appended to `version`.
    pub system: Option<String>,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ui: None,
            language: DEFAULT_LANGUAGE.to_string(),
            styles: None,
            labels: None,
            demo: None,
            version: None,
            system: None,
        }
    }
}

impl CheckoutOptions {
    /// The interface this checkout renders, falling back to fullscreen.
    pub fn ui(&self) -> Ui {
        self.ui.unwrap_or_default()
    }

    /// Fill in `ui` if the caller left it unset.
    pub fn with_default_ui(mut self, ui: Ui) -> Self {
        self.ui.get_or_insert(ui);
        self
    }

    /// The version tag sent to the frame, with `-<system>` appended when known.
    pub fn version_tag(&self) -> Option<String> {
        match (&self.version, &self.system) {
            (Some(version), Some(system)) => Some(format!("{version}-{system}")),
            (Some(version), None) => Some(version.clone()),
            (None, _) => None,
        }
    }

    /// The public partition.
    pub fn public_options(&self) -> PublicOptions {
        PublicOptions {
            styles: self.styles.clone(),
            labels: self.labels.clone(),
            demo: self.demo,
            version: self.version_tag(),
        }
    }

    /// The routing partition.
    pub fn routing_options(&self) -> RoutingOptions {
        RoutingOptions {
            ui: self.ui(),
            language: self.language.clone(),
        }
    }
}

/// Options only the frame document sees, carried in the fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PublicOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PublicOptions {
    /// Base64 of the compact JSON form, or `None` when there is nothing to send.
    pub fn to_fragment(&self) -> serde_json::Result<Option<String>> {
        let json = serde_json::to_string(self)?;
        if json == "{}" {
            return Ok(None);
        }
        Ok(Some(STANDARD.encode(json)))
    }

    /// Decode a fragment produced by [`to_fragment`](Self::to_fragment).
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let bytes = STANDARD.decode(fragment.trim_start_matches('#')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Options the checkout server routes on, carried in the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingOptions {
    pub ui: Ui,
    pub language: String,
}

impl RoutingOptions {
    /// `ui=<ui>&language=<language>`, each component URI-encoded.
    pub fn to_query(&self) -> String {
        [("ui", self.ui.as_str()), ("language", self.language.as_str())]
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}
