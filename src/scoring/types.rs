//! Scoring service request and response shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Features the scoring model expects, with the values used when a caller omits one.
pub const FEATURE_DEFAULTS: [(&str, f64); 12] = [
    ("danceability", 0.65),
    ("energy", 0.72),
    ("key", 5.0),
    ("loudness", -6.5),
    ("mode", 1.0),
    ("speechiness", 0.08),
    ("acousticness", 0.25),
    ("instrumentalness", 0.05),
    ("liveness", 0.15),
    ("valence", 0.58),
    ("tempo", 125.0),
    ("duration_ms", 210000.0),
];

/// Named numeric features sent to the scoring service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference vector used by demos and tests.
    pub fn example() -> Self {
        [
            ("danceability", 0.7),
            ("energy", 0.8),
            ("key", 5.0),
            ("loudness", -5.2),
            ("mode", 1.0),
            ("speechiness", 0.05),
            ("acousticness", 0.12),
            ("instrumentalness", 0.0),
            ("liveness", 0.18),
            ("valence", 0.65),
            ("tempo", 120.0),
            ("duration_ms", 210000.0),
        ]
        .into_iter()
        .collect()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fill every missing known feature from [`FEATURE_DEFAULTS`]. Present values win.
    pub fn with_defaults(mut self) -> Self {
        for (name, value) in FEATURE_DEFAULTS {
            self.0.entry(name.to_string()).or_insert(value);
        }
        self
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Optional prompt the scoring service attaches to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// True when the user must explicitly accept or decline.
    #[serde(default)]
    pub yes_no: bool,
    #[serde(default)]
    pub message: String,
}

/// Gas figure reported by the scoring service; numeric or textual depending on version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GasReport {
    Units(u64),
    Amount(f64),
    Text(String),
}

impl std::fmt::Display for GasReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GasReport::Units(n) => write!(f, "{}", n),
            GasReport::Amount(x) => write!(f, "{}", x),
            GasReport::Text(s) => f.write_str(s),
        }
    }
}

/// Scoring service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResponse {
    /// Hit probability in `[0, 1]`.
    pub prediction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_expenditure: Option<GasReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_update: Option<bool>,
}

/// Probability at or above which a prediction counts as positive when `is_hit` is absent.
pub const HIT_THRESHOLD: f64 = 0.5;

impl ScoringResponse {
    /// `is_hit` when present, otherwise the prediction against [`HIT_THRESHOLD`].
    pub fn is_positive(&self) -> bool {
        self.is_hit.unwrap_or(self.prediction >= HIT_THRESHOLD)
    }

    /// Whether the service asked for an explicit yes/no.
    pub fn requests_confirmation(&self) -> bool {
        self.notification.as_ref().is_some_and(|n| n.yes_no)
    }
}
