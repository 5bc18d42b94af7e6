use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Directional call made by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

impl Prediction {
    /// Headline shown for the prediction card
    pub fn headline(self) -> &'static str {
        match self {
            Prediction::Up => "BULLISH",
            Prediction::Down => "BEARISH",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Up => f.write_str("UP"),
            Prediction::Down => f.write_str("DOWN"),
        }
    }
}

/// Confidence percentage attached to a prediction, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Strength(u8);

impl Strength {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Strength {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Strength::new)
            .ok_or_else(|| format!("strength {} is outside 0..=100", value))
    }
}

impl From<Strength> for u8 {
    fn from(strength: Strength) -> Self {
        strength.0
    }
}

/// A price as reported by the service.
///
/// Normally numeric, but the service reports `"N/A"` when it could not derive a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for PriceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceValue::Number(value) => write!(f, "{}", value),
            PriceValue::Text(text) => f.write_str(text),
        }
    }
}

/// Support and resistance levels detected in the chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resistance: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support: Option<Vec<f64>>,

    /// Extra keys the service attaches (`lastHigh`, `lastLow`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyLevels {
    pub fn resistance(&self) -> &[f64] {
        self.resistance.as_deref().unwrap_or_default()
    }

    pub fn support(&self) -> &[f64] {
        self.support.as_deref().unwrap_or_default()
    }
}

/// Structured analysis returned by `POST /analyze`.
///
/// The struct is a faithful image of the response body: fields outside the
/// contract are kept in `extra`, so serializing a parsed result reproduces the
/// body it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub prediction: Prediction,
    pub strength: Strength,
    pub stop_loss: PriceValue,
    pub take_profit: PriceValue,
    pub risk_reward: String,
    pub current_price: f64,
    pub timeframe: String,

    #[serde(default)]
    pub patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_levels: Option<KeyLevels>,

    #[serde(default)]
    pub analysis: String,

    #[serde(default)]
    pub trading_setup: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    pub fn resistance_levels(&self) -> &[f64] {
        self.key_levels
            .as_ref()
            .map(KeyLevels::resistance)
            .unwrap_or_default()
    }

    pub fn support_levels(&self) -> &[f64] {
        self.key_levels
            .as_ref()
            .map(KeyLevels::support)
            .unwrap_or_default()
    }
}
