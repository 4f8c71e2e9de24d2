use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Untyped scalar as it arrives from a CSV cell or a JSON body.
///
/// Deserializes from any JSON value: arrays and objects land in `Other` and
/// are treated as missing, so an odd field never fails a whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// True for null and for non-scalar values
    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Null | RawValue::Other(_))
    }

    /// Lenient numeric reading. Placeholder tokens (`""`, `"-"`) and
    /// non-finite values read as `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed == "-" {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            RawValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            RawValue::Null | RawValue::Other(_) => None,
        }
    }

    /// Textual rendering of a scalar; `None` when missing
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Number(n) => Some(format_number(*n)),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Null | RawValue::Other(_) => None,
        }
    }
}

/// Render a number without a trailing `.0` when it is integral
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

/// One historical or queried company: attribute name -> raw scalar.
/// No field is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value for a key, including explicit nulls
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.0.get(key)
    }

    /// Value for a key, or `None` if absent or missing
    pub fn value(&self, key: &str) -> Option<&RawValue> {
        self.0.get(key).filter(|v| !v.is_missing())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Form-style company description used by the profile endpoint and the
/// interactive CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartupProfile {
    /// Market or category, possibly pipe-delimited
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Total funding raised in USD
    #[serde(default)]
    pub funding_total: Option<f64>,
    #[serde(default)]
    pub funding_rounds: Option<u32>,
}

impl StartupProfile {
    /// Map the form fields onto the historical dataset vocabulary
    pub fn to_raw_record(&self) -> RawRecord {
        fn text_or_unknown(value: &Option<String>) -> String {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string()
        }

        RawRecord::new()
            .with("category_list", text_or_unknown(&self.market))
            .with(
                "funding_total_usd",
                format_number(self.funding_total.unwrap_or(0.0)),
            )
            .with("funding_rounds", self.funding_rounds.unwrap_or(0) as i64)
            .with("country_code", text_or_unknown(&self.country))
            .with("state_code", "")
            .with("region", text_or_unknown(&self.region))
            .with("city", text_or_unknown(&self.city))
    }
}

/// Coarse risk band derived from the success probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.66 {
            RiskLevel::Low
        } else if probability >= 0.33 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low risk",
            RiskLevel::Moderate => "moderate risk",
            RiskLevel::High => "high risk",
        }
    }
}

/// Success estimate for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEstimate {
    pub success_probability: f64,
    pub success_probability_percent: f64,
    pub risk_level: RiskLevel,
}

impl SuccessEstimate {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            success_probability: probability,
            success_probability_percent: probability * 100.0,
            risk_level: RiskLevel::from_probability(probability),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    pub feature_count: Option<usize>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
