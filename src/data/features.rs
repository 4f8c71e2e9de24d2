//! Feature Engineering
//!
//! Turn raw company records into fixed-order feature rows. Training fits the
//! schema from the batch; serving applies a previously fitted schema so that
//! every row carries the same columns, types and order the model was
//! trained on.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::schema::SchemaMetadata;
use crate::error::{PipelineError, Result};
use crate::models::{format_number, RawRecord, RawValue};

pub const FUNDING_TOTAL: &str = "funding_total_usd";
pub const FUNDING_TOTAL_LOG: &str = "funding_total_log";
pub const FUNDING_ROUNDS: &str = "funding_rounds";
pub const COUNTRY_CODE: &str = "country_code";
pub const STATE_CODE: &str = "state_code";
pub const REGION: &str = "region";
pub const CITY: &str = "city";
pub const MAIN_CATEGORY: &str = "main_category";

/// Raw field holding the pipe-delimited category list
pub const CATEGORY_LIST: &str = "category_list";

/// Fill value for missing categorical features
pub const UNKNOWN: &str = "Unknown";

/// Every column the model may see, in schema order
pub const FEATURE_CANDIDATES: [&str; 8] = [
    FUNDING_TOTAL,
    FUNDING_TOTAL_LOG,
    FUNDING_ROUNDS,
    COUNTRY_CODE,
    STATE_CODE,
    REGION,
    CITY,
    MAIN_CATEGORY,
];

const GEOGRAPHY_FIELDS: [&str; 4] = [COUNTRY_CODE, STATE_CODE, REGION, CITY];

/// Single feature value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(n) => Some(*n),
            FeatureValue::Categorical(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Numeric(_) => None,
            FeatureValue::Categorical(s) => Some(s),
        }
    }

    /// Force to text; missing becomes `"Unknown"`
    fn coerce_categorical(value: Option<&FeatureValue>) -> FeatureValue {
        let text = match value {
            Some(FeatureValue::Categorical(s)) => s.clone(),
            Some(FeatureValue::Numeric(n)) => format_number(*n),
            None => UNKNOWN.to_string(),
        };
        FeatureValue::Categorical(text)
    }

    /// Force to a number; missing or unparseable becomes 0
    fn coerce_numeric(value: Option<&FeatureValue>) -> FeatureValue {
        let number = match value {
            Some(FeatureValue::Numeric(n)) => *n,
            Some(FeatureValue::Categorical(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            None => 0.0,
        };
        FeatureValue::Numeric(if number.is_finite() { number } else { 0.0 })
    }
}

/// One named slot of a feature row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSlot {
    pub name: String,
    pub value: FeatureValue,
}

/// Ordered feature row. Rows produced under the same schema share names,
/// types and order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    slots: Vec<FeatureSlot>,
}

impl FeatureRow {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &FeatureValue> {
        self.slots.iter().map(|s| &s.value)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.slots.iter().find(|s| s.name == name).map(|s| &s.value)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Numeric slots in row order
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values().filter_map(FeatureValue::as_f64).collect()
    }

    /// Categorical slots in row order
    pub fn categorical_values(&self) -> Vec<String> {
        self.values()
            .filter_map(FeatureValue::as_str)
            .map(str::to_string)
            .collect()
    }
}

/// Candidate columns derived from one raw record, before schema enforcement.
///
/// Funding amount, its log, round count and main category are always
/// present; geography columns only when the record carries the field.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRecord {
    values: BTreeMap<&'static str, FeatureValue>,
}

impl TransformedRecord {
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Per-record transform shared by fit and apply
pub fn transform_record(record: &RawRecord) -> TransformedRecord {
    let mut values = BTreeMap::new();

    let funding = funding_amount(record);
    values.insert(FUNDING_TOTAL, FeatureValue::Numeric(funding));
    values.insert(FUNDING_TOTAL_LOG, FeatureValue::Numeric(funding.ln_1p()));
    values.insert(FUNDING_ROUNDS, FeatureValue::Numeric(funding_rounds(record)));

    for field in GEOGRAPHY_FIELDS {
        if record.contains_key(field) {
            values.insert(field, FeatureValue::Categorical(text_or_unknown(record, field)));
        }
    }

    values.insert(MAIN_CATEGORY, FeatureValue::Categorical(main_category(record)));

    TransformedRecord { values }
}

/// Non-negative funding total; placeholders and garbage read as 0
fn funding_amount(record: &RawRecord) -> f64 {
    record
        .value(FUNDING_TOTAL)
        .and_then(|v| v.as_number())
        .map(|n| n.max(0.0))
        .unwrap_or(0.0)
}

/// Non-negative whole number of rounds
fn funding_rounds(record: &RawRecord) -> f64 {
    record
        .value(FUNDING_ROUNDS)
        .and_then(|v| v.as_number())
        .map(|n| n.max(0.0).trunc())
        .unwrap_or(0.0)
}

fn text_or_unknown(record: &RawRecord, field: &str) -> String {
    record
        .value(field)
        .and_then(|v| v.as_text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// First segment of the pipe-delimited category list
fn main_category(record: &RawRecord) -> String {
    match record.value(CATEGORY_LIST) {
        Some(RawValue::Text(list)) => list
            .split('|')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Build a row in exactly the schema's order, synthesizing missing columns
/// and coercing types. Extra columns are dropped.
fn enforce_schema(transformed: &TransformedRecord, metadata: &SchemaMetadata) -> FeatureRow {
    let slots = metadata
        .feature_order()
        .iter()
        .map(|name| {
            let value = transformed.get(name);
            let value = if metadata.is_categorical(name) {
                FeatureValue::coerce_categorical(value)
            } else {
                FeatureValue::coerce_numeric(value)
            };
            FeatureSlot {
                name: name.clone(),
                value,
            }
        })
        .collect();

    FeatureRow { slots }
}

/// Which side of the train/serve boundary a projection runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Establish the schema from the batch
    Fit,
    /// Enforce a previously fitted schema
    Apply,
}

/// Feature rows plus the schema they conform to
#[derive(Debug, Clone)]
pub struct Projection {
    pub rows: Vec<FeatureRow>,
    pub metadata: SchemaMetadata,
}

/// Fit/apply entry points around [`transform_record`]
pub struct FeatureProjector;

impl FeatureProjector {
    /// Establish the schema from a training batch and project every record.
    ///
    /// The returned metadata is part of the deployable model artifact and
    /// must be persisted alongside it.
    pub fn fit(records: &[RawRecord]) -> Result<Projection> {
        if records.is_empty() {
            warn!("Fitting feature schema on an empty batch");
        }

        let transformed: Vec<TransformedRecord> = records.iter().map(transform_record).collect();

        let feature_order: Vec<String> = FEATURE_CANDIDATES
            .iter()
            .filter(|name| transformed.iter().any(|t| t.contains(name)) || is_always_present(name))
            .map(|name| name.to_string())
            .collect();

        let categorical_features: Vec<String> = feature_order
            .iter()
            .filter(|name| is_text_candidate(name))
            .cloned()
            .collect();

        let metadata = SchemaMetadata::new(feature_order, categorical_features)?;
        debug!(
            "Fitted schema on {} records: {:?}",
            records.len(),
            metadata.feature_order()
        );

        let rows = transformed
            .iter()
            .map(|t| enforce_schema(t, &metadata))
            .collect();

        Ok(Projection { rows, metadata })
    }

    /// Project one record under a fitted schema
    pub fn apply(record: &RawRecord, metadata: &SchemaMetadata) -> FeatureRow {
        enforce_schema(&transform_record(record), metadata)
    }

    /// Project a batch under a fitted schema
    pub fn apply_batch(records: &[RawRecord], metadata: &SchemaMetadata) -> Vec<FeatureRow> {
        records.iter().map(|r| Self::apply(r, metadata)).collect()
    }

    /// Single dispatcher over [`fit`](Self::fit) and
    /// [`apply_batch`](Self::apply_batch). Apply mode requires metadata.
    pub fn project(
        records: &[RawRecord],
        metadata: Option<&SchemaMetadata>,
        mode: ProjectionMode,
    ) -> Result<Projection> {
        match mode {
            ProjectionMode::Fit => Self::fit(records),
            ProjectionMode::Apply => {
                let metadata = metadata.ok_or_else(|| {
                    PipelineError::configuration("schema metadata is required in apply mode")
                })?;
                Ok(Projection {
                    rows: Self::apply_batch(records, metadata),
                    metadata: metadata.clone(),
                })
            }
        }
    }
}

fn is_always_present(name: &str) -> bool {
    matches!(
        name,
        FUNDING_TOTAL | FUNDING_TOTAL_LOG | FUNDING_ROUNDS | MAIN_CATEGORY
    )
}

fn is_text_candidate(name: &str) -> bool {
    name == MAIN_CATEGORY || GEOGRAPHY_FIELDS.contains(&name)
}
