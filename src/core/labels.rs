//! Success label construction
//!
//! A company counts as a success when it was acquired, went public, or is
//! still operating after at least `min_operating_years` between founding and
//! its last funding round. Operating companies younger than that have an
//! unknown outcome and must be left out of training.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dates::{elapsed_days, parse_date};
use crate::error::{PipelineError, Result};
use crate::models::{RawRecord, RawValue};

/// Default minimum age for an operating company to count as a success
pub const DEFAULT_MIN_OPERATING_YEARS: f64 = 3.0;

const DAYS_PER_YEAR: f64 = 365.25;

const SUCCESS_STATUSES: [&str; 2] = ["acquired", "ipo"];
const OPERATING_STATUS: &str = "operating";

/// Outcome for a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeLabel {
    /// 1 for success, 0 otherwise. Meaningless when `unknown` is set.
    pub success: u8,
    /// Outcome cannot be determined yet; exclude from training
    pub unknown: bool,
}

/// Labels for a batch, aligned 1:1 with the input records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    pub success: Vec<u8>,
    pub unknown_mask: Vec<bool>,
}

/// Label distribution for a batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub total: usize,
    pub unknown: usize,
    pub successes: usize,
    pub failures: usize,
}

impl LabelSummary {
    /// Share of successes among rows with a known outcome
    pub fn success_rate(&self) -> f64 {
        let known = self.successes + self.failures;
        if known == 0 {
            0.0
        } else {
            self.successes as f64 / known as f64
        }
    }
}

impl Labels {
    pub fn len(&self) -> usize {
        self.success.len()
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<OutcomeLabel> {
        Some(OutcomeLabel {
            success: *self.success.get(index)?,
            unknown: *self.unknown_mask.get(index)?,
        })
    }

    /// Indices of rows whose outcome is known
    pub fn known_indices(&self) -> Vec<usize> {
        self.unknown_mask
            .iter()
            .enumerate()
            .filter(|(_, &unknown)| !unknown)
            .map(|(i, _)| i)
            .collect()
    }

    /// Training subset: the records with a known outcome and their labels
    pub fn select_known(&self, records: &[RawRecord]) -> (Vec<RawRecord>, Vec<u8>) {
        self.known_indices()
            .into_iter()
            .filter_map(|i| Some((records.get(i)?.clone(), self.success[i])))
            .unzip()
    }

    pub fn summary(&self) -> LabelSummary {
        let mut summary = LabelSummary {
            total: self.len(),
            unknown: 0,
            successes: 0,
            failures: 0,
        };

        for (&success, &unknown) in self.success.iter().zip(&self.unknown_mask) {
            if unknown {
                summary.unknown += 1;
            } else if success == 1 {
                summary.successes += 1;
            } else {
                summary.failures += 1;
            }
        }

        summary
    }
}

/// Builds (label, unknown flag) pairs from raw historical records
#[derive(Debug, Clone)]
pub struct LabelBuilder {
    min_operating_years: f64,
}

impl LabelBuilder {
    /// Fails unless the threshold is a finite, non-negative number of years
    pub fn new(min_operating_years: f64) -> Result<Self> {
        if !min_operating_years.is_finite() || min_operating_years < 0.0 {
            return Err(PipelineError::configuration(format!(
                "minimum operating years must be a non-negative number, got {}",
                min_operating_years
            )));
        }
        Ok(Self {
            min_operating_years,
        })
    }

    pub fn min_operating_years(&self) -> f64 {
        self.min_operating_years
    }

    /// Label every record in the batch. Never fails.
    pub fn build(&self, records: &[RawRecord]) -> Labels {
        let mut labels = Labels {
            success: Vec::with_capacity(records.len()),
            unknown_mask: Vec::with_capacity(records.len()),
        };

        for record in records {
            let outcome = self.label(record);
            labels.success.push(outcome.success);
            labels.unknown_mask.push(outcome.unknown);
        }

        debug!(
            "Labelled {} records ({} unknown)",
            labels.len(),
            labels.unknown_mask.iter().filter(|&&u| u).count()
        );
        labels
    }

    /// Label a single record
    pub fn label(&self, record: &RawRecord) -> OutcomeLabel {
        let status = status_of(record);
        let age = age_years(record);

        let is_operating = status == OPERATING_STATUS;
        let old_enough = age >= self.min_operating_years;

        let success = SUCCESS_STATUSES.contains(&status.as_str()) || (is_operating && old_enough);

        OutcomeLabel {
            success: u8::from(success),
            unknown: is_operating && !old_enough,
        }
    }
}

impl Default for LabelBuilder {
    fn default() -> Self {
        Self {
            min_operating_years: DEFAULT_MIN_OPERATING_YEARS,
        }
    }
}

/// Lower-cased status, `"unknown"` when absent or not text
fn status_of(record: &RawRecord) -> String {
    match record.value("status") {
        Some(RawValue::Text(s)) => s.trim().to_lowercase(),
        Some(other) => other.as_text().unwrap_or_default().to_lowercase(),
        None => "unknown".to_string(),
    }
}

/// Years between founding and last funding; zero if either date is unparseable
fn age_years(record: &RawRecord) -> f64 {
    let founded = record.value("founded_at").and_then(parse_date);
    let last_funding = record.value("last_funding_at").and_then(parse_date);
    elapsed_days(founded, last_funding) / DAYS_PER_YEAR
}
