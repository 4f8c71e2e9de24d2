//! Label construction for historical records

pub mod dates;
pub mod labels;

pub use dates::{elapsed_days, parse_date};
pub use labels::{LabelBuilder, LabelSummary, Labels, OutcomeLabel, DEFAULT_MIN_OPERATING_YEARS};
