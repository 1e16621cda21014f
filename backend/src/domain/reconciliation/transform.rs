//! Parse untrusted provider observations into points.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::EconomicPoint;
use crate::domain::ports::RawObservation;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Points parsed from one provider payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedBatch {
    /// Valid points in provider order, at most one per date.
    pub points: Vec<EconomicPoint>,
    /// Records discarded for a bad date, a bad value, or a repeated date.
    pub dropped: usize,
}

/// Parse `records`, dropping any that do not yield a dated finite value.
///
/// A repeated date keeps its first occurrence.
///
/// # Examples
/// ```
/// use pulse_backend::domain::ports::RawObservation;
/// use pulse_backend::domain::reconciliation::transform_records;
///
/// let batch = transform_records(&[
///     RawObservation::new("2024-01-01", "308.417"),
///     RawObservation::new("2023-12-01", "."),
/// ]);
/// assert_eq!(batch.points.len(), 1);
/// assert_eq!(batch.dropped, 1);
/// ```
#[must_use]
pub fn transform_records(records: &[RawObservation]) -> TransformedBatch {
    let mut seen = HashSet::with_capacity(records.len());
    let mut batch = TransformedBatch {
        points: Vec::with_capacity(records.len()),
        dropped: 0,
    };

    for record in records {
        match parse_record(record) {
            Some(point) if seen.insert(point.date) => batch.points.push(point),
            Some(point) => {
                debug!(date = %point.date, "dropping repeated provider date");
                batch.dropped += 1;
            }
            None => {
                debug!(date = %record.date, value = %record.value, "dropping unparseable observation");
                batch.dropped += 1;
            }
        }
    }
    batch
}

fn parse_record(record: &RawObservation) -> Option<EconomicPoint> {
    let date = NaiveDate::parse_from_str(record.date.trim(), DATE_FORMAT).ok()?;
    let value = parse_value(&record.value)?;
    Some(EconomicPoint::new(date, value))
}

fn parse_value(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let float: f64 = trimmed.parse().ok()?;
    if !float.is_finite() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}
