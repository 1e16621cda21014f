//! Time-series values stored per report.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One observation of an economic series.
///
/// Unique within a report by `date`; never rewritten once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicPoint {
    /// Observation date.
    pub date: NaiveDate,
    /// Observed value.
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
}

impl EconomicPoint {
    /// Build a point.
    #[must_use]
    pub const fn new(date: NaiveDate, value: Decimal) -> Self {
        Self { date, value }
    }
}

/// An observation annotated with its change against the next-older point.
///
/// `change` is `100 * (1 - older / current)` and is absent for the oldest
/// point of a window or when the current value is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicPointWithChange {
    /// Observation date.
    pub date: NaiveDate,
    /// Observed value.
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    /// Percentage change against the next-older point.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub change: Option<Decimal>,
}

impl EconomicPointWithChange {
    /// Annotate newest-first `points` with their change against the next
    /// older point. The last element, having no older neighbour, gets none.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    /// use pulse_backend::domain::{EconomicPoint, EconomicPointWithChange};
    ///
    /// let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date");
    /// let points = [
    ///     EconomicPoint::new(day(3), Decimal::from(30)),
    ///     EconomicPoint::new(day(2), Decimal::from(20)),
    ///     EconomicPoint::new(day(1), Decimal::from(10)),
    /// ];
    /// let annotated = EconomicPointWithChange::annotate(&points);
    /// assert_eq!(annotated[1].change, Some(Decimal::from(50)));
    /// assert_eq!(annotated[2].change, None);
    /// ```
    #[must_use]
    pub fn annotate(points: &[EconomicPoint]) -> Vec<Self> {
        points
            .iter()
            .enumerate()
            .map(|(index, point)| Self {
                date: point.date,
                value: point.value,
                change: points
                    .get(index + 1)
                    .and_then(|older| percentage_change(point.value, older.value)),
            })
            .collect()
    }
}

/// `100 * (1 - older / current)`, or `None` when `current` is zero.
#[must_use]
pub fn percentage_change(current: Decimal, older: Decimal) -> Option<Decimal> {
    let ratio = older.checked_div(current)?;
    Decimal::ONE_HUNDRED.checked_mul(Decimal::ONE - ratio)
}

/// Aggregates over one fixed-width time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBucket {
    /// First day covered by the bucket.
    pub bucket_start: NaiveDate,
    /// Last day covered by the bucket.
    pub bucket_end: NaiveDate,
    /// Sample standard deviation; absent for single-point buckets.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub stddev: Option<Decimal>,
    /// Arithmetic mean.
    #[serde(with = "rust_decimal::serde::str")]
    pub mean: Decimal,
    /// Smallest value.
    #[serde(with = "rust_decimal::serde::str")]
    pub min: Decimal,
    /// Largest value.
    #[serde(with = "rust_decimal::serde::str")]
    pub max: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
    }

    #[rstest]
    fn change_is_relative_to_older_neighbour() {
        let points = [
            EconomicPoint::new(day(3), dec!(30)),
            EconomicPoint::new(day(2), dec!(20)),
            EconomicPoint::new(day(1), dec!(10)),
        ];
        let annotated = EconomicPointWithChange::annotate(&points);

        let changes: Vec<_> = annotated.iter().map(|point| point.change).collect();
        assert_eq!(
            changes,
            vec![Some(dec!(100) * (Decimal::ONE - dec!(20) / dec!(30))), Some(dec!(50)), None]
        );
    }

    #[rstest]
    #[case::falling(dec!(10), dec!(20), Some(dec!(-100)))]
    #[case::flat(dec!(4.5), dec!(4.5), Some(dec!(0)))]
    #[case::zero_current(dec!(0), dec!(3), None)]
    fn percentage_change_cases(
        #[case] current: Decimal,
        #[case] older: Decimal,
        #[case] expected: Option<Decimal>,
    ) {
        assert_eq!(percentage_change(current, older), expected);
    }

    #[rstest]
    fn empty_series_annotates_to_empty() {
        assert!(EconomicPointWithChange::annotate(&[]).is_empty());
    }

    #[rstest]
    fn point_with_change_serialises_decimals_as_strings() {
        let point = EconomicPointWithChange {
            date: day(2),
            value: dec!(308.417),
            change: None,
        };
        let json = serde_json::to_value(&point).expect("serialise point");
        assert_eq!(
            json,
            serde_json::json!({"date": "2024-01-02", "value": "308.417", "change": null})
        );
    }
}
