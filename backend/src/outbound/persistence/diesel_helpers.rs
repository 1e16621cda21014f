//! Shared helpers for Diesel repository implementations.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::debug;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Extract a readable message from a Diesel error and emit debug context.
pub fn map_diesel_error_message(error: diesel::result::Error, operation: &str) -> String {
    let error_message = error.to_string();
    debug!(%error_message, %operation, "diesel operation failed");
    error_message
}

/// Parse a `NUMERIC` column rendered as text.
pub fn parse_numeric(column: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|error| format!("column {column} holds non-decimal value {raw:?}: {error}"))
}

/// Parse an optional `NUMERIC` column rendered as text.
pub fn parse_optional_numeric(column: &str, raw: Option<&str>) -> Result<Option<Decimal>, String> {
    raw.map(|value| parse_numeric(column, value)).transpose()
}

/// Collect row conversion results, mapping the first error through `map_err`.
pub fn collect_rows<T, E>(
    results: impl Iterator<Item = Result<T, String>>,
    map_err: impl FnOnce(String) -> E,
) -> Result<Vec<T>, E> {
    results.collect::<Result<Vec<_>, _>>().map_err(map_err)
}

/// Convert a row count to `u64`; negative counts become zero.
pub fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("308.417", dec!(308.417))]
    #[case("-0.0100000000", dec!(-0.01))]
    #[case("1e3", dec!(1000))]
    fn numeric_text_parses(#[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(parse_numeric("value", raw), Ok(expected));
    }

    #[rstest]
    fn non_numeric_text_names_the_column() {
        let error = parse_numeric("mean", "NaN").expect_err("NaN is not a decimal");
        assert!(error.contains("mean"));
    }

    #[rstest]
    fn missing_optional_numeric_is_none() {
        assert_eq!(parse_optional_numeric("change", None), Ok(None));
    }

    #[rstest]
    fn collect_rows_stops_at_first_error() {
        let rows = vec![Ok(1), Err("bad row".to_owned()), Err("later".to_owned())];
        let collected: Result<Vec<i32>, String> =
            collect_rows(rows.into_iter(), |message| format!("mapped: {message}"));
        assert_eq!(collected, Err("mapped: bad row".to_owned()));
    }

    #[rstest]
    #[case(42, 42)]
    #[case(-1, 0)]
    fn counts_never_go_negative(#[case] count: i64, #[case] expected: u64) {
        assert_eq!(count_to_u64(count), expected);
    }
}
