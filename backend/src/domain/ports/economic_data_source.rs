//! Driven port for fetching report series from the external data provider.
//!
//! The domain owns the request options and the raw response shape so the
//! reconciliation engine stays provider-agnostic. Values arrive as untrusted
//! strings; parsing them into points is a domain concern.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Interval, Maturity, ReportType};

/// Sub-report discriminators sent with a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FetchOptions {
    /// Sampling interval, when the report supports more than one.
    pub interval: Option<Interval>,
    /// Treasury maturity, for yield reports.
    pub maturity: Option<Maturity>,
}

impl FetchOptions {
    /// Options the scheduler uses for `report`.
    ///
    /// Treasury yields are pulled daily at their own maturity; every other
    /// report uses the provider default.
    #[must_use]
    pub const fn for_report(report: ReportType) -> Self {
        match report {
            ReportType::TreasuryYield(maturity) => Self {
                interval: Some(Interval::Daily),
                maturity: Some(maturity),
            },
            _ => Self {
                interval: None,
                maturity: None,
            },
        }
    }
}

/// One untrusted observation as published by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation {
    /// Date string, expected as `YYYY-MM-DD`.
    pub date: String,
    /// Value string; may hold placeholders such as `"."`.
    pub value: String,
}

impl RawObservation {
    /// Build a raw observation from string slices.
    pub fn new(date: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            value: value.into(),
        }
    }
}

/// Provider response for one report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderReport {
    /// Series name reported by the provider.
    pub name: String,
    /// Sampling interval reported by the provider.
    pub interval: String,
    /// Unit of the values.
    pub unit: String,
    /// Observations in provider order.
    pub data: Vec<RawObservation>,
}

define_port_error! {
    /// Errors surfaced while calling the data provider.
    pub enum EconomicDataSourceError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "provider transport failed: {message}",
        /// Provider call exceeded its timeout.
        Timeout { message: String } =>
            "provider timeout: {message}",
        /// Provider throttled the request.
        RateLimited { message: String } =>
            "provider rate limited request: {message}",
        /// Provider payload could not be decoded.
        Decode { message: String } =>
            "provider response decode failed: {message}",
        /// Provider rejected the request.
        InvalidRequest { message: String } =>
            "provider request invalid: {message}",
    }
}

impl EconomicDataSourceError {
    /// Return whether a later attempt is expected to help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

/// Port for fetching one report's full series from the provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EconomicDataSource: Send + Sync {
    /// Fetch every observation the provider publishes for `report`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use pulse_backend::domain::ReportType;
    /// use pulse_backend::domain::ports::{
    ///     EconomicDataSource, FetchOptions, FixtureEconomicDataSource,
    /// };
    ///
    /// let source = FixtureEconomicDataSource;
    /// let report = source
    ///     .fetch_report(ReportType::Cpi, &FetchOptions::default())
    ///     .await?;
    /// assert!(report.data.is_empty());
    /// # Ok::<(), pulse_backend::domain::ports::EconomicDataSourceError>(())
    /// ```
    async fn fetch_report(
        &self,
        report: ReportType,
        options: &FetchOptions,
    ) -> Result<ProviderReport, EconomicDataSourceError>;
}

/// Fixture implementation returning an empty series.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureEconomicDataSource;

#[async_trait]
impl EconomicDataSource for FixtureEconomicDataSource {
    async fn fetch_report(
        &self,
        _report: ReportType,
        _options: &FetchOptions,
    ) -> Result<ProviderReport, EconomicDataSourceError> {
        Ok(ProviderReport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn treasury_yields_fetch_daily_at_their_maturity() {
        let options = FetchOptions::for_report(ReportType::TreasuryYield(Maturity::TwoYear));
        assert_eq!(options.interval, Some(Interval::Daily));
        assert_eq!(options.maturity, Some(Maturity::TwoYear));
    }

    #[rstest]
    fn other_reports_use_provider_defaults() {
        assert_eq!(FetchOptions::for_report(ReportType::Cpi), FetchOptions::default());
    }

    #[rstest]
    #[case::transport(EconomicDataSourceError::transport("reset"), true)]
    #[case::timeout(EconomicDataSourceError::timeout("slow"), true)]
    #[case::throttled(EconomicDataSourceError::rate_limited("note"), true)]
    #[case::decode(EconomicDataSourceError::decode("bad json"), false)]
    #[case::invalid(EconomicDataSourceError::invalid_request("bad key"), false)]
    fn retryable_errors_are_transient(#[case] error: EconomicDataSourceError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }
}
