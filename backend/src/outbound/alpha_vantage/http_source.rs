//! Reqwest-backed Alpha Vantage source adapter.
//!
//! This adapter owns transport details only: query construction, timeout and
//! HTTP error mapping, and JSON decoding into provider reports. Values stay
//! as raw strings; parsing them is the reconciliation engine's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::{AlphaVantageResponseDto, DecodedBody};
use crate::domain::ports::{
    EconomicDataSource, EconomicDataSourceError, FetchOptions, ProviderReport,
};
use crate::domain::{Interval, Maturity, ReportType};

const DEFAULT_USER_AGENT: &str = "pulse-backend-sync/0.1";

/// Alpha Vantage source adapter issuing GET requests against one base URL.
pub struct AlphaVantageHttpSource {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl AlphaVantageHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// `base_url` is the provider origin, e.g. `https://www.alphavantage.co`;
    /// requests go to its `/query` path.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        let mut endpoint = base_url;
        endpoint.set_path("/query");
        endpoint.set_query(None);
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    fn request_url(&self, report: ReportType, options: &FetchOptions) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("function", function_name(report));
            if let Some(interval) = options.interval {
                query.append_pair("interval", interval_param(interval));
            }
            if let Some(maturity) = options.maturity {
                query.append_pair("maturity", maturity_param(maturity));
            }
            query.append_pair("datatype", "json");
            query.append_pair("apikey", &self.api_key);
        }
        url
    }
}

#[async_trait]
impl EconomicDataSource for AlphaVantageHttpSource {
    async fn fetch_report(
        &self,
        report: ReportType,
        options: &FetchOptions,
    ) -> Result<ProviderReport, EconomicDataSourceError> {
        let response = self
            .client
            .get(self.request_url(report, options))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let decoded = parse_report(body.as_ref())?;
        debug!(
            report = %report,
            observations = decoded.data.len(),
            "provider report decoded"
        );
        Ok(decoded)
    }
}

const fn function_name(report: ReportType) -> &'static str {
    match report {
        ReportType::Cpi => "CPI",
        ReportType::ConsumerSentiment => "CONSUMER_SENTIMENT",
        ReportType::RetailSales => "RETAIL_SALES",
        ReportType::TreasuryYield(_) => "TREASURY_YIELD",
        ReportType::RealGdp => "REAL_GDP",
        ReportType::RealGdpPerCapita => "REAL_GDP_PER_CAPITA",
        ReportType::Unemployment => "UNEMPLOYMENT",
        ReportType::NonfarmPayroll => "NONFARM_PAYROLL",
        ReportType::DurableGoodsOrders => "DURABLE_GOODS_ORDERS",
        ReportType::FederalFundsRate => "FEDERAL_FUNDS_RATE",
        ReportType::Inflation => "INFLATION",
        ReportType::InflationExpectation => "INFLATION_EXPECTATION",
    }
}

const fn interval_param(interval: Interval) -> &'static str {
    match interval {
        Interval::Daily => "daily",
        Interval::Weekly => "weekly",
        Interval::Monthly => "monthly",
        Interval::Quarterly => "quarterly",
        Interval::Annual => "annual",
    }
}

const fn maturity_param(maturity: Maturity) -> &'static str {
    match maturity {
        Maturity::ThreeMonth => "3month",
        Maturity::TwoYear => "2year",
        Maturity::FiveYear => "5year",
        Maturity::SevenYear => "7year",
        Maturity::TenYear => "10year",
        Maturity::ThirtyYear => "30year",
    }
}

fn parse_report(body: &[u8]) -> Result<ProviderReport, EconomicDataSourceError> {
    let decoded: AlphaVantageResponseDto = serde_json::from_slice(body).map_err(|error| {
        EconomicDataSourceError::decode(format!("invalid Alpha Vantage JSON payload: {error}"))
    })?;
    match decoded.into_decoded() {
        DecodedBody::Report(report) => Ok(report),
        DecodedBody::Throttled(message) => Err(EconomicDataSourceError::rate_limited(message)),
        DecodedBody::Rejected(message) => Err(EconomicDataSourceError::invalid_request(message)),
        DecodedBody::MissingData => Err(EconomicDataSourceError::decode(format!(
            "payload has no data field: {}",
            body_preview(body)
        ))),
    }
}

// The request URL carries the API key, so it never reaches error messages.
fn map_transport_error(error: reqwest::Error) -> EconomicDataSourceError {
    let error = error.without_url();
    if error.is_timeout() {
        EconomicDataSourceError::timeout(error.to_string())
    } else {
        EconomicDataSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> EconomicDataSourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => EconomicDataSourceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            EconomicDataSourceError::timeout(message)
        }
        _ if status.is_client_error() => EconomicDataSourceError::invalid_request(message),
        _ => EconomicDataSourceError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network Alpha Vantage mapping helpers.

    use super::*;
    use crate::domain::ports::RawObservation;
    use rstest::{fixture, rstest};

    #[fixture]
    fn source() -> AlphaVantageHttpSource {
        let base = Url::parse("https://www.alphavantage.co/ignored?x=1").expect("valid url");
        AlphaVantageHttpSource::new(base, "demo-key", Duration::from_secs(5))
            .expect("client builds")
    }

    #[rstest]
    fn treasury_request_carries_interval_and_maturity(source: AlphaVantageHttpSource) {
        let report = ReportType::TreasuryYield(Maturity::TenYear);
        let url = source.request_url(report, &FetchOptions::for_report(report));

        assert_eq!(url.path(), "/query");
        assert_eq!(
            url.query(),
            Some("function=TREASURY_YIELD&interval=daily&maturity=10year&datatype=json&apikey=demo-key")
        );
    }

    #[rstest]
    fn plain_report_request_omits_optional_parameters(source: AlphaVantageHttpSource) {
        let url = source.request_url(ReportType::Cpi, &FetchOptions::default());
        assert_eq!(
            url.query(),
            Some("function=CPI&datatype=json&apikey=demo-key")
        );
    }

    #[rstest]
    #[case(Maturity::ThreeMonth, "3month")]
    #[case(Maturity::TwoYear, "2year")]
    #[case(Maturity::FiveYear, "5year")]
    #[case(Maturity::SevenYear, "7year")]
    #[case(Maturity::ThirtyYear, "30year")]
    fn maturities_use_provider_spelling(#[case] maturity: Maturity, #[case] expected: &str) {
        assert_eq!(maturity_param(maturity), expected);
    }

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, "rate_limited")]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, "timeout")]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "timeout")]
    #[case::bad_request(StatusCode::BAD_REQUEST, "invalid_request")]
    #[case::forbidden(StatusCode::FORBIDDEN, "invalid_request")]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, "transport")]
    #[case::bad_gateway(StatusCode::BAD_GATEWAY, "transport")]
    fn maps_http_statuses_to_expected_domain_errors(
        #[case] status: StatusCode,
        #[case] expected: &str,
    ) {
        let error = map_status_error(status, b"{\"message\": \"upstream unavailable\"}");
        assert_eq!(error.kind(), expected);
        assert!(error.to_string().contains(&status.as_u16().to_string()));
    }

    #[rstest]
    fn parses_series_into_raw_observations() {
        let body = r#"{
            "name": "Consumer Price Index for all Urban Consumers",
            "interval": "monthly",
            "unit": "index 1982-1984=100",
            "data": [
                { "date": "2024-02-01", "value": "310.326" },
                { "date": "2024-01-01", "value": "." }
            ]
        }"#;

        let report = parse_report(body.as_bytes()).expect("JSON should decode");
        assert_eq!(report.interval, "monthly");
        assert_eq!(
            report.data,
            vec![
                RawObservation::new("2024-02-01", "310.326"),
                RawObservation::new("2024-01-01", "."),
            ]
        );
    }

    #[rstest]
    #[case::note(r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}"#)]
    #[case::information(r#"{"Information": "API rate limit reached"}"#)]
    fn throttling_notes_map_to_rate_limited(#[case] body: &str) {
        let error = parse_report(body.as_bytes()).expect_err("throttled body");
        assert!(matches!(error, EconomicDataSourceError::RateLimited { .. }));
    }

    #[rstest]
    fn error_message_maps_to_invalid_request() {
        let body = r#"{"Error Message": "Invalid API call."}"#;
        let error = parse_report(body.as_bytes()).expect_err("rejected body");
        assert_eq!(error, EconomicDataSourceError::invalid_request("Invalid API call."));
    }

    #[rstest]
    #[case::malformed("<html>maintenance</html>")]
    #[case::no_data(r#"{"name": "CPI"}"#)]
    fn undecodable_bodies_map_to_decode(#[case] body: &str) {
        let error = parse_report(body.as_bytes()).expect_err("decode failure");
        assert!(matches!(error, EconomicDataSourceError::Decode { .. }));
    }

    #[rstest]
    fn long_bodies_are_truncated_in_previews() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.len(), 163);
        assert!(preview.ends_with("..."));
    }
}
