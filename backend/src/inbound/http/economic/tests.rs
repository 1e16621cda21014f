//! Handler-level tests for the economic series endpoints.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use chrono::{NaiveDate, TimeZone, Utc};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::domain::{EconomicPoint, Maturity, ReportType, StatsBucket};
use crate::inbound::http::configure_api;
use crate::inbound::http::state::HttpState;
use crate::test_support::{InMemoryTimeSeriesRepository, MutableClock};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[fixture]
fn repository() -> Arc<InMemoryTimeSeriesRepository> {
    let now = Utc
        .with_ymd_and_hms(2026, 2, 26, 12, 0, 0)
        .single()
        .expect("valid time");
    let repository = InMemoryTimeSeriesRepository::new(Arc::new(MutableClock::new(now)));
    repository.seed(
        ReportType::Cpi,
        vec![
            EconomicPoint::new(day(2026, 1, 1), dec!(320)),
            EconomicPoint::new(day(2025, 12, 1), dec!(316.8)),
            EconomicPoint::new(day(2025, 11, 1), dec!(316)),
            EconomicPoint::new(day(2010, 1, 1), dec!(217)),
        ],
    );
    repository.seed_stats(
        ReportType::Cpi,
        vec![StatsBucket {
            bucket_start: day(2025, 2, 27),
            bucket_end: day(2026, 2, 26),
            stddev: Some(dec!(2.1)),
            mean: dec!(317.6),
            min: dec!(316),
            max: dec!(320),
        }],
    );
    repository.seed(
        ReportType::TreasuryYield(Maturity::TenYear),
        vec![EconomicPoint::new(day(2026, 2, 25), dec!(4.1))],
    );
    Arc::new(repository)
}

async fn get(repository: Arc<InMemoryTimeSeriesRepository>, uri: &str) -> (StatusCode, Value) {
    let state = HttpState::new(repository, Duration::from_secs(5));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await;
    let response = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    let status = response.status();
    let body = test::read_body(response).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON body")
    };
    (status, json)
}

#[rstest]
#[actix_web::test]
async fn series_combines_points_meta_and_stats(repository: Arc<InMemoryTimeSeriesRepository>) {
    let (status, body) = get(repository, "/api/v1/economic/cpi?years=5&pageSize=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"][0]["date"], "2026-01-01");
    assert_eq!(body["data"][0]["value"], "320");
    let change = body["data"][0]["change"]
        .as_str()
        .and_then(|raw| Decimal::from_str(raw).ok());
    assert_eq!(change, Some(dec!(1)));
    assert_eq!(body["meta"]["totalRecords"], 3);
    assert_eq!(body["meta"]["lastPage"], 2);
    assert_eq!(body["stats"][0]["bucketEnd"], "2026-02-26");
}

#[rstest]
#[actix_web::test]
async fn stats_endpoint_returns_a_page_of_buckets(repository: Arc<InMemoryTimeSeriesRepository>) {
    let (status, body) = get(repository, "/api/v1/economic/cpi/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["mean"], "317.6");
    assert_eq!(body["meta"]["totalRecords"], 1);
}

#[rstest]
#[actix_web::test]
async fn treasury_maturity_segment_selects_the_series(
    repository: Arc<InMemoryTimeSeriesRepository>,
) {
    let (status, body) = get(repository, "/api/v1/economic/treasury_yield/10y").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["value"], "4.1");
    assert_eq!(body["data"][0]["change"], Value::Null);
}

#[rstest]
#[case::unknown_report("/api/v1/economic/gold_price")]
#[case::unknown_maturity("/api/v1/economic/treasury_yield/1y")]
#[case::unknown_maturity_stats("/api/v1/economic/treasury_yield/40y/stats")]
#[actix_web::test]
async fn unknown_series_is_not_found(
    repository: Arc<InMemoryTimeSeriesRepository>,
    #[case] uri: &str,
) {
    let (status, body) = get(repository, uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[rstest]
#[actix_web::test]
async fn every_invalid_parameter_is_listed(repository: Arc<InMemoryTimeSeriesRepository>) {
    let (status, body) = get(
        repository,
        "/api/v1/economic/cpi?years=0&pageSize=500&timeBucketDays=0",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    let fields: Vec<_> = body["details"]["errors"]
        .as_array()
        .expect("error list")
        .iter()
        .map(|error| error["field"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(fields, vec!["years", "pageSize", "timeBucketDays"]);
}

#[rstest]
#[case::series("/api/v1/economic/cpi?years=100000", "years")]
#[case::stats("/api/v1/economic/cpi/stats?timeBucketDays=4000000", "timeBucketDays")]
#[actix_web::test]
async fn oversized_windows_are_rejected_before_querying(
    repository: Arc<InMemoryTimeSeriesRepository>,
    #[case] uri: &str,
    #[case] field: &str,
) {
    let (status, body) = get(repository, uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["errors"][0]["field"], field);
}

#[rstest]
#[actix_web::test]
async fn malformed_numbers_use_the_error_envelope(repository: Arc<InMemoryTimeSeriesRepository>) {
    let (status, body) = get(repository, "/api/v1/economic/cpi?years=ten").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[rstest]
#[actix_web::test]
async fn repository_failures_are_redacted(repository: Arc<InMemoryTimeSeriesRepository>) {
    repository.fail_reads();

    let (status, body) = get(repository, "/api/v1/economic/cpi").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}
