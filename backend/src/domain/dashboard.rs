//! Latest-value summaries for the dashboard.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::timeout;
use tracing::info;

use crate::domain::ports::TimeSeriesRepository;
use crate::domain::{Maturity, ReportType};

const CPI_HEADER: &str = "Monthly CPI";
const CONSUMER_SENTIMENT_HEADER: &str = "Monthly Consumer Sentiment";
const TREASURY_HEADER: &str = "Treasury Yields";

/// Latest value of one series with its change against the previous point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Display name of the series.
    pub name: String,
    /// Date of the latest point.
    pub last_update: NaiveDate,
    /// Latest value.
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    /// Percentage change against the previous point, if there is one.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub change: Option<Decimal>,
}

/// A titled group of summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryHeader {
    /// Group title.
    pub header_name: String,
    /// Summaries in display order.
    pub summaries: Vec<Summary>,
}

fn treasury_label(maturity: Maturity) -> &'static str {
    match maturity {
        Maturity::ThreeMonth => "Treasury Yield - 3 Months",
        Maturity::TwoYear => "Treasury Yield - 2 Years",
        Maturity::FiveYear => "Treasury Yield - 5 Years",
        Maturity::SevenYear => "Treasury Yield - 7 Years",
        Maturity::TenYear => "Treasury Yield - 10 Years",
        Maturity::ThirtyYear => "Treasury Yield - 30 Years",
    }
}

/// Builds the dashboard from each report's latest point.
#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn TimeSeriesRepository>,
    deadline: Duration,
}

impl DashboardService {
    /// Read latest points from `repository`, bounded by `deadline`.
    #[must_use]
    pub fn new(repository: Arc<dyn TimeSeriesRepository>, deadline: Duration) -> Self {
        Self {
            repository,
            deadline,
        }
    }

    /// CPI and consumer sentiment headers appear only when they have data;
    /// the treasury header is always present, possibly empty. A failed or
    /// empty lookup is logged and its entry skipped.
    pub async fn summary(&self) -> Vec<SummaryHeader> {
        let mut headers = Vec::with_capacity(3);
        for (report, name) in [
            (ReportType::Cpi, CPI_HEADER),
            (ReportType::ConsumerSentiment, CONSUMER_SENTIMENT_HEADER),
        ] {
            if let Some(summary) = self.summarise(report, name).await {
                headers.push(SummaryHeader {
                    header_name: name.to_owned(),
                    summaries: vec![summary],
                });
            }
        }

        let treasuries = join_all(Maturity::ALL.map(|maturity| {
            self.summarise(ReportType::TreasuryYield(maturity), treasury_label(maturity))
        }))
        .await;
        headers.push(SummaryHeader {
            header_name: TREASURY_HEADER.to_owned(),
            summaries: treasuries.into_iter().flatten().collect(),
        });
        headers
    }

    async fn summarise(&self, report: ReportType, name: &str) -> Option<Summary> {
        match timeout(self.deadline, self.repository.latest_with_change(report)).await {
            Ok(Ok(Some(latest))) => Some(Summary {
                name: name.to_owned(),
                last_update: latest.date,
                value: latest.value,
                change: latest.change,
            }),
            Ok(Ok(None)) => {
                info!(report = %report, header = name, "no data for dashboard summary");
                None
            }
            Ok(Err(error)) => {
                info!(report = %report, header = name, error = %error, "dashboard summary lookup failed");
                None
            }
            Err(_) => {
                info!(report = %report, header = name, "dashboard summary lookup timed out");
                None
            }
        }
    }
}
