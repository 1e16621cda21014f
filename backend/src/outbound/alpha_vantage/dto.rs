//! DTOs for decoding Alpha Vantage economic indicator responses.
//!
//! A throttled or rejected call still answers `200 OK`, with a single `Note`,
//! `Information` or `Error Message` field in place of the series. Decoding
//! into [`AlphaVantageResponseDto`] separates those bodies from real data.

use serde::Deserialize;

use crate::domain::ports::{ProviderReport, RawObservation};

#[derive(Debug, Deserialize)]
pub(super) struct AlphaVantageResponseDto {
    #[serde(default, alias = "Name")]
    pub(super) name: String,
    #[serde(default, alias = "Interval")]
    pub(super) interval: String,
    #[serde(default, alias = "Unit")]
    pub(super) unit: String,
    #[serde(default, alias = "Data")]
    pub(super) data: Option<Vec<ObservationDto>>,
    #[serde(rename = "Note")]
    pub(super) note: Option<String>,
    #[serde(rename = "Information")]
    pub(super) information: Option<String>,
    #[serde(rename = "Error Message")]
    pub(super) error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ObservationDto {
    pub(super) date: String,
    pub(super) value: String,
}

/// What a successful HTTP exchange actually carried.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum DecodedBody {
    Report(ProviderReport),
    Throttled(String),
    Rejected(String),
    MissingData,
}

impl AlphaVantageResponseDto {
    pub(super) fn into_decoded(self) -> DecodedBody {
        if let Some(message) = self.error_message {
            return DecodedBody::Rejected(message);
        }
        if let Some(message) = self.note.or(self.information) {
            return DecodedBody::Throttled(message);
        }
        match self.data {
            Some(data) => DecodedBody::Report(ProviderReport {
                name: self.name,
                interval: self.interval,
                unit: self.unit,
                data: data
                    .into_iter()
                    .map(|observation| RawObservation::new(observation.date, observation.value))
                    .collect(),
            }),
            None => DecodedBody::MissingData,
        }
    }
}
