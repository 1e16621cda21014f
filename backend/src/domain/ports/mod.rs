//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod economic_data_source;
mod report_metadata_repository;
mod time_series_repository;

#[cfg(test)]
pub use economic_data_source::MockEconomicDataSource;
pub use economic_data_source::{
    EconomicDataSource, EconomicDataSourceError, FetchOptions, FixtureEconomicDataSource,
    ProviderReport, RawObservation,
};
#[cfg(test)]
pub use report_metadata_repository::MockReportMetadataRepository;
pub use report_metadata_repository::{
    FixtureReportMetadataRepository, ReportMetadataRepository, ReportMetadataRepositoryError,
};
#[cfg(test)]
pub use time_series_repository::MockTimeSeriesRepository;
pub use time_series_repository::{
    DEFAULT_BUCKET_DAYS, DEFAULT_YEARS, FixtureTimeSeriesRepository, StatsQuery,
    TimeSeriesRepository, TimeSeriesRepositoryError,
};
