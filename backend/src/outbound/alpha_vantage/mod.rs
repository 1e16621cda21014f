//! Alpha Vantage outbound adapter.
//!
//! A thin HTTP implementation of the `EconomicDataSource` port.

mod dto;
mod http_source;

pub use http_source::AlphaVantageHttpSource;
