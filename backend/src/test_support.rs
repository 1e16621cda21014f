//! Test utilities for the backend crate.
//!
//! Shared helpers for unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for tests and behind the `test-support` feature.

mod clock;
mod in_memory;

pub use clock::MutableClock;
pub use in_memory::{
    InMemoryReportMetadataRepository, InMemoryTimeSeriesRepository, ScriptedDataSource,
};
