//! PostgreSQL-backed report metadata adapter.

use chrono::{DateTime, Utc};
use diesel::QueryableByName;
use diesel::sql_query;
use diesel::sql_types::{Integer, Jsonb, Text, Timestamptz};
use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::domain::ReportMetadata;
use crate::domain::ports::{ReportMetadataRepository, ReportMetadataRepositoryError};

use super::diesel_helpers::{map_diesel_error_message, map_pool_error_message};
use super::pool::{DbPool, PoolError};

/// Diesel-backed implementation of the report metadata port.
#[derive(Clone)]
pub struct DieselReportMetadataRepository {
    pool: DbPool,
}

impl DieselReportMetadataRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT slug, display_name, description, image, last_data_pull, \
     initial_sync_delay_minutes, extras FROM economic_report";

const TOUCH_SQL: &str = "UPDATE economic_report SET last_data_pull = NOW() WHERE slug = $1";

#[derive(Debug, QueryableByName)]
struct ReportRow {
    #[diesel(sql_type = Text)]
    slug: String,
    #[diesel(sql_type = Text)]
    display_name: String,
    #[diesel(sql_type = Text)]
    description: String,
    #[diesel(sql_type = Text)]
    image: String,
    #[diesel(sql_type = Timestamptz)]
    last_data_pull: DateTime<Utc>,
    #[diesel(sql_type = Integer)]
    initial_sync_delay_minutes: i32,
    #[diesel(sql_type = Jsonb)]
    extras: Value,
}

impl From<ReportRow> for ReportMetadata {
    fn from(row: ReportRow) -> Self {
        Self {
            slug: row.slug,
            display_name: row.display_name,
            description: row.description,
            image: row.image,
            last_pull_date: row.last_data_pull,
            initial_sync_delay_minutes: u32::try_from(row.initial_sync_delay_minutes)
                .unwrap_or(0),
            extras: row.extras,
        }
    }
}

fn map_pool_error(error: PoolError) -> ReportMetadataRepositoryError {
    ReportMetadataRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(
    operation: &'static str,
) -> impl FnOnce(diesel::result::Error) -> ReportMetadataRepositoryError {
    move |error| ReportMetadataRepositoryError::query(map_diesel_error_message(error, operation))
}

#[async_trait::async_trait]
impl ReportMetadataRepository for DieselReportMetadataRepository {
    async fn list_reports(&self) -> Result<Vec<ReportMetadata>, ReportMetadataRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ReportRow> = sql_query(format!("{SELECT_COLUMNS} ORDER BY slug"))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error("list economic reports"))?;
        Ok(rows.into_iter().map(ReportMetadata::from).collect())
    }

    async fn find_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ReportMetadata>, ReportMetadataRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut rows: Vec<ReportRow> = sql_query(format!("{SELECT_COLUMNS} WHERE slug = $1"))
            .bind::<Text, _>(slug)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error("find economic report"))?;
        Ok(rows.pop().map(ReportMetadata::from))
    }

    async fn touch_last_pull(&self, slug: &str) -> Result<(), ReportMetadataRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = sql_query(TOUCH_SQL)
            .bind::<Text, _>(slug)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error("touch economic report"))?;
        if updated == 0 {
            return Err(ReportMetadataRepositoryError::query(format!(
                "no economic report row for slug {slug}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    fn row(minutes: i32) -> ReportRow {
        ReportRow {
            slug: "cpi".to_owned(),
            display_name: "CPI".to_owned(),
            description: "Consumer prices".to_owned(),
            image: "cpi.svg".to_owned(),
            last_data_pull: DateTime::<Utc>::default(),
            initial_sync_delay_minutes: minutes,
            extras: serde_json::json!({"unit": "index"}),
        }
    }

    #[rstest]
    fn rows_map_onto_metadata() {
        let metadata = ReportMetadata::from(row(2));
        assert_eq!(metadata.slug, "cpi");
        assert_eq!(metadata.initial_delay(), Duration::from_secs(120));
        assert_eq!(metadata.extras["unit"], "index");
    }

    #[rstest]
    fn negative_delay_falls_back_to_default() {
        let metadata = ReportMetadata::from(row(-5));
        assert_eq!(metadata.initial_sync_delay_minutes, 0);
        assert_eq!(metadata.initial_delay(), Duration::from_secs(5));
    }

    #[rstest]
    fn touch_uses_store_clock() {
        assert!(TOUCH_SQL.contains("NOW()"));
        assert!(TOUCH_SQL.ends_with("WHERE slug = $1"));
    }
}
