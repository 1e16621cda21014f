//! PostgreSQL-backed time-series adapter.
//!
//! Every report lives in its own `(time DATE PRIMARY KEY, value NUMERIC)`
//! table. Table names come only from [`ReportType::table_name`], so the
//! interpolated identifiers below are a closed, compile-time set. Values
//! cross the wire as text and are parsed into [`rust_decimal::Decimal`] on the way out.

use chrono::NaiveDate;
use diesel::QueryableByName;
use diesel::sql_query;
use diesel::sql_types::{Array, BigInt, Date, Integer, Nullable, Text};
use diesel_async::RunQueryDsl;
use pagination::{PageRequest, Paginated};

use crate::domain::ports::{StatsQuery, TimeSeriesRepository, TimeSeriesRepositoryError};
use crate::domain::{EconomicPoint, EconomicPointWithChange, ReportType, StatsBucket};

use super::diesel_helpers::{
    collect_rows, count_to_u64, map_diesel_error_message, map_pool_error_message, parse_numeric,
    parse_optional_numeric,
};
use super::pool::{DbPool, PoolError};

/// Diesel-backed implementation of the time-series port.
#[derive(Clone)]
pub struct DieselTimeSeriesRepository {
    pool: DbPool,
}

impl DieselTimeSeriesRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(QueryableByName)]
struct PointRow {
    #[diesel(sql_type = Date)]
    time: NaiveDate,
    #[diesel(sql_type = Text)]
    value: String,
}

impl PointRow {
    fn into_point(self) -> Result<EconomicPoint, String> {
        Ok(EconomicPoint::new(self.time, parse_numeric("value", &self.value)?))
    }
}

#[derive(QueryableByName)]
struct ChangeRow {
    #[diesel(sql_type = Date)]
    time: NaiveDate,
    #[diesel(sql_type = Text)]
    value: String,
    #[diesel(sql_type = Nullable<Text>)]
    change: Option<String>,
}

impl ChangeRow {
    fn into_point(self) -> Result<EconomicPointWithChange, String> {
        Ok(EconomicPointWithChange {
            date: self.time,
            value: parse_numeric("value", &self.value)?,
            change: parse_optional_numeric("change", self.change.as_deref())?,
        })
    }
}

#[derive(QueryableByName)]
struct StatsRow {
    #[diesel(sql_type = Date)]
    bucket_start: NaiveDate,
    #[diesel(sql_type = Date)]
    bucket_end: NaiveDate,
    #[diesel(sql_type = Nullable<Text>)]
    stddev: Option<String>,
    #[diesel(sql_type = Text)]
    mean: String,
    #[diesel(sql_type = Text)]
    min: String,
    #[diesel(sql_type = Text)]
    max: String,
}

impl StatsRow {
    fn into_bucket(self) -> Result<StatsBucket, String> {
        Ok(StatsBucket {
            bucket_start: self.bucket_start,
            bucket_end: self.bucket_end,
            stddev: parse_optional_numeric("stddev", self.stddev.as_deref())?,
            mean: parse_numeric("mean", &self.mean)?,
            min: parse_numeric("min", &self.min)?,
            max: parse_numeric("max", &self.max)?,
        })
    }
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

// `older` is the next point back in time inside the filtered window.
const CHANGE_COLUMN: &str =
    "CAST(ROUND(100.0 * (1 - older / NULLIF(value, 0)), 10) AS TEXT) AS change";

fn select_all_sql(report: ReportType) -> String {
    format!(
        "SELECT time, CAST(value AS TEXT) AS value FROM {} ORDER BY time DESC",
        report.table_name()
    )
}

fn insert_sql(report: ReportType) -> String {
    format!(
        "INSERT INTO {} (time, value) VALUES ($1, $2::numeric)",
        report.table_name()
    )
}

fn insert_many_sql(report: ReportType) -> String {
    format!(
        "INSERT INTO {} (time, value) \
         SELECT t, v::numeric FROM UNNEST($1::date[], $2::text[]) AS batch(t, v)",
        report.table_name()
    )
}

fn window_cte(report: ReportType) -> String {
    format!(
        "WITH windowed AS (\
         SELECT time, value, LEAD(value) OVER (ORDER BY time DESC) AS older \
         FROM {} WHERE time > CURRENT_DATE - make_interval(years => $1::int))",
        report.table_name()
    )
}

fn interval_page_sql(report: ReportType) -> String {
    format!(
        "{} SELECT time, CAST(value AS TEXT) AS value, {CHANGE_COLUMN} \
         FROM windowed ORDER BY time DESC LIMIT $2 OFFSET $3",
        window_cte(report)
    )
}

fn interval_count_sql(report: ReportType) -> String {
    format!(
        "SELECT COUNT(*) AS count FROM {} \
         WHERE time > CURRENT_DATE - make_interval(years => $1::int)",
        report.table_name()
    )
}

fn buckets_cte(report: ReportType) -> String {
    format!(
        "WITH bucketed AS (\
         SELECT (CURRENT_DATE - time) / $2::int AS bucket, value FROM {} \
         WHERE time > CURRENT_DATE - make_interval(years => $1::int))",
        report.table_name()
    )
}

fn stats_page_sql(report: ReportType) -> String {
    format!(
        "{} SELECT \
         CURRENT_DATE - ((bucket + 1) * $2::int - 1) AS bucket_start, \
         CURRENT_DATE - bucket * $2::int AS bucket_end, \
         CAST(ROUND(stddev_samp(value), 10) AS TEXT) AS stddev, \
         CAST(ROUND(avg(value), 10) AS TEXT) AS mean, \
         CAST(min(value) AS TEXT) AS min, \
         CAST(max(value) AS TEXT) AS max \
         FROM bucketed GROUP BY bucket ORDER BY bucket ASC LIMIT $3 OFFSET $4",
        buckets_cte(report)
    )
}

fn stats_count_sql(report: ReportType) -> String {
    format!(
        "{} SELECT COUNT(DISTINCT bucket) AS count FROM bucketed",
        buckets_cte(report)
    )
}

fn latest_sql(report: ReportType) -> String {
    format!(
        "SELECT time, CAST(value AS TEXT) AS value, {CHANGE_COLUMN} \
         FROM (SELECT time, value, LEAD(value) OVER (ORDER BY time DESC) AS older \
         FROM {}) AS ranked ORDER BY time DESC LIMIT 1",
        report.table_name()
    )
}

fn sql_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn page_bounds(page: PageRequest) -> (i64, i64) {
    (
        i64::from(page.limit()),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

fn map_pool_error(error: PoolError) -> TimeSeriesRepositoryError {
    TimeSeriesRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(
    report: ReportType,
    operation: &'static str,
) -> impl FnOnce(diesel::result::Error) -> TimeSeriesRepositoryError {
    move |error| {
        let context = format!("{operation} {}", report.table_name());
        TimeSeriesRepositoryError::query(map_diesel_error_message(error, &context))
    }
}

fn map_row_error(message: String) -> TimeSeriesRepositoryError {
    TimeSeriesRepositoryError::query(message)
}

#[async_trait::async_trait]
impl TimeSeriesRepository for DieselTimeSeriesRepository {
    async fn get_all(
        &self,
        report: ReportType,
    ) -> Result<Vec<EconomicPoint>, TimeSeriesRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<PointRow> = sql_query(select_all_sql(report))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error(report, "select all from"))?;
        collect_rows(rows.into_iter().map(PointRow::into_point), map_row_error)
    }

    async fn insert(
        &self,
        report: ReportType,
        point: &EconomicPoint,
    ) -> Result<(), TimeSeriesRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        sql_query(insert_sql(report))
            .bind::<Date, _>(point.date)
            .bind::<Text, _>(point.value.to_string())
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error(report, "insert into"))?;
        Ok(())
    }

    async fn insert_many(
        &self,
        report: ReportType,
        points: &[EconomicPoint],
    ) -> Result<(), TimeSeriesRepositoryError> {
        if points.is_empty() {
            return Ok(());
        }

        let (dates, values): (Vec<NaiveDate>, Vec<String>) = points
            .iter()
            .map(|point| (point.date, point.value.to_string()))
            .unzip();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        sql_query(insert_many_sql(report))
            .bind::<Array<Date>, _>(dates)
            .bind::<Array<Text>, _>(values)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error(report, "bulk insert into"))?;
        Ok(())
    }

    async fn interval_with_change(
        &self,
        report: ReportType,
        years: u32,
        page: PageRequest,
    ) -> Result<Paginated<EconomicPointWithChange>, TimeSeriesRepositoryError> {
        let (limit, offset) = page_bounds(page);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ChangeRow> = sql_query(interval_page_sql(report))
            .bind::<Integer, _>(sql_int(years))
            .bind::<BigInt, _>(limit)
            .bind::<BigInt, _>(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error(report, "interval from"))?;
        let total: CountRow = sql_query(interval_count_sql(report))
            .bind::<Integer, _>(sql_int(years))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error(report, "count interval from"))?;

        let data = collect_rows(rows.into_iter().map(ChangeRow::into_point), map_row_error)?;
        Ok(Paginated::new(data, count_to_u64(total.count), page))
    }

    async fn stats(
        &self,
        report: ReportType,
        query: StatsQuery,
    ) -> Result<Paginated<StatsBucket>, TimeSeriesRepositoryError> {
        let (limit, offset) = page_bounds(query.page);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<StatsRow> = sql_query(stats_page_sql(report))
            .bind::<Integer, _>(sql_int(query.years))
            .bind::<Integer, _>(sql_int(query.bucket_days))
            .bind::<BigInt, _>(limit)
            .bind::<BigInt, _>(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error(report, "stats from"))?;
        let total: CountRow = sql_query(stats_count_sql(report))
            .bind::<Integer, _>(sql_int(query.years))
            .bind::<Integer, _>(sql_int(query.bucket_days))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error(report, "count stats from"))?;

        let data = collect_rows(rows.into_iter().map(StatsRow::into_bucket), map_row_error)?;
        Ok(Paginated::new(data, count_to_u64(total.count), query.page))
    }

    async fn latest_with_change(
        &self,
        report: ReportType,
    ) -> Result<Option<EconomicPointWithChange>, TimeSeriesRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut rows: Vec<ChangeRow> = sql_query(latest_sql(report))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error(report, "latest from"))?;
        rows.pop()
            .map(ChangeRow::into_point)
            .transpose()
            .map_err(map_row_error)
    }
}
