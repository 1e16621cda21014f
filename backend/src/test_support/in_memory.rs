//! In-memory port implementations with failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use mockable::Clock;
use pagination::{PageRequest, Paginated};

use crate::domain::ports::{
    EconomicDataSource, EconomicDataSourceError, FetchOptions, ProviderReport,
    ReportMetadataRepository, ReportMetadataRepositoryError, StatsQuery, TimeSeriesRepository,
    TimeSeriesRepositoryError,
};
use crate::domain::{
    EconomicPoint, EconomicPointWithChange, ReportMetadata, ReportType, StatsBucket,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex"),
    }
}

#[derive(Default)]
struct SeriesState {
    points: HashMap<ReportType, Vec<EconomicPoint>>,
    stats: HashMap<ReportType, Vec<StatsBucket>>,
    failing_dates: HashSet<NaiveDate>,
    fail_reads: bool,
    fail_writes: bool,
    insert_calls: usize,
    insert_many_calls: usize,
}

/// Time-series store backed by a map, newest point first.
pub struct InMemoryTimeSeriesRepository {
    clock: Arc<dyn Clock>,
    state: Mutex<SeriesState>,
}

impl InMemoryTimeSeriesRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(SeriesState::default()),
        }
    }

    /// Replace the stored points for `report`.
    pub fn seed(&self, report: ReportType, points: Vec<EconomicPoint>) {
        let mut state = lock(&self.state, "series");
        let mut points = points;
        points.sort_by(|a, b| b.date.cmp(&a.date));
        state.points.insert(report, points);
    }

    /// Buckets returned verbatim by [`TimeSeriesRepository::stats`].
    pub fn seed_stats(&self, report: ReportType, buckets: Vec<StatsBucket>) {
        lock(&self.state, "series").stats.insert(report, buckets);
    }

    /// Make single inserts on `date` fail.
    pub fn fail_insert_on(&self, date: NaiveDate) {
        lock(&self.state, "series").failing_dates.insert(date);
    }

    /// Make every read fail.
    pub fn fail_reads(&self) {
        lock(&self.state, "series").fail_reads = true;
    }

    /// Make batch inserts fail.
    pub fn fail_writes(&self) {
        lock(&self.state, "series").fail_writes = true;
    }

    /// Stored points for `report`, newest first.
    pub fn points(&self, report: ReportType) -> Vec<EconomicPoint> {
        lock(&self.state, "series")
            .points
            .get(&report)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of single-point inserts attempted.
    pub fn insert_calls(&self) -> usize {
        lock(&self.state, "series").insert_calls
    }

    /// Number of batch inserts attempted.
    pub fn insert_many_calls(&self) -> usize {
        lock(&self.state, "series").insert_many_calls
    }

    fn check_reads(state: &SeriesState) -> Result<(), TimeSeriesRepositoryError> {
        if state.fail_reads {
            return Err(TimeSeriesRepositoryError::query("injected read failure"));
        }
        Ok(())
    }

    fn append(state: &mut SeriesState, report: ReportType, point: &EconomicPoint) {
        let points = state.points.entry(report).or_default();
        points.push(point.clone());
        points.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

fn page_of<T: Clone>(items: &[T], page: PageRequest) -> Paginated<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let data = items.iter().skip(offset).take(limit).cloned().collect();
    Paginated::new(data, items.len() as u64, page)
}

#[async_trait]
impl TimeSeriesRepository for InMemoryTimeSeriesRepository {
    async fn get_all(
        &self,
        report: ReportType,
    ) -> Result<Vec<EconomicPoint>, TimeSeriesRepositoryError> {
        let state = lock(&self.state, "series");
        Self::check_reads(&state)?;
        Ok(state.points.get(&report).cloned().unwrap_or_default())
    }

    async fn insert(
        &self,
        report: ReportType,
        point: &EconomicPoint,
    ) -> Result<(), TimeSeriesRepositoryError> {
        let mut state = lock(&self.state, "series");
        state.insert_calls += 1;
        if state.failing_dates.contains(&point.date) {
            return Err(TimeSeriesRepositoryError::query(format!(
                "injected insert failure for {}",
                point.date
            )));
        }
        let duplicate = state
            .points
            .get(&report)
            .is_some_and(|points| points.iter().any(|stored| stored.date == point.date));
        if duplicate {
            return Err(TimeSeriesRepositoryError::query(format!(
                "duplicate key value for {}",
                point.date
            )));
        }
        Self::append(&mut state, report, point);
        Ok(())
    }

    async fn insert_many(
        &self,
        report: ReportType,
        points: &[EconomicPoint],
    ) -> Result<(), TimeSeriesRepositoryError> {
        let mut state = lock(&self.state, "series");
        state.insert_many_calls += 1;
        if state.fail_writes {
            return Err(TimeSeriesRepositoryError::query("injected batch failure"));
        }
        for point in points {
            Self::append(&mut state, report, point);
        }
        Ok(())
    }

    async fn interval_with_change(
        &self,
        report: ReportType,
        years: u32,
        page: PageRequest,
    ) -> Result<Paginated<EconomicPointWithChange>, TimeSeriesRepositoryError> {
        let today = self.clock.utc().date_naive();
        let cutoff = today
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);
        let state = lock(&self.state, "series");
        Self::check_reads(&state)?;
        let window: Vec<EconomicPoint> = state
            .points
            .get(&report)
            .map(|points| points.iter().filter(|p| p.date > cutoff).cloned().collect())
            .unwrap_or_default();
        let annotated = EconomicPointWithChange::annotate(&window);
        Ok(page_of(&annotated, page))
    }

    async fn stats(
        &self,
        report: ReportType,
        query: StatsQuery,
    ) -> Result<Paginated<StatsBucket>, TimeSeriesRepositoryError> {
        let state = lock(&self.state, "series");
        Self::check_reads(&state)?;
        let buckets = state.stats.get(&report).cloned().unwrap_or_default();
        Ok(page_of(&buckets, query.page))
    }

    async fn latest_with_change(
        &self,
        report: ReportType,
    ) -> Result<Option<EconomicPointWithChange>, TimeSeriesRepositoryError> {
        let state = lock(&self.state, "series");
        Self::check_reads(&state)?;
        let newest: Vec<EconomicPoint> = state
            .points
            .get(&report)
            .map(|points| points.iter().take(2).cloned().collect())
            .unwrap_or_default();
        Ok(EconomicPointWithChange::annotate(&newest).into_iter().next())
    }
}

#[derive(Default)]
struct MetadataState {
    rows: HashMap<String, ReportMetadata>,
    fail_reads: bool,
    fail_touch: bool,
    touches: Vec<String>,
}

/// Metadata store whose `touch_last_pull` stamps the injected clock's time.
pub struct InMemoryReportMetadataRepository {
    clock: Arc<dyn Clock>,
    state: Mutex<MetadataState>,
}

impl InMemoryReportMetadataRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(MetadataState::default()),
        }
    }

    /// Insert or replace a row.
    pub fn upsert(&self, metadata: ReportMetadata) {
        lock(&self.state, "metadata")
            .rows
            .insert(metadata.slug.clone(), metadata);
    }

    /// Insert a never-pulled row for every report type.
    pub fn seed_all(&self) {
        for report in ReportType::all() {
            self.upsert(ReportMetadata::placeholder(report.slug()));
        }
    }

    pub fn get(&self, slug: &str) -> Option<ReportMetadata> {
        lock(&self.state, "metadata").rows.get(slug).cloned()
    }

    /// Slugs passed to `touch_last_pull`, in call order.
    pub fn touches(&self) -> Vec<String> {
        lock(&self.state, "metadata").touches.clone()
    }

    pub fn fail_reads(&self) {
        lock(&self.state, "metadata").fail_reads = true;
    }

    pub fn fail_touch(&self) {
        lock(&self.state, "metadata").fail_touch = true;
    }
}

#[async_trait]
impl ReportMetadataRepository for InMemoryReportMetadataRepository {
    async fn list_reports(&self) -> Result<Vec<ReportMetadata>, ReportMetadataRepositoryError> {
        let state = lock(&self.state, "metadata");
        if state.fail_reads {
            return Err(ReportMetadataRepositoryError::connection("injected read failure"));
        }
        let mut rows: Vec<_> = state.rows.values().cloned().collect();
        rows.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(rows)
    }

    async fn find_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ReportMetadata>, ReportMetadataRepositoryError> {
        let state = lock(&self.state, "metadata");
        if state.fail_reads {
            return Err(ReportMetadataRepositoryError::connection("injected read failure"));
        }
        Ok(state.rows.get(slug).cloned())
    }

    async fn touch_last_pull(&self, slug: &str) -> Result<(), ReportMetadataRepositoryError> {
        let now = self.clock.utc();
        let mut state = lock(&self.state, "metadata");
        state.touches.push(slug.to_owned());
        if state.fail_touch {
            return Err(ReportMetadataRepositoryError::query("injected touch failure"));
        }
        match state.rows.get_mut(slug) {
            Some(row) => {
                row.last_pull_date = now;
                Ok(())
            }
            None => Err(ReportMetadataRepositoryError::query(format!(
                "no metadata row for {slug}"
            ))),
        }
    }
}

/// Data source replaying a configured response per report.
#[derive(Default)]
pub struct ScriptedDataSource {
    responses: Mutex<HashMap<ReportType, Result<ProviderReport, EconomicDataSourceError>>>,
    calls: Mutex<Vec<(ReportType, FetchOptions)>>,
}

impl ScriptedDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every fetch of `report` with `response`.
    pub fn respond_with(
        &self,
        report: ReportType,
        response: Result<ProviderReport, EconomicDataSourceError>,
    ) {
        lock(&self.responses, "responses").insert(report, response);
    }

    /// Fetches received, in call order.
    pub fn calls(&self) -> Vec<(ReportType, FetchOptions)> {
        lock(&self.calls, "calls").clone()
    }
}

#[async_trait]
impl EconomicDataSource for ScriptedDataSource {
    async fn fetch_report(
        &self,
        report: ReportType,
        options: &FetchOptions,
    ) -> Result<ProviderReport, EconomicDataSourceError> {
        lock(&self.calls, "calls").push((report, *options));
        lock(&self.responses, "responses")
            .get(&report)
            .cloned()
            .unwrap_or_else(|| {
                Err(EconomicDataSourceError::invalid_request(format!(
                    "no scripted response for {report}"
                )))
            })
    }
}
