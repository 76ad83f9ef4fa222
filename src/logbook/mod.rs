//! Flight aggregation state
//!
//! The `Logbook` owns the locally cached view of the pilot's flights: the
//! completed flights from the store (`recent`), flights scheduled during
//! this session (`upcoming`) and the statistics derived from both. Every
//! change builds a fresh [`LogbookSnapshot`] and swaps it in whole, so
//! readers never observe a half-applied update.

pub mod stats;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backup::{parse_backup, Backup, BackupSink};
use crate::error::LogbookError;
use crate::models::{FlightRecord, FlightStatistics, UserIdentity};
use crate::remote::{FlightStore, StoreError};
use crate::views::group_by_month;

pub use stats::{AircraftShare, MonthlyHours, TypeHours};

// ============================================================================
// Data Types
// ============================================================================

/// Immutable state of the logbook at one point in time
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogbookSnapshot {
    /// Incremented on every commit; 0 means nothing has been loaded yet
    pub version: u64,
    pub recent: Vec<FlightRecord>,
    pub upcoming: Vec<FlightRecord>,
    pub statistics: FlightStatistics,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl LogbookSnapshot {
    /// Recent and upcoming flights together, newest date first
    pub fn all_flights(&self) -> Vec<FlightRecord> {
        let mut flights: Vec<FlightRecord> = self.recent.iter().chain(self.upcoming.iter()).cloned().collect();
        flights.sort_by(|a, b| b.date.cmp(&a.date));
        flights
    }

    /// Recent hours per aircraft, relative to the store's total hours
    pub fn hours_by_aircraft(&self) -> Vec<AircraftShare> {
        stats::hours_by_aircraft(&self.recent, self.statistics.total_hours)
    }

    /// Logged flights under "Month Year" headings; scheduled flights are
    /// not history
    pub fn history(&self) -> Vec<(String, Vec<FlightRecord>)> {
        group_by_month(&self.recent)
    }
}

/// Where a restored backup is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreTarget {
    /// Replace the local cache only; the next refresh supersedes it
    LocalCache,
    /// Re-submit records the store no longer has, then refresh
    Remote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Records placed into the local cache
    pub restored: usize,
    /// Records re-created in the store
    pub submitted: usize,
    /// Records the store already had
    pub skipped: usize,
    pub failed: usize,
}

/// Result of a successful backup
#[derive(Debug, Clone)]
pub struct BackupReceipt {
    pub backup: Backup,
    /// Where the sink put it (a file path for `FileBackupSink`)
    pub location: String,
}

/// Marks an operation as in flight for as long as it is alive
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ============================================================================
// Logbook
// ============================================================================

pub struct Logbook {
    store: Arc<dyn FlightStore>,
    state: RwLock<Arc<LogbookSnapshot>>,
    in_flight: AtomicUsize,
}

impl Logbook {
    pub fn new(store: Arc<dyn FlightStore>) -> Self {
        Self {
            store,
            state: RwLock::new(Arc::new(LogbookSnapshot::default())),
            in_flight: AtomicUsize::new(0),
        }
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    pub async fn snapshot(&self) -> Arc<LogbookSnapshot> {
        Arc::clone(&*self.state.read().await)
    }

    pub async fn recent_flights(&self) -> Vec<FlightRecord> {
        self.snapshot().await.recent.clone()
    }

    pub async fn upcoming_flights(&self) -> Vec<FlightRecord> {
        self.snapshot().await.upcoming.clone()
    }

    pub async fn all_flights(&self) -> Vec<FlightRecord> {
        self.snapshot().await.all_flights()
    }

    pub async fn statistics(&self) -> FlightStatistics {
        self.snapshot().await.statistics
    }

    pub async fn version(&self) -> u64 {
        self.snapshot().await.version
    }

    /// True while any operation is talking to the store or a sink
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Swap in the snapshot built from the current one
    ///
    /// The write lock is only held while building, never across a store call.
    async fn commit<F>(&self, build: F) -> Arc<LogbookSnapshot>
    where
        F: FnOnce(&LogbookSnapshot) -> LogbookSnapshot,
    {
        let mut state = self.state.write().await;
        let mut next = build(&state);
        next.version = state.version + 1;
        let next = Arc::new(next);
        *state = Arc::clone(&next);
        next
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Reload flights and analytics from the store
    ///
    /// Both requests run concurrently. The snapshot is only replaced when
    /// both succeed; `upcoming` is carried over untouched.
    pub async fn refresh(&self) -> Result<Arc<LogbookSnapshot>, LogbookError> {
        let _loading = LoadingGuard::enter(&self.in_flight);
        log::info!("Refreshing flights");

        let (flights, analytics) = tokio::try_join!(self.store.list_flights(), self.store.get_analytics())
            .map_err(|e| {
                log::error!("Refresh failed: {}", e);
                LogbookError::RefreshFailed(e)
            })?;

        let today = today();
        let snapshot = self
            .commit(|current| LogbookSnapshot {
                version: 0,
                statistics: stats::build_statistics(&flights, &analytics, today),
                recent: flights,
                upcoming: current.upcoming.clone(),
                refreshed_at: Some(Utc::now()),
            })
            .await;

        log::info!(
            "Refreshed logbook v{}: {} recent, {} upcoming ({})",
            snapshot.version,
            snapshot.recent.len(),
            snapshot.upcoming.len(),
            snapshot.statistics
        );
        Ok(snapshot)
    }

    /// Log a completed flight
    ///
    /// Returns the record as stored, with its server-assigned id.
    pub async fn add_flight_log(&self, record: &FlightRecord) -> Result<FlightRecord, LogbookError> {
        let _loading = LoadingGuard::enter(&self.in_flight);
        log::info!("Adding flight log {} on {}", record.route(), record.date);

        let stored = self.store.create_flight_log(record).await.map_err(|e| {
            log::error!("Failed to add flight log: {}", e);
            LogbookError::AddFailed(e)
        })?;

        let today = today();
        let created = stored.clone();
        self.commit(|current| {
            let mut recent = Vec::with_capacity(current.recent.len() + 1);
            recent.push(created);
            recent.extend(current.recent.iter().cloned());
            LogbookSnapshot {
                version: 0,
                statistics: FlightStatistics {
                    month_hours: stats::month_hours(&recent, today),
                    ..current.statistics
                },
                recent,
                upcoming: current.upcoming.clone(),
                refreshed_at: current.refreshed_at,
            }
        })
        .await;

        self.follow_up_refresh("add").await;
        Ok(stored)
    }

    /// Schedule a future flight for the signed-in pilot
    pub async fn schedule_new_flight(
        &self,
        record: &FlightRecord,
        identity: Option<&UserIdentity>,
    ) -> Result<FlightRecord, LogbookError> {
        let owner = identity.ok_or_else(|| {
            log::warn!("Refusing to schedule {} without a signed-in user", record.route());
            LogbookError::NotAuthenticated
        })?;

        let _loading = LoadingGuard::enter(&self.in_flight);
        log::info!("Scheduling flight {} on {} for user {}", record.route(), record.date, owner.id);

        let stored = self.store.create_scheduled_flight(record, owner).await.map_err(|e| {
            log::error!("Failed to schedule flight: {}", e);
            LogbookError::ScheduleFailed(e)
        })?;

        let created = stored.clone();
        self.commit(|current| {
            let mut upcoming = Vec::with_capacity(current.upcoming.len() + 1);
            upcoming.push(created);
            upcoming.extend(current.upcoming.iter().cloned());
            LogbookSnapshot {
                upcoming,
                ..current.clone()
            }
        })
        .await;

        Ok(stored)
    }

    /// Delete a flight
    ///
    /// A flight the store no longer knows counts as deleted, so repeating
    /// the call is harmless.
    pub async fn delete_flight_log(&self, id: &str) -> Result<(), LogbookError> {
        let _loading = LoadingGuard::enter(&self.in_flight);
        log::info!("Deleting flight {}", id);

        match self.store.delete_flight(id).await {
            Ok(()) => {}
            Err(StoreError::NotFound(msg)) => {
                log::info!("Flight {} already gone from store ({})", id, msg);
            }
            Err(e) => {
                log::error!("Failed to delete flight {}: {}", id, e);
                return Err(LogbookError::DeleteFailed {
                    id: id.to_string(),
                    source: e,
                });
            }
        }

        let today = today();
        self.commit(|current| {
            let recent: Vec<FlightRecord> = current.recent.iter().filter(|f| f.id != id).cloned().collect();
            LogbookSnapshot {
                version: 0,
                statistics: FlightStatistics {
                    month_hours: stats::month_hours(&recent, today),
                    ..current.statistics
                },
                recent,
                upcoming: current.upcoming.iter().filter(|f| f.id != id).cloned().collect(),
                refreshed_at: current.refreshed_at,
            }
        })
        .await;

        self.follow_up_refresh("delete").await;
        Ok(())
    }

    /// Export the current snapshot through `sink`
    pub async fn backup_data(&self, sink: &dyn BackupSink) -> Result<BackupReceipt, LogbookError> {
        let _loading = LoadingGuard::enter(&self.in_flight);
        let snapshot = self.snapshot().await;

        let backup = Backup::new(
            snapshot.recent.clone(),
            snapshot.upcoming.clone(),
            snapshot.statistics,
            Utc::now(),
        );
        log::info!("Backing up {} flights", backup.flight_count());

        let contents = backup.to_json().map_err(LogbookError::BackupFailed)?;
        let location = sink.export(&contents).await.map_err(|e| {
            log::error!("Backup failed: {}", e);
            LogbookError::BackupFailed(e)
        })?;

        Ok(BackupReceipt { backup, location })
    }

    /// Restore a backup produced by [`Logbook::backup_data`]
    ///
    /// `identity` is needed for [`RestoreTarget::Remote`] when the backup
    /// holds scheduled flights.
    pub async fn restore_data(
        &self,
        data: &str,
        target: RestoreTarget,
        identity: Option<&UserIdentity>,
    ) -> Result<RestoreReport, LogbookError> {
        let _loading = LoadingGuard::enter(&self.in_flight);

        let backup = parse_backup(data).map_err(|e| {
            log::error!("Rejected backup: {}", e);
            LogbookError::InvalidBackup(e)
        })?;
        log::info!(
            "Restoring {} flights from backup taken {} ({:?})",
            backup.flight_count(),
            backup
                .timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "at an unknown time".to_string()),
            target
        );

        match target {
            RestoreTarget::LocalCache => Ok(self.restore_local(backup).await),
            RestoreTarget::Remote => self.restore_remote(backup, identity).await,
        }
    }

    async fn restore_local(&self, backup: Backup) -> RestoreReport {
        let restored = backup.flight_count();
        let today = today();
        self.commit(|current| LogbookSnapshot {
            version: 0,
            statistics: FlightStatistics {
                month_hours: stats::month_hours(&backup.recent_flights, today),
                ..backup.flight_stats
            },
            recent: backup.recent_flights,
            upcoming: backup.upcoming_flights,
            refreshed_at: current.refreshed_at,
        })
        .await;

        RestoreReport {
            restored,
            ..Default::default()
        }
    }

    async fn restore_remote(
        &self,
        backup: Backup,
        identity: Option<&UserIdentity>,
    ) -> Result<RestoreReport, LogbookError> {
        if !backup.upcoming_flights.is_empty() && identity.is_none() {
            return Err(LogbookError::NotAuthenticated);
        }

        let remote = self.store.list_flights().await.map_err(|e| {
            log::error!("Restore could not list remote flights: {}", e);
            LogbookError::RestoreFailed(e)
        })?;

        // Scheduled flights are not listed by the store; the ones created in
        // this session are known from the local cache.
        let mut known: HashSet<String> = remote.into_iter().map(|f| f.id).collect();
        known.extend(self.snapshot().await.upcoming.iter().map(|f| f.id.clone()));

        let mut report = RestoreReport::default();

        for record in &backup.recent_flights {
            if known.contains(&record.id) {
                report.skipped += 1;
                continue;
            }
            match self.store.create_flight_log(record).await {
                Ok(_) => report.submitted += 1,
                Err(e) => {
                    log::warn!("Could not restore flight {}: {}", record.id, e);
                    report.failed += 1;
                }
            }
        }

        let mut scheduled = Vec::new();
        if let Some(owner) = identity {
            for record in &backup.upcoming_flights {
                if known.contains(&record.id) {
                    report.skipped += 1;
                    continue;
                }
                match self.store.create_scheduled_flight(record, owner).await {
                    Ok(stored) => {
                        report.submitted += 1;
                        scheduled.push(stored);
                    }
                    Err(e) => {
                        log::warn!("Could not restore scheduled flight {}: {}", record.id, e);
                        report.failed += 1;
                    }
                }
            }
        }

        if !scheduled.is_empty() {
            self.commit(|current| {
                let mut upcoming = scheduled;
                upcoming.extend(current.upcoming.iter().cloned());
                LogbookSnapshot {
                    upcoming,
                    ..current.clone()
                }
            })
            .await;
        }

        log::info!(
            "Restore finished: {} submitted, {} skipped, {} failed",
            report.submitted,
            report.skipped,
            report.failed
        );

        self.follow_up_refresh("restore").await;
        Ok(report)
    }

    /// Refresh after a successful mutation; a failure here is not the
    /// mutation's failure
    async fn follow_up_refresh(&self, after: &str) {
        if let Err(e) = self.refresh().await {
            log::warn!("Refresh after {} failed, keeping local state: {}", after, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupError;
    use crate::models::{Analytics, FlightStatus, NewFlight};
    use crate::remote::{MemoryFlightStore, StoreOp};
    use async_trait::async_trait;
    use chrono::Days;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    fn record(id: &str, date: NaiveDate, aircraft: &str, hours: f64) -> FlightRecord {
        FlightRecord {
            id: id.to_string(),
            date,
            departure: "HTDA".to_string(),
            arrival: "HTKJ".to_string(),
            aircraft: aircraft.to_string(),
            departure_time: "08:00".to_string(),
            arrival_time: "09:30".to_string(),
            total_hours: hours,
            status: FlightStatus::Completed,
            flight_type: Some("training".to_string()),
            remarks: None,
            notification: None,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(flights: &[FlightRecord]) -> Vec<String> {
        flights.iter().map(|f| f.id.clone()).collect()
    }

    fn setup(flights: Vec<FlightRecord>) -> (Arc<MemoryFlightStore>, Logbook) {
        let store = Arc::new(MemoryFlightStore::with_flights(flights));
        let logbook = Logbook::new(store.clone());
        (store, logbook)
    }

    #[derive(Default)]
    struct CaptureSink {
        contents: StdMutex<Option<String>>,
        fail: bool,
    }

    #[async_trait]
    impl BackupSink for CaptureSink {
        async fn export(&self, contents: &str) -> Result<String, BackupError> {
            if self.fail {
                return Err(BackupError::Export("disk full".to_string()));
            }
            *self.contents.lock().unwrap() = Some(contents.to_string());
            Ok("memory".to_string())
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_recent() {
        let (store, logbook) = setup(vec![
            record("a", ymd(2025, 5, 1), "C172", 1.0),
            record("b", ymd(2025, 5, 2), "C172", 1.0),
        ]);
        logbook.refresh().await.unwrap();
        assert_eq!(ids(&logbook.recent_flights().await), vec!["a", "b"]);

        store.remove("a").await;
        store.insert_logged(record("c", ymd(2025, 5, 3), "BE58", 2.0)).await;

        let snapshot = logbook.refresh().await.unwrap();
        assert_eq!(ids(&snapshot.recent), vec!["b", "c"]);
        assert_eq!(snapshot.statistics.total_flights, 2);
        assert_eq!(snapshot.statistics.total_hours, 3.0);
        assert_eq!(snapshot.statistics.aircraft_count, 2);
        assert_eq!(snapshot.version, 2);
        assert!(snapshot.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_refresh_is_all_or_nothing() {
        let (store, logbook) = setup(vec![record("a", ymd(2025, 5, 1), "C172", 1.0)]);
        let before = logbook.refresh().await.unwrap();

        store.insert_logged(record("b", ymd(2025, 5, 2), "C172", 1.0)).await;
        store.fail(StoreOp::GetAnalytics, StoreError::Network("timeout".to_string())).await;

        let result = logbook.refresh().await;
        assert!(matches!(result, Err(LogbookError::RefreshFailed(StoreError::Network(_)))));

        let after = logbook.snapshot().await;
        assert_eq!(after.version, before.version);
        assert_eq!(ids(&after.recent), vec!["a"]);
        assert!(!logbook.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_keeps_upcoming() {
        let (store, logbook) = setup(vec![]);
        store.queue_ids(["s1"]).await;
        let owner = UserIdentity::new("pilot-1");
        let flight = record("", today() + Days::new(3), "C172", 1.5);
        logbook.schedule_new_flight(&flight, Some(&owner)).await.unwrap();

        logbook.refresh().await.unwrap();
        assert_eq!(ids(&logbook.upcoming_flights().await), vec!["s1"]);
    }

    #[tokio::test]
    async fn test_month_hours_consistency() {
        let today = today();
        let last_year = today.checked_sub_months(chrono::Months::new(12)).unwrap();
        let (_store, logbook) = setup(vec![
            record("a", today, "C172", 1.5),
            record("b", today, "C172", 2.25),
            record("c", last_year, "C172", 5.0),
        ]);

        let stats = logbook.refresh().await.unwrap().statistics;
        assert_eq!(stats.month_hours, 3.8);
        assert_eq!(format!("{:.1}", stats.month_hours), "3.8");
        assert_eq!(stats.total_hours, 8.75);
    }

    #[tokio::test]
    async fn test_add_flight_log_prepends_and_refreshes() {
        let (store, logbook) = setup(vec![record("a", ymd(2025, 5, 1), "C172", 1.0)]);
        logbook.refresh().await.unwrap();
        store.queue_ids(["new-1"]).await;

        let flight = NewFlight::new(today(), "htda", "htkj", "C172", "08:00", "09:30")
            .completed()
            .unwrap();
        let stored = logbook.add_flight_log(&flight).await.unwrap();

        assert_eq!(stored.id, "new-1");
        assert_eq!(ids(&logbook.recent_flights().await), vec!["new-1", "a"]);
        assert_eq!(logbook.statistics().await.total_flights, 2);
        assert_eq!(store.calls(StoreOp::ListFlights).await, 2);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_state_untouched() {
        let (store, logbook) = setup(vec![record("a", ymd(2025, 5, 1), "C172", 1.0)]);
        logbook.refresh().await.unwrap();
        let before = logbook.snapshot().await;

        store
            .fail(
                StoreOp::CreateFlightLog,
                StoreError::Rejected {
                    status: 500,
                    message: "boom".to_string(),
                },
            )
            .await;
        let flight = record("x", ymd(2025, 5, 2), "C172", 1.0);
        let result = logbook.add_flight_log(&flight).await;

        assert!(matches!(result, Err(LogbookError::AddFailed(_))));
        let after = logbook.snapshot().await;
        assert_eq!(ids(&after.recent), ids(&before.recent));
        assert_eq!(after.version, before.version);
        assert!(!logbook.is_loading());
    }

    #[tokio::test]
    async fn test_add_succeeds_when_follow_up_refresh_fails() {
        let (store, logbook) = setup(vec![]);
        store.queue_ids(["new-1"]).await;
        store.fail(StoreOp::ListFlights, StoreError::Network("offline".to_string())).await;

        let flight = record("", today(), "C172", 1.5);
        let stored = logbook.add_flight_log(&flight).await.unwrap();

        assert_eq!(stored.id, "new-1");
        assert_eq!(ids(&logbook.recent_flights().await), vec!["new-1"]);
        assert_eq!(logbook.statistics().await.month_hours, 1.5);
    }

    #[tokio::test]
    async fn test_schedule_scenario() {
        let (store, logbook) = setup(vec![]);
        store.queue_ids(["abc123"]).await;
        let owner = UserIdentity::new("pilot-1");

        let date = today().checked_add_days(Days::new(2)).unwrap();
        let flight = NewFlight::new(date, "HTDA", "HTKJ", "C172", "08:00", "09:30")
            .scheduled(FlightStatus::Confirmed)
            .unwrap();
        assert_eq!(flight.total_hours, 1.5);

        let stored = logbook.schedule_new_flight(&flight, Some(&owner)).await.unwrap();

        assert_eq!(stored.id, "abc123");
        let snapshot = logbook.snapshot().await;
        assert_eq!(ids(&snapshot.upcoming), vec!["abc123"]);
        assert!(snapshot.recent.is_empty());
        assert_eq!(store.scheduled().await[0].1, "pilot-1");
    }

    #[tokio::test]
    async fn test_schedule_requires_identity() {
        let (store, logbook) = setup(vec![]);
        let flight = record("", today(), "C172", 1.5);

        let result = logbook.schedule_new_flight(&flight, None).await;

        assert!(matches!(result, Err(LogbookError::NotAuthenticated)));
        assert_eq!(store.total_calls(), 0);
        assert_eq!(logbook.version().await, 0);
    }

    #[tokio::test]
    async fn test_failed_schedule_leaves_state_untouched() {
        let (store, logbook) = setup(vec![]);
        store.fail(StoreOp::CreateScheduledFlight, StoreError::Auth("expired".to_string())).await;

        let flight = record("", today(), "C172", 1.5);
        let result = logbook.schedule_new_flight(&flight, Some(&UserIdentity::new("p"))).await;

        assert!(matches!(result, Err(LogbookError::ScheduleFailed(StoreError::Auth(_)))));
        assert!(logbook.upcoming_flights().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_store, logbook) = setup(vec![
            record("a", ymd(2025, 5, 1), "C172", 1.0),
            record("b", ymd(2025, 5, 2), "C172", 1.0),
        ]);
        logbook.refresh().await.unwrap();

        logbook.delete_flight_log("a").await.unwrap();
        let once = logbook.all_flights().await;
        logbook.delete_flight_log("a").await.unwrap();
        let twice = logbook.all_flights().await;

        assert_eq!(ids(&once), vec!["b"]);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_delete_removes_upcoming() {
        let (store, logbook) = setup(vec![]);
        store.queue_ids(["s1"]).await;
        let owner = UserIdentity::new("pilot-1");
        let flight = record("", today(), "C172", 1.0);
        logbook.schedule_new_flight(&flight, Some(&owner)).await.unwrap();

        logbook.delete_flight_log("s1").await.unwrap();
        assert!(logbook.upcoming_flights().await.is_empty());
        assert!(store.scheduled().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_state_untouched() {
        let (store, logbook) = setup(vec![record("a", ymd(2025, 5, 1), "C172", 1.0)]);
        logbook.refresh().await.unwrap();
        store.fail(StoreOp::DeleteFlight, StoreError::Network("offline".to_string())).await;

        let result = logbook.delete_flight_log("a").await;

        assert!(matches!(result, Err(LogbookError::DeleteFailed { .. })));
        assert_eq!(ids(&logbook.recent_flights().await), vec!["a"]);
    }

    #[test]
    fn test_all_flights_sorted_newest_first() {
        let snapshot = LogbookSnapshot {
            recent: vec![record("r", ymd(2025, 5, 10), "C172", 1.0)],
            upcoming: vec![record("u", ymd(2025, 5, 20), "C172", 1.0)],
            ..Default::default()
        };

        let dates: Vec<NaiveDate> = snapshot.all_flights().iter().map(|f| f.date).collect();
        assert_eq!(dates, vec![ymd(2025, 5, 20), ymd(2025, 5, 10)]);
    }

    #[tokio::test]
    async fn test_backup_and_restore_local_cache() {
        let (_store, logbook) = setup(vec![
            record("a", ymd(2025, 5, 1), "C172", 1.0),
            record("b", ymd(2025, 5, 2), "BE58", 2.0),
        ]);
        logbook.refresh().await.unwrap();

        let sink = CaptureSink::default();
        let receipt = logbook.backup_data(&sink).await.unwrap();
        assert_eq!(receipt.location, "memory");
        assert_eq!(receipt.backup.flight_count(), 2);

        let contents = sink.contents.lock().unwrap().clone().unwrap();
        let (_other_store, restored) = setup(vec![]);
        let report = restored
            .restore_data(&contents, RestoreTarget::LocalCache, None)
            .await
            .unwrap();

        assert_eq!(report.restored, 2);
        assert_eq!(restored.recent_flights().await, logbook.recent_flights().await);
        assert_eq!(restored.statistics().await.total_hours, 3.0);
        assert!(!restored.is_loading());
    }

    #[tokio::test]
    async fn test_backup_failure() {
        let (_store, logbook) = setup(vec![]);
        let sink = CaptureSink {
            fail: true,
            ..Default::default()
        };

        let result = logbook.backup_data(&sink).await;
        assert!(matches!(result, Err(LogbookError::BackupFailed(BackupError::Export(_)))));
        assert!(!logbook.is_loading());
    }

    #[tokio::test]
    async fn test_restore_rejects_invalid_backup() {
        let (_store, logbook) = setup(vec![]);
        let result = logbook
            .restore_data(r#"{"recentFlights": []}"#, RestoreTarget::LocalCache, None)
            .await;

        assert!(matches!(
            result,
            Err(LogbookError::InvalidBackup(BackupError::MissingField("upcomingFlights")))
        ));
        assert_eq!(logbook.version().await, 0);
    }

    #[tokio::test]
    async fn test_restore_remote_resubmits_missing() {
        let (source_store, source) = setup(vec![
            record("a", ymd(2025, 5, 1), "C172", 1.0),
            record("b", ymd(2025, 5, 2), "BE58", 2.0),
        ]);
        source.refresh().await.unwrap();
        source_store.queue_ids(["s1"]).await;
        let owner = UserIdentity::new("pilot-1");
        let flight = record("", today() + Days::new(5), "C172", 1.0);
        source.schedule_new_flight(&flight, Some(&owner)).await.unwrap();

        let sink = CaptureSink::default();
        source.backup_data(&sink).await.unwrap();
        let contents = sink.contents.lock().unwrap().clone().unwrap();

        // Target store still has "a" but lost "b"
        let (store, logbook) = setup(vec![record("a", ymd(2025, 5, 1), "C172", 1.0)]);
        let report = logbook
            .restore_data(&contents, RestoreTarget::Remote, Some(&owner))
            .await
            .unwrap();

        assert_eq!(report.submitted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(store.logged().await.len(), 2);
        assert_eq!(store.scheduled().await.len(), 1);
        assert_eq!(logbook.recent_flights().await.len(), 2);
        assert_eq!(logbook.upcoming_flights().await.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_remote_scheduled_needs_identity() {
        let backup = Backup::new(
            vec![],
            vec![record("s1", ymd(2025, 6, 1), "C172", 1.0)],
            FlightStatistics::default(),
            Utc::now(),
        );
        let (store, logbook) = setup(vec![]);

        let result = logbook
            .restore_data(&backup.to_json().unwrap(), RestoreTarget::Remote, None)
            .await;

        assert!(matches!(result, Err(LogbookError::NotAuthenticated)));
        assert_eq!(store.total_calls(), 0);
    }

    /// Holds the first caller until released, announcing that it got there
    #[derive(Default)]
    struct Gate {
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl Gate {
        fn armed() -> Self {
            let gate = Self::default();
            gate.armed.store(true, Ordering::SeqCst);
            gate
        }

        async fn pass(&self) {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
        }

        async fn wait_entered(&self) {
            self.entered.notified().await;
        }

        fn open(&self) {
            self.release.notify_one();
        }
    }

    /// Memory store whose first `list_flights` blocks on a gate
    struct GatedStore {
        inner: MemoryFlightStore,
        gate: Gate,
    }

    impl GatedStore {
        fn new(flights: Vec<FlightRecord>) -> Self {
            Self {
                inner: MemoryFlightStore::with_flights(flights),
                gate: Gate::armed(),
            }
        }
    }

    #[async_trait]
    impl FlightStore for GatedStore {
        async fn list_flights(&self) -> Result<Vec<FlightRecord>, StoreError> {
            self.gate.pass().await;
            self.inner.list_flights().await
        }

        async fn get_analytics(&self) -> Result<Analytics, StoreError> {
            self.inner.get_analytics().await
        }

        async fn create_flight_log(&self, record: &FlightRecord) -> Result<FlightRecord, StoreError> {
            self.inner.create_flight_log(record).await
        }

        async fn create_scheduled_flight(
            &self,
            record: &FlightRecord,
            owner: &UserIdentity,
        ) -> Result<FlightRecord, StoreError> {
            self.inner.create_scheduled_flight(record, owner).await
        }

        async fn delete_flight(&self, id: &str) -> Result<(), StoreError> {
            self.inner.delete_flight(id).await
        }
    }

    struct GatedSink {
        gate: Gate,
    }

    #[async_trait]
    impl BackupSink for GatedSink {
        async fn export(&self, _contents: &str) -> Result<String, BackupError> {
            self.gate.pass().await;
            Ok("gated".to_string())
        }
    }

    #[tokio::test]
    async fn test_loading_while_refresh_in_flight() {
        let store = Arc::new(GatedStore::new(vec![record("a", ymd(2025, 5, 1), "C172", 1.0)]));
        let logbook = Logbook::new(store.clone());
        assert!(!logbook.is_loading());

        let (result, loading_mid_refresh) = tokio::join!(logbook.refresh(), async {
            store.gate.wait_entered().await;
            let loading = logbook.is_loading();
            store.gate.open();
            loading
        });

        assert!(loading_mid_refresh);
        assert_eq!(ids(&result.unwrap().recent), vec!["a"]);
        assert!(!logbook.is_loading());
    }

    #[tokio::test]
    async fn test_loading_while_backup_in_flight() {
        let (_store, logbook) = setup(vec![]);
        let sink = GatedSink { gate: Gate::armed() };

        let (result, loading_mid_backup) = tokio::join!(logbook.backup_data(&sink), async {
            sink.gate.wait_entered().await;
            let loading = logbook.is_loading();
            sink.gate.open();
            loading
        });

        assert!(loading_mid_backup);
        assert_eq!(result.unwrap().location, "gated");
        assert!(!logbook.is_loading());
    }

    #[tokio::test]
    async fn test_loading_while_restore_in_flight() {
        let backup = Backup::new(
            vec![record("r1", ymd(2025, 5, 1), "C172", 1.0)],
            vec![],
            FlightStatistics::default(),
            Utc::now(),
        );
        let data = backup.to_json().unwrap();
        let store = Arc::new(GatedStore::new(vec![]));
        let logbook = Logbook::new(store.clone());

        let (result, loading_mid_restore) = tokio::join!(logbook.restore_data(&data, RestoreTarget::Remote, None), async {
            store.gate.wait_entered().await;
            let loading = logbook.is_loading();
            store.gate.open();
            loading
        });

        assert!(loading_mid_restore);
        assert_eq!(result.unwrap().submitted, 1);
        assert!(!logbook.is_loading());
        assert_eq!(logbook.recent_flights().await.len(), 1);
    }

    #[tokio::test]
    async fn test_schedule_during_refresh_survives_commit() {
        let store = Arc::new(GatedStore::new(vec![record("a", ymd(2025, 5, 1), "C172", 1.0)]));
        store.inner.queue_ids(["s1"]).await;
        let logbook = Logbook::new(store.clone());
        let owner = UserIdentity::new("pilot-1");
        let flight = record("", today() + Days::new(2), "C172", 1.5);

        let (refreshed, scheduled) = tokio::join!(logbook.refresh(), async {
            store.gate.wait_entered().await;
            let scheduled = logbook.schedule_new_flight(&flight, Some(&owner)).await;
            store.gate.open();
            scheduled
        });

        assert_eq!(scheduled.unwrap().id, "s1");
        let snapshot = refreshed.unwrap();
        assert_eq!(snapshot.version, 2);
        assert_eq!(ids(&snapshot.recent), vec!["a"]);
        assert_eq!(ids(&snapshot.upcoming), vec!["s1"]);
        assert_eq!(ids(&logbook.upcoming_flights().await), vec!["s1"]);
    }

    #[test]
    fn test_history_groups_logged_flights_only() {
        let snapshot = LogbookSnapshot {
            recent: vec![
                record("r1", ymd(2025, 5, 10), "C172", 1.0),
                record("r2", ymd(2025, 4, 2), "C172", 1.0),
            ],
            upcoming: vec![record("u1", ymd(2025, 6, 1), "C172", 1.0)],
            ..Default::default()
        };

        let history = snapshot.history();
        let labels: Vec<&str> = history.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["May 2025", "April 2025"]);
        assert!(history.iter().all(|(_, flights)| flights.iter().all(|f| f.id != "u1")));
    }
}
