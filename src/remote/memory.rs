// In-process flight store
//
// Behaves like the backend for the parts the logbook relies on: logged and
// scheduled flights are kept apart, `list_flights` returns the logged ones,
// analytics are computed from them. Ids handed out are taken from a queue
// when one was seeded, otherwise fresh UUIDs. Individual operations can be
// made to fail to exercise error paths.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::{FlightStore, StoreError};
use crate::models::{AircraftHours, Analytics, FlightRecord, UserIdentity};

/// Store operations, used for failure injection and call accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListFlights,
    GetAnalytics,
    CreateFlightLog,
    CreateScheduledFlight,
    DeleteFlight,
}

#[derive(Default)]
struct Inner {
    logged: Vec<FlightRecord>,
    scheduled: Vec<(FlightRecord, String)>,
    next_ids: VecDeque<String>,
    failing: HashMap<StoreOp, StoreError>,
}

#[derive(Default)]
pub struct MemoryFlightStore {
    inner: Mutex<Inner>,
    calls: Mutex<HashMap<StoreOp, u64>>,
    total_calls: AtomicU64,
}

impl MemoryFlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with logged flights
    pub fn with_flights(flights: Vec<FlightRecord>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                logged: flights,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Ids to assign to the next created records, in order
    pub async fn queue_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.lock().await.next_ids.extend(ids.into_iter().map(Into::into));
    }

    /// Make every call of `op` fail with `error` until cleared
    pub async fn fail(&self, op: StoreOp, error: StoreError) {
        self.inner.lock().await.failing.insert(op, error);
    }

    pub async fn clear_failures(&self) {
        self.inner.lock().await.failing.clear();
    }

    /// Insert a logged flight directly, bypassing the API
    pub async fn insert_logged(&self, record: FlightRecord) {
        self.inner.lock().await.logged.push(record);
    }

    /// Remove a flight directly, as another client would
    pub async fn remove(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        inner.logged.retain(|f| f.id != id);
        inner.scheduled.retain(|(f, _)| f.id != id);
    }

    pub async fn logged(&self) -> Vec<FlightRecord> {
        self.inner.lock().await.logged.clone()
    }

    /// Scheduled flights with their owner ids
    pub async fn scheduled(&self) -> Vec<(FlightRecord, String)> {
        self.inner.lock().await.scheduled.clone()
    }

    pub async fn calls(&self, op: StoreOp) -> u64 {
        self.calls.lock().await.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    /// Count the call and return the injected failure, if any
    async fn enter(&self, op: StoreOp) -> Result<tokio::sync::MutexGuard<'_, Inner>, StoreError> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        *self.calls.lock().await.entry(op).or_insert(0) += 1;

        let inner = self.inner.lock().await;
        if let Some(err) = inner.failing.get(&op) {
            return Err(err.clone());
        }
        Ok(inner)
    }
}

fn assign_id(inner: &mut Inner) -> String {
    inner
        .next_ids
        .pop_front()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn analytics_for(flights: &[FlightRecord]) -> Analytics {
    let mut order: Vec<String> = Vec::new();
    let mut hours: HashMap<String, f64> = HashMap::new();
    for flight in flights {
        if !hours.contains_key(&flight.aircraft) {
            order.push(flight.aircraft.clone());
        }
        *hours.entry(flight.aircraft.clone()).or_insert(0.0) += flight.total_hours;
    }

    Analytics {
        total_hours: flights.iter().map(|f| f.total_hours).sum(),
        total_flights: flights.len() as u64,
        aircraft_hours: order
            .into_iter()
            .map(|aircraft| AircraftHours {
                hours: hours[&aircraft],
                aircraft,
            })
            .collect(),
    }
}

#[async_trait]
impl FlightStore for MemoryFlightStore {
    async fn list_flights(&self) -> Result<Vec<FlightRecord>, StoreError> {
        let inner = self.enter(StoreOp::ListFlights).await?;
        Ok(inner.logged.clone())
    }

    async fn get_analytics(&self) -> Result<Analytics, StoreError> {
        let inner = self.enter(StoreOp::GetAnalytics).await?;
        Ok(analytics_for(&inner.logged))
    }

    async fn create_flight_log(&self, record: &FlightRecord) -> Result<FlightRecord, StoreError> {
        let mut inner = self.enter(StoreOp::CreateFlightLog).await?;
        let stored = FlightRecord {
            id: assign_id(&mut inner),
            ..record.clone()
        };
        inner.logged.insert(0, stored.clone());
        Ok(stored)
    }

    async fn create_scheduled_flight(
        &self,
        record: &FlightRecord,
        owner: &UserIdentity,
    ) -> Result<FlightRecord, StoreError> {
        let mut inner = self.enter(StoreOp::CreateScheduledFlight).await?;
        let stored = FlightRecord {
            id: assign_id(&mut inner),
            ..record.clone()
        };
        inner.scheduled.insert(0, (stored.clone(), owner.id.clone()));
        Ok(stored)
    }

    async fn delete_flight(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.enter(StoreOp::DeleteFlight).await?;
        let before = inner.logged.len() + inner.scheduled.len();
        inner.logged.retain(|f| f.id != id);
        inner.scheduled.retain(|(f, _)| f.id != id);
        if inner.logged.len() + inner.scheduled.len() == before {
            return Err(StoreError::NotFound(format!("flight {}", id)));
        }
        Ok(())
    }
}
