//! Test doubles for the remote collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Coordinates, DeleteResponse, ServerId, SurveyError, SurveyResult, WaypointPayload,
    WaypointRecord,
};
use crate::geocoding::{Geocoder, Place};
use crate::media::ImageUpload;
use crate::repository::{ImageHost, RemoteStore};
use crate::routing::{Route, RoutingApi};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    List,
    Default,
    Create(WaypointPayload),
    Update(ServerId, WaypointPayload),
    Delete(ServerId),
}

#[derive(Default)]
struct MockState {
    calls: Vec<StoreCall>,
    next_id: i64,
    rows: Vec<WaypointRecord>,
    failures: VecDeque<SurveyError>,
}

/// In-memory store that logs every call and hands out sequential ids
pub struct MockStore {
    state: Mutex<MockState>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_id: i64) -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: first_id,
                ..Default::default()
            }),
        }
    }

    /// The next call fails with `error` instead of touching the rows
    pub fn fail_next(&self, error: SurveyError) {
        self.state.lock().unwrap().failures.push_back(error);
    }

    pub fn seed(&self, payload: WaypointPayload) -> WaypointRecord {
        let mut state = self.state.lock().unwrap();
        insert(&mut state, &payload)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Create(_)))
            .count()
    }

    pub fn updates(&self) -> Vec<ServerId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Update(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn rows(&self) -> Vec<WaypointRecord> {
        self.state.lock().unwrap().rows.clone()
    }

    fn begin(&self, call: StoreCall) -> SurveyResult<std::sync::MutexGuard<'_, MockState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

fn to_record(id: ServerId, payload: &WaypointPayload) -> WaypointRecord {
    let now = Utc::now();
    WaypointRecord {
        id,
        name: payload.name.clone(),
        latitude: payload.latitude,
        longitude: payload.longitude,
        notes: Some(payload.notes.clone()).filter(|n| !n.is_empty()),
        image_url: payload.image_url.clone(),
        created_at: Some(now),
        updated_at: Some(now),
    }
}

fn insert(state: &mut MockState, payload: &WaypointPayload) -> WaypointRecord {
    let id = ServerId::from(state.next_id);
    state.next_id += 1;
    let record = to_record(id, payload);
    state.rows.push(record.clone());
    record
}

fn not_found() -> SurveyError {
    SurveyError::ValidationRejected("Waypoint not found".to_string())
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn list(&self) -> SurveyResult<Vec<WaypointRecord>> {
        let state = self.begin(StoreCall::List)?;
        Ok(state.rows.iter().rev().cloned().collect())
    }

    async fn default_location(&self) -> SurveyResult<WaypointRecord> {
        let state = self.begin(StoreCall::Default)?;
        state
            .rows
            .iter()
            .find(|r| crate::domain::is_default_location(&r.name))
            .cloned()
            .ok_or_else(|| SurveyError::ValidationRejected("Default location not found".to_string()))
    }

    async fn create(&self, payload: &WaypointPayload) -> SurveyResult<WaypointRecord> {
        let mut state = self.begin(StoreCall::Create(payload.clone()))?;
        Ok(insert(&mut state, payload))
    }

    async fn update(&self, id: &ServerId, payload: &WaypointPayload) -> SurveyResult<WaypointRecord> {
        let mut state = self.begin(StoreCall::Update(id.clone(), payload.clone()))?;
        let row = state.rows.iter_mut().find(|r| r.id == *id).ok_or_else(not_found)?;
        let created_at = row.created_at;
        *row = to_record(id.clone(), payload);
        row.created_at = created_at;
        Ok(row.clone())
    }

    async fn delete(&self, id: &ServerId) -> SurveyResult<DeleteResponse> {
        let mut state = self.begin(StoreCall::Delete(id.clone()))?;
        let index = state.rows.iter().position(|r| r.id == *id).ok_or_else(not_found)?;
        let removed = state.rows.remove(index);
        Ok(DeleteResponse {
            message: "Waypoint deleted successfully".to_string(),
            waypoint: Some(removed),
        })
    }
}

/// Image host failing its first `failures` uploads with a transport error
pub struct MockImageHost {
    failures: usize,
    attempts: AtomicUsize,
    successes: AtomicUsize,
}

impl MockImageHost {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
            successes: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageHost for MockImageHost {
    async fn upload(&self, image: &ImageUpload) -> SurveyResult<String> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(SurveyError::TransportFailure("connection reset".to_string()));
        }
        let n = self.successes.fetch_add(1, Ordering::SeqCst) + 1;
        let extension = image.file_name().rsplit('.').next().unwrap_or("bin");
        Ok(format!("https://images.test/{}.{}", n, extension))
    }
}

/// Router returning a straight line between the endpoints
pub struct StraightLineRouter;

#[async_trait]
impl RoutingApi for StraightLineRouter {
    async fn route(&self, from: Coordinates, to: Coordinates) -> SurveyResult<Route> {
        Ok(Route {
            geometry: vec![from, to],
            distance_m: 1000.0,
            duration_s: 60.0,
        })
    }
}

/// Geocoder that knows a single place
pub struct OnePlaceGeocoder(pub Place);

#[async_trait]
impl Geocoder for OnePlaceGeocoder {
    async fn search(&self, query: &str) -> SurveyResult<Option<Place>> {
        let wanted = query.to_lowercase();
        Ok(self
            .0
            .display_name
            .to_lowercase()
            .contains(&wanted)
            .then(|| self.0.clone()))
    }
}
