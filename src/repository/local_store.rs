//! Local Store Implementation
//!
//! SQLite-backed [`RemoteStore`] for offline use. Mirrors the backend's
//! contract: the store owns ids and timestamps, lists newest first, and
//! reports missing rows the way the server does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::traits::RemoteStore;
use crate::domain::{
    DeleteResponse, ServerId, SurveyError, SurveyResult, WaypointPayload, WaypointRecord,
};

const COLUMNS: &str = "id, name, latitude, longitude, notes, image_url, created_at, updated_at";

pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn internal(e: rusqlite::Error) -> SurveyError {
    SurveyError::TransportFailure(format!("Database error: {}", e))
}

fn not_found() -> SurveyError {
    SurveyError::ValidationRejected("Waypoint not found".to_string())
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Local rows use integer keys; anything else cannot exist here
fn row_key(id: &ServerId) -> SurveyResult<i64> {
    id.as_str().parse().map_err(|_| not_found())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<WaypointRecord> {
    let created: String = row.get(6)?;
    let updated: String = row.get(7)?;
    Ok(WaypointRecord {
        id: ServerId::from(row.get::<_, i64>(0)?),
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        notes: row.get(4)?,
        image_url: row.get(5)?,
        created_at: parse_stamp(&created),
        updated_at: parse_stamp(&updated),
    })
}

fn find(conn: &Connection, key: i64) -> SurveyResult<Option<WaypointRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM waypoints WHERE id = ?1", COLUMNS),
        params![key],
        row_to_record,
    )
    .optional()
    .map_err(internal)
}

fn validate(payload: &WaypointPayload) -> SurveyResult<()> {
    if payload.name.trim().is_empty() {
        return Err(SurveyError::ValidationRejected("Name is required".to_string()));
    }
    Ok(())
}

/// Empty strings are stored as NULL, like the backend does
fn nullable(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn list(&self) -> SurveyResult<Vec<WaypointRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM waypoints ORDER BY created_at DESC, id DESC",
                COLUMNS
            ))
            .map_err(internal)?;
        let rows = stmt.query_map([], row_to_record).map_err(internal)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(internal)
    }

    async fn default_location(&self) -> SurveyResult<WaypointRecord> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!(
                "SELECT {} FROM waypoints WHERE lower(trim(name)) = 'default location'
                 ORDER BY id ASC LIMIT 1",
                COLUMNS
            ),
            [],
            row_to_record,
        )
        .optional()
        .map_err(internal)?
        .ok_or_else(|| SurveyError::ValidationRejected("Default location not found".to_string()))
    }

    async fn create(&self, payload: &WaypointPayload) -> SurveyResult<WaypointRecord> {
        validate(payload)?;
        let conn = self.conn.lock().await;
        let stamp = now_stamp();
        conn.execute(
            "INSERT INTO waypoints (name, latitude, longitude, notes, image_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                payload.name,
                payload.latitude,
                payload.longitude,
                nullable(&payload.notes),
                payload.image_url.as_deref().and_then(nullable),
                stamp,
            ],
        )
        .map_err(internal)?;

        let key = conn.last_insert_rowid();
        find(&conn, key)?.ok_or_else(not_found)
    }

    async fn update(&self, id: &ServerId, payload: &WaypointPayload) -> SurveyResult<WaypointRecord> {
        validate(payload)?;
        let key = row_key(id)?;
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE waypoints
                 SET name = ?1, latitude = ?2, longitude = ?3, notes = ?4, image_url = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    payload.name,
                    payload.latitude,
                    payload.longitude,
                    nullable(&payload.notes),
                    payload.image_url.as_deref().and_then(nullable),
                    now_stamp(),
                    key,
                ],
            )
            .map_err(internal)?;

        if changed == 0 {
            return Err(not_found());
        }
        find(&conn, key)?.ok_or_else(not_found)
    }

    async fn delete(&self, id: &ServerId) -> SurveyResult<DeleteResponse> {
        let key = row_key(id)?;
        let conn = self.conn.lock().await;
        let existing = find(&conn, key)?.ok_or_else(not_found)?;
        conn.execute("DELETE FROM waypoints WHERE id = ?1", params![key])
            .map_err(internal)?;

        Ok(DeleteResponse {
            message: "Waypoint deleted successfully".to_string(),
            waypoint: Some(existing),
        })
    }
}
