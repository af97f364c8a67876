//! Repository Layer - Core Traits
//!
//! Abstract interfaces for the remote collaborators. The controller only
//! ever talks to these; HTTP and SQLite implementations live next door.

use async_trait::async_trait;

use crate::domain::{DeleteResponse, ServerId, SurveyResult, WaypointPayload, WaypointRecord};
use crate::media::ImageUpload;

/// CRUD over persisted waypoint records
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All saved waypoints, newest first
    async fn list(&self) -> SurveyResult<Vec<WaypointRecord>>;

    /// The server's "Default Location" record; needs no session
    async fn default_location(&self) -> SurveyResult<WaypointRecord>;

    async fn create(&self, payload: &WaypointPayload) -> SurveyResult<WaypointRecord>;

    async fn update(&self, id: &ServerId, payload: &WaypointPayload) -> SurveyResult<WaypointRecord>;

    async fn delete(&self, id: &ServerId) -> SurveyResult<DeleteResponse>;
}

/// External image storage. Returns the hosted URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: &ImageUpload) -> SurveyResult<String>;
}

/// Opaque session holder
pub trait SessionProvider: Send + Sync {
    /// Bearer token of the current session, if any
    fn token(&self) -> Option<String>;
}

/// Session provider with a fixed token (or none)
#[derive(Debug, Clone, Default)]
pub struct StaticSession(pub Option<String>);

impl SessionProvider for StaticSession {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}
