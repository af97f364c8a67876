//! HTTP Remote Store
//!
//! `reqwest` implementation of [`RemoteStore`] and [`ImageHost`] against the
//! survey backend's REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::traits::{ImageHost, RemoteStore, SessionProvider};
use crate::domain::{
    DeleteResponse, ServerId, SurveyError, SurveyResult, WaypointPayload, WaypointRecord,
};
use crate::media::ImageUpload;

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Deserialize)]
struct UploadBody {
    image_url: String,
}

/// Map a failed response to the error taxonomy.
///
/// 401 needs a new session; other 4xx carry the server's message (or
/// `fallback`); anything else is a transport failure naming the status.
pub fn classify(status: u16, body: &str, fallback: &str) -> SurveyError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    match status {
        401 => SurveyError::Unauthenticated,
        400..=499 => SurveyError::ValidationRejected(message),
        _ => SurveyError::TransportFailure(format!("HTTP {}: {}", status, message)),
    }
}

fn transport(e: reqwest::Error) -> SurveyError {
    if e.is_timeout() {
        SurveyError::TransportFailure("Request timed out".to_string())
    } else {
        SurveyError::TransportFailure(e.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, fallback: &str) -> SurveyResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify(status.as_u16(), &body, fallback));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| SurveyError::TransportFailure(format!("Invalid response body: {}", e)))
}

fn build_client(timeout: Duration) -> SurveyResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SurveyError::Configuration(format!("HTTP client: {}", e)))
}

/// `<base>/api` with any trailing slash on `base` removed
fn api_root(base_url: &str) -> String {
    format!("{}/api", base_url.trim_end_matches('/'))
}

// ========================
// Waypoints
// ========================

pub struct HttpRemoteStore {
    client: Client,
    api_root: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpRemoteStore {
    pub fn new(
        base_url: &str,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> SurveyResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_root: api_root(base_url),
            session,
        })
    }

    fn waypoint_url(&self, id: &ServerId) -> String {
        format!(
            "{}/waypoints/{}",
            self.api_root,
            utf8_percent_encode(id.as_str(), NON_ALPHANUMERIC)
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list(&self) -> SurveyResult<Vec<WaypointRecord>> {
        let request = self.client.get(format!("{}/waypoints", self.api_root));
        let response = self.authorized(request).send().await.map_err(transport)?;
        read_json(response, "Failed to fetch waypoints").await
    }

    async fn default_location(&self) -> SurveyResult<WaypointRecord> {
        let response = self
            .client
            .get(format!("{}/waypoints/default", self.api_root))
            .send()
            .await
            .map_err(transport)?;
        read_json(response, "Failed to fetch default location").await
    }

    async fn create(&self, payload: &WaypointPayload) -> SurveyResult<WaypointRecord> {
        let request = self
            .client
            .post(format!("{}/waypoints", self.api_root))
            .json(payload);
        let response = self.authorized(request).send().await.map_err(transport)?;
        read_json(response, "Failed to create waypoint").await
    }

    async fn update(&self, id: &ServerId, payload: &WaypointPayload) -> SurveyResult<WaypointRecord> {
        let request = self.client.put(self.waypoint_url(id)).json(payload);
        let response = self.authorized(request).send().await.map_err(transport)?;
        read_json(response, "Failed to update waypoint").await
    }

    async fn delete(&self, id: &ServerId) -> SurveyResult<DeleteResponse> {
        let request = self.client.delete(self.waypoint_url(id));
        let response = self.authorized(request).send().await.map_err(transport)?;
        read_json(response, "Failed to delete waypoint").await
    }
}

// ========================
// Images
// ========================

pub struct HttpImageHost {
    client: Client,
    upload_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpImageHost {
    pub fn new(
        base_url: &str,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> SurveyResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            upload_url: format!("{}/upload", api_root(base_url)),
            session,
        })
    }
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(&self, image: &ImageUpload) -> SurveyResult<String> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime_type())
            .map_err(|e| SurveyError::InvalidImage(e.to_string()))?;
        let form = Form::new().part("image", part);

        let mut request = self.client.post(&self.upload_url).multipart(form);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(transport)?;
        let body: UploadBody = read_json(response, "Failed to upload image").await?;
        Ok(body.image_url)
    }
}
