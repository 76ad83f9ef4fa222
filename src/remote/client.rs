// Flight Store REST Client
// Implements the flight store contract against the logbook backend API.
//
// Endpoints (relative to the configured base URL, e.g. http://localhost:3000/api):
//   GET    /flights            -> [FlightRecord]
//   GET    /analytics          -> Analytics
//   POST   /flights            -> FlightRecord
//   POST   /flights/schedule   -> FlightRecord
//   DELETE /flights/{id}
//
// The bearer token, when configured, is attached to every request.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{FlightStore, StoreError};
use crate::config::AppConfig;
use crate::models::{Analytics, FlightRecord, UserIdentity};
use crate::time_utils::round_to_tenth;

const USER_AGENT: &str = concat!("PilotLogbook/", env!("CARGO_PKG_VERSION"));

/// Body of a schedule request: the record plus its owner
#[derive(Serialize)]
struct ScheduleRequest<'a> {
    #[serde(flatten)]
    record: &'a FlightRecord,
    user_id: &'a str,
}

/// REST client for the flight store
pub struct HttpFlightStore {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpFlightStore {
    /// Create a client for `base_url` with an optional bearer token
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        Self::new(&config.api_url, config.api_token.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Build `{base}/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::Network(format!("invalid base URL {}: {}", self.base_url, e)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Network(format!("base URL cannot hold a path: {}", self.base_url)))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<String, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        log::debug!("Flight store {}: HTTP {}", what, status);

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        check_status(status, &body, what)?;
        Ok(body)
    }
}

#[async_trait]
impl FlightStore for HttpFlightStore {
    async fn list_flights(&self) -> Result<Vec<FlightRecord>, StoreError> {
        let url = self.endpoint(&["flights"])?;
        let body = self.send(self.request(Method::GET, url), "list flights").await?;
        let flights: Vec<FlightRecord> = decode(&body)?;
        log::info!("Fetched {} flights from store", flights.len());
        Ok(flights)
    }

    async fn get_analytics(&self) -> Result<Analytics, StoreError> {
        let url = self.endpoint(&["analytics"])?;
        let body = self.send(self.request(Method::GET, url), "analytics").await?;
        decode(&body)
    }

    async fn create_flight_log(&self, record: &FlightRecord) -> Result<FlightRecord, StoreError> {
        log::info!("Submitting flight log {} ({})", record.id, record.route());
        let url = self.endpoint(&["flights"])?;
        let body = self
            .send(self.request(Method::POST, url).json(record), "create flight log")
            .await?;
        decode(&body)
    }

    async fn create_scheduled_flight(
        &self,
        record: &FlightRecord,
        owner: &UserIdentity,
    ) -> Result<FlightRecord, StoreError> {
        log::info!("Scheduling flight {} ({}) for user {}", record.id, record.route(), owner.id);
        let mut rounded = record.clone();
        rounded.total_hours = round_to_tenth(rounded.total_hours);
        let payload = ScheduleRequest {
            record: &rounded,
            user_id: &owner.id,
        };

        let url = self.endpoint(&["flights", "schedule"])?;
        let body = self
            .send(self.request(Method::POST, url).json(&payload), "schedule flight")
            .await?;
        decode(&body)
    }

    async fn delete_flight(&self, id: &str) -> Result<(), StoreError> {
        log::info!("Deleting flight {}", id);
        let url = self.endpoint(&["flights", id])?;
        self.send(self.request(Method::DELETE, url), &format!("delete flight {}", id))
            .await?;
        Ok(())
    }
}

/// Map an HTTP status to a store error
fn check_status(status: u16, body: &str, what: &str) -> Result<(), StoreError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(StoreError::Auth(error_message(body))),
        404 => Err(StoreError::NotFound(what.to_string())),
        _ => Err(StoreError::Rejected {
            status,
            message: error_message(body),
        }),
    }
}

/// Pull a human-readable message out of an error body
///
/// Uses the `message` or `error` field of a JSON body when present,
/// otherwise the (truncated) raw body.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    truncate_string(body.trim(), 200)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Parse(e.to_string()))
}

/// Truncate a string for error messages
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
