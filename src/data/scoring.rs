//! HTTP client for the loan scoring service.
//!
//! Wire contract:
//!
//! - `GET {base}/`  -> `{"clients_list": [<id>, ...]}`
//! - `POST {base}/` with `{"client_id": <id>}` -> `{"proba": <0..1>, "result": <0|1>}`
//!
//! Any non-2xx response becomes an error carrying the numeric status code and
//! the raw response body. Requests carry an explicit timeout so an
//! unresponsive service surfaces a distinct timeout error instead of hanging
//! the session.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::cache::BoundedCache;
use crate::domain::{AppConfig, ClientId, Decision, Prediction};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct ClientListResponse {
    clients_list: Vec<ClientId>,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    client_id: ClientId,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    proba: f64,
    result: u8,
}

pub struct ScoringClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    /// Session-level memo of the applicant list (key is the unit request).
    lists: BoundedCache<(), Vec<ClientId>>,
    predictions: BoundedCache<ClientId, Prediction>,
}

impl ScoringClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.service_url.clone(),
            timeout: config.timeout,
            lists: BoundedCache::new(1, config.cache_ttl),
            predictions: BoundedCache::new(config.cache_capacity, config.cache_ttl),
        })
    }

    /// Fetch the known applicant identifiers, memoized for the session.
    pub fn list_clients(&mut self) -> Result<Vec<ClientId>, AppError> {
        if let Some(clients) = self.lists.get(&()) {
            debug!(count = clients.len(), "client list cache hit");
            return Ok(clients);
        }

        let resp = self
            .client
            .get(&self.base_url)
            .send()
            .map_err(|e| self.transport_error("client list", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AppError::runtime(format!(
                "Scoring service returned {} for client list: {body}",
                status.as_u16()
            )));
        }

        let body: ClientListResponse = resp
            .json()
            .map_err(|e| AppError::runtime(format!("Failed to parse client list response: {e}")))?;

        info!(count = body.clients_list.len(), "fetched applicant list");
        self.lists.insert((), body.clients_list.clone());
        Ok(body.clients_list)
    }

    /// Request a prediction for one applicant, memoized per identifier.
    ///
    /// Caching is safe only because the service is assumed deterministic for a
    /// fixed identifier within a session.
    pub fn predict(&mut self, client_id: ClientId) -> Result<Prediction, AppError> {
        if let Some(prediction) = self.predictions.get(&client_id) {
            debug!(client_id, "prediction cache hit");
            return Ok(prediction);
        }

        let resp = self
            .client
            .post(&self.base_url)
            .json(&PredictRequest { client_id })
            .send()
            .map_err(|e| self.transport_error("prediction", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AppError::runtime(format!(
                "Scoring service returned {} for client {client_id}: {body}",
                status.as_u16()
            )));
        }

        let body: PredictResponse = resp
            .json()
            .map_err(|e| AppError::runtime(format!("Failed to parse prediction response: {e}")))?;

        let prediction = validate_prediction(client_id, &body)?;

        info!(
            client_id,
            proba = prediction.proba,
            rejected = prediction.decision.is_rejected(),
            "scored applicant"
        );
        self.predictions.insert(client_id, prediction);
        Ok(prediction)
    }

    /// Drop the memoized applicant list so the next call re-queries.
    pub fn evict_client_list(&mut self) {
        self.lists.clear();
    }

    fn transport_error(&self, what: &str, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::runtime(format!(
                "Scoring service {what} request timed out after {}s.",
                self.timeout.as_secs()
            ))
        } else {
            AppError::runtime(format!("Scoring service {what} request failed: {err}"))
        }
    }
}

fn validate_prediction(client_id: ClientId, body: &PredictResponse) -> Result<Prediction, AppError> {
    if !body.proba.is_finite() || !(0.0..=1.0).contains(&body.proba) {
        return Err(AppError::runtime(format!(
            "Scoring service returned out-of-range probability {} for client {client_id}.",
            body.proba
        )));
    }
    let decision = Decision::from_flag(body.result).ok_or_else(|| {
        AppError::runtime(format!(
            "Scoring service returned unexpected decision flag {} for client {client_id}.",
            body.result
        ))
    })?;
    Ok(Prediction {
        proba: body.proba,
        decision,
    })
}
