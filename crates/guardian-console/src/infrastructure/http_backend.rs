//! REST client for the backend collaborators.
//!
//! The session never talks HTTP itself.  It queues [`BackendRequest`]s, the
//! event loop hands each one to a [`Backend`], and the reply goes back through
//! `Session::on_backend_result`.
//!
//! | Request                       | HTTP                                          |
//! |-------------------------------|-----------------------------------------------|
//! | `StatsSummary`                | `GET  {base}/dashboard/overview`              |
//! | `Agents`                      | `GET  {base}/agents`                          |
//! | `RecentIncidents{hours,limit}`| `GET  {base}/incidents?hours=..&per_page=..`  |
//! | `Configure`                   | `POST {base}/configure`                       |
//! | `StartMonitoring`             | `POST {base}/start-monitoring`                |
//! | `SimulateThreat`              | `POST {base}/simulate-threat`                 |

use std::time::Duration;

use async_trait::async_trait;
use guardian_core::domain::backend::ActionAck;
use guardian_core::{BackendError, BackendReply, BackendRequest};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Executes backend requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    async fn execute(&self, request: &BackendRequest) -> Result<BackendReply, BackendError>;
}

/// [`Backend`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: String,
}

impl HttpBackend {
    /// Creates a client for the API rooted at `base`
    /// (e.g. `http://127.0.0.1:8000/api`).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Request`] if the TLS backend cannot be
    /// initialised.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// Builds the HTTP request for `request` without sending it.
    fn build(&self, request: &BackendRequest) -> RequestBuilder {
        match request {
            BackendRequest::StatsSummary => {
                self.client.request(Method::GET, self.url("dashboard/overview"))
            }
            BackendRequest::Agents => self.client.request(Method::GET, self.url("agents")),
            BackendRequest::RecentIncidents { hours, limit } => self
                .client
                .request(Method::GET, self.url("incidents"))
                .query(&[("hours", hours), ("per_page", limit)]),
            BackendRequest::Configure(config) => {
                self.client.request(Method::POST, self.url("configure")).json(config)
            }
            BackendRequest::StartMonitoring => {
                self.client.request(Method::POST, self.url("start-monitoring"))
            }
            BackendRequest::SimulateThreat(simulation) => self
                .client
                .request(Method::POST, self.url("simulate-threat"))
                .json(simulation),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: &BackendRequest) -> Result<T, BackendError> {
        let response = self
            .build(request)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn execute(&self, request: &BackendRequest) -> Result<BackendReply, BackendError> {
        debug!(%request, base = %self.base, "executing backend request");
        match request {
            BackendRequest::StatsSummary => self.fetch(request).await.map(BackendReply::StatsSummary),
            BackendRequest::Agents => self.fetch(request).await.map(BackendReply::Agents),
            BackendRequest::RecentIncidents { .. } => {
                self.fetch(request).await.map(BackendReply::Incidents)
            }
            BackendRequest::Configure(_)
            | BackendRequest::StartMonitoring
            | BackendRequest::SimulateThreat(_) => {
                self.fetch::<ActionAck>(request).await.map(BackendReply::Ack)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
