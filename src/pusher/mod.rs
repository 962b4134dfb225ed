//! Delivery of encoded batches to a Prometheus push gateway.

mod instance;

pub use instance::{LocalIpv4, ResolveError, Resolver, Static};

use crate::config;

use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};

use std::net::Ipv4Addr;

const USER_AGENT: &str = "node pusher";

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid auth header: {0}")]
    Header(String),
    #[error("failed to push metrics to {url}: {source}")]
    Send { url: String, source: reqwest::Error },
}

/// What the gateway made of a push that reached it.
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted(StatusCode),
    Rejected { status: StatusCode, body: String },
}

/// The gateway grouping for this agent, `job` and `instance`.
pub struct PushTarget {
    address: String,
    job: String,
}

impl PushTarget {
    pub fn new(address: &str, job: &str) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            job: job.to_string(),
        }
    }

    pub fn url(&self, instance: Ipv4Addr) -> String {
        format!(
            "{}/metrics/job/{}/instance/{instance}",
            self.address, self.job
        )
    }
}

pub struct Pusher {
    client: Client,
    target: PushTarget,
    auth_name: HeaderName,
    auth_value: HeaderValue,
    content_type: &'static str,
}

impl Pusher {
    pub fn new(config: &config::Pusher) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(PushError::Client)?;

        let auth_name = HeaderName::from_bytes(config.auth_header().as_bytes())
            .map_err(|e| PushError::Header(e.to_string()))?;

        let mut auth_value = HeaderValue::from_str(&format!("bearer {}", config.token()))
            .map_err(|e| PushError::Header(e.to_string()))?;
        auth_value.set_sensitive(true);

        Ok(Self {
            client,
            target: PushTarget::new(config.address(), config.job()),
            auth_name,
            auth_value,
            content_type: config.format().content_type(),
        })
    }

    /// POSTs one encoded batch. Only transport failures are errors, a
    /// response with any status is an outcome.
    pub async fn push(&self, instance: Ipv4Addr, body: Vec<u8>) -> Result<PushOutcome, PushError> {
        let url = self.target.url(instance);

        let response = self
            .client
            .post(&url)
            .header(self.auth_name.clone(), self.auth_value.clone())
            .header(CONTENT_TYPE, self.content_type)
            .body(body)
            .send()
            .await
            .map_err(|source| PushError::Send {
                url: url.clone(),
                source,
            })?;

        let status = response.status();

        if status.is_success() {
            return Ok(PushOutcome::Accepted(status));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("<failed to read response body: {e}>"),
        };

        Ok(PushOutcome::Rejected { status, body })
    }
}
