use super::*;

use reqwest::Url;
use std::net::Ipv4Addr;

fn address() -> String {
    "http://129.204.3.3:32583".into()
}

fn job() -> String {
    "node".into()
}

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn auth_header() -> String {
    "Authorization".into()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pusher {
    // base url of the push gateway
    #[serde(default = "address")]
    address: String,

    // sent as `bearer <token>` in the auth header
    #[serde(default)]
    token: String,

    #[serde(default = "job")]
    job: String,

    // fixed instance address, resolved from the local interfaces when unset
    #[serde(default)]
    instance: Option<Ipv4Addr>,

    // bound on the whole request including reading a rejection body
    #[serde(default = "timeout", deserialize_with = "duration")]
    timeout: Duration,

    #[serde(default)]
    format: Format,

    // some gateways sit behind proxies expecting a custom header name
    #[serde(default = "auth_header")]
    auth_header: String,
}

impl Default for Pusher {
    fn default() -> Self {
        Self {
            address: address(),
            token: String::new(),
            job: job(),
            instance: None,
            timeout: timeout(),
            format: Format::default(),
            auth_header: auth_header(),
        }
    }
}

impl Pusher {
    pub fn check(&self) -> Result<(), String> {
        let url = Url::parse(&self.address)
            .map_err(|e| format!("bad push gateway address '{}': {e}", self.address))?;

        // the client is built without a tls stack
        if url.scheme() != "http" {
            return Err(format!(
                "push gateway address must be http: {}",
                self.address
            ));
        }

        if self.job.is_empty() || self.job.contains('/') {
            return Err(format!("invalid job name: '{}'", self.job));
        }

        if self.timeout.is_zero() {
            return Err("push timeout must be greater than zero".to_string());
        }

        if reqwest::header::HeaderName::from_bytes(self.auth_header.as_bytes()).is_err() {
            return Err(format!("invalid auth header name: '{}'", self.auth_header));
        }

        Ok(())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn instance(&self) -> Option<Ipv4Addr> {
        self.instance
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    pub(super) fn set_address(&mut self, address: String) {
        self.address = address;
    }

    pub(super) fn set_token(&mut self, token: String) {
        self.token = token;
    }

    pub(super) fn set_job(&mut self, job: String) {
        self.job = job;
    }

    pub(super) fn set_instance(&mut self, instance: Ipv4Addr) {
        self.instance = Some(instance);
    }

    pub(super) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub(super) fn set_format(&mut self, format: Format) {
        self.format = format;
    }
}
