//! Blocking HTTP access to the upstream platform and the push relay.

use std::time::Duration;
use thiserror::Error;

/// Desktop browser identity; the mobile page and betard endpoint reject bare clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Per-request timeout so a stalled room cannot block the cycle
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("could not read response body: {0}")]
    Body(String),
}

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL after following redirects
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Network seam shared by the resolver and the push relay
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<Fetched, FetchError>;

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<Fetched, FetchError>;
}

/// `reqwest` backed client used in production
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    fn finish(response: reqwest::blocking::Response) -> Result<Fetched, FetchError> {
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| FetchError::Body(e.to_string()))?;
        Ok(Fetched {
            final_url,
            status,
            body,
        })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Fetched, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Self::finish(response)
    }

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<Fetched, FetchError> {
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Self::finish(response)
    }
}
