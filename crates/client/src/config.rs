//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Default ViaCEP endpoint.
pub const VIACEP_BASE_URL: &str = "https://viacep.com.br/ws";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how the client talks to the API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, e.g. `https://api.tavola.app`. Routes are resolved under
    /// `/api/v1`.
    pub base_url: Url,
    /// Per-request timeout. Requests are never retried.
    pub timeout: Duration,
    /// Base URL of the postal-code service.
    pub viacep_base_url: String,
    /// Directory for persisted client state.
    pub storage_dir: PathBuf,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API origin.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            timeout: DEFAULT_TIMEOUT,
            viacep_base_url: VIACEP_BASE_URL.to_owned(),
            storage_dir: PathBuf::from(".tavola"),
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_viacep_base_url(mut self, url: impl Into<String>) -> Self {
        self.viacep_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}
