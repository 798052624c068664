//! Configuration types for the auditing pipeline.
//!
//! Configuration is usually loaded from YAML:
//!
//! ```yaml
//! policyName: kube-auditing-webhook
//! clientIpHeaders: [X-Client-IP, X-Real-IP]
//! eventQueueCapacity: 10000
//! ```

use std::path::{Path, PathBuf};

use axum::http::HeaderName;
use kaudit_core::DEFAULT_POLICY_NAME;
use kaudit_event::ChannelBackend;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Header set by trusted reverse proxies with the original client address.
pub const X_CLIENT_IP: &str = "X-Client-IP";

/// Alternate client address header.
pub const X_REAL_IP: &str = "X-Real-IP";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is malformed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A configuration value is invalid.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Reason for invalidity.
        reason: String,
    },
}

/// Configuration for the auditing pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditingConfig {
    /// Name of the policy object consulted on every request.
    pub policy_name: String,

    /// Trusted headers carrying the client address, in priority order.
    pub client_ip_headers: Vec<String>,

    /// Capacity of the queue between the pipeline and the shipping task.
    pub event_queue_capacity: usize,
}

impl Default for AuditingConfig {
    fn default() -> Self {
        Self {
            policy_name: DEFAULT_POLICY_NAME.to_string(),
            client_ip_headers: vec![X_CLIENT_IP.to_string(), X_REAL_IP.to_string()],
            event_queue_capacity: 10_000,
        }
    }
}

impl AuditingConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy name.
    #[must_use]
    pub fn with_policy_name(mut self, name: impl Into<String>) -> Self {
        self.policy_name = name.into();
        self
    }

    /// Sets the trusted client address headers.
    #[must_use]
    pub fn with_client_ip_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.client_ip_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the event queue capacity.
    #[must_use]
    pub const fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    /// Parses configuration from YAML and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or invalid.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy_name.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "policyName cannot be empty".to_string(),
            });
        }
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                reason: "eventQueueCapacity must be greater than zero".to_string(),
            });
        }
        self.header_names().map(|_| ())
    }

    /// Creates the delivery queue sized by `eventQueueCapacity`.
    ///
    /// The backend goes into the dispatcher; the receiver belongs to the task
    /// shipping events off the request path.
    #[must_use]
    pub fn channel_backend(&self) -> (ChannelBackend, mpsc::Receiver<String>) {
        ChannelBackend::new(self.event_queue_capacity)
    }

    /// Returns the client address headers as parsed header names.
    ///
    /// # Errors
    ///
    /// Returns an error if a header name is not a valid HTTP header name.
    pub fn header_names(&self) -> Result<Vec<HeaderName>, ConfigError> {
        self.client_ip_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| ConfigError::Invalid {
                    reason: format!("invalid client IP header name '{name}'"),
                })
            })
            .collect()
    }
}
