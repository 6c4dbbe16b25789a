//! Polling source configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::{ConsumerError, Result};

/// Default upper bound on items fetched per poll cycle.
pub const DEFAULT_MAX_MESSAGES_PER_POLL: usize = 10;

/// What to poll and how much per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ConsumerConfig {
    /// Container (bucket) to consume from.
    #[cfg_attr(
        feature = "config",
        arg(long = "consumer-container", env = "CONSUMER_CONTAINER")
    )]
    pub container: String,

    /// Only consume objects under this path prefix.
    #[cfg_attr(
        feature = "config",
        arg(long = "consumer-directory", env = "CONSUMER_DIRECTORY")
    )]
    #[serde(default)]
    pub directory: Option<String>,

    /// Backend location used when the container has to be created at startup.
    #[cfg_attr(
        feature = "config",
        arg(long = "consumer-location-id", env = "CONSUMER_LOCATION_ID")
    )]
    #[serde(default)]
    pub location_id: Option<String>,

    /// Maximum number of objects handed over per poll. Zero means unbounded.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "consumer-max-messages-per-poll",
            env = "CONSUMER_MAX_MESSAGES_PER_POLL",
            default_value_t = DEFAULT_MAX_MESSAGES_PER_POLL
        )
    )]
    #[serde(default = "default_max_messages_per_poll")]
    pub max_messages_per_poll: usize,
}

fn default_max_messages_per_poll() -> usize {
    DEFAULT_MAX_MESSAGES_PER_POLL
}

impl ConsumerConfig {
    /// Creates a configuration for `container` with default limits.
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            directory: None,
            location_id: None,
            max_messages_per_poll: DEFAULT_MAX_MESSAGES_PER_POLL,
        }
    }

    /// Restricts polling to a directory prefix.
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Sets the location used to create a missing container.
    pub fn with_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    /// Sets the per-poll bound.
    pub fn with_max_messages_per_poll(mut self, max_messages_per_poll: usize) -> Self {
        self.max_messages_per_poll = max_messages_per_poll;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::InvalidConfig`] when the container name is blank.
    pub fn validate(&self) -> Result<()> {
        if self.container.trim().is_empty() {
            return Err(ConsumerError::invalid_config(
                "consumer container must not be empty",
            ));
        }
        Ok(())
    }
}
