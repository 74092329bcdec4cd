//! Configuration for fetch scheduling, listing coordination and the HTTP client
//!
//! Scheduling timings come from presets or a custom configuration; every
//! struct can also be loaded from JSON.

use crate::core::constants::{
    DEFAULT_CITY_PER_PAGE, DEFAULT_DEBOUNCE_MS, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MAP_PER_PAGE,
    DEFAULT_THROTTLE_MS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerProfile {
    Balanced,
    /// Shorter quiet periods, more requests
    Responsive,
    /// Longer quiet periods for slow links or rate-limited backends
    Conservative,
    Custom(SchedulerConfig),
}

impl SchedulerProfile {
    pub fn resolve(&self) -> SchedulerConfig {
        match self {
            Self::Balanced => SchedulerConfig {
                debounce_ms: DEFAULT_DEBOUNCE_MS,
                throttle_ms: DEFAULT_THROTTLE_MS,
                skip_duplicates: true,
            },
            Self::Responsive => SchedulerConfig {
                debounce_ms: 150,
                throttle_ms: 400,
                skip_duplicates: true,
            },
            Self::Conservative => SchedulerConfig {
                debounce_ms: 600,
                throttle_ms: 2000,
                skip_duplicates: true,
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for SchedulerProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Timing and coalescing behaviour of the viewport fetch scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Quiet period after the latest `schedule` call before fetching
    pub debounce_ms: u64,
    /// Longest a burst of `schedule` calls can delay a fetch
    pub throttle_ms: u64,
    /// Drop debounced fetches identical to the last issued one
    pub skip_duplicates: bool,
}

impl SchedulerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.throttle_ms == 0 {
            return Err(Error::Config("throttle_ms must be greater than zero".into()));
        }
        if self.throttle_ms < self.debounce_ms {
            return Err(Error::Config(format!(
                "throttle_ms ({}) must not be shorter than debounce_ms ({})",
                self.throttle_ms, self.debounce_ms
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn for_testing() -> Self {
        Self {
            debounce_ms: 300,
            throttle_ms: 800,
            skip_duplicates: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerProfile::default().resolve()
    }
}

/// Behaviour of the filter coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub city_per_page: u32,
    pub map_per_page: u32,
    /// Re-query the backend when the property type changes, in addition to
    /// filtering the cached set locally
    pub refetch_on_filter_change: bool,
    pub scheduler: SchedulerConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            city_per_page: DEFAULT_CITY_PER_PAGE,
            map_per_page: DEFAULT_MAP_PER_PAGE,
            refetch_on_filter_change: true,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.city_per_page == 0 || self.map_per_page == 0 {
            return Err(Error::Config("page sizes must be greater than zero".into()));
        }
        self.scheduler.validate()
    }
}

/// HTTP client settings for the listings backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host of the API, without a trailing path
    pub base_url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            user_agent: concat!("listing-map/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
