use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use utoipa::ToSchema;

use crate::error::{RegistryError, RegistryResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegistryConfig {
    /// Upper bound on any single store call.
    #[serde(default = "default_store_timeout", with = "duration_ms")]
    #[schema(value_type = u64, pattern = "uint64 as milliseconds")]
    pub store_timeout: Duration,

    /// Deletes in flight at once during a bulk delete.
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,

    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// How long an add request token is remembered.
    #[serde(default = "default_idempotency_window", with = "duration_ms")]
    #[schema(value_type = u64, pattern = "uint64 as milliseconds")]
    pub idempotency_window: Duration,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store_timeout: default_store_timeout(),
            bulk_concurrency: default_bulk_concurrency(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            idempotency_window: default_idempotency_window(),
            storage: StorageConfig::default(),
        }
    }
}

impl RegistryConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> RegistryResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RegistryError::validation(format!(
                "Failed to open config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            RegistryError::validation(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.bulk_concurrency == 0 {
            return Err(RegistryError::validation(
                "bulk_concurrency must be at least 1",
            ));
        }
        if self.max_page_size == 0 {
            return Err(RegistryError::validation("max_page_size must be at least 1"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(RegistryError::validation(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        if self.store_timeout.is_zero() {
            return Err(RegistryError::validation("store_timeout must be positive"));
        }
        Ok(())
    }
}

/// Which record store backs the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    InMemory,
    LocalFs {
        /// Data directory. Interfaces are kept under `interfaces/`, caller
        /// grants under `user_interfaces/`.
        path: String,
    },
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_bulk_concurrency() -> usize {
    8
}
fn default_page_size() -> u64 {
    10
}
fn default_max_page_size() -> u64 {
    100
}
fn default_idempotency_window() -> Duration {
    Duration::from_secs(600)
}

pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
