//! Configuration module
//!
//! This module provides configuration for the document pipeline: scan engine
//! endpoints and timeouts, blob storage backend settings, and the delivery
//! relay policy. Everything is read from the environment with sensible
//! defaults for local development.

use std::env;
use std::time::Duration;

use crate::storage_types::StorageBackend;

// Common constants
const DEFAULT_SCAN_ENDPOINT: &str = "127.0.0.1:3310";
const SCAN_CONNECT_ATTEMPTS: u32 = 3;
const SCAN_RETRY_DELAY_MS: u64 = 500;
const SCAN_TIMEOUT_SECS: u64 = 30;
const SCAN_CHUNK_BYTES: usize = 64 * 1024;
const SCAN_MAX_ARCHIVE_DEPTH: u32 = 100;
const RELAY_TIMEOUT_SECS: u64 = 4;
const RELAY_ATTEMPTS: u32 = 3;

/// Scan engine client configuration.
#[derive(Clone, Debug)]
pub struct ScanSettings {
    /// `host:port` endpoints tried in order when connecting.
    pub endpoints: Vec<String>,
    pub connect_attempts: u32,
    pub retry_delay_ms: u64,
    pub io_timeout_secs: u64,
    /// Upper bound on a single streamed chunk; the engine rejects larger.
    pub chunk_size: usize,
    /// How deep nested archives are unpacked before scanning gives up.
    pub max_archive_depth: u32,
}

impl ScanSettings {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            endpoints: vec![DEFAULT_SCAN_ENDPOINT.to_string()],
            connect_attempts: SCAN_CONNECT_ATTEMPTS,
            retry_delay_ms: SCAN_RETRY_DELAY_MS,
            io_timeout_secs: SCAN_TIMEOUT_SECS,
            chunk_size: SCAN_CHUNK_BYTES,
            max_archive_depth: SCAN_MAX_ARCHIVE_DEPTH,
        }
    }
}

/// Delivery relay policy: one timeout and attempt budget applied to both
/// the initial backend response and each subsequent body read.
#[derive(Clone, Debug)]
pub struct RelaySettings {
    pub attempt_timeout_secs: u64,
    pub max_attempts: u32,
}

impl RelaySettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            attempt_timeout_secs: RELAY_TIMEOUT_SECS,
            max_attempts: RELAY_ATTEMPTS,
        }
    }
}

/// Blob storage backend configuration.
#[derive(Clone, Debug, Default)]
pub struct StorageSettings {
    pub backend: Option<StorageBackend>,
    pub azure_account: Option<String>,
    pub azure_access_key: Option<String>,
    /// Custom endpoint for Azurite or other emulators.
    pub azure_endpoint: Option<String>,
    /// Public root used when building external URLs; derived from the
    /// account name when unset.
    pub azure_public_base_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

/// Application configuration for the document pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub environment: String,
    pub scan: ScanSettings,
    pub relay: RelaySettings,
    pub storage: StorageSettings,
}

impl PipelineConfig {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase().eq("production") || self.environment.to_lowercase().eq("prod")
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let endpoints: Vec<String> = env::var("SCAN_ENDPOINTS")
            .unwrap_or_else(|_| DEFAULT_SCAN_ENDPOINT.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if endpoints.is_empty() {
            return Err(anyhow::anyhow!(
                "SCAN_ENDPOINTS must contain at least one host:port entry"
            ));
        }

        let scan = ScanSettings {
            endpoints,
            connect_attempts: env::var("SCAN_CONNECT_ATTEMPTS")
                .unwrap_or_else(|_| SCAN_CONNECT_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(SCAN_CONNECT_ATTEMPTS),
            retry_delay_ms: env::var("SCAN_RETRY_DELAY_MS")
                .unwrap_or_else(|_| SCAN_RETRY_DELAY_MS.to_string())
                .parse()
                .unwrap_or(SCAN_RETRY_DELAY_MS),
            io_timeout_secs: env::var("SCAN_TIMEOUT_SECS")
                .unwrap_or_else(|_| SCAN_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(SCAN_TIMEOUT_SECS),
            chunk_size: env::var("SCAN_CHUNK_BYTES")
                .unwrap_or_else(|_| SCAN_CHUNK_BYTES.to_string())
                .parse()
                .unwrap_or(SCAN_CHUNK_BYTES)
                .min(SCAN_CHUNK_BYTES),
            max_archive_depth: env::var("SCAN_MAX_ARCHIVE_DEPTH")
                .unwrap_or_else(|_| SCAN_MAX_ARCHIVE_DEPTH.to_string())
                .parse()
                .unwrap_or(SCAN_MAX_ARCHIVE_DEPTH),
        };

        let relay = RelaySettings {
            attempt_timeout_secs: env::var("RELAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| RELAY_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(RELAY_TIMEOUT_SECS),
            max_attempts: env::var("RELAY_ATTEMPTS")
                .unwrap_or_else(|_| RELAY_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(RELAY_ATTEMPTS),
        };

        let backend = env::var("STORAGE_BACKEND")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "azure" => Some(StorageBackend::Azure),
                "local" => Some(StorageBackend::Local),
                _ => None,
            });

        let storage = StorageSettings {
            backend,
            azure_account: env::var("AZURE_STORAGE_ACCOUNT").ok(),
            azure_access_key: env::var("AZURE_STORAGE_ACCESS_KEY").ok(),
            azure_endpoint: env::var("AZURE_STORAGE_ENDPOINT").ok(),
            azure_public_base_url: env::var("AZURE_PUBLIC_BASE_URL").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
        };

        let config = PipelineConfig {
            environment,
            scan,
            relay,
            storage,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage.backend {
            Some(StorageBackend::Azure) => {
                if self.storage.azure_account.is_none() {
                    return Err(anyhow::anyhow!(
                        "AZURE_STORAGE_ACCOUNT must be set when STORAGE_BACKEND is azure"
                    ));
                }
            }
            Some(StorageBackend::Local) => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND is local"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when STORAGE_BACKEND is local"
                    ));
                }
            }
            None => {
                if self.is_production() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND must be set in production (azure or local)"
                    ));
                }
            }
        }
        if self.relay.max_attempts == 0 {
            return Err(anyhow::anyhow!("RELAY_ATTEMPTS must be at least 1"));
        }
        Ok(())
    }
}
