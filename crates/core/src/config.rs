use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

/// Orchestrator configuration, loadable from environment variables
/// (`CORPORA_*`, call [`load_dotenv`] first) or a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    /// Build config from environment variables.
    pub fn from_env() -> Self {
        Self {
            engine: EngineConfig::from_env(),
            throttle: ThrottleConfig::from_env(),
            jobs: JobsConfig::from_env(),
            fetch: FetchConfig::from_env(),
        }
    }

    /// Load config from a TOML file.
    pub fn from_toml_path(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  engine:   mode={:?}, workers={}",
            self.engine.mode,
            self.engine.resolved_worker_threads()
        );
        tracing::info!("  throttle: min_interval={}ms", self.throttle.default_min_interval_ms);
        tracing::info!(
            "  jobs:     poll={}s, batch={}",
            self.jobs.poll_interval_seconds,
            self.jobs.activation_batch
        );
        tracing::info!(
            "  fetch:    timeout={}s, host_interval={}ms",
            self.fetch.request_timeout_seconds,
            self.fetch.host_min_interval_ms
        );
    }
}

// ── Engine ────────────────────────────────────────────────────

/// How submitted tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Caller's thread runs the task inline; submit blocks until it
    /// finishes. Deterministic — used by tests and single-tenant setups.
    Synchronous,
    /// A bounded worker pool drains the priority queue; submit returns
    /// immediately.
    Asynchronous,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Execution mode for the task engine.
    #[serde(default = "default_mode")]
    pub mode: ExecutionMode,
    /// Number of worker threads in asynchronous mode. 0 = available
    /// parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

fn default_mode() -> ExecutionMode {
    ExecutionMode::Asynchronous
}
fn default_worker_threads() -> usize {
    0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            worker_threads: default_worker_threads(),
        }
    }
}

impl EngineConfig {
    fn from_env() -> Self {
        let mode = match env_or("CORPORA_ENGINE_MODE", "asynchronous").as_str() {
            "synchronous" => ExecutionMode::Synchronous,
            _ => ExecutionMode::Asynchronous,
        };
        Self {
            mode,
            worker_threads: env_usize("CORPORA_ENGINE_WORKERS", 0),
        }
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            self.worker_threads
        }
    }
}

// ── Throttle ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum interval between READY decisions for one key, in ms.
    #[serde(default = "default_min_interval_ms")]
    pub default_min_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    2_000
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            default_min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl ThrottleConfig {
    fn from_env() -> Self {
        Self {
            default_min_interval_ms: env_u64("CORPORA_THROTTLE_INTERVAL_MS", default_min_interval_ms()),
        }
    }
}

// ── Jobs ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Scheduler tick interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Max documents activated per facade pass.
    #[serde(default = "default_activation_batch")]
    pub activation_batch: usize,
}

fn default_poll_interval() -> u64 {
    30
}
fn default_activation_batch() -> usize {
    16
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            activation_batch: default_activation_batch(),
        }
    }
}

impl JobsConfig {
    fn from_env() -> Self {
        Self {
            poll_interval_seconds: env_u64("CORPORA_JOBS_POLL_SECONDS", default_poll_interval()),
            activation_batch: env_usize("CORPORA_JOBS_BATCH", default_activation_batch()),
        }
    }
}

// ── Fetch ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// User-Agent header sent to origin servers.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Minimum interval between requests to one origin host, in ms.
    #[serde(default = "default_host_interval_ms")]
    pub host_min_interval_ms: u64,
}

fn default_request_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    "corpora-fetch/0.1".to_string()
}
fn default_host_interval_ms() -> u64 {
    2_000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            user_agent: default_user_agent(),
            host_min_interval_ms: default_host_interval_ms(),
        }
    }
}

impl FetchConfig {
    fn from_env() -> Self {
        Self {
            request_timeout_seconds: env_u64("CORPORA_FETCH_TIMEOUT_SECONDS", default_request_timeout()),
            user_agent: env_or("CORPORA_FETCH_USER_AGENT", &default_user_agent()),
            host_min_interval_ms: env_u64("CORPORA_FETCH_HOST_INTERVAL_MS", default_host_interval_ms()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.mode, ExecutionMode::Asynchronous);
        assert_eq!(config.engine.worker_threads, 0);
        assert_eq!(config.throttle.default_min_interval_ms, 2_000);
        assert_eq!(config.jobs.poll_interval_seconds, 30);
        assert_eq!(config.fetch.request_timeout_seconds, 30);
    }

    #[test]
    fn resolved_worker_threads() {
        let mut config = EngineConfig::default();
        // 0 means auto-detect
        assert!(config.resolved_worker_threads() > 0);

        config.worker_threads = 8;
        assert_eq!(config.resolved_worker_threads(), 8);
    }

    #[test]
    fn toml_partial_sections_use_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [engine]
            mode = "synchronous"
            worker_threads = 2
            "#,
        )
        .unwrap();
        assert_eq!(parsed.engine.mode, ExecutionMode::Synchronous);
        assert_eq!(parsed.engine.worker_threads, 2);
        assert_eq!(parsed.jobs.poll_interval_seconds, 30);
    }
}
