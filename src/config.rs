//! # Kernel and self-healing configuration.
//!
//! Provides [`KernelConfig`] (kernel, health supervision, node role) and
//! [`HealingConfig`] (queue monitor, anomaly predictor, rule engine, recovery).
//!
//! Config is loaded three ways:
//! 1. **Defaults**: `KernelConfig::default()`
//! 2. **TOML**: `KernelConfig::from_toml_str(doc)`; missing keys fall back to defaults
//! 3. **Environment**: `KernelConfig::from_env()` overlays `REGION`, `NODE_ROLE`
//!    and `KERNEL_HEALTH_INTERVAL_MS` on the defaults
//!
//! ## Units
//! Durations are written in milliseconds in TOML (`*_ms` keys).
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use kernelvisor::KernelConfig;
//!
//! let cfg = KernelConfig::from_toml_str(r#"
//!     region = "EU-WEST-2"
//!     health_interval_ms = 10000
//!
//!     [healing]
//!     stall_threshold = 250
//! "#).unwrap();
//!
//! assert_eq!(cfg.region, "EU-WEST-2");
//! assert_eq!(cfg.health_interval, Duration::from_secs(10));
//! assert_eq!(cfg.healing.stall_threshold, 250);
//! assert_eq!(cfg.healing.cooldown, Duration::from_secs(60));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which process owns the background loops.
///
/// Only a `Primary` node runs the health supervisor, the queue monitor and the
/// rule engine; replicas serve reads only. This keeps recovery actions and
/// metric writes singleton per deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    #[default]
    Primary,
    Replica,
}

impl NodeRole {
    /// True for the node that runs background loops.
    #[inline]
    pub fn is_primary(self) -> bool {
        matches!(self, NodeRole::Primary)
    }
}

/// Global configuration for the kernel.
///
/// ## Field semantics
/// - `region`: identifier stamped on health records and replicated events
/// - `role`: see [`NodeRole`]
/// - `health_interval`: period of the health supervision cycle
/// - `health_timeout`: per-service health check deadline (`0s` = no deadline)
/// - `healing`: self-healing knobs
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub region: String,
    pub role: NodeRole,

    #[serde(rename = "health_interval_ms", with = "millis")]
    pub health_interval: Duration,

    #[serde(rename = "health_timeout_ms", with = "millis")]
    pub health_timeout: Duration,

    pub healing: HealingConfig,
}

impl KernelConfig {
    /// Parses a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(doc: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(doc)?)
    }

    /// Defaults overlaid with `REGION`, `NODE_ROLE` and `KERNEL_HEALTH_INTERVAL_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(region) = std::env::var("REGION") {
            if !region.trim().is_empty() {
                cfg.region = region;
            }
        }
        if let Ok(role) = std::env::var("NODE_ROLE") {
            cfg.role = match role.to_ascii_lowercase().as_str() {
                "primary" => NodeRole::Primary,
                "replica" => NodeRole::Replica,
                _ => {
                    return Err(ConfigError::Env {
                        var: "NODE_ROLE",
                        value: role,
                    });
                }
            };
        }
        if let Ok(raw) = std::env::var("KERNEL_HEALTH_INTERVAL_MS") {
            let ms = raw.parse::<u64>().map_err(|_| ConfigError::Env {
                var: "KERNEL_HEALTH_INTERVAL_MS",
                value: raw.clone(),
            })?;
            cfg.health_interval = Duration::from_millis(ms);
        }
        Ok(cfg)
    }

    /// Returns the health check deadline as an `Option`.
    ///
    /// - `None` → wait for the service indefinitely
    /// - `Some(d)` → a check slower than `d` counts as failed
    #[inline]
    pub fn health_deadline(&self) -> Option<Duration> {
        if self.health_timeout == Duration::ZERO {
            None
        } else {
            Some(self.health_timeout)
        }
    }

    /// Health interval clamped to at least 1ms (`tokio::time::interval` rejects zero).
    #[inline]
    pub fn health_interval_clamped(&self) -> Duration {
        self.health_interval.max(Duration::from_millis(1))
    }
}

impl Default for KernelConfig {
    /// Default configuration:
    ///
    /// - `region = "GLOBAL-1"`
    /// - `role = Primary`
    /// - `health_interval = 30s`
    /// - `health_timeout = 5s`
    fn default() -> Self {
        Self {
            region: "GLOBAL-1".to_string(),
            role: NodeRole::Primary,
            health_interval: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
            healing: HealingConfig::default(),
        }
    }
}

/// Self-healing configuration.
///
/// - `queue_interval`: queue monitor polling period
/// - `stall_threshold`: `waiting` above this emits `queue.stalled`
/// - `history_window`: samples read per risk evaluation
/// - `min_history`: below this many samples risk is always SAFE
/// - `surge_multiplier`: `current > multiplier × mean` is HIGH_RISK
/// - `insight_confidence`: confidence stored on predictive insights
/// - `cooldown`: minimum time between two firings of the same recovery action
/// - `scaled_concurrency`: worker concurrency applied by `scaleWorkers`
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HealingConfig {
    #[serde(rename = "queue_interval_ms", with = "millis")]
    pub queue_interval: Duration,

    pub stall_threshold: u64,
    pub history_window: usize,
    pub min_history: usize,
    pub surge_multiplier: f64,
    pub insight_confidence: f64,

    #[serde(rename = "cooldown_ms", with = "millis")]
    pub cooldown: Duration,

    pub scaled_concurrency: usize,
}

impl HealingConfig {
    /// Queue interval clamped to at least 1ms.
    #[inline]
    pub fn queue_interval_clamped(&self) -> Duration {
        self.queue_interval.max(Duration::from_millis(1))
    }
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            queue_interval: Duration::from_secs(15),
            stall_threshold: 1000,
            history_window: 20,
            min_history: 5,
            surge_multiplier: 5.0,
            insight_confidence: 0.95,
            cooldown: Duration::from_secs(60),
            scaled_concurrency: 50,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
