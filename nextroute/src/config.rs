//! `backend.toml` configuration of the relay backend.

use crate::duration::Duration;
use anyhow::{Context as _, Result, ensure};
use nextroute_core::{NearRelayPolicy, defaults::DEFAULT_STALE_DURATION, stats::StatsStore};
use serde::Deserialize;
use std::path::Path;

/// Where extracted ping statistics go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Discard,
    Local,
    Log,
}

/// Top-level backend configuration.
///
/// ```
/// # use nextroute::config::{BackendConfig, SinkKind};
/// let config = BackendConfig::from_toml_str(r#"
///     max_jitter = 5.0
///     stale_duration = "1m"
///     sink = "log"
///
///     [near_relays]
///     latency_threshold_ms = 20.0
/// "#).unwrap();
///
/// assert_eq!(config.max_jitter, 5.0);
/// assert_eq!(config.max_packet_loss, 1.0);
/// assert_eq!(config.stale_duration.into_duration().as_secs(), 60);
/// assert_eq!(config.sink, SinkKind::Log);
/// assert_eq!(config.near_relays.max_distance_km, 2500);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendConfig {
    /// Pairs with more jitter than this, in milliseconds, get no cost.
    #[serde(default = "BackendConfig::default_max_jitter")]
    pub max_jitter: f32,
    /// Pairs with more packet loss than this, in percent, get no cost.
    #[serde(default = "BackendConfig::default_max_packet_loss")]
    pub max_packet_loss: f32,
    /// Route matrices older than this are refused.
    #[serde(default = "BackendConfig::default_stale_duration")]
    pub stale_duration: Duration,
    /// Stamped on every published ping statistics entry.
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "BackendConfig::default_stats_shards")]
    pub stats_shards: usize,
    #[serde(default)]
    pub sink: SinkKind,
    #[serde(default)]
    pub near_relays: NearRelayPolicy,
}

impl BackendConfig {
    fn default_max_jitter() -> f32 {
        10.0
    }

    fn default_max_packet_loss() -> f32 {
        1.0
    }

    fn default_stale_duration() -> Duration {
        Duration::new(DEFAULT_STALE_DURATION)
    }

    fn default_stats_shards() -> usize {
        StatsStore::DEFAULT_SHARDS
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.stats_shards > 0, "stats_shards must be greater than 0");
        ensure!(
            self.max_jitter.is_finite() && self.max_jitter >= 0.0,
            "max_jitter must be a positive number, got {}",
            self.max_jitter
        );
        ensure!(
            self.max_packet_loss.is_finite() && self.max_packet_loss >= 0.0,
            "max_packet_loss must be a positive number, got {}",
            self.max_packet_loss
        );
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_jitter: Self::default_max_jitter(),
            max_packet_loss: Self::default_max_packet_loss(),
            stale_duration: Self::default_stale_duration(),
            instance_id: String::new(),
            debug: false,
            stats_shards: Self::default_stats_shards(),
            sink: SinkKind::default(),
            near_relays: NearRelayPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_default() {
        assert_eq!(BackendConfig::from_toml_str("").unwrap(), BackendConfig::default());
    }

    #[test]
    fn full() {
        let config = BackendConfig::from_toml_str(
            r#"
            max_jitter = 2.5
            max_packet_loss = 0.5
            stale_duration = "45s"
            instance_id = "backend-1"
            debug = true
            stats_shards = 4
            sink = "local"

            [near_relays]
            max_distance_km = 1000
            latency_threshold_ms = 15.0
            latency_scale = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.max_jitter, 2.5);
        assert_eq!(config.max_packet_loss, 0.5);
        assert_eq!(config.stale_duration.into_duration().as_secs(), 45);
        assert_eq!(config.instance_id, "backend-1");
        assert!(config.debug);
        assert_eq!(config.stats_shards, 4);
        assert_eq!(config.sink, SinkKind::Local);
        assert_eq!(
            config.near_relays,
            NearRelayPolicy {
                max_distance_km: 1000,
                latency_threshold_ms: 15.0,
                latency_scale: 2.0,
            }
        );
    }

    #[test]
    fn invalid() {
        assert!(BackendConfig::from_toml_str("stats_shards = 0").is_err());
        assert!(BackendConfig::from_toml_str("max_jitter = -1.0").is_err());
        assert!(BackendConfig::from_toml_str(r#"stale_duration = "soon""#).is_err());
        assert!(BackendConfig::from_toml_str(r#"sink = "kafka""#).is_err());
    }

    #[test]
    fn load() {
        let path = std::env::temp_dir().join(format!("nextroute-config-{}.toml", std::process::id()));
        std::fs::write(&path, "max_jitter = 3.0\n").unwrap();
        let config = BackendConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.max_jitter, 3.0);

        let error = BackendConfig::load(&path).unwrap_err();
        assert!(error.to_string().contains("failed to read config file"));
    }
}
