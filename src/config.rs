//! Pusher configuration
//!
//! Loaded once from a TOML file and passed explicitly to the pusher and the
//! scheduler. Every tunable has a default, so an empty file is valid apart
//! from having no stations.

use crate::adapters::{adapter_for, ProviderAdapter};
use crate::error::PushError;
use crate::types::{ProviderId, StationConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PusherConfig {
    /// Maximum age of a module reading, in seconds
    #[serde(default = "default_time_shift_threshold")]
    pub time_shift_threshold_secs: u64,

    /// Total HTTP request timeout, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound on simultaneous pushes in one cycle
    #[serde(default = "default_max_concurrent_pushes")]
    pub max_concurrent_pushes: usize,

    /// Cadence of the run loop, in seconds
    #[serde(default = "default_push_interval")]
    pub push_interval_secs: u64,

    /// Overrides the `softwaretype` signature sent to providers
    #[serde(default)]
    pub software_signature: Option<String>,

    /// Per-provider endpoint overrides, keyed by provider name
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,

    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

fn default_time_shift_threshold() -> u64 {
    30 * 60
}

fn default_http_timeout() -> u64 {
    45
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_concurrent_pushes() -> usize {
    4
}

fn default_push_interval() -> u64 {
    10 * 60
}

impl Default for PusherConfig {
    fn default() -> Self {
        Self {
            time_shift_threshold_secs: default_time_shift_threshold(),
            http_timeout_secs: default_http_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_concurrent_pushes: default_max_concurrent_pushes(),
            push_interval_secs: default_push_interval(),
            software_signature: None,
            endpoints: BTreeMap::new(),
            stations: Vec::new(),
        }
    }
}

impl PusherConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PushError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, PushError> {
        let config: PusherConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PushError> {
        if self.time_shift_threshold_secs == 0 {
            return Err(PushError::InvalidConfig(
                "time_shift_threshold_secs must be greater than zero".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(PushError::InvalidConfig(
                "HTTP timeouts must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_pushes == 0 {
            return Err(PushError::InvalidConfig(
                "max_concurrent_pushes must be at least 1".to_string(),
            ));
        }
        if self.push_interval_secs == 0 {
            return Err(PushError::InvalidConfig(
                "push_interval_secs must be greater than zero".to_string(),
            ));
        }
        for name in self.endpoints.keys() {
            name.parse::<ProviderId>()?;
        }

        let mut seen = HashSet::new();
        for station in &self.stations {
            if station.station_id.trim().is_empty() {
                return Err(PushError::InvalidConfig("station_id cannot be empty".to_string()));
            }
            if !seen.insert(station.station_id.as_str()) {
                return Err(PushError::InvalidConfig(format!(
                    "duplicate station_id {}",
                    station.station_id
                )));
            }
            let mut providers = HashSet::new();
            for creds in &station.providers {
                if !providers.insert(creds.provider) {
                    return Err(PushError::InvalidConfig(format!(
                        "station {} lists provider {} twice",
                        station.station_id, creds.provider
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn time_shift_threshold(&self) -> Duration {
        Duration::from_secs(self.time_shift_threshold_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_secs(self.push_interval_secs)
    }

    pub fn signature(&self) -> String {
        self.software_signature
            .clone()
            .unwrap_or_else(|| crate::SOFTWARE_SIGNATURE.to_string())
    }

    /// Configured endpoint override for a provider
    pub fn endpoint_for(&self, provider: ProviderId) -> Option<&str> {
        self.endpoints
            .iter()
            .find(|(name, _)| name.parse::<ProviderId>().ok() == Some(provider))
            .map(|(_, url)| url.as_str())
    }

    /// Whether moving to `other` needs a new pusher and adapters; station
    /// lists are read every cycle and never do
    pub fn requires_rebuild(&self, other: &PusherConfig) -> bool {
        self.time_shift_threshold_secs != other.time_shift_threshold_secs
            || self.http_timeout_secs != other.http_timeout_secs
            || self.connect_timeout_secs != other.connect_timeout_secs
            || self.max_concurrent_pushes != other.max_concurrent_pushes
            || self.software_signature != other.software_signature
            || self.endpoints != other.endpoints
    }

    /// Adapter for a provider, honouring endpoint overrides
    pub fn adapter(&self, provider: ProviderId) -> Box<dyn ProviderAdapter> {
        adapter_for(provider, self.endpoint_for(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
time_shift_threshold_secs = 900
http_timeout_secs = 20
software_signature = "Live Weather Station test"

[endpoints]
wow = "http://localhost:8080/automaticreading"

[[stations]]
station_id = "70:ee:50:00:00:01"

[[stations.providers]]
provider = "wow"
sync = true
username = "ABC"
password = "XYZ"

[[stations.providers]]
provider = "wug"
sync = false
username = "KSTATION1"
"#;

    #[test]
    fn test_parse_sample() {
        let config = PusherConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.time_shift_threshold(), Duration::from_secs(900));
        assert_eq!(config.http_timeout(), Duration::from_secs(20));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.signature(), "Live Weather Station test");
        assert_eq!(config.stations.len(), 1);

        let station = &config.stations[0];
        let wow = station.credentials_for(ProviderId::Wow).unwrap();
        assert!(wow.sync);
        assert_eq!(wow.password, "XYZ");
        let wug = station.credentials_for(ProviderId::Wunderground).unwrap();
        assert!(!wug.sync);
        assert_eq!(wug.password, "");
    }

    #[test]
    fn test_endpoint_override() {
        let config = PusherConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            config.endpoint_for(ProviderId::Wow),
            Some("http://localhost:8080/automaticreading")
        );
        assert_eq!(config.endpoint_for(ProviderId::Pws), None);
        assert_eq!(
            config.adapter(ProviderId::Wow).endpoint(),
            "http://localhost:8080/automaticreading"
        );
    }

    #[test]
    fn test_defaults() {
        let config = PusherConfig::from_toml_str("").unwrap();
        assert_eq!(config.time_shift_threshold(), Duration::from_secs(1800));
        assert_eq!(config.http_timeout(), Duration::from_secs(45));
        assert_eq!(config.max_concurrent_pushes, 4);
        assert_eq!(config.signature(), crate::SOFTWARE_SIGNATURE);
        assert!(config.stations.is_empty());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let toml = r#"
[[stations]]
station_id = "a"
[[stations.providers]]
provider = "metar"
"#;
        assert!(matches!(
            PusherConfig::from_toml_str(toml),
            Err(PushError::TomlError(_))
        ));

        let toml = "[endpoints]\nmetar = \"http://x\"\n";
        assert!(matches!(
            PusherConfig::from_toml_str(toml),
            Err(PushError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_zero_values() {
        let toml = r#"
[[stations]]
station_id = "a"
[[stations]]
station_id = "a"
"#;
        assert!(matches!(
            PusherConfig::from_toml_str(toml),
            Err(PushError::InvalidConfig(_))
        ));

        assert!(matches!(
            PusherConfig::from_toml_str("time_shift_threshold_secs = 0"),
            Err(PushError::InvalidConfig(_))
        ));
        assert!(matches!(
            PusherConfig::from_toml_str("max_concurrent_pushes = 0"),
            Err(PushError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_requires_rebuild_ignores_station_edits() {
        let config = PusherConfig::from_toml_str(SAMPLE).unwrap();

        let mut stations_only = config.clone();
        stations_only.stations.clear();
        stations_only.push_interval_secs = 60;
        assert!(!config.requires_rebuild(&stations_only));

        let mut threshold = config.clone();
        threshold.time_shift_threshold_secs = 60;
        assert!(config.requires_rebuild(&threshold));

        let mut endpoints = config.clone();
        endpoints.endpoints.clear();
        assert!(config.requires_rebuild(&endpoints));

        let mut signature = config.clone();
        signature.software_signature = None;
        assert!(config.requires_rebuild(&signature));
    }
}
