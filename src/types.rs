//! Core types for the push pipeline
//!
//! This module defines the data structures that flow through each stage of a
//! push: station credentials, reading snapshots, the shaped payload and the
//! typed result handed back to the caller.

use crate::error::TransportError;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Third-party weather network a station can publish to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    /// WOW Met Office
    #[serde(rename = "wow")]
    Wow,
    /// PWS Weather
    #[serde(rename = "pws")]
    Pws,
    /// Weather Underground
    #[serde(rename = "wug")]
    Wunderground,
    /// OpenWeatherMap station API
    #[serde(rename = "owm")]
    OpenWeatherMap,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] = [
        ProviderId::Wow,
        ProviderId::Pws,
        ProviderId::Wunderground,
        ProviderId::OpenWeatherMap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Wow => "wow",
            ProviderId::Pws => "pws",
            ProviderId::Wunderground => "wug",
            ProviderId::OpenWeatherMap => "owm",
        }
    }

    /// Human readable network name
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::Wow => "WOW Met Office",
            ProviderId::Pws => "PWS Weather",
            ProviderId::Wunderground => "Weather Underground",
            ProviderId::OpenWeatherMap => "OpenWeatherMap",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = crate::error::PushError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wow" | "metoffice" => Ok(ProviderId::Wow),
            "pws" | "pwsweather" => Ok(ProviderId::Pws),
            "wug" | "wunderground" => Ok(ProviderId::Wunderground),
            "owm" | "openweathermap" => Ok(ProviderId::OpenWeatherMap),
            other => Err(crate::error::PushError::UnsupportedProvider(
                other.to_string(),
            )),
        }
    }
}

/// Per-station, per-provider sharing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationCredentials {
    /// Network these credentials belong to
    pub provider: ProviderId,
    /// Whether sharing to this network is switched on
    #[serde(default)]
    pub sync: bool,
    /// Site id, station id or account name depending on the provider
    #[serde(default)]
    pub username: String,
    /// Authentication key or password; unused by some providers
    #[serde(default)]
    pub password: String,
}

impl StationCredentials {
    pub fn new(
        provider: ProviderId,
        sync: bool,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sync,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn has_username(&self) -> bool {
        !self.username.trim().is_empty()
    }

    pub fn has_password(&self) -> bool {
        !self.password.trim().is_empty()
    }
}

/// A station and the networks it shares to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    pub station_id: String,
    #[serde(default)]
    pub providers: Vec<StationCredentials>,
}

impl StationConfig {
    pub fn credentials_for(&self, provider: ProviderId) -> Option<&StationCredentials> {
        self.providers.iter().find(|c| c.provider == provider)
    }
}

/// Module type tag as reported by the collecting subsystem
///
/// Tags are matched case-insensitively; unrecognized tags contribute nothing
/// to any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModuleType {
    /// Base station (indoor module, carries pressure and the reference timestamp)
    Main,
    /// Outdoor thermo-hygrometer
    Outdoor,
    /// Wind gauge
    Wind,
    /// Rain gauge
    Rain,
    /// Additional indoor module
    Indoor,
    /// Virtual module holding computed values
    Computed,
    /// Anything else
    Unknown,
}

impl ModuleType {
    pub fn as_tag(&self) -> &'static str {
        match self {
            ModuleType::Main => "NAMain",
            ModuleType::Outdoor => "NAModule1",
            ModuleType::Wind => "NAModule2",
            ModuleType::Rain => "NAModule3",
            ModuleType::Indoor => "NAModule4",
            ModuleType::Computed => "NAComputed",
            ModuleType::Unknown => "unknown",
        }
    }
}

impl From<&str> for ModuleType {
    fn from(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "namain" => ModuleType::Main,
            "namodule1" => ModuleType::Outdoor,
            "namodule2" => ModuleType::Wind,
            "namodule3" => ModuleType::Rain,
            "namodule4" => ModuleType::Indoor,
            "nacomputed" => ModuleType::Computed,
            _ => ModuleType::Unknown,
        }
    }
}

impl From<String> for ModuleType {
    fn from(tag: String) -> Self {
        ModuleType::from(tag.as_str())
    }
}

impl From<ModuleType> for String {
    fn from(module_type: ModuleType) -> Self {
        module_type.as_tag().to_string()
    }
}

/// Latest readings of one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReading {
    #[serde(default)]
    pub module_id: String,
    pub module_type: ModuleType,
    /// Observation time, epoch seconds
    pub time_utc: i64,
    /// Measurement name to value, in metric source units
    #[serde(default)]
    pub measurements: HashMap<String, f64>,
}

impl ModuleReading {
    pub fn new(module_id: impl Into<String>, module_type: ModuleType, time_utc: i64) -> Self {
        Self {
            module_id: module_id.into(),
            module_type,
            time_utc,
            measurements: HashMap::new(),
        }
    }

    /// Builder-style helper to add one measurement
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(key.into(), value);
        self
    }

    pub fn measurement(&self, key: &str) -> Option<f64> {
        self.measurements.get(key).copied()
    }

    /// Seconds elapsed between the observation and `now`
    /// Seconds elapsed since the reading, saturating for out-of-range stamps
    pub fn age_at(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().saturating_sub(self.time_utc)
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time_utc, 0)
    }
}

/// Latest known readings of one physical station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSnapshot {
    pub station_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleReading>,
}

impl ReadingSnapshot {
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            station_name: None,
            modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: ModuleReading) -> Self {
        self.modules.push(module);
        self
    }

    /// The base module anchoring the record
    pub fn base_module(&self) -> Option<&ModuleReading> {
        self.modules
            .iter()
            .find(|m| m.module_type == ModuleType::Main)
    }

    pub fn first_of(&self, module_type: ModuleType) -> Option<&ModuleReading> {
        self.modules.iter().find(|m| m.module_type == module_type)
    }
}

/// Provider-shaped, ordered key/value payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPayload {
    fields: Vec<(String, String)>,
}

impl PushPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value in place if the key already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl Serialize for PushPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Steps of a single push attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    Idle,
    CheckingEligibility,
    ShapingPayload,
    Submitting,
    Skipped,
    Success,
    ProviderError,
    TransportError,
}

impl PushState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PushState::Skipped
                | PushState::Success
                | PushState::ProviderError
                | PushState::TransportError
        )
    }
}

/// Why a push was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Sharing disabled or a required credential is empty
    NotConfigured,
    /// No fresh base module, nothing meaningful to send
    StaleData,
    /// The collector supplied no snapshot for this station
    NoSnapshot,
}

/// Terminal outcome of one push attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PushOutcome {
    Skipped { reason: SkipReason },
    /// Delivered; `warning` is set when the response body could not be understood
    Success { warning: Option<String> },
    /// The provider refused the data, message is the provider's own
    ProviderRejected { message: String },
    TransportFailed { error: TransportError },
}

/// Error taxonomy exposed to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushErrorKind {
    Configuration,
    StaleData,
    Transport,
    ProviderRejection,
    MalformedResponse,
}

/// What the caller should do about a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAdvice {
    /// Nothing to retry
    None,
    /// Network trouble, try again on the next cycle
    RetrySoon,
    /// Credentials were refused; pushing again is pointless until they change
    AwaitConfigurationChange,
}

/// Result of one push attempt
#[derive(Debug, Clone, Serialize)]
pub struct PushResult {
    pub attempt_id: Uuid,
    pub station_id: String,
    pub provider: ProviderId,
    #[serde(flatten)]
    pub outcome: PushOutcome,
    /// HTTP status, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response body, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Payload that was submitted, when a request was made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PushPayload>,
}

impl PushResult {
    pub fn skipped(station_id: &str, provider: ProviderId, reason: SkipReason) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            station_id: station_id.to_string(),
            provider,
            outcome: PushOutcome::Skipped { reason },
            status: None,
            body: None,
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PushOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, PushOutcome::Skipped { .. })
    }

    pub fn state(&self) -> PushState {
        match self.outcome {
            PushOutcome::Skipped { .. } => PushState::Skipped,
            PushOutcome::Success { .. } => PushState::Success,
            PushOutcome::ProviderRejected { .. } => PushState::ProviderError,
            PushOutcome::TransportFailed { .. } => PushState::TransportError,
        }
    }

    pub fn error_kind(&self) -> Option<PushErrorKind> {
        match &self.outcome {
            PushOutcome::Skipped {
                reason: SkipReason::NotConfigured,
            } => Some(PushErrorKind::Configuration),
            PushOutcome::Skipped { .. } => Some(PushErrorKind::StaleData),
            PushOutcome::Success { warning: Some(_) } => Some(PushErrorKind::MalformedResponse),
            PushOutcome::Success { warning: None } => None,
            PushOutcome::ProviderRejected { .. } => Some(PushErrorKind::ProviderRejection),
            PushOutcome::TransportFailed { .. } => Some(PushErrorKind::Transport),
        }
    }

    pub fn retry_advice(&self) -> RetryAdvice {
        match self.outcome {
            PushOutcome::TransportFailed { .. } => RetryAdvice::RetrySoon,
            PushOutcome::ProviderRejected { .. } => RetryAdvice::AwaitConfigurationChange,
            PushOutcome::Skipped { .. } | PushOutcome::Success { .. } => RetryAdvice::None,
        }
    }

    /// Provider message for rejected pushes
    pub fn rejection_message(&self) -> Option<&str> {
        match &self.outcome {
            PushOutcome::ProviderRejected { message } => Some(message),
            _ => None,
        }
    }
}
