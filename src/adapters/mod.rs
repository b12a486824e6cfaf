//! Provider adapters
//!
//! Each adapter describes one weather network: which readings it accepts and
//! under what names, when a station may publish to it, where and how the data
//! is sent, and how the network reports a refusal. The push workflow in
//! [`crate::pusher`] is the same for every adapter.

mod openweathermap;
mod pws;
mod wow;
mod wunderground;

pub use openweathermap::OpenWeatherMapAdapter;
pub use pws::PwsWeatherAdapter;
pub use wow::WowAdapter;
pub use wunderground::WundergroundAdapter;

use crate::types::{ModuleType, ProviderId, PushPayload, StationCredentials};
use crate::units::{Conversion, PressureUnit, RainUnit, SpeedUnit, TemperatureUnit};
use chrono::{DateTime, Utc};

/// One row of a provider's field table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Module type the source measurement is read from
    pub module: ModuleType,
    /// Measurement key inside that module
    pub source: &'static str,
    /// Payload field name expected by the provider
    pub target: &'static str,
    pub conversion: Conversion,
}

impl FieldRule {
    pub const fn new(
        module: ModuleType,
        source: &'static str,
        target: &'static str,
        conversion: Conversion,
    ) -> Self {
        Self {
            module,
            source,
            target,
            conversion,
        }
    }
}

/// Name and `strftime` format of the observation timestamp field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampField {
    pub name: &'static str,
    pub format: &'static str,
}

impl TimestampField {
    pub fn render(&self, at: DateTime<Utc>) -> String {
        at.format(self.format).to_string()
    }
}

/// `dateutc` as used by the Weather Underground protocol family
pub const DATEUTC: TimestampField = TimestampField {
    name: "dateutc",
    format: "%Y-%m-%d %H:%M:%S",
};

/// How the payload travels to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// POST with an `application/x-www-form-urlencoded` body
    PostForm,
    /// GET with the payload in the query string
    GetQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// What a response body says about the submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseScan {
    /// Nothing in the body indicates a problem
    Accepted,
    /// The provider refused the data with this message
    Rejected(String),
    /// The body could not be understood
    Unrecognized(String),
}

/// Capability set of one weather network
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> ProviderId;

    /// Whether this station may publish to the provider at all
    fn is_eligible(&self, station: &StationCredentials) -> bool {
        station.provider == self.provider()
            && station.sync
            && station.has_username()
            && (!self.requires_password() || station.has_password())
    }

    /// Whether the secondary credential field is mandatory
    fn requires_password(&self) -> bool {
        true
    }

    /// Ordered module/measurement to payload field table
    fn field_map(&self) -> &'static [FieldRule];

    /// Timestamp field taken from the base module, if the provider wants one
    fn timestamp_field(&self) -> Option<TimestampField> {
        Some(DATEUTC)
    }

    fn endpoint(&self) -> &str;

    fn method(&self) -> HttpMethod {
        HttpMethod::PostForm
    }

    /// HTTP Basic credentials; `None` when credentials travel in the payload
    fn basic_auth(&self, _station: &StationCredentials) -> Option<BasicAuth> {
        None
    }

    /// Inject identity, authentication and signature fields
    fn complete(&self, payload: &mut PushPayload, station: &StationCredentials, signature: &str);

    fn parse_error(&self, body: &str) -> ResponseScan;
}

/// Field table shared by WOW, PWS Weather and Weather Underground
pub const IMPERIAL_FIELDS: &[FieldRule] = &[
    FieldRule::new(
        ModuleType::Main,
        "Pressure",
        "baromin",
        Conversion::Pressure(PressureUnit::InchMercury, 2),
    ),
    FieldRule::new(
        ModuleType::Outdoor,
        "Temperature",
        "tempf",
        Conversion::Temperature(TemperatureUnit::Fahrenheit, 1),
    ),
    FieldRule::new(ModuleType::Outdoor, "Humidity", "humidity", Conversion::Humidity),
    FieldRule::new(
        ModuleType::Rain,
        "sum_rain_1",
        "rainin",
        Conversion::Rain(RainUnit::Inch, 2),
    ),
    FieldRule::new(
        ModuleType::Rain,
        "sum_rain_24",
        "dailyrainin",
        Conversion::Rain(RainUnit::Inch, 2),
    ),
    FieldRule::new(ModuleType::Wind, "WindAngle", "winddir", Conversion::Angle),
    FieldRule::new(
        ModuleType::Wind,
        "WindStrength",
        "windspeedmph",
        Conversion::WindSpeed(SpeedUnit::MilesPerHour, 1),
    ),
    FieldRule::new(ModuleType::Wind, "GustAngle", "windgustdir", Conversion::Angle),
    FieldRule::new(
        ModuleType::Wind,
        "GustStrength",
        "windgustmph",
        Conversion::WindSpeed(SpeedUnit::MilesPerHour, 1),
    ),
    FieldRule::new(
        ModuleType::Computed,
        "dew_point",
        "dewptf",
        Conversion::Temperature(TemperatureUnit::Fahrenheit, 1),
    ),
];

/// Build the adapter for a provider, optionally pointed at another endpoint
pub fn adapter_for(provider: ProviderId, endpoint: Option<&str>) -> Box<dyn ProviderAdapter> {
    match provider {
        ProviderId::Wow => Box::new(match endpoint {
            Some(url) => WowAdapter::with_endpoint(url),
            None => WowAdapter::default(),
        }),
        ProviderId::Pws => Box::new(match endpoint {
            Some(url) => PwsWeatherAdapter::with_endpoint(url),
            None => PwsWeatherAdapter::default(),
        }),
        ProviderId::Wunderground => Box::new(match endpoint {
            Some(url) => WundergroundAdapter::with_endpoint(url),
            None => WundergroundAdapter::default(),
        }),
        ProviderId::OpenWeatherMap => Box::new(match endpoint {
            Some(url) => OpenWeatherMapAdapter::with_endpoint(url),
            None => OpenWeatherMapAdapter::default(),
        }),
    }
}

/// Scan a JSON body for a string error field
///
/// Empty bodies and JSON without the key are accepted; anything that is not
/// JSON is unrecognized.
pub(crate) fn scan_json_error(body: &str, key: &str) -> ResponseScan {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return ResponseScan::Accepted;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => match map.get(key) {
            Some(serde_json::Value::String(message)) => ResponseScan::Rejected(message.clone()),
            Some(serde_json::Value::Null) | None => ResponseScan::Accepted,
            Some(other) => ResponseScan::Rejected(other.to_string()),
        },
        Ok(_) => ResponseScan::Accepted,
        Err(e) => ResponseScan::Unrecognized(format!("response is not JSON: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_imperial_targets_are_unique() {
        let targets: HashSet<_> = IMPERIAL_FIELDS.iter().map(|r| r.target).collect();
        assert_eq!(targets.len(), IMPERIAL_FIELDS.len());
    }

    #[test]
    fn test_dateutc_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 8, 5, 9).unwrap();
        assert_eq!(DATEUTC.render(at), "2024-01-15 08:05:09");
    }

    #[test]
    fn test_registry_honours_endpoint_override() {
        for provider in ProviderId::ALL {
            let adapter = adapter_for(provider, Some("http://127.0.0.1:9/x"));
            assert_eq!(adapter.provider(), provider);
            assert_eq!(adapter.endpoint(), "http://127.0.0.1:9/x");

            let default = adapter_for(provider, None);
            assert!(default.endpoint().starts_with("http"));
        }
    }

    #[test]
    fn test_scan_json_error() {
        assert_eq!(scan_json_error("", "errorMessage"), ResponseScan::Accepted);
        assert_eq!(scan_json_error("{}", "errorMessage"), ResponseScan::Accepted);
        assert_eq!(
            scan_json_error(r#"{"errorMessage":"Invalid site ID"}"#, "errorMessage"),
            ResponseScan::Rejected("Invalid site ID".to_string())
        );
        assert_eq!(scan_json_error("[1,2]", "errorMessage"), ResponseScan::Accepted);
        assert!(matches!(
            scan_json_error("<html>oops</html>", "errorMessage"),
            ResponseScan::Unrecognized(_)
        ));
    }

    #[test]
    fn test_default_eligibility_checks_provider() {
        let adapter = WowAdapter::default();
        let creds = StationCredentials::new(ProviderId::Pws, true, "ABC", "XYZ");
        assert!(!adapter.is_eligible(&creds));
    }
}
