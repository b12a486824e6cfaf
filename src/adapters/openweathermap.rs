//! OpenWeatherMap station adapter
//!
//! Metric readings are posted as a form and authenticated with HTTP Basic
//! auth. The service stamps readings on receipt, so no timestamp is sent.
//! Errors come back as `{"cod": "401", "message": "..."}`.

use super::{BasicAuth, FieldRule, ProviderAdapter, ResponseScan, TimestampField};
use crate::types::{ModuleType, ProviderId, PushPayload, StationCredentials};
use crate::units::{Conversion, PressureUnit, RainUnit, SpeedUnit, TemperatureUnit};

pub const OWM_ENDPOINT: &str = "http://openweathermap.org/data/post";

const OWM_FIELDS: &[FieldRule] = &[
    FieldRule::new(
        ModuleType::Main,
        "Pressure",
        "pressure",
        Conversion::Pressure(PressureUnit::Hectopascal, 1),
    ),
    FieldRule::new(
        ModuleType::Outdoor,
        "Temperature",
        "temp",
        Conversion::Temperature(TemperatureUnit::Celsius, 1),
    ),
    FieldRule::new(ModuleType::Outdoor, "Humidity", "humidity", Conversion::Humidity),
    FieldRule::new(
        ModuleType::Rain,
        "sum_rain_1",
        "rain_1h",
        Conversion::Rain(RainUnit::Millimeter, 1),
    ),
    FieldRule::new(
        ModuleType::Rain,
        "sum_rain_24",
        "rain_24h",
        Conversion::Rain(RainUnit::Millimeter, 1),
    ),
    FieldRule::new(ModuleType::Wind, "WindAngle", "wind_dir", Conversion::Angle),
    FieldRule::new(
        ModuleType::Wind,
        "WindStrength",
        "wind_speed",
        Conversion::WindSpeed(SpeedUnit::MetersPerSecond, 1),
    ),
    FieldRule::new(ModuleType::Wind, "GustAngle", "wind_gust_dir", Conversion::Angle),
    FieldRule::new(
        ModuleType::Wind,
        "GustStrength",
        "wind_gust",
        Conversion::WindSpeed(SpeedUnit::MetersPerSecond, 1),
    ),
    FieldRule::new(
        ModuleType::Computed,
        "dew_point",
        "dewpoint",
        Conversion::Temperature(TemperatureUnit::Celsius, 1),
    ),
];

#[derive(Debug, Clone)]
pub struct OpenWeatherMapAdapter {
    endpoint: String,
}

impl Default for OpenWeatherMapAdapter {
    fn default() -> Self {
        Self::with_endpoint(OWM_ENDPOINT)
    }
}

impl OpenWeatherMapAdapter {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl ProviderAdapter for OpenWeatherMapAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenWeatherMap
    }

    fn field_map(&self) -> &'static [FieldRule] {
        OWM_FIELDS
    }

    fn timestamp_field(&self) -> Option<TimestampField> {
        None
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn basic_auth(&self, station: &StationCredentials) -> Option<BasicAuth> {
        Some(BasicAuth {
            username: station.username.trim().to_string(),
            password: station.password.trim().to_string(),
        })
    }

    // Identity is carried by Basic auth; the API has no signature field.
    fn complete(&self, _payload: &mut PushPayload, _station: &StationCredentials, _signature: &str) {}

    fn parse_error(&self, body: &str) -> ResponseScan {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return ResponseScan::Accepted;
        }
        let value: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => return ResponseScan::Unrecognized(format!("response is not JSON: {}", e)),
        };
        let code = match value.get("cod") {
            Some(serde_json::Value::String(s)) => s.parse::<u16>().ok(),
            Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            _ => None,
        };
        let message = value.get("message").and_then(|m| m.as_str());
        match (code, message) {
            (Some(code), Some(message)) if !(200..300).contains(&code) => {
                ResponseScan::Rejected(message.to_string())
            }
            _ => ResponseScan::Accepted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_from_credentials() {
        let adapter = OpenWeatherMapAdapter::default();
        let creds = StationCredentials::new(ProviderId::OpenWeatherMap, true, "user", "pass");
        assert_eq!(
            adapter.basic_auth(&creds),
            Some(BasicAuth {
                username: "user".to_string(),
                password: "pass".to_string(),
            })
        );
    }

    #[test]
    fn test_complete_adds_nothing() {
        let adapter = OpenWeatherMapAdapter::default();
        let creds = StationCredentials::new(ProviderId::OpenWeatherMap, true, "user", "pass");
        let mut payload = PushPayload::new();
        payload.insert("temp", "20.0");
        adapter.complete(&mut payload, &creds, "sig");
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_parse_error_codes() {
        let adapter = OpenWeatherMapAdapter::default();
        assert_eq!(
            adapter.parse_error(r#"{"cod":"401","message":"Invalid username or password"}"#),
            ResponseScan::Rejected("Invalid username or password".to_string())
        );
        assert_eq!(
            adapter.parse_error(r#"{"cod":200,"message":"ok"}"#),
            ResponseScan::Accepted
        );
        assert_eq!(adapter.parse_error(r#"{"id":42}"#), ResponseScan::Accepted);
        assert!(matches!(adapter.parse_error("nope"), ResponseScan::Unrecognized(_)));
    }

    #[test]
    fn test_no_timestamp_field() {
        assert!(OpenWeatherMapAdapter::default().timestamp_field().is_none());
    }
}
