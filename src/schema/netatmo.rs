//! Adapter for Netatmo station data payloads
//!
//! Accepts the `devices` list of a station data response, either at the top
//! level or wrapped in `body`. Each device becomes one snapshot whose base
//! module is the device itself.

use crate::computed::with_computed_values;
use crate::error::PushError;
use crate::types::{ModuleReading, ModuleType, ReadingSnapshot};
use serde::Deserialize;
use std::collections::HashMap;

/// Netatmo reports wind speeds in km/h
const KMH_TO_MS: f64 = 1.0 / 3.6;

const WIND_SPEED_KEYS: &[&str] = &["WindStrength", "GustStrength", "max_wind_str"];

/// Adapter for converting Netatmo payloads to reading snapshots
pub struct NetatmoAdapter;

impl NetatmoAdapter {
    /// Parse a Netatmo station data payload
    pub fn parse(json: &str) -> Result<Vec<ReadingSnapshot>, PushError> {
        let payload: NetatmoPayload = serde_json::from_str(json)?;
        let devices = match (payload.devices, payload.body) {
            (Some(devices), _) => devices,
            (None, Some(body)) => body.devices,
            (None, None) => {
                return Err(PushError::ParseError(
                    "payload has no devices list".to_string(),
                ))
            }
        };

        Ok(devices.into_iter().filter_map(device_to_snapshot).collect())
    }
}

fn device_to_snapshot(device: NetatmoDevice) -> Option<ReadingSnapshot> {
    let mut modules = Vec::new();

    // The device's own dashboard anchors the station, whatever its type
    let base = to_module(&device.id, ModuleType::Main, device.dashboard_data)?;
    modules.push(base);

    for module in device.modules {
        let module_type = ModuleType::from(module.module_type.as_deref().unwrap_or_default());
        if let Some(reading) = to_module(&module.id, module_type, module.dashboard_data) {
            modules.push(reading);
        }
    }

    let snapshot = ReadingSnapshot {
        station_id: device.id,
        station_name: device.station_name,
        modules,
    };
    Some(with_computed_values(snapshot))
}

fn to_module(
    id: &str,
    module_type: ModuleType,
    dashboard: Option<HashMap<String, serde_json::Value>>,
) -> Option<ModuleReading> {
    let dashboard = dashboard?;
    let time_utc = dashboard.get("time_utc").and_then(|v| v.as_i64())?;

    let mut reading = ModuleReading::new(id, module_type, time_utc);
    for (key, value) in dashboard {
        if key == "time_utc" {
            continue;
        }
        let number = match value.as_f64() {
            Some(n) => n,
            None => continue,
        };
        let number = if WIND_SPEED_KEYS.contains(&key.as_str()) {
            number * KMH_TO_MS
        } else {
            number
        };
        reading.measurements.insert(key, number);
    }
    Some(reading)
}

// Netatmo API structures

#[derive(Debug, Deserialize)]
struct NetatmoPayload {
    devices: Option<Vec<NetatmoDevice>>,
    body: Option<NetatmoBody>,
}

#[derive(Debug, Deserialize)]
struct NetatmoBody {
    #[serde(default)]
    devices: Vec<NetatmoDevice>,
}

#[derive(Debug, Deserialize)]
struct NetatmoDevice {
    #[serde(rename = "_id")]
    id: String,
    station_name: Option<String>,
    dashboard_data: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    modules: Vec<NetatmoModule>,
}

#[derive(Debug, Deserialize)]
struct NetatmoModule {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "type")]
    module_type: Option<String>,
    dashboard_data: Option<HashMap<String, serde_json::Value>>,
}
