//! Computed values virtual module
//!
//! Some collectors only report raw sensor values. The computed module carries
//! values derived from them (currently the dew point) so adapters can map it
//! like any other module.

use crate::types::{ModuleReading, ModuleType, ReadingSnapshot};

const MAGNUS_A: f64 = 17.62;
const MAGNUS_B: f64 = 243.12;

/// Dew point (°C) from temperature (°C) and relative humidity (%), Magnus formula
pub fn dew_point(temperature: f64, humidity: f64) -> Option<f64> {
    if !temperature.is_finite() || !humidity.is_finite() || humidity <= 0.0 || humidity > 100.0 {
        return None;
    }
    let gamma = (humidity / 100.0).ln() + MAGNUS_A * temperature / (MAGNUS_B + temperature);
    Some(MAGNUS_B * gamma / (MAGNUS_A - gamma))
}

/// Build the computed module for a snapshot from its outdoor module
///
/// The computed module shares the outdoor module's timestamp, so it is fresh
/// exactly when its inputs are.
pub fn computed_module(snapshot: &ReadingSnapshot) -> Option<ModuleReading> {
    let outdoor = snapshot.first_of(ModuleType::Outdoor)?;
    let temperature = outdoor.measurement("Temperature")?;
    let humidity = outdoor.measurement("Humidity")?;
    let dew = dew_point(temperature, humidity)?;

    Some(
        ModuleReading::new(
            format!("{}-computed", snapshot.station_id),
            ModuleType::Computed,
            outdoor.time_utc,
        )
        .with("dew_point", dew),
    )
}

/// Append a computed module unless the snapshot already carries one
pub fn with_computed_values(mut snapshot: ReadingSnapshot) -> ReadingSnapshot {
    if snapshot.first_of(ModuleType::Computed).is_none() {
        if let Some(module) = computed_module(&snapshot) {
            snapshot.modules.push(module);
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dew_point_reference_values() {
        // 20 °C at 55 % is about 10.7 °C
        let dp = dew_point(20.0, 55.0).unwrap();
        assert!((dp - 10.7).abs() < 0.1, "dew point was {}", dp);

        // Saturated air: dew point equals temperature
        let dp = dew_point(15.0, 100.0).unwrap();
        assert!((dp - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_dew_point_rejects_bad_humidity() {
        assert!(dew_point(20.0, 0.0).is_none());
        assert!(dew_point(20.0, 120.0).is_none());
        assert!(dew_point(f64::NAN, 50.0).is_none());
    }

    #[test]
    fn test_computed_module_follows_outdoor_timestamp() {
        let snapshot = ReadingSnapshot::new("st").with_module(
            ModuleReading::new("out", ModuleType::Outdoor, 1_000)
                .with("Temperature", 20.0)
                .with("Humidity", 55.0),
        );

        let module = computed_module(&snapshot).unwrap();
        assert_eq!(module.module_type, ModuleType::Computed);
        assert_eq!(module.time_utc, 1_000);
        assert!(module.measurement("dew_point").is_some());
    }

    #[test]
    fn test_existing_computed_module_is_kept() {
        let snapshot = ReadingSnapshot::new("st")
            .with_module(
                ModuleReading::new("out", ModuleType::Outdoor, 1_000)
                    .with("Temperature", 20.0)
                    .with("Humidity", 55.0),
            )
            .with_module(ModuleReading::new("c", ModuleType::Computed, 900).with("dew_point", 3.0));

        let snapshot = with_computed_values(snapshot);
        assert_eq!(snapshot.modules.len(), 2);
        assert_eq!(
            snapshot.first_of(ModuleType::Computed).unwrap().measurement("dew_point"),
            Some(3.0)
        );
    }

    #[test]
    fn test_no_outdoor_module_no_computed() {
        let snapshot = ReadingSnapshot::new("st");
        assert!(computed_module(&snapshot).is_none());
    }
}
