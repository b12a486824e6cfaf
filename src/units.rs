//! Unit conversion
//!
//! Converts metric source readings into the units each network expects and
//! renders them with a fixed number of decimals. Source units are degrees
//! Celsius, hectopascals, meters per second, millimeters, percent and degrees.

use serde::Serialize;

const HPA_TO_INHG: f64 = 0.029_529_983_071_4;
const HPA_TO_MMHG: f64 = 0.750_061_683;
const MS_TO_KMH: f64 = 3.6;
const MS_TO_MPH: f64 = 2.236_936_292;
const MS_TO_KNOTS: f64 = 1.943_844_492;
const MM_TO_IN: f64 = 0.039_370_078_740_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PressureUnit {
    Hectopascal,
    InchMercury,
    MillimeterMercury,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpeedUnit {
    MetersPerSecond,
    KilometersPerHour,
    MilesPerHour,
    Knots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RainUnit {
    Millimeter,
    Inch,
}

/// Round to `precision` decimals and render without a negative zero
fn render(value: f64, precision: usize) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{:.*}", precision, rounded)
}

pub fn to_temperature(celsius: f64, unit: TemperatureUnit, precision: usize) -> String {
    let value = match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    };
    render(value, precision)
}

pub fn to_pressure(hpa: f64, unit: PressureUnit, precision: usize) -> String {
    let value = match unit {
        PressureUnit::Hectopascal => hpa,
        PressureUnit::InchMercury => hpa * HPA_TO_INHG,
        PressureUnit::MillimeterMercury => hpa * HPA_TO_MMHG,
    };
    render(value, precision)
}

pub fn to_wind_speed(ms: f64, unit: SpeedUnit, precision: usize) -> String {
    let value = match unit {
        SpeedUnit::MetersPerSecond => ms,
        SpeedUnit::KilometersPerHour => ms * MS_TO_KMH,
        SpeedUnit::MilesPerHour => ms * MS_TO_MPH,
        SpeedUnit::Knots => ms * MS_TO_KNOTS,
    };
    render(value, precision)
}

pub fn to_rain(mm: f64, unit: RainUnit, precision: usize) -> String {
    let value = match unit {
        RainUnit::Millimeter => mm,
        RainUnit::Inch => mm * MM_TO_IN,
    };
    render(value, precision)
}

/// Wind and gust directions are already in degrees
pub fn to_wind_angle(degrees: f64) -> String {
    render(degrees, 0)
}

pub fn to_humidity(percent: f64) -> String {
    render(percent, 0)
}

/// How a source measurement becomes a payload value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conversion {
    Temperature(TemperatureUnit, usize),
    Pressure(PressureUnit, usize),
    WindSpeed(SpeedUnit, usize),
    Rain(RainUnit, usize),
    Humidity,
    Angle,
}

impl Conversion {
    /// Convert and render a value; non-finite readings yield nothing
    pub fn apply(&self, value: f64) -> Option<String> {
        if !value.is_finite() {
            return None;
        }
        let rendered = match *self {
            Conversion::Temperature(unit, precision) => to_temperature(value, unit, precision),
            Conversion::Pressure(unit, precision) => to_pressure(value, unit, precision),
            Conversion::WindSpeed(unit, precision) => to_wind_speed(value, unit, precision),
            Conversion::Rain(unit, precision) => to_rain(value, unit, precision),
            Conversion::Humidity => to_humidity(value),
            Conversion::Angle => to_wind_angle(value),
        };
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_fahrenheit() {
        assert_eq!(to_temperature(20.0, TemperatureUnit::Fahrenheit, 1), "68.0");
        assert_eq!(to_temperature(-40.0, TemperatureUnit::Fahrenheit, 1), "-40.0");
        assert_eq!(to_temperature(21.37, TemperatureUnit::Celsius, 1), "21.4");
    }

    #[test]
    fn test_pressure_inches() {
        assert_eq!(to_pressure(1013.0, PressureUnit::InchMercury, 2), "29.91");
        assert_eq!(to_pressure(1013.25, PressureUnit::Hectopascal, 1), "1013.3");
        assert_eq!(to_pressure(1013.25, PressureUnit::MillimeterMercury, 0), "760");
    }

    #[test]
    fn test_wind_speed() {
        assert_eq!(to_wind_speed(10.0, SpeedUnit::MilesPerHour, 1), "22.4");
        assert_eq!(to_wind_speed(10.0, SpeedUnit::KilometersPerHour, 0), "36");
        assert_eq!(to_wind_speed(10.0, SpeedUnit::Knots, 1), "19.4");
    }

    #[test]
    fn test_rain_inches() {
        assert_eq!(to_rain(25.4, RainUnit::Inch, 2), "1.00");
        assert_eq!(to_rain(0.0, RainUnit::Inch, 2), "0.00");
        assert_eq!(to_rain(1.3, RainUnit::Millimeter, 1), "1.3");
    }

    #[test]
    fn test_no_negative_zero() {
        assert_eq!(to_temperature(-17.79, TemperatureUnit::Fahrenheit, 0), "0");
        assert_eq!(to_rain(-0.001, RainUnit::Millimeter, 1), "0.0");
    }

    #[test]
    fn test_angle_and_humidity_round() {
        assert_eq!(to_wind_angle(271.6), "272");
        assert_eq!(to_humidity(55.0), "55");
    }

    #[test]
    fn test_conversion_rejects_non_finite() {
        let conversion = Conversion::Temperature(TemperatureUnit::Fahrenheit, 1);
        assert_eq!(conversion.apply(f64::NAN), None);
        assert_eq!(conversion.apply(f64::INFINITY), None);
        assert_eq!(conversion.apply(20.0).as_deref(), Some("68.0"));
    }
}
