//! Length and duration unit conversion for radius and corridor queries.

use crate::errors::EdrError;

/// Length units accepted in `within-units`, `width-units` and `height-units`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Millimeters,
    Centimeters,
    Meters,
    Kilometers,
    Feet,
    Miles,
    NauticalMiles,
}

impl LengthUnit {
    /// Parse a unit string. Accepts common abbreviations and spellings.
    pub fn parse(unit: &str) -> Option<Self> {
        match unit.trim().to_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => {
                Some(LengthUnit::Millimeters)
            }
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => {
                Some(LengthUnit::Centimeters)
            }
            "m" | "meter" | "meters" | "metre" | "metres" => Some(LengthUnit::Meters),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                Some(LengthUnit::Kilometers)
            }
            "ft" | "foot" | "feet" => Some(LengthUnit::Feet),
            "mi" | "mile" | "miles" => Some(LengthUnit::Miles),
            "nm" | "nmi" | "nautical_miles" | "nautical miles" => Some(LengthUnit::NauticalMiles),
            _ => None,
        }
    }

    fn meters_per_unit(&self) -> f64 {
        match self {
            LengthUnit::Millimeters => 0.001,
            LengthUnit::Centimeters => 0.01,
            LengthUnit::Meters => 1.0,
            LengthUnit::Kilometers => 1000.0,
            LengthUnit::Feet => 0.3048,
            LengthUnit::Miles => 1609.344,
            LengthUnit::NauticalMiles => 1852.0,
        }
    }

    /// Convert a value in this unit to meters.
    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }
}

/// Convert `value` between two unit names.
///
/// Returns NaN when either unit is unknown, mirroring a failed numeric
/// conversion; callers reject NaN results.
pub fn convert_length(value: f64, from: &str, to: &str) -> f64 {
    match (LengthUnit::parse(from), LengthUnit::parse(to)) {
        (Some(from), Some(to)) => from.to_meters(value) / to.meters_per_unit(),
        _ => f64::NAN,
    }
}

/// Duration units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    pub fn parse(unit: &str) -> Option<Self> {
        match unit.trim().to_lowercase().as_str() {
            "ms" | "millisecond" | "milliseconds" => Some(DurationUnit::Milliseconds),
            "s" | "sec" | "second" | "seconds" => Some(DurationUnit::Seconds),
            "min" | "minute" | "minutes" => Some(DurationUnit::Minutes),
            "h" | "hr" | "hour" | "hours" => Some(DurationUnit::Hours),
            "d" | "day" | "days" => Some(DurationUnit::Days),
            _ => None,
        }
    }

    fn seconds_per_unit(&self) -> f64 {
        match self {
            DurationUnit::Milliseconds => 0.001,
            DurationUnit::Seconds => 1.0,
            DurationUnit::Minutes => 60.0,
            DurationUnit::Hours => 3600.0,
            DurationUnit::Days => 86_400.0,
        }
    }
}

/// Convert `value` between two duration unit names. NaN on unknown units.
pub fn convert_duration(value: f64, from: &str, to: &str) -> f64 {
    match (DurationUnit::parse(from), DurationUnit::parse(to)) {
        (Some(from), Some(to)) => value * from.seconds_per_unit() / to.seconds_per_unit(),
        _ => f64::NAN,
    }
}

/// Convert between two units of the same kind, length or duration.
///
/// Mixing kinds, or an unknown unit, yields NaN.
pub fn convert(value: f64, from: &str, to: &str) -> f64 {
    if LengthUnit::parse(from).is_some() && LengthUnit::parse(to).is_some() {
        convert_length(value, from, to)
    } else {
        convert_duration(value, from, to)
    }
}

/// Validate a unit against an archetype's declared list and convert a raw
/// value into meters.
///
/// `value_param`/`unit_param` name the query parameters for error reporting
/// (e.g. `corridor-width` / `width-units`).
pub fn parse_unit_conversion(
    raw_value: &str,
    value_param: &str,
    raw_unit: &str,
    unit_param: &str,
    allowed_units: &[String],
) -> Result<f64, EdrError> {
    if !allowed_units.iter().any(|u| u == raw_unit) {
        return Err(EdrError::InvalidUnit {
            parameter: unit_param.to_string(),
            value: raw_unit.to_string(),
            allowed: allowed_units.join(", "),
        });
    }

    let value = raw_value.trim().parse::<f64>().unwrap_or(f64::NAN);
    let meters = convert(value, raw_unit, "m");
    if meters.is_nan() {
        return Err(EdrError::NaNConversionResult {
            parameter: value_param.to_string(),
            detail: format!("invalid {} number '{}'", value_param, raw_value),
        });
    }
    Ok(meters)
}
