//! Decode validated payloads into named physical values.
//!
//! Every message type has a fixed [`Layout`]: the exact payload length and a routine that reads
//! the fields in order. A payload of any other length is rejected as a whole, nothing of it is
//! published.
use crate::reader::{error::FieldError, FieldReader};
use bytes::Bytes;
use error::DecodeError;
use std::fmt;

pub mod inverter;
pub mod logger;

/// Physical unit of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Volt,
    Ampere,
    Hertz,
    Kilowatt,
    KilowattHour,
    Hour,
    Degree,
    None,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Hertz => "Hz",
            Unit::Kilowatt => "kW",
            Unit::KilowattHour => "kWh",
            Unit::Hour => "h",
            Unit::Degree => "°",
            Unit::None => "",
        }
    }
}

/// Conversion of a raw integer into a physical value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub divisor: f64,
    pub unit: Unit,
    /// Number of meaningful decimals after scaling.
    pub decimals: u8,
}

impl Scale {
    pub const fn new(divisor: f64, unit: Unit, decimals: u8) -> Scale {
        Scale {
            divisor,
            unit,
            decimals,
        }
    }
}

pub const DECI_CELSIUS: Scale = Scale::new(10.0, Unit::Celsius, 1);
pub const DECI_VOLT: Scale = Scale::new(10.0, Unit::Volt, 1);
pub const DECI_AMPERE: Scale = Scale::new(10.0, Unit::Ampere, 1);
pub const MILLI_AMPERE: Scale = Scale::new(1000.0, Unit::Ampere, 3);
pub const CENTI_HERTZ: Scale = Scale::new(100.0, Unit::Hertz, 2);
pub const WATT: Scale = Scale::new(1000.0, Unit::Kilowatt, 3);
pub const DECA_WATT_HOUR: Scale = Scale::new(100.0, Unit::KilowattHour, 2);
pub const HECTO_WATT_HOUR: Scale = Scale::new(10.0, Unit::KilowattHour, 1);
pub const HOUR: Scale = Scale::new(1.0, Unit::Hour, 0);
pub const MILLI_DEGREE: Scale = Scale::new(1000.0, Unit::Degree, 3);
pub const COUNT: Scale = Scale::new(1.0, Unit::None, 0);

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number { value: f64, unit: Unit, decimals: u8 },
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number {
                value,
                unit: Unit::None,
                decimals,
            } => write!(f, "{:.*}", *decimals as usize, value),
            FieldValue::Number {
                value,
                unit,
                decimals,
            } => write!(f, "{:.*} {}", *decimals as usize, value, unit.symbol()),
            FieldValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A named value destined for the telemetry sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub name: &'static str,
    pub value: FieldValue,
}

impl DecodedField {
    pub fn number(name: &'static str, raw: f64, scale: Scale) -> DecodedField {
        DecodedField {
            name,
            value: FieldValue::Number {
                value: raw / scale.divisor,
                unit: scale.unit,
                decimals: scale.decimals,
            },
        }
    }

    pub fn text(name: &'static str, text: impl Into<String>) -> DecodedField {
        DecodedField {
            name,
            value: FieldValue::Text(text.into()),
        }
    }

    /// Numeric value, if this is a numeric field.
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            FieldValue::Number { value, .. } => Some(value),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Text(text) => Some(text),
            FieldValue::Number { .. } => None,
        }
    }
}

impl fmt::Display for DecodedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

type Routine = fn(&mut FieldReader, &mut Vec<DecodedField>) -> Result<(), FieldError>;

/// Fixed layout of one message type.
pub struct Layout {
    pub name: &'static str,
    pub expected_len: usize,
    routine: Routine,
    /// Fields published even though the payload length did not match.
    legacy_size_fallback: Option<fn(usize) -> DecodedField>,
}

impl Layout {
    pub const fn new(name: &'static str, expected_len: usize, routine: Routine) -> Layout {
        Layout {
            name,
            expected_len,
            routine,
            legacy_size_fallback: None,
        }
    }

    const fn with_legacy_size_fallback(mut self, fallback: fn(usize) -> DecodedField) -> Layout {
        self.legacy_size_fallback = Some(fallback);
        self
    }

    /// Check the payload length and read all fields.
    pub fn decode(&self, payload: &Bytes) -> Result<Vec<DecodedField>, DecodeError> {
        if payload.len() != self.expected_len {
            return Err(DecodeError::SizeMismatch {
                expected: self.expected_len,
                actual: payload.len(),
            });
        }

        let mut reader = FieldReader::new(payload.clone());
        let mut fields = Vec::new();
        (self.routine)(&mut reader, &mut fields)?;
        Ok(fields)
    }

    /// What a payload of the wrong length still publishes. Empty for all but one layout.
    pub fn size_mismatch_fallback(&self, actual: usize) -> Option<DecodedField> {
        self.legacy_size_fallback.map(|fallback| fallback(actual))
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("name", &self.name)
            .field("expected_len", &self.expected_len)
            .finish()
    }
}

/// Render a run state code.
pub fn to_run_state(code: u16) -> String {
    match code {
        0 => "Startup".to_string(),
        1 => "Online".to_string(),
        2 => "Waiting".to_string(),
        other => other.to_string(),
    }
}

/// Render a packed firmware version, `MMmmbbbb` in decimal digits.
pub fn to_version(packed: u32) -> String {
    let build = packed % 10000;
    let packed = packed / 10000;
    let minor = packed % 100;
    let major = packed / 100;
    format!("V{}.{:02}Build{}", major, minor, build)
}

/// Two digit upper case hex, used for acknowledge bytes.
pub fn to_hex(byte: u8) -> String {
    format!("{:02X}", byte)
}

pub mod error {
    use crate::reader::error::FieldError;
    use thiserror::Error;

    #[derive(Error, Debug, PartialEq)]
    pub enum DecodeError {
        #[error("Received not the correct number of bytes: expected={expected} actual={actual}")]
        SizeMismatch { expected: usize, actual: usize },
        #[error(transparent)]
        Field(#[from] FieldError),
    }
}
