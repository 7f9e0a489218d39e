//! Decoding of individual register words.

use std::borrow::Cow;

use crate::registers::{RegisterIndex, Rule};

/// Descriptions of the values reported by the `error_code` register, indexed by the value.
pub static ERROR_DESCRIPTIONS: [&str; 17] = [
    "No error",
    "Equipment overcurrent, short circuit",
    "Overload",
    "Low pressure (no pressure sensor)",
    "Overpressure",
    "Low pressure",
    "Overpressure",
    "Phase loss (power phase loss)",
    "Overheating",
    "Insufficient power",
    "Software current overload",
    "Communication failure",
    "Default",
    "Motor locked",
    "Motor phase loss",
    "Motor overspeed",
    "Memory failure (FLASH failure)",
];

const HIGH_CARRIER_FREQUENCY: u16 = 72;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::FromRepr, strum::IntoStaticStr)]
#[repr(u16)]
#[strum(serialize_all = "lowercase")]
pub enum StatusCommand {
    Invalid = 0,
    Running = 1,
    Stop = 4,
    #[strum(serialize = "error reset")]
    ErrorReset = 17,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::FromRepr, strum::IntoStaticStr)]
#[repr(u16)]
pub enum MeasurementRange {
    #[strum(serialize = "6 bar")]
    Bar6 = 6,
    #[strum(serialize = "10 bar")]
    Bar10 = 10,
    #[strum(serialize = "16 bar")]
    Bar16 = 16,
    #[strum(serialize = "25 bar")]
    Bar25 = 25,
}

/// A plain register reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reading {
    Raw(u16),
    /// The raw value multiplied by the register scale, rounded to three decimal places.
    Scaled(f64),
}

impl Reading {
    pub fn new(raw: u16, scale: Option<f64>) -> Self {
        match scale {
            None => Self::Raw(raw),
            Some(scale) => Self::Scaled((f64::from(raw) * scale * 1000.0).round() / 1000.0),
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Reading::Raw(n) => f.write_fmt(format_args!("{}", n)),
            Reading::Scaled(n) => f.write_fmt(format_args!("{}", n)),
        }
    }
}

impl serde::Serialize for Reading {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Reading::Raw(n) => serializer.serialize_u16(n),
            Reading::Scaled(n) => serializer.serialize_f64(n),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Generic { value: Reading, raw_value: u16 },
    ErrorCode { code: u16, description: &'static str, raw_value: u16 },
    StatusFlags { water_shortage: bool, running: bool, raw_value: u16 },
    CarrierFrequency { value: char, code: u16, raw_value: u16 },
    StatusCommand { code: u16, description: &'static str, raw_value: u16 },
    MeasurementRange { value: Cow<'static, str>, code: u16, raw_value: u16 },
    /// A register the table does not know about. The raw value is passed through untouched.
    Unknown { value: u16, raw_value: u16 },
}

impl DecodedValue {
    /// Decode `raw` according to the rule of `register`. Every raw value decodes to something.
    pub fn decode(register: RegisterIndex, raw: u16) -> Self {
        match register.rule() {
            Rule::Scaled => Self::Generic { value: Reading::new(raw, register.scale()), raw_value: raw },
            Rule::ErrorCode => Self::ErrorCode {
                code: raw,
                description: ERROR_DESCRIPTIONS.get(usize::from(raw)).copied().unwrap_or("Unknown error"),
                raw_value: raw,
            },
            Rule::StatusFlags => Self::StatusFlags {
                water_shortage: raw & 0b01 != 0,
                running: raw & 0b10 != 0,
                raw_value: raw,
            },
            Rule::CarrierFrequency => Self::CarrierFrequency {
                value: if raw == HIGH_CARRIER_FREQUENCY { 'H' } else { 'L' },
                code: raw,
                raw_value: raw,
            },
            Rule::StatusCommand => Self::StatusCommand {
                code: raw,
                description: StatusCommand::from_repr(raw).map_or("Unknown status", Into::into),
                raw_value: raw,
            },
            Rule::MeasurementRange => Self::MeasurementRange {
                value: match MeasurementRange::from_repr(raw) {
                    Some(range) => Cow::Borrowed(range.into()),
                    None => Cow::Owned(format!("Unknown ({raw})")),
                },
                code: raw,
                raw_value: raw,
            },
        }
    }

    pub fn has_own_description(&self) -> bool {
        matches!(self, Self::ErrorCode { .. } | Self::StatusCommand { .. })
    }

    pub fn raw_value(&self) -> u16 {
        match *self {
            Self::Generic { raw_value, .. }
            | Self::ErrorCode { raw_value, .. }
            | Self::StatusFlags { raw_value, .. }
            | Self::CarrierFrequency { raw_value, .. }
            | Self::StatusCommand { raw_value, .. }
            | Self::MeasurementRange { raw_value, .. }
            | Self::Unknown { raw_value, .. } => raw_value,
        }
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic { value, .. } => write!(f, "{value}"),
            Self::ErrorCode { code, description, .. } => write!(f, "{code} ({description})"),
            Self::StatusFlags { water_shortage, running, .. } => {
                write!(f, "water_shortage={water_shortage} running={running}")
            }
            Self::CarrierFrequency { value, code, .. } => write!(f, "{value} ({code})"),
            Self::StatusCommand { code, description, .. } => write!(f, "{description} ({code})"),
            Self::MeasurementRange { value, .. } => f.write_str(value),
            Self::Unknown { value, .. } => write!(f, "{value}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// The register was reported in a write acknowledgement.
    Write,
}

/// A decoded register together with the metadata consumers need to present it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DecodedRegister {
    #[serde(flatten)]
    pub value: DecodedValue,
    pub unit: &'static str,
    /// Description of the register. `None` when the value carries a description of its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub address: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

impl DecodedRegister {
    pub fn decode(address: u16, raw: u16) -> Self {
        match RegisterIndex::from_address(address) {
            Some(register) => {
                let value = DecodedValue::decode(register, raw);
                Self {
                    description: (!value.has_own_description()).then(|| register.description()),
                    value,
                    unit: register.unit(),
                    address,
                    read_only: Some(register.read_only()),
                    operation: None,
                }
            }
            None => Self {
                value: DecodedValue::Unknown { value: raw, raw_value: raw },
                unit: "unknown",
                description: Some("Unknown register"),
                address,
                read_only: None,
                operation: None,
            },
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.value, DecodedValue::Unknown { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(address: u16, raw: u16) -> DecodedValue {
        DecodedValue::decode(RegisterIndex::from_address(address).unwrap(), raw)
    }

    #[test]
    fn scaling() {
        assert_eq!(decode(0x0001, 500), DecodedValue::Generic { value: Reading::Scaled(50.0), raw_value: 500 });
        assert_eq!(decode(0x0005, 123), DecodedValue::Generic { value: Reading::Scaled(1.23), raw_value: 123 });
        assert_eq!(decode(0x1000, 4999), DecodedValue::Generic { value: Reading::Scaled(49.99), raw_value: 4999 });
        assert_eq!(decode(0x0003, 234), DecodedValue::Generic { value: Reading::Raw(234), raw_value: 234 });
    }

    #[test]
    fn scaled_values_are_rounded() {
        // 0.1 * 3 is 0.30000000000000004 without rounding.
        assert_eq!(Reading::new(3, Some(0.1)), Reading::Scaled(0.3));
        assert_eq!(Reading::new(1, Some(1.0 / 3.0)), Reading::Scaled(0.333));
        assert_eq!(Reading::new(u16::MAX, Some(0.01)), Reading::Scaled(655.35));
    }

    #[test]
    fn error_codes() {
        assert_eq!(
            decode(0x0006, 0),
            DecodedValue::ErrorCode { code: 0, description: "No error", raw_value: 0 }
        );
        assert_eq!(
            decode(0x0006, 16),
            DecodedValue::ErrorCode { code: 16, description: "Memory failure (FLASH failure)", raw_value: 16 }
        );
        assert_eq!(
            decode(0x0006, 17),
            DecodedValue::ErrorCode { code: 17, description: "Unknown error", raw_value: 17 }
        );
    }

    #[test]
    fn status_flags() {
        let flags = |raw| match decode(0x0007, raw) {
            DecodedValue::StatusFlags { water_shortage, running, .. } => (water_shortage, running),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(flags(0), (false, false));
        assert_eq!(flags(1), (true, false));
        assert_eq!(flags(2), (false, true));
        assert_eq!(flags(3), (true, true));
        assert_eq!(flags(0xfffc), (false, false));
    }

    #[test]
    fn carrier_frequency() {
        assert_eq!(
            decode(0x0014, 72),
            DecodedValue::CarrierFrequency { value: 'H', code: 72, raw_value: 72 }
        );
        assert_eq!(
            decode(0x0014, 76),
            DecodedValue::CarrierFrequency { value: 'L', code: 76, raw_value: 76 }
        );
    }

    #[test]
    fn status_commands() {
        let description = |raw| match decode(0x1001, raw) {
            DecodedValue::StatusCommand { description, .. } => description,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(description(0), "invalid");
        assert_eq!(description(1), "running");
        assert_eq!(description(4), "stop");
        assert_eq!(description(17), "error reset");
        assert_eq!(description(2), "Unknown status");
    }

    #[test]
    fn measurement_ranges() {
        let value = |raw| match decode(0x0019, raw) {
            DecodedValue::MeasurementRange { value, .. } => value.into_owned(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(value(6), "6 bar");
        assert_eq!(value(10), "10 bar");
        assert_eq!(value(16), "16 bar");
        assert_eq!(value(25), "25 bar");
        assert_eq!(value(12), "Unknown (12)");
    }

    #[test]
    fn register_shapes() {
        let known = DecodedRegister::decode(0x0014, 72);
        assert_eq!(
            serde_json::to_value(&known).unwrap(),
            serde_json::json!({
                "value": "H",
                "code": 72,
                "raw_value": 72,
                "unit": "",
                "description": "PWM carrier frequency. 72=High, anything else=Low",
                "address": 0x0014,
                "read_only": false,
            })
        );

        let error = DecodedRegister::decode(0x0006, 5);
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({
                "code": 5,
                "description": "Low pressure",
                "raw_value": 5,
                "unit": "",
                "address": 6,
                "read_only": true,
            })
        );

        let unknown = DecodedRegister::decode(0x0008, 1234);
        assert!(!unknown.is_known());
        assert_eq!(
            serde_json::to_value(&unknown).unwrap(),
            serde_json::json!({
                "value": 1234,
                "raw_value": 1234,
                "unit": "unknown",
                "description": "Unknown register",
                "address": 8,
            })
        );
    }
}
