//! The three encodings a frame may arrive in and their conversion to bytes.

use std::borrow::Cow;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("hex input has an odd length ({0} digits)")]
    OddLength(usize),
    #[error("hex input contains {character:?} at digit {index}, which is not a hex digit")]
    InvalidHex { character: char, index: usize },
    #[error("element {index} of the byte array is {value}, which does not fit into a byte")]
    ByteOutOfRange { index: usize, value: i64 },
    #[error("unsupported type of input: {0}")]
    UnsupportedType(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    /// Raw frame bytes.
    Bytes(Cow<'a, [u8]>),
    /// Hex digits, case-insensitive. Whitespace anywhere is ignored.
    Hex(Cow<'a, str>),
    /// One integer per byte.
    Array(Cow<'a, [i64]>),
}

impl<'a> Input<'a> {
    /// Pick an encoding for a piece of text.
    ///
    /// A JSON array of integers is an array. Text made only of hex digits and whitespace is hex.
    /// Anything else is taken to be the raw bytes themselves.
    pub fn detect(text: &'a str) -> Result<Self, InputError> {
        if text.trim_start().starts_with('[') {
            let value = serde_json::from_str::<serde_json::Value>(text);
            if let Ok(serde_json::Value::Array(elements)) = value {
                let integers = elements.iter().map(serde_json::Value::as_i64);
                if let Some(integers) = integers.collect::<Option<Vec<i64>>>() {
                    return Ok(Self::Array(Cow::Owned(integers)));
                }
            }
        }
        if is_hex_text(text) {
            Ok(Self::Hex(Cow::Borrowed(text)))
        } else {
            Ok(Self::Bytes(Cow::Borrowed(text.as_bytes())))
        }
    }

    /// Interpret a JSON message payload.
    ///
    /// Strings are handled as by [`Input::detect`], arrays must hold integers only.
    pub fn from_json(value: &serde_json::Value) -> Result<Input<'static>, InputError> {
        use serde_json::Value;
        match value {
            Value::String(text) => Ok(match Input::detect(text)? {
                Input::Hex(hex) => Input::Hex(Cow::Owned(hex.into_owned())),
                Input::Bytes(bytes) => Input::Bytes(Cow::Owned(bytes.into_owned())),
                Input::Array(array) => Input::Array(Cow::Owned(array.into_owned())),
            }),
            Value::Array(elements) => {
                let integers = elements
                    .iter()
                    .map(|e| e.as_i64().ok_or(InputError::UnsupportedType("non-integer array element")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Input::Array(Cow::Owned(integers)))
            }
            Value::Null => Err(InputError::UnsupportedType("null")),
            Value::Bool(_) => Err(InputError::UnsupportedType("boolean")),
            Value::Number(_) => Err(InputError::UnsupportedType("number")),
            Value::Object(_) => Err(InputError::UnsupportedType("object")),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, InputError> {
        match self {
            Input::Bytes(bytes) => Ok(bytes.to_vec()),
            Input::Hex(text) => decode_hex(text),
            Input::Array(integers) => integers
                .iter()
                .enumerate()
                .map(|(index, &value)| {
                    u8::try_from(value).map_err(|_| InputError::ByteOutOfRange { index, value })
                })
                .collect(),
        }
    }

    /// A textual rendition of the input suitable for reporting it back alongside an error.
    ///
    /// Buffers are rendered as uppercase hex so that they survive the round trip through text.
    pub fn to_display_string(&self) -> String {
        match self {
            Input::Bytes(bytes) => hex::encode_upper(bytes),
            Input::Hex(text) => text.to_string(),
            Input::Array(integers) => serde_json::Value::from(integers.to_vec()).to_string(),
        }
    }
}

fn is_hex_text(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_hexdigit() || c.is_whitespace())
}

fn decode_hex(text: &str) -> Result<Vec<u8>, InputError> {
    let digits = text.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    let invalid = digits.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit());
    if let Some((index, character)) = invalid {
        return Err(InputError::InvalidHex { character, index });
    }
    // Only ASCII digits remain, so byte and digit positions agree.
    hex::decode(&digits).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, index } => {
            InputError::InvalidHex { character: c, index }
        }
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            InputError::OddLength(digits.len())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_ignores_whitespace_and_case() {
        let input = Input::Hex("3F 83\n02 a1\t3d".into());
        assert_eq!(input.to_bytes().unwrap(), vec![0x3f, 0x83, 0x02, 0xa1, 0x3d]);
    }

    #[test]
    fn odd_hex_is_rejected() {
        let input = Input::Hex("3f030".into());
        assert_eq!(input.to_bytes(), Err(InputError::OddLength(5)));
        let input = Input::Hex("3f 03 0".into());
        assert_eq!(input.to_bytes(), Err(InputError::OddLength(5)));
    }

    #[test]
    fn invalid_hex_digit_is_rejected() {
        let input = Input::Hex("3f0g".into());
        assert_eq!(input.to_bytes(), Err(InputError::InvalidHex { character: 'g', index: 3 }));
        let input = Input::Hex("ééab".into());
        assert_eq!(input.to_bytes(), Err(InputError::InvalidHex { character: 'é', index: 0 }));
        let input = Input::Hex("3f 0ë 12".into());
        assert_eq!(input.to_bytes(), Err(InputError::InvalidHex { character: 'ë', index: 3 }));
    }

    #[test]
    fn buffers_display_as_hex() {
        let bytes = vec![0x3f, 0x83, 0x02, 0xa1, 0x3e];
        let input = Input::Bytes(bytes.clone().into());
        assert_eq!(input.to_display_string(), "3F8302A13E");
        assert_eq!(Input::Hex(input.to_display_string().into()).to_bytes(), Ok(bytes));
    }

    #[test]
    fn array_out_of_range_is_rejected() {
        let input = Input::Array(vec![63, 3, 256].into());
        assert_eq!(input.to_bytes(), Err(InputError::ByteOutOfRange { index: 2, value: 256 }));
        let input = Input::Array(vec![-1].into());
        assert_eq!(input.to_bytes(), Err(InputError::ByteOutOfRange { index: 0, value: -1 }));
    }

    #[test]
    fn detection() {
        assert!(matches!(Input::detect("3f 83 02"), Ok(Input::Hex(_))));
        assert!(matches!(Input::detect("[63, 131, 2]"), Ok(Input::Array(_))));
        assert!(matches!(Input::detect("?\u{3}"), Ok(Input::Bytes(_))));
        // Not valid JSON, so these are just bytes.
        assert!(matches!(Input::detect("[63,"), Ok(Input::Bytes(_))));
        // JSON, but not a sequence of integers.
        assert!(matches!(Input::detect(r#"["a"]"#), Ok(Input::Bytes(_))));
        assert!(matches!(Input::detect("[63, 1.5]"), Ok(Input::Bytes(_))));
    }

    #[test]
    fn json_payloads() {
        let array = serde_json::json!([63, 131, 2]);
        assert_eq!(Input::from_json(&array).unwrap().to_bytes().unwrap(), vec![63, 131, 2]);
        let text = serde_json::json!("3f8302");
        assert_eq!(Input::from_json(&text).unwrap().to_bytes().unwrap(), vec![63, 131, 2]);
        let number = serde_json::json!(42);
        assert_eq!(Input::from_json(&number), Err(InputError::UnsupportedType("number")));
        let mixed = serde_json::json!([63, "x"]);
        assert!(matches!(Input::from_json(&mixed), Err(InputError::UnsupportedType(_))));
    }
}
