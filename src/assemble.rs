//! Turning decode results into the messages handed to consumers.
//!
//! Two shapes exist. The detailed shape is the [`DecodedFrame`] itself plus a capture
//! timestamp. The simplified shape flattens registers into the top-level object, replacing each
//! one with its `value` where it has one.

use serde_json::{Map, Value};

use crate::DecodedFrame;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shape {
    #[default]
    Detailed,
    Simplified,
}

/// A successfully decoded frame and the moment it was decoded.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Capture {
    #[serde(flatten)]
    pub frame: DecodedFrame,
    pub timestamp: jiff::Timestamp,
}

impl Capture {
    pub fn new(frame: DecodedFrame) -> Self {
        Self::at(frame, jiff::Timestamp::now())
    }

    pub fn at(frame: DecodedFrame, timestamp: jiff::Timestamp) -> Self {
        Self { frame, timestamp }
    }

    pub fn simplified(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut object = Map::new();
        object.insert("slave".into(), self.frame.slave_address.into());
        object.insert("function".into(), self.frame.function_name.as_ref().into());
        object.insert("timestamp".into(), self.timestamp.to_string().into());
        for (name, register) in self.frame.registers.iter() {
            let value = match serde_json::to_value(register)? {
                Value::Object(mut fields) => match fields.remove("value") {
                    Some(value) => value,
                    None => Value::Object(fields),
                },
                other => other,
            };
            object.insert(name.into(), value);
        }
        if let Some(error) = &self.frame.error {
            object.insert("error".into(), serde_json::to_value(error)?);
        }
        Ok(object)
    }

    pub fn project(&self, shape: Shape) -> Result<Value, serde_json::Error> {
        match shape {
            Shape::Detailed => serde_json::to_value(self),
            Shape::Simplified => self.simplified().map(Value::Object),
        }
    }
}

/// A frame that could not be decoded, kept together with the input that caused the failure.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Failure {
    pub error: String,
    pub input: String,
    pub timestamp: jiff::Timestamp,
}

impl Failure {
    /// `input` is the undecoded frame as the consumer received it.
    pub fn new(error: &crate::Error, input: String) -> Self {
        Self::at(error, input, jiff::Timestamp::now())
    }

    pub fn at(error: &crate::Error, input: String, timestamp: jiff::Timestamp) -> Self {
        Self { error: error_chain(error), input, timestamp }
    }
}

/// `error` and all of its sources, separated by `: `.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut cause = error.source();
    while let Some(e) = cause {
        message.push_str(": ");
        message.push_str(&e.to_string());
        cause = e.source();
    }
    message
}
