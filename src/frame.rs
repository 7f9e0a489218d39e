use std::borrow::Cow;

use tracing::{debug, trace, warn};

use crate::registers::output_key;
use crate::value::{DecodedRegister, Operation};
use crate::{Error, checksum};

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const EXCEPTION: u8 = 0x83;

/// Slave address, function code and the two byte checksum.
pub const MIN_FRAME_LENGTH: usize = 4;

/// Read Holding Registers responses carry no addresses, the first register is always this one.
const FIRST_READ_ADDRESS: u16 = 0x0001;

pub fn function_name(function_code: u8) -> Cow<'static, str> {
    match function_code {
        READ_HOLDING_REGISTERS => "Read Holding Registers".into(),
        WRITE_SINGLE_REGISTER => "Write Single Register".into(),
        EXCEPTION => "Error Response".into(),
        code => format!("Unknown ({code})").into(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::FromRepr, strum::IntoStaticStr)]
#[repr(u8)]
pub enum ExceptionCode {
    #[strum(serialize = "Illegal Function")]
    IllegalFunction = 1,
    #[strum(serialize = "Illegal Data Address")]
    IllegalDataAddress = 2,
    #[strum(serialize = "Illegal Data Value")]
    IllegalDataValue = 3,
    #[strum(serialize = "Server Device Failure")]
    ServerDeviceFailure = 4,
}

/// The error a device reported in an exception response.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ModbusError {
    pub code: u8,
    pub description: String,
    /// Always `true`, lets consumers tell device errors apart from their own.
    pub modbus_error: bool,
}

impl ModbusError {
    pub fn new(code: u8) -> Self {
        let text = ExceptionCode::from_repr(code).map_or("Unknown error", Into::into);
        Self { code, description: format!("Modbus Error: {text}"), modbus_error: true }
    }
}

/// Decoded registers, in the order they appear in the frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registers(Vec<(Cow<'static, str>, DecodedRegister)>);

impl Registers {
    pub fn get(&self, name: &str) -> Option<&DecodedRegister> {
        self.0.iter().find(|(key, _)| key == name).map(|(_, register)| register)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DecodedRegister)> {
        self.0.iter().map(|(key, register)| (&**key, register))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, key: Cow<'static, str>, register: DecodedRegister) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = register,
            None => self.0.push((key, register)),
        }
    }
}

impl serde::Serialize for Registers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DecodedFrame {
    pub slave_address: u8,
    pub function_code: u8,
    pub function_name: Cow<'static, str>,
    /// The whole frame, checksum included, as uppercase hex.
    pub raw_data: String,
    pub registers: Registers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ModbusError>,
}

/// Decode a single complete frame.
///
/// The length is checked before the checksum, so a three byte frame is reported as too short
/// rather than as corrupted.
pub fn decode(frame: &[u8]) -> Result<DecodedFrame, Error> {
    trace!(message = "decoding frame", length = frame.len());
    let &[slave_address, function_code, first_data_byte, _, ..] = frame else {
        return Err(Error::FrameTooShort { length: frame.len() });
    };
    checksum::verify(frame).map_err(Error::Checksum)?;
    // Checksum excluded.
    let body = &frame[..frame.len() - 2];

    let mut decoded = DecodedFrame {
        slave_address,
        function_code,
        function_name: function_name(function_code),
        raw_data: hex::encode_upper(frame),
        registers: Registers::default(),
        error: None,
    };
    match function_code {
        READ_HOLDING_REGISTERS => read_holding_registers(first_data_byte, body, &mut decoded.registers),
        WRITE_SINGLE_REGISTER => write_single_register(body, &mut decoded.registers),
        EXCEPTION => decoded.error = Some(ModbusError::new(first_data_byte)),
        code => debug!(message = "function code carries no registers", code),
    }
    Ok(decoded)
}

fn read_holding_registers(byte_count: u8, body: &[u8], registers: &mut Registers) {
    let register_count = usize::from(byte_count / 2);
    let data = body.get(3..).unwrap_or_default();
    let available = data.len() / 2;
    if available < register_count {
        warn!(
            message = "frame is shorter than its byte count claims",
            byte_count,
            decoded = available
        );
    }
    for (address, word) in (FIRST_READ_ADDRESS..).zip(data.chunks_exact(2).take(register_count)) {
        let raw = u16::from_be_bytes([word[0], word[1]]);
        let register = DecodedRegister::decode(address, raw);
        if !register.is_known() {
            debug!(message = "unknown register", address, raw);
        }
        registers.insert(output_key(address), register);
    }
}

fn write_single_register(body: &[u8], registers: &mut Registers) {
    let Some(&[address_hi, address_lo, value_hi, value_lo]) = body.get(2..6) else {
        warn!(message = "write acknowledgement is missing address or value", length = body.len());
        return;
    };
    let address = u16::from_be_bytes([address_hi, address_lo]);
    let raw = u16::from_be_bytes([value_hi, value_lo]);
    let mut register = DecodedRegister::decode(address, raw);
    if !register.is_known() {
        debug!(message = "unknown register", address, raw);
    }
    register.operation = Some(Operation::Write);
    registers.insert(output_key(address), register);
}
