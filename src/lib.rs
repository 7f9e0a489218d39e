//! Decoder for the Modbus RTU dialect spoken by pump frequency converters.
//!
//! A frame goes through [`input`] normalization, [`checksum`] verification and then [`frame`]
//! parsing, which looks registers up in the static [`registers`] table and decodes their raw
//! words with [`value`]. The result is a [`frame::DecodedFrame`]; the [`assemble`] module turns
//! it into the message shapes consumers expect.

pub mod assemble;
pub mod checksum;
pub mod commands;
pub mod frame;
pub mod input;
pub mod output;
pub mod registers;
pub mod value;

pub use frame::DecodedFrame;
pub use input::Input;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("input could not be interpreted as a frame")]
    Input(#[source] input::InputError),
    #[error("frame is {length} bytes long, but at least 4 are required")]
    FrameTooShort { length: usize },
    #[error("frame failed the integrity check")]
    Checksum(#[source] checksum::ChecksumError),
}

/// Normalize `input` into bytes and decode them as a single frame.
pub fn decode(input: &Input<'_>) -> Result<DecodedFrame, Error> {
    let bytes = input.to_bytes().map_err(Error::Input)?;
    frame::decode(&bytes)
}
