use crc::{CRC_16_MODBUS, Crc};

/// CRC-16/MODBUS: initial value 0xFFFF, reflected polynomial 0xA001, no final XOR.
const MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("frame of {0} bytes cannot hold a checksum")]
    TooShort(usize),
    #[error("checksum mismatch (computed {computed:#06x}, received {received:#06x})")]
    Mismatch { computed: u16, received: u16 },
}

pub fn compute(body: &[u8]) -> u16 {
    MODBUS.checksum(body)
}

/// Check the trailing little-endian checksum of `frame` against its body.
pub fn verify(frame: &[u8]) -> Result<(), ChecksumError> {
    let Some((body, trailer)) = frame.split_last_chunk::<2>() else {
        return Err(ChecksumError::TooShort(frame.len()));
    };
    let computed = compute(body);
    let received = u16::from_le_bytes(*trailer);
    if computed != received {
        return Err(ChecksumError::Mismatch { computed, received });
    }
    Ok(())
}

/// `body` followed by its checksum, ready to be put on the wire.
pub fn with_checksum(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 2);
    frame.extend_from_slice(body);
    frame.extend(compute(body).to_le_bytes());
    frame
}
