//! TS packet header parsing and sync-byte scanning.

use bitstream_io::{BigEndian, BitRead, BitReader};
use serde::Serialize;

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE};

/// Header parse failures. A wrong sync byte is recoverable: the caller
/// may rescan the input with [`find_sync`] at the packet stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("packet shorter than the 4-byte header ({0} bytes)")]
    Truncated(usize),
    #[error("sync byte 0x{0:02X}, expected 0x47")]
    SyncByte(u8),
}

/// Decoded 4-byte TS packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TsHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_control: u8,
    pub continuity_counter: u8,
}

impl TsHeader {
    /// Decode the fixed header. `data` is the packet from its sync byte;
    /// only the first 4 bytes are consumed.
    pub fn parse(data: &[u8]) -> Result<Self, HeaderError> {
        if data.len() < 4 {
            return Err(HeaderError::Truncated(data.len()));
        }
        if data[0] != TS_SYNC_BYTE {
            return Err(HeaderError::SyncByte(data[0]));
        }

        let mut r = BitReader::endian(&data[1..4], BigEndian);
        // the reader is over exactly 3 bytes; reads below cannot fail
        let transport_error = r.read_bit().map_err(|_| HeaderError::Truncated(data.len()))?;
        let payload_unit_start = r.read_bit().map_err(|_| HeaderError::Truncated(data.len()))?;
        let priority = r.read_bit().map_err(|_| HeaderError::Truncated(data.len()))?;
        let pid = r.read::<13, u16>().map_err(|_| HeaderError::Truncated(data.len()))?;
        let scrambling_control = r.read::<2, u8>().map_err(|_| HeaderError::Truncated(data.len()))?;
        let adaptation_field_control =
            r.read::<2, u8>().map_err(|_| HeaderError::Truncated(data.len()))?;
        let continuity_counter =
            r.read::<4, u8>().map_err(|_| HeaderError::Truncated(data.len()))?;

        Ok(Self {
            transport_error,
            payload_unit_start,
            priority,
            pid,
            scrambling_control,
            adaptation_field_control,
            continuity_counter,
        })
    }

    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }

    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }
}

/// Offset of the first position in `buf` where a sync byte repeats at
/// `stride` for every complete packet in view. Used to reacquire lock
/// after a sync loss.
pub fn find_sync(buf: &[u8], stride: usize) -> Option<usize> {
    (0..buf.len().min(stride)).find(|&off| {
        buf[off..]
            .chunks(stride)
            .filter(|c| !c.is_empty())
            .all(|c| c[0] == TS_SYNC_BYTE)
    })
}

/// Payload byte offset within a 188-byte packet, past any adaptation
/// field. `None` when the packet carries no payload bytes.
pub fn payload_offset(header: &TsHeader, data: &[u8]) -> Option<usize> {
    if !header.has_payload() {
        return None;
    }
    let mut off = 4usize;
    if header.has_adaptation_field() {
        off += 1 + *data.get(4)? as usize;
    }
    if off < TS_PACKET_SIZE.min(data.len()) {
        Some(off)
    } else {
        None
    }
}
