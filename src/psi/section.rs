//! Generic PSI/SI section reassembly with CRC-32 (MPEG-2) validation.
//!
//! One [`SectionBuffer`] lives per PSI/SI PID and rebuilds logical
//! sections from packet payloads: `Idle -> Collecting -> Complete`.
//! The 12-bit `section_length` is authoritative; collection stops at
//! exactly that boundary no matter how the bytes were split across
//! packets, and back-to-back sections within one packet are all
//! recovered.

use bytes::{Bytes, BytesMut};
use crc::{CRC_32_MPEG_2, Crc};
use tracing::debug;

use crate::constants::SECTION_LENGTH_MAX;
use crate::psi::{PsiError, table_has_crc};

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Fixed section header. For short-form sections
/// (`section_syntax_indicator == 0`) only `table_id` and
/// `section_length` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub table_id: u8,
    pub syntax_indicator: bool,
    pub section_length: u16,
    pub table_id_extension: u16,
    pub version: u8,
    pub current_next: bool,
    pub section_number: u8,
    pub last_section_number: u8,
}

impl SectionHeader {
    pub fn parse(data: &[u8]) -> Result<Self, PsiError> {
        if data.len() < 3 {
            return Err(PsiError::Malformed("section header shorter than 3 bytes"));
        }
        let table_id = data[0];
        let syntax_indicator = data[1] & 0x80 != 0;
        let section_length = ((data[1] as u16 & 0x0F) << 8) | data[2] as u16;

        let mut hdr = SectionHeader {
            table_id,
            syntax_indicator,
            section_length,
            table_id_extension: 0,
            version: 0,
            current_next: true,
            section_number: 0,
            last_section_number: 0,
        };
        if syntax_indicator {
            if data.len() < 8 {
                return Err(PsiError::Malformed("long-form header truncated"));
            }
            hdr.table_id_extension = u16::from_be_bytes([data[3], data[4]]);
            hdr.version = (data[5] & 0x3E) >> 1;
            hdr.current_next = data[5] & 0x01 != 0;
            hdr.section_number = data[6];
            hdr.last_section_number = data[7];
        }
        Ok(hdr)
    }

    /// Whole section size including the 3 fixed header bytes.
    pub fn total_len(&self) -> usize {
        self.section_length as usize + 3
    }
}

/// A complete, length-exact section. `data` spans header through CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: SectionHeader,
    pub data: Bytes,
}

impl Section {
    /// Parse and validate a reassembled section: the declared length
    /// must match the byte count, and tables that carry a CRC-32 must
    /// pass it before any contents are trusted.
    pub fn parse(data: Bytes) -> Result<Self, PsiError> {
        let header = SectionHeader::parse(&data)?;
        if data.len() != header.total_len() {
            return Err(PsiError::Malformed("section length mismatch"));
        }
        if table_has_crc(header.table_id, header.syntax_indicator) {
            let body_floor = if header.syntax_indicator { 5 + 4 } else { 4 };
            if (header.section_length as usize) < body_floor {
                return Err(PsiError::Malformed("section_length below fixed fields"));
            }
            let split = data.len() - 4;
            let calc = CRC_MPEG.checksum(&data[..split]);
            let found = u32::from_be_bytes([data[split], data[split + 1], data[split + 2], data[split + 3]]);
            if calc != found {
                return Err(PsiError::Crc { calc, found });
            }
        }
        Ok(Section { header, data })
    }

    /// Table payload: past the fixed header fields, before any CRC.
    pub fn body(&self) -> &[u8] {
        let start = if self.header.syntax_indicator { 8 } else { 3 };
        let has_crc = table_has_crc(self.header.table_id, self.header.syntax_indicator);
        let end = self.data.len() - if has_crc { 4 } else { 0 };
        &self.data[start..end]
    }
}

/// What one packet payload produced: zero or more raw completed
/// sections plus defects observed while framing them.
#[derive(Debug, Default)]
pub struct FeedResult {
    pub completed: Vec<Bytes>,
    /// An in-progress section was cut short by a new payload start.
    pub truncated: bool,
    /// A declared length was out of range; the rest of the packet's
    /// payload was dropped.
    pub malformed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Collecting,
}

/// Per-PID reassembly buffer.
#[derive(Debug)]
pub struct SectionBuffer {
    state: State,
    buf: BytesMut,
    /// Total bytes this section needs, known once 3 bytes are in.
    declared: Option<usize>,
}

impl Default for SectionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionBuffer {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            buf: BytesMut::new(),
            declared: None,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.state == State::Collecting
    }

    pub fn bytes_collected(&self) -> usize {
        self.buf.len()
    }

    /// Feed one packet's payload bytes.
    ///
    /// With `payload_unit_start` set, the leading pointer-field byte is
    /// consumed; the bytes it skips finish any in-progress section, and
    /// a new section starts at the pointer target. Without it, bytes
    /// extend the current section (or are stuffing if none is open).
    pub fn feed(&mut self, payload_unit_start: bool, payload: &[u8]) -> FeedResult {
        let mut out = FeedResult::default();

        let rest = if payload_unit_start {
            let Some(&pointer) = payload.first() else {
                return out;
            };
            let pointer = pointer as usize;
            if 1 + pointer > payload.len() {
                debug!(pointer, len = payload.len(), "pointer field overruns payload");
                out.malformed = true;
                self.reset();
                return out;
            }

            // tail of the previous section, if one is open
            let tail = &payload[1..1 + pointer];
            if self.state == State::Collecting {
                self.append_tail(tail, &mut out);
                if self.state == State::Collecting {
                    debug!(collected = self.buf.len(), "section cut short by new payload start");
                    out.truncated = true;
                    self.reset();
                }
            }
            self.reset();
            &payload[1 + pointer..]
        } else {
            if self.state == State::Idle {
                return out; // nothing open on this PID
            }
            payload
        };

        self.collect(rest, &mut out);
        out
    }

    fn reset(&mut self) {
        self.state = State::Idle;
        self.buf.clear();
        self.declared = None;
    }

    /// Consume bytes, completing sections back-to-back until stuffing
    /// or the end of the packet payload.
    fn collect(&mut self, mut rest: &[u8], out: &mut FeedResult) {
        while !rest.is_empty() {
            if self.state == State::Idle {
                if rest[0] == 0xFF {
                    break; // stuffing runs to the end of the packet
                }
                self.state = State::Collecting;
                self.buf.clear();
                self.declared = None;
            }

            let declared = match self.declared {
                Some(d) => d,
                None => {
                    let need = 3 - self.buf.len();
                    let take = need.min(rest.len());
                    self.buf.extend_from_slice(&rest[..take]);
                    rest = &rest[take..];
                    if self.buf.len() < 3 {
                        return; // length still unknown, wait for more packets
                    }
                    let section_length =
                        ((self.buf[1] as usize & 0x0F) << 8) | self.buf[2] as usize;
                    if section_length > SECTION_LENGTH_MAX {
                        debug!(section_length, "section_length out of range");
                        out.malformed = true;
                        self.reset();
                        return; // framing lost for the rest of this payload
                    }
                    let total = section_length + 3;
                    self.declared = Some(total);
                    total
                }
            };

            let need = declared - self.buf.len();
            let take = need.min(rest.len());
            self.buf.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.buf.len() == declared {
                out.completed.push(Bytes::copy_from_slice(&self.buf));
                self.reset();
            }
        }
    }

    /// Pointer-field bytes may only finish the open section; anything
    /// past its declared end is dropped.
    fn append_tail(&mut self, tail: &[u8], out: &mut FeedResult) {
        if tail.is_empty() {
            return;
        }
        self.collect(tail, out);
        // a tail cannot open a new section; if collect() finished the
        // old one and restarted on leftover bytes, discard that start
        if self.state == State::Collecting && !out.completed.is_empty() {
            self.reset();
        }
    }
}
