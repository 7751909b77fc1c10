//! PES packet header parsing, limited to what timing analysis needs:
//! the stream_id and the PTS/DTS fields.

use serde::Serialize;

/// Timestamps recovered from one PES header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PesTimestamps {
    pub stream_id: u8,
    /// 33-bit 90 kHz value.
    pub pts: Option<u64>,
    pub dts: Option<u64>,
}

/// Stream ids that carry no PES header extension and so can never hold
/// a PTS (program_stream_map, padding, private_2, ECM/EMM, DSMCC ranges).
fn has_header_extension(stream_id: u8) -> bool {
    !matches!(stream_id, 0xBC | 0xBE | 0xBF | 0xF0 | 0xF1 | 0xF2 | 0xF8 | 0xFF)
}

fn read_timestamp(b: &[u8]) -> Option<u64> {
    if b.len() < 5 {
        return None;
    }
    // 33 bits spread over 5 bytes with marker bits between.
    Some(
        ((b[0] as u64 & 0x0E) << 29)
            | ((b[1] as u64) << 22)
            | ((b[2] as u64 & 0xFE) << 14)
            | ((b[3] as u64) << 7)
            | ((b[4] as u64) >> 1),
    )
}

/// Parse the head of a PES packet. `data` starts at the packet_start_code
/// prefix, i.e. the payload of a packet with payload_unit_start set.
/// Returns `None` when the payload is not a PES packet or the header is
/// cut short.
pub fn parse_timestamps(data: &[u8]) -> Option<PesTimestamps> {
    if data.len() < 6 || data[0] != 0x00 || data[1] != 0x00 || data[2] != 0x01 {
        return None;
    }
    let stream_id = data[3];
    if !has_header_extension(stream_id) {
        return Some(PesTimestamps {
            stream_id,
            pts: None,
            dts: None,
        });
    }
    if data.len() < 9 {
        return None;
    }

    let pts_dts_flags = (data[7] >> 6) & 0x03;
    let (pts, dts) = match pts_dts_flags {
        0b10 => (read_timestamp(&data[9..]), None),
        0b11 => {
            let pts = read_timestamp(&data[9..]);
            let dts = if data.len() >= 19 {
                read_timestamp(&data[14..])
            } else {
                None
            };
            (pts, dts)
        }
        _ => (None, None),
    };

    Some(PesTimestamps {
        stream_id,
        pts,
        dts,
    })
}
