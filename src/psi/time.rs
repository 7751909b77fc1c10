//! DVB time fields: 16-bit Modified Julian Date plus 24-bit BCD UTC.
//!
//! The MJD conversion is the exact integer form of the ETSI EN 300 468
//! annex-C formula; no calendar library is involved.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UtcTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Decode the 5-byte MJD + UTC field carried by TDT/TOT/EIT.
pub fn decode_mjd_utc(b: &[u8]) -> Option<UtcTime> {
    if b.len() < 5 {
        return None;
    }
    let mjd = u16::from_be_bytes([b[0], b[1]]) as i64;

    // Y' = floor((MJD - 15078.2) / 365.25) etc., scaled to integers
    let y1 = (mjd * 100 - 1_507_820) / 36_525;
    let yday = mjd - 14_956 - (y1 * 36_525) / 100;
    let m1 = (yday * 10_000 - 1_000) / 306_001;
    let day = yday - (m1 * 306_001) / 10_000;
    let k = if m1 == 14 || m1 == 15 { 1 } else { 0 };
    let year = 1900 + y1 + k;
    let month = m1 - 1 - k * 12;

    Some(UtcTime {
        year: year as i32,
        month: month as u8,
        day: day as u8,
        hour: bcd(b[2])?,
        minute: bcd(b[3])?,
        second: bcd(b[4])?,
    })
}

/// Decode a 24-bit BCD duration into seconds.
pub fn decode_bcd_duration(b: &[u8]) -> Option<u32> {
    if b.len() < 3 {
        return None;
    }
    let h = bcd(b[0])? as u32;
    let m = bcd(b[1])? as u32;
    let s = bcd(b[2])? as u32;
    Some(h * 3600 + m * 60 + s)
}

fn bcd(b: u8) -> Option<u8> {
    let hi = b >> 4;
    let lo = b & 0x0F;
    if hi > 9 || lo > 9 {
        return None;
    }
    Some(hi * 10 + lo)
}

/// DVB running_status names, as reported in SDT/EIT entries.
pub fn running_status(status: u8) -> &'static str {
    match status {
        0 => "undefined",
        1 => "stopped",
        2 => "preparing",
        3 => "pausing",
        4 => "running",
        _ => "reserved running status",
    }
}
