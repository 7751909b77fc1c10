//! Event Information Table (table_ids 0x4E..0x6F: present/following and
//! schedule, actual and other transport stream).

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::time::{decode_bcd_duration, decode_mjd_utc};
use crate::psi::{Descriptor, PsiError, Section, UtcTime, descriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EitSection {
    pub table_id: u8,
    pub service_id: u16,
    pub version: u8,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub events: Vec<EitEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EitEvent {
    pub event_id: u16,
    /// `None` when the start time field is the undefined all-ones value.
    pub start: Option<UtcTime>,
    pub duration_secs: Option<u32>,
    pub running_status: u8,
    pub free_ca_mode: bool,
    pub descriptors: Vec<Descriptor>,
}

pub fn decode(section: &Section) -> Result<EitSection, PsiError> {
    let table_id = section.header.table_id;
    if !(0x4E..=0x6F).contains(&table_id) {
        return Err(PsiError::UnexpectedTableId(table_id));
    }
    let mut cur = Cursor::new(section.body());

    let transport_stream_id = cur.u16()?;
    let original_network_id = cur.u16()?;
    cur.skip(2)?; // segment_last_section_number, last_table_id

    let mut events = Vec::new();
    while !cur.is_empty() {
        let event_id = cur.u16()?;
        let start = decode_mjd_utc(cur.bytes(5)?);
        let duration_secs = decode_bcd_duration(cur.bytes(3)?);
        let word = cur.u16()?;
        let running_status = (word >> 13) as u8 & 0x07;
        let free_ca_mode = word & 0x1000 != 0;
        let desc_len = (word & 0x0FFF) as usize;
        events.push(EitEvent {
            event_id,
            start,
            duration_secs,
            running_status,
            free_ca_mode,
            descriptors: descriptor::parse_loop(&mut cur, desc_len)?,
        });
    }

    Ok(EitSection {
        table_id,
        service_id: section.header.table_id_extension,
        version: section.header.version,
        transport_stream_id,
        original_network_id,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::tests::make_section;

    #[test]
    fn present_following_event() {
        let body = [
            0x00, 0x01, 0x00, 0x02, 0x00, 0x4E, // ts 1, onid 2, seg, last_tid
            0x00, 0x2A, // event 42
            0xC0, 0x79, 0x12, 0x45, 0x00, // 1993-10-13 12:45:00
            0x01, 0x30, 0x00, // 1h30m
            0x80, 0x00, // running, clear, no descriptors
        ];
        let eit = decode(&make_section(0x4E, 9, &body)).unwrap();
        assert_eq!(eit.service_id, 9);
        assert_eq!(eit.events.len(), 1);
        let ev = &eit.events[0];
        assert_eq!(ev.event_id, 42);
        let start = ev.start.unwrap();
        assert_eq!((start.year, start.month, start.day), (1993, 10, 13));
        assert_eq!(ev.duration_secs, Some(5400));
        assert_eq!(ev.running_status, 4);
    }

    #[test]
    fn schedule_table_ids_accepted() {
        let body = [0x00, 0x01, 0x00, 0x02, 0x00, 0x60];
        assert!(decode(&make_section(0x60, 9, &body)).is_ok());
        assert!(decode(&make_section(0x3F, 9, &body)).is_err());
    }
}
