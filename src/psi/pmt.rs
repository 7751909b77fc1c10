//! Program Map Table (table_id 0x02).

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::{Descriptor, PsiError, Section, descriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PmtSection {
    pub program_number: u16,
    pub version: u8,
    pub current_next: bool,
    pub pcr_pid: u16,
    pub descriptors: Vec<Descriptor>,
    pub streams: Vec<EsEntry>,
}

/// One elementary-stream loop entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsEntry {
    pub stream_type: u8,
    pub elementary_pid: u16,
    pub descriptors: Vec<Descriptor>,
}

pub fn decode(section: &Section) -> Result<PmtSection, PsiError> {
    if section.header.table_id != 0x02 {
        return Err(PsiError::UnexpectedTableId(section.header.table_id));
    }
    let mut cur = Cursor::new(section.body());

    let pcr_pid = cur.pid()?;
    let program_info_len = cur.len12()?;
    let descriptors = descriptor::parse_loop(&mut cur, program_info_len)?;

    let mut streams = Vec::new();
    while !cur.is_empty() {
        let stream_type = cur.u8()?;
        let elementary_pid = cur.pid()?;
        let es_info_len = cur.len12()?;
        streams.push(EsEntry {
            stream_type,
            elementary_pid,
            descriptors: descriptor::parse_loop(&mut cur, es_info_len)?,
        });
    }

    Ok(PmtSection {
        program_number: section.header.table_id_extension,
        version: section.header.version,
        current_next: section.header.current_next,
        pcr_pid,
        descriptors,
        streams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::tests::make_section;

    #[test]
    fn pcr_pid_and_stream_loop() {
        let body = [
            0xE1, 0x01, // PCR_PID 0x101
            0xF0, 0x00, // no program descriptors
            0x1B, 0xE1, 0x01, 0xF0, 0x00, // H.264 on 0x101
            0x0F, 0xE1, 0x02, 0xF0, 0x03, 0x0A, 0x01, 0x00, // AAC on 0x102 + one descriptor
        ];
        let pmt = decode(&make_section(0x02, 1, &body)).unwrap();
        assert_eq!(pmt.program_number, 1);
        assert_eq!(pmt.pcr_pid, 0x101);
        assert_eq!(pmt.streams.len(), 2);
        assert_eq!(pmt.streams[0].stream_type, 0x1B);
        assert_eq!(pmt.streams[0].elementary_pid, 0x101);
        assert_eq!(pmt.streams[1].elementary_pid, 0x102);
        assert_eq!(pmt.streams[1].descriptors.len(), 1);
        assert_eq!(pmt.streams[1].descriptors[0].tag, 0x0A);
    }

    #[test]
    fn es_info_overrun_is_malformed() {
        let body = [
            0xE1, 0x01, 0xF0, 0x00, //
            0x1B, 0xE1, 0x01, 0xF0, 0x40, // ES_info_length 0x40 > remaining
        ];
        assert!(decode(&make_section(0x02, 1, &body)).is_err());
    }
}
