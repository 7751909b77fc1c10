//! Program Association Table (table_id 0x00).

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::{PsiError, Section};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatSection {
    pub transport_stream_id: u16,
    pub version: u8,
    pub current_next: bool,
    /// `program_number == 0` entries name the network PID instead of a
    /// program; they land in `network_pid`, not `programs`.
    pub network_pid: Option<u16>,
    pub programs: Vec<PatEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatEntry {
    pub program_number: u16,
    pub pmt_pid: u16,
}

pub fn decode(section: &Section) -> Result<PatSection, PsiError> {
    if section.header.table_id != 0x00 {
        return Err(PsiError::UnexpectedTableId(section.header.table_id));
    }
    let mut cur = Cursor::new(section.body());

    let mut network_pid = None;
    let mut programs = Vec::new();
    while !cur.is_empty() {
        let program_number = cur.u16()?;
        let pid = cur.pid()?;
        if program_number == 0 {
            network_pid = Some(pid);
        } else {
            programs.push(PatEntry {
                program_number,
                pmt_pid: pid,
            });
        }
    }

    Ok(PatSection {
        transport_stream_id: section.header.table_id_extension,
        version: section.header.version,
        current_next: section.header.current_next,
        network_pid,
        programs,
    })
}
