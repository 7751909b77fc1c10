//! Service Description Table (table_ids 0x42 actual / 0x46 other).

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::{Descriptor, PsiError, Section, descriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdtSection {
    pub table_id: u8,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub version: u8,
    pub services: Vec<SdtService>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdtService {
    pub service_id: u16,
    pub running_status: u8,
    pub free_ca_mode: bool,
    pub descriptors: Vec<Descriptor>,
}

pub fn decode(section: &Section) -> Result<SdtSection, PsiError> {
    let table_id = section.header.table_id;
    if table_id != 0x42 && table_id != 0x46 {
        return Err(PsiError::UnexpectedTableId(table_id));
    }
    let mut cur = Cursor::new(section.body());

    let original_network_id = cur.u16()?;
    cur.skip(1)?; // reserved_future_use

    let mut services = Vec::new();
    while !cur.is_empty() {
        let service_id = cur.u16()?;
        cur.skip(1)?; // EIT schedule/present-following flags
        let word = cur.u16()?;
        let running_status = (word >> 13) as u8 & 0x07;
        let free_ca_mode = word & 0x1000 != 0;
        let desc_len = (word & 0x0FFF) as usize;
        services.push(SdtService {
            service_id,
            running_status,
            free_ca_mode,
            descriptors: descriptor::parse_loop(&mut cur, desc_len)?,
        });
    }

    Ok(SdtSection {
        table_id,
        transport_stream_id: section.header.table_id_extension,
        original_network_id,
        version: section.header.version,
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::tests::make_section;

    #[test]
    fn service_loop() {
        let body = [
            0x00, 0x02, 0xFF, // original_network_id 2, reserved
            0x00, 0x09, 0xFC, // service 9
            0x80, 0x00, // running, clear, no descriptors
            0x00, 0x0A, 0xFC, // service 10
            0x90, 0x03, 0x48, 0x01, 0x01, // scrambled + service descriptor
        ];
        let sdt = decode(&make_section(0x42, 1, &body)).unwrap();
        assert_eq!(sdt.original_network_id, 2);
        assert_eq!(sdt.services.len(), 2);
        assert_eq!(sdt.services[0].service_id, 9);
        assert_eq!(sdt.services[0].running_status, 4);
        assert!(!sdt.services[0].free_ca_mode);
        assert!(sdt.services[1].free_ca_mode);
        assert_eq!(sdt.services[1].descriptors[0].tag, 0x48);
    }

    #[test]
    fn overrunning_descriptor_loop_aborts_section() {
        let body = [
            0x00, 0x02, 0xFF, //
            0x00, 0x09, 0xFC, 0x80, 0x20, // claims 32 descriptor bytes
        ];
        assert!(decode(&make_section(0x42, 1, &body)).is_err());
    }
}
