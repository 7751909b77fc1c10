//! Network Information Table (table_ids 0x40 actual / 0x41 other).

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::{Descriptor, PsiError, Section, descriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NitSection {
    pub table_id: u8,
    pub network_id: u16,
    pub version: u8,
    pub descriptors: Vec<Descriptor>,
    pub transports: Vec<NitTransport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NitTransport {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub descriptors: Vec<Descriptor>,
}

pub fn decode(section: &Section) -> Result<NitSection, PsiError> {
    let table_id = section.header.table_id;
    if table_id != 0x40 && table_id != 0x41 {
        return Err(PsiError::UnexpectedTableId(table_id));
    }
    let mut cur = Cursor::new(section.body());

    let net_desc_len = cur.len12()?;
    let descriptors = descriptor::parse_loop(&mut cur, net_desc_len)?;

    let ts_loop_len = cur.len12()?;
    let mut loop_cur = cur.slice(ts_loop_len)?;
    let mut transports = Vec::new();
    while !loop_cur.is_empty() {
        let transport_stream_id = loop_cur.u16()?;
        let original_network_id = loop_cur.u16()?;
        let desc_len = loop_cur.len12()?;
        transports.push(NitTransport {
            transport_stream_id,
            original_network_id,
            descriptors: descriptor::parse_loop(&mut loop_cur, desc_len)?,
        });
    }

    Ok(NitSection {
        table_id,
        network_id: section.header.table_id_extension,
        version: section.header.version,
        descriptors,
        transports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::tests::make_section;

    #[test]
    fn network_and_transport_loops() {
        let body = [
            0xF0, 0x05, 0x40, 0x03, b'n', b'e', b't', // network_name descriptor
            0xF0, 0x06, // transport_stream loop
            0x00, 0x01, 0x00, 0x02, 0xF0, 0x00,
        ];
        let nit = decode(&make_section(0x40, 0x1234, &body)).unwrap();
        assert_eq!(nit.network_id, 0x1234);
        assert_eq!(nit.descriptors[0].tag, 0x40);
        assert_eq!(nit.transports.len(), 1);
        assert_eq!(nit.transports[0].transport_stream_id, 1);
        assert_eq!(nit.transports[0].original_network_id, 2);
    }
}
