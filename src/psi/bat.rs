//! Bouquet Association Table (table_id 0x4A). Same loop layout as NIT.

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::{Descriptor, NitTransport, PsiError, Section, descriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatSection {
    pub bouquet_id: u16,
    pub version: u8,
    pub descriptors: Vec<Descriptor>,
    pub transports: Vec<NitTransport>,
}

pub fn decode(section: &Section) -> Result<BatSection, PsiError> {
    if section.header.table_id != 0x4A {
        return Err(PsiError::UnexpectedTableId(section.header.table_id));
    }
    let mut cur = Cursor::new(section.body());

    let bouquet_desc_len = cur.len12()?;
    let descriptors = descriptor::parse_loop(&mut cur, bouquet_desc_len)?;

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

    Ok(BatSection {
        bouquet_id: section.header.table_id_extension,
        version: section.header.version,
        descriptors,
        transports,
    })
}
