//! Conditional Access Table (table_id 0x01).

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::{Descriptor, PsiError, Section, descriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatSection {
    pub version: u8,
    pub current_next: bool,
    pub descriptors: Vec<Descriptor>,
}

pub fn decode(section: &Section) -> Result<CatSection, PsiError> {
    if section.header.table_id != 0x01 {
        return Err(PsiError::UnexpectedTableId(section.header.table_id));
    }
    let body = section.body();
    let mut cur = Cursor::new(body);
    let descriptors = descriptor::parse_loop(&mut cur, body.len())?;

    Ok(CatSection {
        version: section.header.version,
        current_next: section.header.current_next,
        descriptors,
    })
}
