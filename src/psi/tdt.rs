//! Time and Date Table (0x70, no CRC) and Time Offset Table (0x73,
//! CRC present).

use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::time::decode_mjd_utc;
use crate::psi::{Descriptor, PsiError, Section, UtcTime, descriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TdtSection {
    pub utc: UtcTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotSection {
    pub utc: UtcTime,
    pub descriptors: Vec<Descriptor>,
}

pub fn decode_tdt(section: &Section) -> Result<TdtSection, PsiError> {
    if section.header.table_id != 0x70 {
        return Err(PsiError::UnexpectedTableId(section.header.table_id));
    }
    let mut cur = Cursor::new(section.body());
    let utc = decode_mjd_utc(cur.bytes(5)?).ok_or(PsiError::Malformed("bad BCD UTC time"))?;
    Ok(TdtSection { utc })
}

pub fn decode_tot(section: &Section) -> Result<TotSection, PsiError> {
    if section.header.table_id != 0x73 {
        return Err(PsiError::UnexpectedTableId(section.header.table_id));
    }
    let mut cur = Cursor::new(section.body());
    let utc = decode_mjd_utc(cur.bytes(5)?).ok_or(PsiError::Malformed("bad BCD UTC time"))?;
    let desc_len = cur.len12()?;
    let descriptors = descriptor::parse_loop(&mut cur, desc_len)?;
    Ok(TotSection { utc, descriptors })
}
