//! PSI/SI section reassembly and table decoding.

pub mod bat;
pub mod cat;
pub mod descriptor;
pub mod eit;
pub mod nit;
pub mod pat;
pub mod pmt;
pub mod section;
pub mod sdt;
pub mod tdt;
pub mod time;

pub use bat::BatSection;
pub use cat::CatSection;
pub use descriptor::Descriptor;
pub use eit::{EitEvent, EitSection};
pub use nit::{NitSection, NitTransport};
pub use pat::{PatEntry, PatSection};
pub use pmt::{EsEntry, PmtSection};
pub use section::{Section, SectionBuffer, SectionHeader};
pub use sdt::{SdtSection, SdtService};
pub use tdt::{TdtSection, TotSection};
pub use time::UtcTime;

use bytes::Bytes;
use serde::Serialize;

use crate::cursor::Underflow;

/// Section-level decode failures. A failed section is discarded and
/// decoding continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PsiError {
    #[error("malformed section: {0}")]
    Malformed(&'static str),
    #[error("CRC-32 mismatch: calculated 0x{calc:08X}, found 0x{found:08X}")]
    Crc { calc: u32, found: u32 },
    #[error("unexpected table_id 0x{0:02X}")]
    UnexpectedTableId(u8),
}

impl From<Underflow> for PsiError {
    fn from(_: Underflow) -> Self {
        PsiError::Malformed("declared length overruns section")
    }
}

/// Raw bytes of a table the engine does not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTable {
    pub table_id: u8,
    #[serde(skip)]
    pub data: Bytes,
}

/// One decoded PSI/SI table, tagged by kind. Reserved and user-defined
/// table_ids are surfaced with their raw bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Table {
    Pat(PatSection),
    Cat(CatSection),
    Pmt(PmtSection),
    Tsdt(RawTable),
    Nit(NitSection),
    Sdt(SdtSection),
    Bat(BatSection),
    Eit(EitSection),
    Tdt(TdtSection),
    Rst(RawTable),
    St(RawTable),
    Tot(TotSection),
    Dit(RawTable),
    Sit(RawTable),
    Reserved(RawTable),
    UserDefined(RawTable),
}

impl Table {
    pub fn table_id(&self) -> u8 {
        match self {
            Table::Pat(_) => 0x00,
            Table::Cat(_) => 0x01,
            Table::Pmt(_) => 0x02,
            Table::Tsdt(r)
            | Table::Rst(r)
            | Table::St(r)
            | Table::Dit(r)
            | Table::Sit(r)
            | Table::Reserved(r)
            | Table::UserDefined(r) => r.table_id,
            Table::Nit(n) => n.table_id,
            Table::Sdt(s) => s.table_id,
            Table::Bat(_) => 0x4A,
            Table::Eit(e) => e.table_id,
            Table::Tdt(_) => 0x70,
            Table::Tot(_) => 0x73,
        }
    }
}

/// Whether a section carries a trailing CRC-32. TDT, RST, ST and DIT
/// never do; the other standard tables always do, TOT included despite
/// its short form. Reserved and user-defined ids follow their
/// section_syntax_indicator.
pub fn table_has_crc(table_id: u8, syntax_indicator: bool) -> bool {
    match table_id {
        0x70 | 0x71 | 0x72 | 0x7E => false,
        0x00..=0x03 | 0x40..=0x42 | 0x46 | 0x4A | 0x4E..=0x6F | 0x73 | 0x7F => true,
        _ => syntax_indicator,
    }
}

/// Dispatch a reassembled, CRC-validated section to its decoder.
pub fn decode_table(section: &Section) -> Result<Table, PsiError> {
    let id = section.header.table_id;
    let raw = || RawTable {
        table_id: id,
        data: section.data.clone(),
    };
    match id {
        0x00 => pat::decode(section).map(Table::Pat),
        0x01 => cat::decode(section).map(Table::Cat),
        0x02 => pmt::decode(section).map(Table::Pmt),
        0x03 => Ok(Table::Tsdt(raw())),
        0x40 | 0x41 => nit::decode(section).map(Table::Nit),
        0x42 | 0x46 => sdt::decode(section).map(Table::Sdt),
        0x4A => bat::decode(section).map(Table::Bat),
        0x4E..=0x6F => eit::decode(section).map(Table::Eit),
        0x70 => tdt::decode_tdt(section).map(Table::Tdt),
        0x71 => Ok(Table::Rst(raw())),
        0x72 => Ok(Table::St(raw())),
        0x73 => tdt::decode_tot(section).map(Table::Tot),
        0x7E => Ok(Table::Dit(raw())),
        0x7F => Ok(Table::Sit(raw())),
        0x04..=0x3F | 0x43..=0x45 | 0x47..=0x49 | 0x4B..=0x4D | 0x74..=0x7D | 0xFF => {
            Ok(Table::Reserved(raw()))
        }
        0x80..=0xFE => Ok(Table::UserDefined(raw())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::tests::make_section;

    #[test]
    fn reserved_and_user_defined_surface_raw() {
        let sec = make_section(0x3F, 0x0000, &[0xDE, 0xAD]);
        match decode_table(&sec).unwrap() {
            Table::Reserved(r) => assert_eq!(r.table_id, 0x3F),
            other => panic!("expected Reserved, got {other:?}"),
        }
        let sec = make_section(0x90, 0x0000, &[0xBE, 0xEF]);
        assert!(matches!(decode_table(&sec).unwrap(), Table::UserDefined(_)));
    }

    #[test]
    fn crc_exempt_tables() {
        for id in [0x70, 0x71, 0x72, 0x7E] {
            assert!(!table_has_crc(id, false));
            assert!(!table_has_crc(id, true));
        }
        for id in [0x00, 0x02, 0x42, 0x73] {
            assert!(table_has_crc(id, false));
            assert!(table_has_crc(id, true));
        }
        // private ids carry a CRC only in long form
        assert!(table_has_crc(0x90, true));
        assert!(!table_has_crc(0x90, false));
        assert!(!table_has_crc(0x3F, false));
    }
}
