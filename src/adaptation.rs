//! Adaptation field decoding, including the 42-bit PCR/OPCR.

use bitstream_io::{BigEndian, BitRead, BitReader};
use serde::Serialize;

/// Program Clock Reference: 33-bit base on 90 kHz plus 9-bit extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pcr {
    pub base: u64,
    pub ext: u16,
}

impl Pcr {
    /// Full 27 MHz tick count.
    pub fn value(&self) -> u64 {
        self.base * 300 + self.ext as u64
    }
}

/// Decoded adaptation field. `pcr`/`opcr` are `None` when the
/// corresponding flag is absent; a zero PCR is a present PCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AdaptationField {
    pub length: u8,
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    pub pcr: Option<Pcr>,
    pub opcr: Option<Pcr>,
    pub splice_countdown: Option<i8>,
}

impl AdaptationField {
    /// Decode from the bytes following the 4-byte packet header. The
    /// first byte is `adaptation_field_length`; a zero length is a
    /// valid, empty field.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let length = *data.first()?;
        let mut af = AdaptationField {
            length,
            ..Default::default()
        };
        if length == 0 {
            return Some(af);
        }
        let body = data.get(1..1 + length as usize)?;

        let mut r = BitReader::endian(body, BigEndian);
        af.discontinuity = r.read_bit().ok()?;
        af.random_access = r.read_bit().ok()?;
        af.es_priority = r.read_bit().ok()?;
        let pcr_flag = r.read_bit().ok()?;
        let opcr_flag = r.read_bit().ok()?;
        let splice_flag = r.read_bit().ok()?;
        let _private_flag = r.read_bit().ok()?;
        let _ext_flag = r.read_bit().ok()?;

        if pcr_flag {
            af.pcr = Some(read_pcr(&mut r)?);
        }
        if opcr_flag {
            af.opcr = Some(read_pcr(&mut r)?);
        }
        if splice_flag {
            af.splice_countdown = Some(r.read::<8, u8>().ok()? as i8);
        }
        Some(af)
    }
}

fn read_pcr<R: std::io::Read>(r: &mut BitReader<R, BigEndian>) -> Option<Pcr> {
    let base = r.read::<33, u64>().ok()?;
    r.skip(6).ok()?; // reserved
    let ext = r.read::<9, u16>().ok()?;
    Some(Pcr { base, ext })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_pcr(base: u64, ext: u16) -> [u8; 6] {
        let v = (base << 15) | (0x3F << 9) | ext as u64;
        let b = v.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }

    #[test]
    fn pcr_round_trip() {
        let mut data = vec![7u8, 0x10]; // length, PCR_flag
        data.extend_from_slice(&encode_pcr(0x1_2345_6789, 0x1AB));
        let af = AdaptationField::parse(&data).unwrap();
        let pcr = af.pcr.unwrap();
        assert_eq!(pcr.base, 0x1_2345_6789);
        assert_eq!(pcr.ext, 0x1AB);
        assert_eq!(pcr.value(), 0x1_2345_6789 * 300 + 0x1AB);
        assert!(af.opcr.is_none());
    }

    #[test]
    fn no_pcr_flag_means_no_pcr() {
        // discontinuity + random access set, PCR flag clear
        let af = AdaptationField::parse(&[1, 0xC0]).unwrap();
        assert!(af.discontinuity);
        assert!(af.random_access);
        assert_eq!(af.pcr, None);
    }

    #[test]
    fn zero_length_field() {
        let af = AdaptationField::parse(&[0]).unwrap();
        assert_eq!(af.length, 0);
        assert_eq!(af.pcr, None);
    }

    #[test]
    fn splice_countdown_is_signed() {
        let af = AdaptationField::parse(&[2, 0x04, 0xFF]).unwrap();
        assert_eq!(af.splice_countdown, Some(-1));
    }

    #[test]
    fn truncated_field_rejected() {
        assert!(AdaptationField::parse(&[7, 0x10, 0x00]).is_none());
    }
}
