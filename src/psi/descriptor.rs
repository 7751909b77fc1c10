//! Descriptor loop walking: `(tag, length, payload)` entries.

use bytes::Bytes;
use serde::Serialize;

use crate::cursor::Cursor;
use crate::psi::PsiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub tag: u8,
    #[serde(skip)]
    pub data: Bytes,
}

impl Descriptor {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Walk a descriptor loop of `loop_len` bytes. Unrecognized tags are
/// carried as raw payloads; a length that would overrun the loop is a
/// malformed section and aborts the decode of this section only.
pub fn parse_loop(cur: &mut Cursor<'_>, loop_len: usize) -> Result<Vec<Descriptor>, PsiError> {
    let mut inner = cur.slice(loop_len)?;
    let mut out = Vec::new();
    while !inner.is_empty() {
        let tag = inner.u8()?;
        let len = inner.u8()? as usize;
        out.push(Descriptor {
            tag,
            data: inner.take(len)?,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_unknown_tags_by_length() {
        let buf = [0x0A, 0x04, b'e', b'n', b'g', 0x00, 0xC3, 0x01, 0x55];
        let mut cur = Cursor::new(&buf);
        let descs = parse_loop(&mut cur, buf.len()).unwrap();
        assert_eq!(descs.len(), 2);
        assert_eq!(descs[0].tag, 0x0A);
        assert_eq!(&descs[0].data[..], b"eng\0");
        assert_eq!(descs[1].tag, 0xC3);
        assert_eq!(descs[1].len(), 1);
    }

    #[test]
    fn overrunning_length_is_malformed() {
        let buf = [0x0A, 0x7F, 0x00];
        let mut cur = Cursor::new(&buf);
        assert!(parse_loop(&mut cur, buf.len()).is_err());
    }

    #[test]
    fn empty_loop() {
        let mut cur = Cursor::new(&[]);
        assert!(parse_loop(&mut cur, 0).unwrap().is_empty());
    }
}
