//! Program/Track data model built from PAT and PMT.

use serde::Serialize;

/// Broad role of an elementary stream, derived from `stream_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

impl TrackKind {
    pub fn from_stream_type(stream_type: u8) -> Self {
        match stream_type {
            0x01 | 0x02 | 0x10 | 0x1B | 0x20 | 0x24 | 0x42 | 0xD1 | 0xEA => TrackKind::Video,
            0x03 | 0x04 | 0x0F | 0x11 | 0x1C | 0x81 | 0x83 | 0x87 | 0x8A => TrackKind::Audio,
            _ => TrackKind::Other,
        }
    }
}

/// One elementary stream, owned by exactly one [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Track {
    pub pid: u16,
    pub stream_type: u8,
    pub kind: TrackKind,
}

impl Track {
    pub fn new(pid: u16, stream_type: u8) -> Self {
        Self {
            pid,
            stream_type,
            kind: TrackKind::from_stream_type(stream_type),
        }
    }
}

/// A program from the PAT, completed once its PMT has been decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub program_number: u16,
    pub pmt_pid: u16,
    pub pcr_pid: Option<u16>,
    /// PMT seen and decoded.
    pub parsed: bool,
    pub pmt_version: Option<u8>,
    pub tracks: Vec<Track>,
}

impl Program {
    pub fn new(program_number: u16, pmt_pid: u16) -> Self {
        Self {
            program_number,
            pmt_pid,
            pcr_pid: None,
            parsed: false,
            pmt_version: None,
            tracks: Vec::new(),
        }
    }

    pub fn track(&self, pid: u16) -> Option<&Track> {
        self.tracks.iter().find(|t| t.pid == pid)
    }

    /// Replace the track list from a fresh PMT, updating matching PIDs
    /// in place so repeated tables do not duplicate entries.
    pub fn update_tracks(&mut self, entries: impl IntoIterator<Item = Track>) {
        let mut next: Vec<Track> = Vec::new();
        for entry in entries {
            if let Some(existing) = next.iter_mut().find(|t| t.pid == entry.pid) {
                *existing = entry;
            } else {
                next.push(entry);
            }
        }
        self.tracks = next;
    }
}
