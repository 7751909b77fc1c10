//! Per-PID state registry: classification, continuity counters and
//! section reassembly buffers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::*;
use crate::packet::TsHeader;
use crate::psi::SectionBuffer;

/// What a PID carries, refined as PAT and PMTs are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PidClass {
    Pat,
    Cat,
    Tsdt,
    Nit,
    Sdt,
    Eit,
    Rst,
    Tdt,
    Dit,
    Sit,
    Pmt,
    Video,
    Audio,
    Other,
    Null,
    Unknown,
}

impl PidClass {
    /// PIDs whose payload is PSI/SI sections.
    pub fn is_psi_si(self) -> bool {
        matches!(
            self,
            PidClass::Pat
                | PidClass::Cat
                | PidClass::Tsdt
                | PidClass::Nit
                | PidClass::Sdt
                | PidClass::Eit
                | PidClass::Rst
                | PidClass::Tdt
                | PidClass::Dit
                | PidClass::Sit
                | PidClass::Pmt
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            PidClass::Pat => "PAT",
            PidClass::Cat => "CAT",
            PidClass::Tsdt => "TSDT",
            PidClass::Nit => "NIT",
            PidClass::Sdt => "SDT/BAT",
            PidClass::Eit => "EIT",
            PidClass::Rst => "RST",
            PidClass::Tdt => "TDT/TOT",
            PidClass::Dit => "DIT",
            PidClass::Sit => "SIT",
            PidClass::Pmt => "PMT",
            PidClass::Video => "Video",
            PidClass::Audio => "Audio",
            PidClass::Other => "Other",
            PidClass::Null => "Null",
            PidClass::Unknown => "Unknown",
        }
    }

    /// Class a PID has before any table references it, from the
    /// well-known PID assignments alone.
    pub fn well_known(pid: u16) -> Self {
        match pid {
            PID_PAT => PidClass::Pat,
            PID_CAT => PidClass::Cat,
            PID_TSDT => PidClass::Tsdt,
            PID_NIT => PidClass::Nit,
            PID_SDT => PidClass::Sdt,
            PID_EIT => PidClass::Eit,
            PID_RST => PidClass::Rst,
            PID_TDT => PidClass::Tdt,
            PID_DIT => PidClass::Dit,
            PID_SIT => PidClass::Sit,
            PID_NULL => PidClass::Null,
            _ => PidClass::Unknown,
        }
    }
}

/// Outcome of a continuity counter check for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcCheck {
    /// First packet seen on this PID.
    Initial,
    Ok,
    /// Same counter repeated with payload, allowed once.
    Duplicate,
    /// Null PID or a PID that never carries payload.
    Exempt,
    Error {
        expected: u8,
        found: u8,
        /// Packets missing, `(found - expected) mod 16`.
        lost: u8,
    },
}

/// Everything tracked per PID.
#[derive(Debug)]
pub struct PidState {
    pub pid: u16,
    pub class: PidClass,
    /// Set on the PCR PID of a program; independent of `class` since a
    /// track PID can carry the PCR too.
    pub is_pcr: bool,
    pub program_number: Option<u16>,
    pub stream_type: Option<u8>,
    pub section: Option<SectionBuffer>,
    pub packets: u64,
    pub bytes: u64,
    last_cc: Option<u8>,
    dup_seen: bool,
    payload_seen: bool,
}

impl PidState {
    fn new(pid: u16) -> Self {
        let class = PidClass::well_known(pid);
        Self {
            pid,
            class,
            is_pcr: false,
            program_number: None,
            stream_type: None,
            section: class.is_psi_si().then(SectionBuffer::new),
            packets: 0,
            bytes: 0,
            last_cc: None,
            dup_seen: false,
            payload_seen: false,
        }
    }

    /// Reclassify after a PAT or PMT reference. Allocates the section
    /// buffer when the PID becomes PSI/SI carrying.
    pub fn set_class(&mut self, class: PidClass) {
        self.class = class;
        if class.is_psi_si() {
            if self.section.is_none() {
                self.section = Some(SectionBuffer::new());
            }
        } else {
            self.section = None;
        }
    }

    /// `discontinuity` is the adaptation field flag for this packet; it
    /// licenses any counter jump.
    pub fn check_continuity(&mut self, header: &TsHeader, discontinuity: bool) -> CcCheck {
        if self.pid == PID_NULL {
            return CcCheck::Exempt;
        }
        let cc = header.continuity_counter;
        let has_payload = header.has_payload();
        if has_payload {
            self.payload_seen = true;
        }

        let Some(prev) = self.last_cc else {
            self.last_cc = Some(cc);
            return CcCheck::Initial;
        };

        if discontinuity {
            self.last_cc = Some(cc);
            self.dup_seen = false;
            return CcCheck::Ok;
        }

        if !has_payload {
            if !self.payload_seen {
                return CcCheck::Exempt;
            }
            // Without payload the counter must not advance.
            if cc == prev {
                return CcCheck::Ok;
            }
            self.last_cc = Some(cc);
            return CcCheck::Error {
                expected: prev,
                found: cc,
                lost: (cc.wrapping_sub(prev)) & 0x0F,
            };
        }

        let expected = (prev + 1) & 0x0F;
        if cc == expected {
            self.last_cc = Some(cc);
            self.dup_seen = false;
            CcCheck::Ok
        } else if cc == prev && !self.dup_seen {
            self.dup_seen = true;
            CcCheck::Duplicate
        } else {
            self.last_cc = Some(cc);
            self.dup_seen = false;
            CcCheck::Error {
                expected,
                found: cc,
                lost: (cc.wrapping_sub(expected)) & 0x0F,
            }
        }
    }
}

/// A PID referenced by PAT or PMT that the stream must eventually carry.
#[derive(Debug, Clone, Copy)]
pub struct ReferencedPid {
    /// STC tick at which the reference was decoded.
    pub referenced_at: u64,
    pub seen: bool,
    pub reported: bool,
}

/// All PIDs observed or referenced so far, in PID order.
#[derive(Debug, Default)]
pub struct PidRegistry {
    pids: BTreeMap<u16, PidState>,
    referenced: BTreeMap<u16, ReferencedPid>,
}

impl PidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_mut(&mut self, pid: u16) -> &mut PidState {
        let entry = self.pids.entry(pid).or_insert_with(|| PidState::new(pid));
        if let Some(r) = self.referenced.get_mut(&pid) {
            r.seen = true;
        }
        entry
    }

    pub fn state(&self, pid: u16) -> Option<&PidState> {
        self.pids.get(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PidState> {
        self.pids.values()
    }

    /// Record a PAT/PMT reference to `pid`. The first sighting of the
    /// reference starts the timeout clock; a PID already carried by the
    /// stream is marked seen immediately.
    pub fn reference(&mut self, pid: u16, stc: u64) {
        let seen = self.pids.contains_key(&pid);
        self.referenced
            .entry(pid)
            .and_modify(|r| r.seen |= seen)
            .or_insert(ReferencedPid {
                referenced_at: stc,
                seen,
                reported: false,
            });
    }

    /// Next referenced PID still absent after `timeout` ticks. Each PID
    /// is returned exactly once; PIDs beyond the first stay pending so
    /// later sweeps surface them instead of losing them.
    pub fn next_timed_out_reference(&mut self, stc: u64, timeout: u64) -> Option<u16> {
        for (&pid, r) in self.referenced.iter_mut() {
            if !r.seen && !r.reported && stc.wrapping_sub(r.referenced_at) > timeout {
                r.reported = true;
                return Some(pid);
            }
        }
        None
    }
}
