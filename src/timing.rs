//! System Time Clock recovery and PCR/PTS interval analysis.
//!
//! The stream itself is the timebase: the STC at any byte position is
//! the last PCR of the reference PID plus a byte-rate extrapolation
//! using the rate implied by the last two PCRs. All intervals are
//! signed modular differences so counter wraparound never shows up as
//! a huge jump.

use std::collections::HashMap;

use serde::Serialize;

use crate::adaptation::Pcr;
use crate::constants::{PCR_MAX, PTS_MAX, STC_US};

/// Signed difference `cur - prev` on a clock of period `modulus`,
/// mapped into `[-modulus/2, modulus/2)`.
pub fn wrapping_delta(cur: u64, prev: u64, modulus: u64) -> i64 {
    let d = (cur % modulus + modulus - prev % modulus) % modulus;
    if d >= modulus / 2 {
        d as i64 - modulus as i64
    } else {
        d as i64
    }
}

/// Analysis of one PCR arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PcrReport {
    pub pid: u16,
    /// Full 27 MHz value, `base * 300 + ext`.
    pub pcr: u64,
    pub base: u64,
    pub ext: u16,
    /// Ticks since the previous PCR on this PID, wrap-corrected.
    pub interval: Option<i64>,
    /// Deviation of this PCR from the byte-rate prediction, in
    /// nanoseconds. Needs two prior PCRs on the PID.
    pub jitter_ns: Option<f64>,
    /// The raw counter wrapped between the previous PCR and this one.
    pub wrapped: bool,
}

/// Analysis of one PTS/DTS arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PtsReport {
    pub pid: u16,
    pub pts: u64,
    pub dts: Option<u64>,
    /// 90 kHz ticks since the previous PTS on this PID, wrap-corrected.
    pub interval: Option<i64>,
    /// `PTS - STC` in milliseconds, when an STC is available.
    pub pts_minus_stc_ms: Option<f64>,
    pub dts_minus_stc_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct PcrTrack {
    last_pcr: u64,
    last_byte_pos: u64,
    /// 27 MHz ticks per stream byte, from the last two PCRs.
    ticks_per_byte: Option<f64>,
}

/// Per-PID PCR and PTS trackers plus the stream-wide STC.
#[derive(Debug, Default)]
pub struct TimingEngine {
    pcr_tracks: HashMap<u16, PcrTrack>,
    /// First PID that carried a PCR; it drives the STC.
    reference_pid: Option<u16>,
    last_pts: HashMap<u16, u64>,
}

impl TimingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference_pid(&self) -> Option<u16> {
        self.reference_pid
    }

    /// Current STC at `byte_pos`, extrapolated from the reference PID.
    pub fn stc(&self, byte_pos: u64) -> Option<u64> {
        let track = self.pcr_tracks.get(&self.reference_pid?)?;
        let tpb = track.ticks_per_byte?;
        let elapsed = (byte_pos.saturating_sub(track.last_byte_pos)) as f64 * tpb;
        Some((track.last_pcr + elapsed as u64) % PCR_MAX)
    }

    pub fn on_pcr(&mut self, pid: u16, pcr: Pcr, byte_pos: u64) -> PcrReport {
        let value = pcr.value();
        self.reference_pid.get_or_insert(pid);

        let prev = self.pcr_tracks.get(&pid).copied();
        let (interval, jitter_ns, wrapped, ticks_per_byte) = match prev {
            None => (None, None, false, None),
            Some(track) => {
                let interval = wrapping_delta(value, track.last_pcr, PCR_MAX);
                let wrapped = value < track.last_pcr && interval > 0;
                let byte_delta = byte_pos.saturating_sub(track.last_byte_pos);
                let jitter_ns = track.ticks_per_byte.map(|tpb| {
                    let expected = byte_delta as f64 * tpb;
                    (interval as f64 - expected) * 1000.0 / STC_US as f64
                });
                let ticks_per_byte = (interval > 0 && byte_delta > 0)
                    .then(|| interval as f64 / byte_delta as f64);
                (Some(interval), jitter_ns, wrapped, ticks_per_byte)
            }
        };

        self.pcr_tracks.insert(
            pid,
            PcrTrack {
                last_pcr: value,
                last_byte_pos: byte_pos,
                ticks_per_byte: ticks_per_byte.or(prev.and_then(|t| t.ticks_per_byte)),
            },
        );

        PcrReport {
            pid,
            pcr: value,
            base: pcr.base,
            ext: pcr.ext,
            interval,
            jitter_ns,
            wrapped,
        }
    }

    /// Reset the rate model on a signalled discontinuity so the jump is
    /// not folded into the byte-rate estimate.
    pub fn on_discontinuity(&mut self, pid: u16) {
        if let Some(track) = self.pcr_tracks.get_mut(&pid) {
            track.ticks_per_byte = None;
        }
    }

    pub fn on_pts(&mut self, pid: u16, pts: u64, dts: Option<u64>, byte_pos: u64) -> PtsReport {
        let interval = self
            .last_pts
            .insert(pid, pts)
            .map(|prev| wrapping_delta(pts, prev, PTS_MAX));

        let stc90 = self.stc(byte_pos).map(|stc| stc / 300);
        let to_ms =
            |ts: u64| stc90.map(|stc| wrapping_delta(ts, stc, PTS_MAX) as f64 / 90.0);

        PtsReport {
            pid,
            pts,
            dts,
            interval,
            pts_minus_stc_ms: to_ms(pts),
            dts_minus_stc_ms: dts.and_then(to_ms),
        }
    }
}
