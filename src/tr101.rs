//! TR 101 290 style error classification.
//!
//! Each packet gets an [`ErrorReport`]; the monitor keeps the cross
//! packet state (sync run length, table intervals, CAT presence) and
//! cumulative [`ErrorCounters`]. A priority 1 error on a packet
//! suppresses that packet's priority 2 findings.

use std::collections::HashMap;

use serde::Serialize;

use crate::constants::*;
use crate::packet::TsHeader;
use crate::pid::{CcCheck, PidClass, PidRegistry};
use crate::timing::{PcrReport, PtsReport};

/// Sync lock abandoned after too many consecutive bad sync bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sync lost for {consecutive} consecutive packets")]
pub struct SyncLoss {
    pub consecutive: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CcError {
    pub expected: u8,
    pub found: u8,
    pub lost: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PatErrorKind {
    /// No PAT section for longer than 0.5 s.
    IntervalExceeded { interval_ms: f64 },
    /// PID 0x0000 carried a section with a foreign table_id.
    WrongTableId { table_id: u8 },
    /// PID 0x0000 packet had scrambling_control set.
    Scrambled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PmtErrorKind {
    IntervalExceeded { pid: u16, interval_ms: f64 },
    Scrambled { pid: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrcMismatch {
    pub pid: u16,
    pub table_id: u8,
    pub calculated: u32,
    pub found: u32,
}

/// Findings for a single packet. Default is all clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorReport {
    // priority 1
    pub ts_sync_loss: bool,
    pub sync_byte_error: bool,
    pub pat_error: Option<PatErrorKind>,
    pub continuity_count_error: Option<CcError>,
    pub pmt_error: Option<PmtErrorKind>,
    /// Referenced PID never seen within the timeout.
    pub pid_error: Option<u16>,
    // priority 2
    pub transport_error: bool,
    pub crc_error: Option<CrcMismatch>,
    /// PCR interval in ms when it exceeded 100 ms.
    pub pcr_repetition_error: Option<f64>,
    /// Unsignalled PCR jump (or signalled jump that never happened),
    /// interval in ms.
    pub pcr_discontinuity_error: Option<f64>,
    /// PCR deviation from the byte-rate model beyond the 27-tick
    /// (1 us) tolerance, in ns.
    pub pcr_accuracy_error: Option<f64>,
    /// PTS gap in ms when it exceeded 700 ms.
    pub pts_error: Option<f64>,
    pub cat_error: bool,
}

impl ErrorReport {
    pub fn has_priority1(&self) -> bool {
        self.ts_sync_loss
            || self.sync_byte_error
            || self.pat_error.is_some()
            || self.continuity_count_error.is_some()
            || self.pmt_error.is_some()
            || self.pid_error.is_some()
    }

    pub fn has_priority2(&self) -> bool {
        self.transport_error
            || self.crc_error.is_some()
            || self.pcr_repetition_error.is_some()
            || self.pcr_discontinuity_error.is_some()
            || self.pcr_accuracy_error.is_some()
            || self.pts_error.is_some()
            || self.cat_error
    }

    pub fn is_clean(&self) -> bool {
        !self.has_priority1() && !self.has_priority2()
    }
}

/// Running totals over the whole session, one counter per check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCounters {
    pub ts_sync_loss: u64,
    pub sync_byte_error: u64,
    pub pat_error: u64,
    pub continuity_count_error: u64,
    pub pmt_error: u64,
    pub pid_error: u64,
    pub transport_error: u64,
    pub crc_error: u64,
    pub pcr_repetition_error: u64,
    pub pcr_discontinuity_error: u64,
    pub pcr_accuracy_error: u64,
    pub pts_error: u64,
    pub cat_error: u64,
}

fn ticks_to_ms(ticks: i64) -> f64 {
    ticks as f64 / STC_MS as f64
}

/// An unsignalled PCR step larger than this is a discontinuity.
const PCR_JUMP_TICKS: i64 = STC_HZ as i64;

#[derive(Debug, Default)]
struct TableClock {
    last_seen: Option<u64>,
    /// Timeout reported and not yet cleared by a fresh section.
    flagged: bool,
}

/// Cross-packet classifier state.
#[derive(Debug, Default)]
pub struct Tr101Monitor {
    consecutive_sync_errors: u64,
    pat: TableClock,
    pmt: HashMap<u16, TableClock>,
    cat_seen: bool,
    pub counters: ErrorCounters,
}

impl Tr101Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account a sync byte check. Errors accumulate until either a good
    /// packet resets the run or the run exceeds the sync loss threshold.
    pub fn on_sync(&mut self, report: &mut ErrorReport, ok: bool) -> Result<(), SyncLoss> {
        if ok {
            self.consecutive_sync_errors = 0;
            return Ok(());
        }
        self.consecutive_sync_errors += 1;
        report.sync_byte_error = true;
        if self.consecutive_sync_errors >= 2 {
            report.ts_sync_loss = true;
        }
        if self.consecutive_sync_errors > SYNC_LOSS_THRESHOLD {
            return Err(SyncLoss {
                consecutive: self.consecutive_sync_errors,
            });
        }
        Ok(())
    }

    pub fn on_header(&mut self, report: &mut ErrorReport, header: &TsHeader, class: PidClass) {
        if header.transport_error {
            report.transport_error = true;
        }
        if header.scrambling_control != 0 {
            match class {
                PidClass::Pat => report.pat_error = Some(PatErrorKind::Scrambled),
                PidClass::Pmt => {
                    report.pmt_error = Some(PmtErrorKind::Scrambled { pid: header.pid })
                }
                _ if !self.cat_seen => report.cat_error = true,
                _ => {}
            }
        }
    }

    pub fn on_continuity(&mut self, report: &mut ErrorReport, check: CcCheck) {
        if let CcCheck::Error {
            expected,
            found,
            lost,
        } = check
        {
            report.continuity_count_error = Some(CcError {
                expected,
                found,
                lost,
            });
        }
    }

    /// `signalled` is the adaptation field discontinuity_indicator.
    pub fn on_pcr(&mut self, report: &mut ErrorReport, pcr: &PcrReport, signalled: bool) {
        let Some(interval) = pcr.interval else {
            return;
        };
        let jumped = interval < 0 || interval > PCR_JUMP_TICKS;
        if jumped != signalled {
            report.pcr_discontinuity_error = Some(ticks_to_ms(interval));
        }
        if jumped || signalled {
            return;
        }
        if interval > PCR_REPETITION_MAX as i64 {
            report.pcr_repetition_error = Some(ticks_to_ms(interval));
        }
        if let Some(ns) = pcr.jitter_ns {
            let ticks = ns * STC_US as f64 / 1000.0;
            if ticks.abs() > PCR_ACCURACY_TICKS as f64 {
                report.pcr_accuracy_error = Some(ns);
            }
        }
    }

    pub fn on_pts(&mut self, report: &mut ErrorReport, pts: &PtsReport) {
        if let Some(interval) = pts.interval {
            if interval.unsigned_abs() > PTS_REPETITION_MAX {
                report.pts_error = Some(interval as f64 / 90.0);
            }
        }
    }

    /// Account a section completing on `pid`. Interval checks only run
    /// once an STC exists.
    pub fn on_section(
        &mut self,
        report: &mut ErrorReport,
        pid: u16,
        class: PidClass,
        table_id: u8,
        stc: Option<u64>,
    ) {
        match class {
            PidClass::Pat => {
                if table_id != 0x00 {
                    report.pat_error = Some(PatErrorKind::WrongTableId { table_id });
                    return;
                }
                if let Some(ms) = Self::clock_section(&mut self.pat, stc, PAT_INTERVAL_MAX) {
                    report.pat_error = Some(PatErrorKind::IntervalExceeded { interval_ms: ms });
                }
            }
            PidClass::Cat => {
                if table_id != 0x01 {
                    report.cat_error = true;
                } else {
                    self.cat_seen = true;
                }
            }
            PidClass::Pmt if table_id == 0x02 => {
                let clock = self.pmt.entry(pid).or_default();
                if let Some(ms) = Self::clock_section(clock, stc, PMT_INTERVAL_MAX) {
                    report.pmt_error = Some(PmtErrorKind::IntervalExceeded {
                        pid,
                        interval_ms: ms,
                    });
                }
            }
            _ => {}
        }
    }

    fn clock_section(clock: &mut TableClock, stc: Option<u64>, max: u64) -> Option<f64> {
        let prev = clock.last_seen;
        if stc.is_some() {
            clock.last_seen = stc;
        }
        clock.flagged = false;
        let interval = crate::timing::wrapping_delta(stc?, prev?, PCR_MAX);
        (interval > max as i64).then(|| ticks_to_ms(interval))
    }

    /// Per-packet timeout sweep: overdue PAT/PMT sections and referenced
    /// PIDs that never appeared. Each condition reports once and stays
    /// quiet until cleared.
    pub fn on_tick(&mut self, report: &mut ErrorReport, stc: u64, registry: &mut PidRegistry) {
        if let Some(ms) = Self::clock_overdue(&mut self.pat, stc, PAT_INTERVAL_MAX) {
            report.pat_error = Some(PatErrorKind::IntervalExceeded { interval_ms: ms });
        }
        for (&pid, clock) in self.pmt.iter_mut() {
            if let Some(ms) = Self::clock_overdue(clock, stc, PMT_INTERVAL_MAX) {
                report.pmt_error = Some(PmtErrorKind::IntervalExceeded {
                    pid,
                    interval_ms: ms,
                });
                // one PMT per packet; the rest stay unflagged and
                // surface on the following sweeps
                break;
            }
        }
        if let Some(pid) = registry.next_timed_out_reference(stc, PID_TIMEOUT) {
            report.pid_error = Some(pid);
        }
    }

    fn clock_overdue(clock: &mut TableClock, stc: u64, max: u64) -> Option<f64> {
        let last = clock.last_seen?;
        if clock.flagged {
            return None;
        }
        let elapsed = crate::timing::wrapping_delta(stc, last, PCR_MAX);
        if elapsed > max as i64 {
            clock.flagged = true;
            Some(ticks_to_ms(elapsed))
        } else {
            None
        }
    }

    pub fn crc_mismatch(&mut self, report: &mut ErrorReport, mismatch: CrcMismatch) {
        report.crc_error = Some(mismatch);
    }

    /// Apply priority suppression and fold the packet into the totals.
    pub fn finalize(&mut self, report: &mut ErrorReport) {
        if report.has_priority1() {
            report.transport_error = false;
            report.crc_error = None;
            report.pcr_repetition_error = None;
            report.pcr_discontinuity_error = None;
            report.pcr_accuracy_error = None;
            report.pts_error = None;
            report.cat_error = false;
        }

        let c = &mut self.counters;
        c.ts_sync_loss += report.ts_sync_loss as u64;
        c.sync_byte_error += report.sync_byte_error as u64;
        c.pat_error += report.pat_error.is_some() as u64;
        c.continuity_count_error += report.continuity_count_error.is_some() as u64;
        c.pmt_error += report.pmt_error.is_some() as u64;
        c.pid_error += report.pid_error.is_some() as u64;
        c.transport_error += report.transport_error as u64;
        c.crc_error += report.crc_error.is_some() as u64;
        c.pcr_repetition_error += report.pcr_repetition_error.is_some() as u64;
        c.pcr_discontinuity_error += report.pcr_discontinuity_error.is_some() as u64;
        c.pcr_accuracy_error += report.pcr_accuracy_error.is_some() as u64;
        c.pts_error += report.pts_error.is_some() as u64;
        c.cat_error += report.cat_error as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptation::Pcr;
    use crate::timing::TimingEngine;

    #[test]
    fn sync_run_escalates() {
        let mut mon = Tr101Monitor::new();
        let mut r = ErrorReport::default();
        assert!(mon.on_sync(&mut r, false).is_ok());
        assert!(r.sync_byte_error);
        assert!(!r.ts_sync_loss);
        let mut r = ErrorReport::default();
        assert!(mon.on_sync(&mut r, false).is_ok());
        assert!(r.ts_sync_loss);
        for _ in 0..8 {
            let mut r = ErrorReport::default();
            assert!(mon.on_sync(&mut r, false).is_ok());
        }
        let mut r = ErrorReport::default();
        assert_eq!(
            mon.on_sync(&mut r, false),
            Err(SyncLoss { consecutive: 11 })
        );
    }

    #[test]
    fn good_packet_resets_sync_run() {
        let mut mon = Tr101Monitor::new();
        let mut r = ErrorReport::default();
        mon.on_sync(&mut r, false).unwrap();
        mon.on_sync(&mut r, true).unwrap();
        let mut r = ErrorReport::default();
        mon.on_sync(&mut r, false).unwrap();
        assert!(!r.ts_sync_loss);
    }

    #[test]
    fn pat_interval_checked_on_section() {
        let mut mon = Tr101Monitor::new();
        let mut r = ErrorReport::default();
        mon.on_section(&mut r, PID_PAT, PidClass::Pat, 0x00, Some(0));
        mon.on_section(&mut r, PID_PAT, PidClass::Pat, 0x00, Some(400 * STC_MS));
        assert_eq!(r.pat_error, None);
        mon.on_section(&mut r, PID_PAT, PidClass::Pat, 0x00, Some(1000 * STC_MS));
        assert!(matches!(
            r.pat_error,
            Some(PatErrorKind::IntervalExceeded { .. })
        ));
    }

    #[test]
    fn foreign_table_on_pat_pid() {
        let mut mon = Tr101Monitor::new();
        let mut r = ErrorReport::default();
        mon.on_section(&mut r, PID_PAT, PidClass::Pat, 0x02, Some(0));
        assert_eq!(
            r.pat_error,
            Some(PatErrorKind::WrongTableId { table_id: 0x02 })
        );
    }

    #[test]
    fn pat_timeout_reports_once() {
        let mut mon = Tr101Monitor::new();
        let mut registry = PidRegistry::new();
        let mut r = ErrorReport::default();
        mon.on_section(&mut r, PID_PAT, PidClass::Pat, 0x00, Some(0));
        let mut r = ErrorReport::default();
        mon.on_tick(&mut r, 600 * STC_MS, &mut registry);
        assert!(r.pat_error.is_some());
        let mut r = ErrorReport::default();
        mon.on_tick(&mut r, 700 * STC_MS, &mut registry);
        assert_eq!(r.pat_error, None);
        // A fresh PAT rearms the timeout.
        let mut r = ErrorReport::default();
        mon.on_section(&mut r, PID_PAT, PidClass::Pat, 0x00, Some(800 * STC_MS));
        let mut r = ErrorReport::default();
        mon.on_tick(&mut r, 1400 * STC_MS, &mut registry);
        assert!(r.pat_error.is_some());
    }

    #[test]
    fn overdue_pmts_surface_on_consecutive_packets() {
        let mut mon = Tr101Monitor::new();
        let mut registry = PidRegistry::new();
        let mut r = ErrorReport::default();
        mon.on_section(&mut r, 0x100, PidClass::Pmt, 0x02, Some(0));
        mon.on_section(&mut r, 0x200, PidClass::Pmt, 0x02, Some(0));

        let pid_at = |mon: &mut Tr101Monitor, registry: &mut PidRegistry| {
            let mut r = ErrorReport::default();
            mon.on_tick(&mut r, 600 * STC_MS, registry);
            match r.pmt_error {
                Some(PmtErrorKind::IntervalExceeded { pid, .. }) => Some(pid),
                Some(other) => panic!("unexpected {other:?}"),
                None => None,
            }
        };
        let first = pid_at(&mut mon, &mut registry).expect("first overdue PMT");
        let second = pid_at(&mut mon, &mut registry).expect("second overdue PMT");
        assert_ne!(first, second);
        assert!(matches!(first, 0x100 | 0x200));
        assert!(matches!(second, 0x100 | 0x200));
        assert_eq!(pid_at(&mut mon, &mut registry), None);
    }

    #[test]
    fn simultaneous_missing_pids_each_reported() {
        let mut mon = Tr101Monitor::new();
        let mut registry = PidRegistry::new();
        registry.reference(0x101, 0);
        registry.reference(0x102, 0);

        let mut r = ErrorReport::default();
        mon.on_tick(&mut r, PID_TIMEOUT + 1, &mut registry);
        assert_eq!(r.pid_error, Some(0x101));
        let mut r = ErrorReport::default();
        mon.on_tick(&mut r, PID_TIMEOUT + 2, &mut registry);
        assert_eq!(r.pid_error, Some(0x102));
        let mut r = ErrorReport::default();
        mon.on_tick(&mut r, PID_TIMEOUT + 3, &mut registry);
        assert_eq!(r.pid_error, None);
    }

    #[test]
    fn pcr_checks() {
        let mut mon = Tr101Monitor::new();
        let mut timing = TimingEngine::new();
        let pcr = |t: u64| Pcr {
            base: t / 300,
            ext: (t % 300) as u16,
        };

        let mut r = ErrorReport::default();
        let rep = timing.on_pcr(0x100, pcr(0), 0);
        mon.on_pcr(&mut r, &rep, false);
        // 150 ms gap: repetition error
        let rep = timing.on_pcr(0x100, pcr(150 * STC_MS), 188 * 100);
        mon.on_pcr(&mut r, &rep, false);
        assert!(r.pcr_repetition_error.is_some());

        // 5 s unsignalled jump: discontinuity error
        let mut r = ErrorReport::default();
        let rep = timing.on_pcr(0x100, pcr(5150 * STC_MS), 188 * 200);
        mon.on_pcr(&mut r, &rep, false);
        assert!(r.pcr_discontinuity_error.is_some());

        // the same jump signalled is clean
        let mut r = ErrorReport::default();
        let rep = timing.on_pcr(0x100, pcr(11_000 * STC_MS), 188 * 300);
        mon.on_pcr(&mut r, &rep, true);
        assert_eq!(r.pcr_discontinuity_error, None);
    }

    #[test]
    fn priority1_suppresses_priority2() {
        let mut mon = Tr101Monitor::new();
        let mut r = ErrorReport {
            transport_error: true,
            continuity_count_error: Some(CcError {
                expected: 1,
                found: 3,
                lost: 2,
            }),
            ..Default::default()
        };
        mon.finalize(&mut r);
        assert!(!r.transport_error);
        assert!(r.continuity_count_error.is_some());
        assert_eq!(mon.counters.transport_error, 0);
        assert_eq!(mon.counters.continuity_count_error, 1);
    }

    #[test]
    fn scrambled_es_without_cat() {
        let mut mon = Tr101Monitor::new();
        let header = TsHeader {
            transport_error: false,
            payload_unit_start: false,
            priority: false,
            pid: 0x101,
            scrambling_control: 2,
            adaptation_field_control: 1,
            continuity_counter: 0,
        };
        let mut r = ErrorReport::default();
        mon.on_header(&mut r, &header, PidClass::Video);
        assert!(r.cat_error);

        mon.on_section(&mut ErrorReport::default(), PID_CAT, PidClass::Cat, 0x01, None);
        let mut r = ErrorReport::default();
        mon.on_header(&mut r, &header, PidClass::Video);
        assert!(!r.cat_error);
    }
}
