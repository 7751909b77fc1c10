//! Windowed bitrate accounting on the STC timebase.
//!
//! Packets are counted per PID and per group (everything, PSI/SI,
//! null). When the STC advances past the configured window the counts
//! convert to bits per second using the actual elapsed ticks, so a
//! late rollover does not inflate the rates.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::{PCR_MAX, STC_HZ, STC_MS, WINDOW_MS_MAX, WINDOW_MS_MIN};

/// Rates for one elapsed window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSnapshot {
    /// Actual measured span, in milliseconds of STC time.
    pub interval_ms: f64,
    /// Whole-stream rate in bits per second, null packets included.
    pub system_bps: f64,
    pub psi_si_bps: f64,
    pub null_bps: f64,
    /// Per-PID rates in ascending PID order.
    pub pids: Vec<PidRate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PidRate {
    pub pid: u16,
    pub bps: f64,
}

impl RateSnapshot {
    pub fn pid_bps(&self, pid: u16) -> Option<f64> {
        self.pids.iter().find(|r| r.pid == pid).map(|r| r.bps)
    }

    /// Aggregate rate of a set of PIDs, e.g. one program's tracks plus
    /// its PMT PID.
    pub fn group_bps(&self, pids: impl IntoIterator<Item = u16>) -> f64 {
        pids.into_iter().filter_map(|p| self.pid_bps(p)).sum()
    }
}

/// Accumulates packet counts until one window of STC time has passed.
#[derive(Debug)]
pub struct RateWindow {
    window_ticks: u64,
    packet_bits: u64,
    started_at: Option<u64>,
    pid_packets: BTreeMap<u16, u64>,
    total_packets: u64,
    psi_packets: u64,
    null_packets: u64,
}

impl RateWindow {
    /// `window_ms` must lie in [`WINDOW_MS_MIN`]..=[`WINDOW_MS_MAX`];
    /// `packet_size` is the transmitted size (188 or 204).
    pub fn new(window_ms: u64, packet_size: usize) -> Self {
        debug_assert!((WINDOW_MS_MIN..=WINDOW_MS_MAX).contains(&window_ms));
        Self {
            window_ticks: window_ms * STC_MS,
            packet_bits: packet_size as u64 * 8,
            started_at: None,
            pid_packets: BTreeMap::new(),
            total_packets: 0,
            psi_packets: 0,
            null_packets: 0,
        }
    }

    /// Count one packet. Returns a snapshot when the window has elapsed;
    /// the triggering packet opens the next window. Packets arriving
    /// before any STC exists are counted and attributed to the window
    /// that eventually opens.
    pub fn on_packet(
        &mut self,
        pid: u16,
        is_psi_si: bool,
        is_null: bool,
        stc: Option<u64>,
    ) -> Option<RateSnapshot> {
        let mut snapshot = None;
        if let Some(stc) = stc {
            if let Some(start) = self.started_at {
                // modular distance on the PCR clock, not on u64
                let elapsed = (stc % PCR_MAX + PCR_MAX - start % PCR_MAX) % PCR_MAX;
                if elapsed >= self.window_ticks {
                    snapshot = Some(self.take_snapshot(elapsed));
                    self.started_at = Some(stc);
                }
            } else {
                self.started_at = Some(stc);
            }
        }

        *self.pid_packets.entry(pid).or_insert(0) += 1;
        self.total_packets += 1;
        if is_psi_si {
            self.psi_packets += 1;
        }
        if is_null {
            self.null_packets += 1;
        }
        snapshot
    }

    fn take_snapshot(&mut self, elapsed: u64) -> RateSnapshot {
        let to_bps = |packets: u64| {
            packets as f64 * self.packet_bits as f64 * STC_HZ as f64 / elapsed as f64
        };
        let snapshot = RateSnapshot {
            interval_ms: elapsed as f64 / STC_MS as f64,
            system_bps: to_bps(self.total_packets),
            psi_si_bps: to_bps(self.psi_packets),
            null_bps: to_bps(self.null_packets),
            pids: self
                .pid_packets
                .iter()
                .map(|(&pid, &n)| PidRate {
                    pid,
                    bps: to_bps(n),
                })
                .collect(),
        };
        self.pid_packets.clear();
        self.total_packets = 0;
        self.psi_packets = 0;
        self.null_packets = 0;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WINDOW_MS_DEFAULT;

    #[test]
    fn stc_wrap_inside_window() {
        let mut w = RateWindow::new(WINDOW_MS_DEFAULT, 188);
        let start = PCR_MAX - 500 * STC_MS;
        assert!(w.on_packet(0x101, false, false, Some(start)).is_none());
        // 500 ms later the counter has wrapped; the window stays open
        assert!(w.on_packet(0x101, false, false, Some(0)).is_none());
        let snap = w
            .on_packet(0x101, false, false, Some(500 * STC_MS))
            .expect("rollover");
        assert!((snap.interval_ms - 1000.0).abs() < 1e-9, "{}", snap.interval_ms);
        assert_eq!(snap.pid_bps(0x101), Some(2.0 * 188.0 * 8.0));
    }

    #[test]
    fn one_second_window_exact_rate() {
        let mut w = RateWindow::new(WINDOW_MS_DEFAULT, 188);
        let mut snap = None;
        // 1000 packets spread over exactly one second of STC
        for n in 0..=1000u64 {
            let stc = n * 27_000_000 / 1000;
            snap = w.on_packet(0x101, false, false, Some(stc));
            if snap.is_some() {
                break;
            }
        }
        let snap = snap.expect("window must roll over");
        assert_eq!(snap.system_bps, 1000.0 * 188.0 * 8.0);
        assert_eq!(snap.pid_bps(0x101), Some(1000.0 * 188.0 * 8.0));
        assert_eq!(snap.null_bps, 0.0);
    }

    #[test]
    fn groups_split_by_class() {
        let mut w = RateWindow::new(WINDOW_MS_DEFAULT, 188);
        let mut snap = None;
        for n in 0..=900u64 {
            let stc = n * 30_000;
            snap = snap.or(match n % 3 {
                0 => w.on_packet(0x000, true, false, Some(stc)),
                1 => w.on_packet(0x101, false, false, Some(stc)),
                _ => w.on_packet(0x1FFF, false, true, Some(stc)),
            });
        }
        let snap = snap.expect("window must roll over");
        assert!(snap.psi_si_bps > 0.0);
        assert!(snap.null_bps > 0.0);
        let sum = snap.pids.iter().map(|r| r.bps).sum::<f64>();
        assert!((sum - snap.system_bps).abs() < 1.0);
        // program-style aggregation over a PID set
        let grouped = snap.group_bps([0x000, 0x101]);
        let expected = snap.pid_bps(0x000).unwrap() + snap.pid_bps(0x101).unwrap();
        assert_eq!(grouped, expected);
    }

    #[test]
    fn no_stc_means_no_rollover() {
        let mut w = RateWindow::new(WINDOW_MS_DEFAULT, 188);
        for _ in 0..10_000 {
            assert!(w.on_packet(0x101, false, false, None).is_none());
        }
        // counts survive until the clock appears
        assert!(w.on_packet(0x101, false, false, Some(0)).is_none());
        let snap = w
            .on_packet(0x101, false, false, Some(27_000_000))
            .expect("rollover");
        assert_eq!(snap.pid_bps(0x101), Some(10_001.0 * 188.0 * 8.0));
    }

    #[test]
    fn window_resets_after_snapshot() {
        let mut w = RateWindow::new(WINDOW_MS_DEFAULT, 188);
        w.on_packet(0x101, false, false, Some(0));
        w.on_packet(0x101, false, false, Some(27_000_000)).unwrap();
        assert!(w.on_packet(0x101, false, false, Some(27_100_000)).is_none());
    }
}
