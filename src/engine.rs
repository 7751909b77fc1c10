//! Push-driven transport stream analysis.
//!
//! Feed packets one at a time with [`TsEngine::push_packet`]; each call
//! returns everything observed on that packet: header, adaptation
//! field, completed tables, timing reports, error findings and any
//! rate window that closed. The engine owns all cross-packet state
//! (PID registry, program model, STC recovery, TR 101 290 monitor).

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::adaptation::AdaptationField;
use crate::constants::*;
use crate::packet::{self, TsHeader};
use crate::pes;
use crate::pid::{CcCheck, PidClass, PidRegistry};
use crate::psi::{self, PsiError, Section, SectionBuffer, Table};
use crate::rate::{RateSnapshot, RateWindow};
use crate::timing::{PcrReport, PtsReport, TimingEngine};
use crate::tr101::{CrcMismatch, ErrorCounters, ErrorReport, SyncLoss, Tr101Monitor};
use crate::types::{Program, Track, TrackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("packet is {actual} bytes, engine configured for {expected}")]
    PacketSize { expected: usize, actual: usize },
    #[error("packet size {0} unsupported, must be 188 or 204")]
    UnsupportedPacketSize(usize),
    #[error("measurement window {0} ms outside {WINDOW_MS_MIN}..={WINDOW_MS_MAX} ms")]
    WindowOutOfRange(u64),
    #[error(transparent)]
    SyncLoss(#[from] SyncLoss),
    #[error("packet budget exhausted")]
    Finished,
}

/// Output filters. Filters narrow what is marked reportable; analysis
/// always covers the whole stream, and packets with error findings are
/// reportable regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filters {
    pub pid: Option<u16>,
    pub table_id: Option<u8>,
    pub program: Option<u16>,
    pub kind: Option<TrackKind>,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Transmitted packet size, 188 or 204. The 16 trailing parity
    /// bytes of a 204-byte stream are counted for rates but otherwise
    /// opaque.
    pub packet_size: usize,
    pub window_ms: u64,
    /// Packets to skip before analysis starts.
    pub start_offset: u64,
    /// Stop after analyzing this many packets.
    pub max_packets: Option<u64>,
    pub filters: Filters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            packet_size: TS_PACKET_SIZE,
            window_ms: WINDOW_MS_DEFAULT,
            start_offset: 0,
            max_packets: None,
            filters: Filters::default(),
        }
    }
}

/// Everything observed on one pushed packet.
#[derive(Debug, Clone, Serialize)]
pub struct PacketResult {
    /// Position in the pushed stream, first packet is 0.
    pub index: u64,
    /// Before `start_offset`: counted but not analyzed.
    pub skipped: bool,
    /// `None` when the sync byte was wrong.
    pub header: Option<TsHeader>,
    pub adaptation: Option<AdaptationField>,
    pub class: PidClass,
    pub is_pcr_pid: bool,
    pub pcr: Option<PcrReport>,
    pub pts: Option<PtsReport>,
    /// Tables whose final section completed in this packet.
    pub tables: Vec<Table>,
    pub errors: ErrorReport,
    /// Present when a rate window closed on this packet.
    pub rate: Option<RateSnapshot>,
    /// STC at the start of this packet, once recoverable.
    pub stc: Option<u64>,
    /// PAT and every referenced PMT decoded.
    pub psi_parse_finished: bool,
    pub reportable: bool,
}

impl PacketResult {
    fn skipped(index: u64) -> Self {
        Self {
            index,
            skipped: true,
            header: None,
            adaptation: None,
            class: PidClass::Unknown,
            is_pcr_pid: false,
            pcr: None,
            pts: None,
            tables: Vec::new(),
            errors: ErrorReport::default(),
            rate: None,
            stc: None,
            psi_parse_finished: false,
            reportable: false,
        }
    }
}

pub struct TsEngine {
    config: EngineConfig,
    registry: PidRegistry,
    timing: TimingEngine,
    monitor: Tr101Monitor,
    rate: RateWindow,
    programs: Vec<Program>,
    transport_stream_id: Option<u16>,
    pat_seen: bool,
    packet_index: u64,
    analyzed: u64,
    byte_pos: u64,
    finished: bool,
}

impl TsEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if config.packet_size != TS_PACKET_SIZE && config.packet_size != TS_PACKET_SIZE_RS {
            return Err(EngineError::UnsupportedPacketSize(config.packet_size));
        }
        if !(WINDOW_MS_MIN..=WINDOW_MS_MAX).contains(&config.window_ms) {
            return Err(EngineError::WindowOutOfRange(config.window_ms));
        }
        Ok(Self {
            rate: RateWindow::new(config.window_ms, config.packet_size),
            config,
            registry: PidRegistry::new(),
            timing: TimingEngine::new(),
            monitor: Tr101Monitor::new(),
            programs: Vec::new(),
            transport_stream_id: None,
            pat_seen: false,
            packet_index: 0,
            analyzed: 0,
            byte_pos: 0,
            finished: false,
        })
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn registry(&self) -> &PidRegistry {
        &self.registry
    }

    pub fn counters(&self) -> &ErrorCounters {
        &self.monitor.counters
    }

    pub fn transport_stream_id(&self) -> Option<u16> {
        self.transport_stream_id
    }

    /// PAT decoded and every program's PMT decoded.
    pub fn is_psi_parse_finished(&self) -> bool {
        self.pat_seen && self.programs.iter().all(|p| p.parsed)
    }

    pub fn push_packet(&mut self, data: &[u8]) -> Result<PacketResult, EngineError> {
        if self.finished {
            return Err(EngineError::Finished);
        }
        if data.len() != self.config.packet_size {
            return Err(EngineError::PacketSize {
                expected: self.config.packet_size,
                actual: data.len(),
            });
        }

        let index = self.packet_index;
        self.packet_index += 1;
        if index < self.config.start_offset {
            return Ok(PacketResult::skipped(index));
        }
        if let Some(max) = self.config.max_packets {
            if self.analyzed >= max {
                self.finished = true;
                return Err(EngineError::Finished);
            }
        }
        self.analyzed += 1;
        let byte_pos = self.byte_pos;
        self.byte_pos += self.config.packet_size as u64;

        // parity trailer of a 204-byte stream is not part of the packet
        let ts = &data[..TS_PACKET_SIZE];
        let mut errors = ErrorReport::default();

        let header = match TsHeader::parse(ts) {
            Ok(h) => {
                // a good packet cannot fail the sync check
                let _ = self.monitor.on_sync(&mut errors, true);
                h
            }
            Err(e) => {
                debug!(index, error = %e, "unparseable packet header");
                let sync = self.monitor.on_sync(&mut errors, false);
                self.monitor.finalize(&mut errors);
                if let Err(loss) = sync {
                    self.finished = true;
                    return Err(loss.into());
                }
                // continuity state stays untouched on a framing error
                return Ok(PacketResult {
                    index,
                    skipped: false,
                    header: None,
                    adaptation: None,
                    class: PidClass::Unknown,
                    is_pcr_pid: false,
                    pcr: None,
                    pts: None,
                    tables: Vec::new(),
                    errors,
                    rate: None,
                    stc: None,
                    psi_parse_finished: self.is_psi_parse_finished(),
                    reportable: true,
                });
            }
        };

        let adaptation = if header.has_adaptation_field() {
            AdaptationField::parse(&ts[4..])
        } else {
            None
        };
        let discontinuity = adaptation.is_some_and(|af| af.discontinuity);

        let (class, cc_check) = {
            let state = self.registry.state_mut(header.pid);
            state.packets += 1;
            state.bytes += self.config.packet_size as u64;
            (state.class, state.check_continuity(&header, discontinuity))
        };
        self.monitor.on_header(&mut errors, &header, class);
        self.monitor.on_continuity(&mut errors, cc_check);
        let cc_failed = matches!(cc_check, CcCheck::Error { .. });
        // a duplicate repeats bytes already consumed; feeding them
        // again would double-append into an open section
        let duplicate = cc_check == CcCheck::Duplicate;

        let mut pcr = None;
        if let Some(p) = adaptation.and_then(|af| af.pcr) {
            if discontinuity {
                self.timing.on_discontinuity(header.pid);
            }
            let report = self.timing.on_pcr(header.pid, p, byte_pos);
            self.monitor.on_pcr(&mut errors, &report, discontinuity);
            pcr = Some(report);
        }
        let stc = self.timing.stc(byte_pos);

        let mut tables = Vec::new();
        let mut pts = None;
        if let Some(off) = packet::payload_offset(&header, ts).filter(|_| !duplicate) {
            let payload = &ts[off..];
            if class.is_psi_si() {
                if header.scrambling_control == 0 {
                    let fed = {
                        let state = self.registry.state_mut(header.pid);
                        if cc_failed {
                            // lost packets break section framing
                            state.section = Some(SectionBuffer::new());
                        }
                        state
                            .section
                            .as_mut()
                            .map(|sb| sb.feed(header.payload_unit_start, payload))
                    };
                    if let Some(fed) = fed {
                        if fed.truncated || fed.malformed {
                            debug!(pid = header.pid, "section framing defect");
                        }
                        for raw in fed.completed {
                            self.handle_section(header.pid, raw, stc, &mut errors, &mut tables);
                        }
                    }
                }
            } else if header.payload_unit_start
                && header.scrambling_control == 0
                && matches!(class, PidClass::Video | PidClass::Audio | PidClass::Other)
            {
                if let Some(stamps) = pes::parse_timestamps(payload) {
                    if let Some(p) = stamps.pts {
                        let report = self.timing.on_pts(header.pid, p, stamps.dts, byte_pos);
                        self.monitor.on_pts(&mut errors, &report);
                        pts = Some(report);
                    }
                }
            }
        }

        if let Some(stc) = stc {
            self.monitor.on_tick(&mut errors, stc, &mut self.registry);
        }
        let rate = self
            .rate
            .on_packet(header.pid, class.is_psi_si(), header.pid == PID_NULL, stc);

        self.monitor.finalize(&mut errors);

        let reportable = !errors.is_clean() || self.filters_pass(&header, &tables);
        Ok(PacketResult {
            index,
            skipped: false,
            header: Some(header),
            adaptation,
            // classification may have been refined by a table decoded
            // in this very packet
            class: self.registry.state(header.pid).map_or(class, |s| s.class),
            is_pcr_pid: self
                .registry
                .state(header.pid)
                .is_some_and(|s| s.is_pcr),
            pcr,
            pts,
            tables,
            errors,
            rate,
            stc,
            psi_parse_finished: self.is_psi_parse_finished(),
            reportable,
        })
    }

    fn handle_section(
        &mut self,
        pid: u16,
        raw: Bytes,
        stc: Option<u64>,
        errors: &mut ErrorReport,
        tables: &mut Vec<Table>,
    ) {
        let table_id = raw.first().copied().unwrap_or(0xFF);
        let class = self.registry.state(pid).map_or(PidClass::Unknown, |s| s.class);

        let section = match Section::parse(raw) {
            Ok(section) => section,
            Err(PsiError::Crc { calc, found }) => {
                self.monitor.crc_mismatch(
                    errors,
                    CrcMismatch {
                        pid,
                        table_id,
                        calculated: calc,
                        found,
                    },
                );
                return;
            }
            Err(e) => {
                debug!(pid, table_id, error = %e, "section discarded");
                return;
            }
        };

        self.monitor
            .on_section(errors, pid, class, section.header.table_id, stc);
        // a foreign table on PID 0 or 1 was just flagged; do not decode it
        if (class == PidClass::Pat && section.header.table_id != 0x00)
            || (class == PidClass::Cat && section.header.table_id != 0x01)
        {
            return;
        }

        match psi::decode_table(&section) {
            Ok(table) => {
                if section.header.current_next {
                    self.apply_table(pid, &table, stc);
                }
                tables.push(table);
            }
            Err(e) => debug!(pid, table_id, error = %e, "table decode failed"),
        }
    }

    /// Fold a decoded table into the program model. Re-feeding the same
    /// table is a no-op.
    fn apply_table(&mut self, pid: u16, table: &Table, stc: Option<u64>) {
        let stc = stc.unwrap_or(0);
        match table {
            Table::Pat(pat) => {
                self.pat_seen = true;
                self.transport_stream_id = Some(pat.transport_stream_id);
                for entry in &pat.programs {
                    match self
                        .programs
                        .iter_mut()
                        .find(|p| p.program_number == entry.program_number)
                    {
                        Some(prog) => {
                            if prog.pmt_pid != entry.pmt_pid {
                                prog.pmt_pid = entry.pmt_pid;
                                prog.parsed = false;
                            }
                        }
                        None => self
                            .programs
                            .push(Program::new(entry.program_number, entry.pmt_pid)),
                    }
                    let state = self.registry.state_mut(entry.pmt_pid);
                    state.set_class(PidClass::Pmt);
                    state.program_number = Some(entry.program_number);
                    self.registry.reference(entry.pmt_pid, stc);
                }
                self.programs
                    .retain(|p| pat.programs.iter().any(|e| e.program_number == p.program_number));
                if let Some(nit_pid) = pat.network_pid {
                    self.registry.state_mut(nit_pid).set_class(PidClass::Nit);
                }
            }
            Table::Pmt(pmt) => {
                let Some(prog) = self
                    .programs
                    .iter_mut()
                    .find(|p| p.program_number == pmt.program_number)
                else {
                    debug!(
                        pid,
                        program_number = pmt.program_number,
                        "PMT for a program absent from the PAT"
                    );
                    return;
                };
                if prog.pmt_pid != pid {
                    debug!(pid, expected = prog.pmt_pid, "PMT on an unreferenced PID");
                    return;
                }
                prog.parsed = true;
                prog.pmt_version = Some(pmt.version);
                prog.pcr_pid = (pmt.pcr_pid != PID_NULL).then_some(pmt.pcr_pid);
                prog.update_tracks(
                    pmt.streams
                        .iter()
                        .map(|es| Track::new(es.elementary_pid, es.stream_type)),
                );
                let program_number = prog.program_number;
                let pcr_pid = prog.pcr_pid;
                let tracks: Vec<Track> = prog.tracks.clone();

                for track in &tracks {
                    let state = self.registry.state_mut(track.pid);
                    state.set_class(match track.kind {
                        TrackKind::Video => PidClass::Video,
                        TrackKind::Audio => PidClass::Audio,
                        TrackKind::Other => PidClass::Other,
                    });
                    state.program_number = Some(program_number);
                    state.stream_type = Some(track.stream_type);
                    self.registry.reference(track.pid, stc);
                }
                if let Some(pcr_pid) = pcr_pid {
                    let state = self.registry.state_mut(pcr_pid);
                    state.is_pcr = true;
                    if state.program_number.is_none() {
                        state.program_number = Some(program_number);
                    }
                    self.registry.reference(pcr_pid, stc);
                }
            }
            _ => {}
        }
    }

    fn filters_pass(&self, header: &TsHeader, tables: &[Table]) -> bool {
        let f = &self.config.filters;
        if let Some(pid) = f.pid {
            if header.pid != pid {
                return false;
            }
        }
        if let Some(table_id) = f.table_id {
            if !tables.iter().any(|t| t.table_id() == table_id) {
                return false;
            }
        }
        if let Some(program) = f.program {
            let belongs = self
                .registry
                .state(header.pid)
                .is_some_and(|s| s.program_number == Some(program))
                || self
                    .programs
                    .iter()
                    .any(|p| p.program_number == program && p.pmt_pid == header.pid);
            if !belongs {
                return false;
            }
        }
        if let Some(kind) = f.kind {
            let class = self
                .registry
                .state(header.pid)
                .map_or(PidClass::Unknown, |s| s.class);
            let matches = matches!(
                (kind, class),
                (TrackKind::Video, PidClass::Video)
                    | (TrackKind::Audio, PidClass::Audio)
                    | (TrackKind::Other, PidClass::Other)
            );
            if !matches {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::tests::make_section_bytes;

    fn ts_packet(pid: u16, cc: u8, pusi: bool, payload: &[u8]) -> Vec<u8> {
        let mut p = vec![0x47u8, 0, 0, 0];
        p[1] = ((pid >> 8) as u8 & 0x1F) | if pusi { 0x40 } else { 0 };
        p[2] = pid as u8;
        p[3] = 0x10 | (cc & 0x0F);
        p.extend_from_slice(payload);
        p.resize(188, 0xFF);
        p
    }

    fn psi_packet(pid: u16, cc: u8, section: &[u8]) -> Vec<u8> {
        let mut payload = vec![0u8]; // pointer field
        payload.extend_from_slice(section);
        ts_packet(pid, cc, true, &payload)
    }

    fn pat_bytes(program: u16, pmt_pid: u16) -> Bytes {
        let body = [
            (program >> 8) as u8,
            program as u8,
            0xE0 | (pmt_pid >> 8) as u8,
            pmt_pid as u8,
        ];
        make_section_bytes(0x00, 0x0001, &body)
    }

    fn pmt_bytes(program: u16, pcr_pid: u16, streams: &[(u8, u16)]) -> Bytes {
        let mut body = vec![
            0xE0 | (pcr_pid >> 8) as u8,
            pcr_pid as u8,
            0xF0,
            0x00, // empty program_info loop
        ];
        for &(stream_type, pid) in streams {
            body.push(stream_type);
            body.push(0xE0 | (pid >> 8) as u8);
            body.push(pid as u8);
            body.push(0xF0);
            body.push(0x00);
        }
        make_section_bytes(0x02, program, &body)
    }

    fn engine() -> TsEngine {
        TsEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn pat_pmt_video_bootstrap() {
        let mut eng = engine();

        let r = eng
            .push_packet(&psi_packet(0x000, 0, &pat_bytes(1, 0x100)))
            .unwrap();
        assert!(r.errors.is_clean());
        assert!(matches!(r.tables[0], Table::Pat(_)));
        assert!(!r.psi_parse_finished);
        assert_eq!(eng.programs().len(), 1);

        let r = eng
            .push_packet(&psi_packet(0x100, 0, &pmt_bytes(1, 0x101, &[(0x1B, 0x101)])))
            .unwrap();
        assert!(r.errors.is_clean());
        assert!(r.psi_parse_finished);
        assert_eq!(eng.programs()[0].pcr_pid, Some(0x101));
        assert_eq!(eng.programs()[0].tracks[0].kind, TrackKind::Video);

        let r = eng.push_packet(&ts_packet(0x101, 0, true, &[])).unwrap();
        assert!(r.errors.is_clean(), "errors: {:?}", r.errors);
        assert_eq!(r.class, PidClass::Video);
        assert!(r.is_pcr_pid);
        assert!(r.psi_parse_finished);
    }

    #[test]
    fn repeated_tables_are_idempotent() {
        let mut eng = engine();
        for cc in 0..3u8 {
            eng.push_packet(&psi_packet(0x000, cc, &pat_bytes(1, 0x100)))
                .unwrap();
            eng.push_packet(&psi_packet(0x100, cc, &pmt_bytes(1, 0x101, &[(0x1B, 0x101)])))
                .unwrap();
        }
        assert_eq!(eng.programs().len(), 1);
        assert_eq!(eng.programs()[0].tracks.len(), 1);
        assert!(eng.is_psi_parse_finished());
    }

    #[test]
    fn duplicated_packet_mid_section_is_not_refed() {
        // PAT large enough to span three packets
        let mut body = Vec::new();
        for n in 1..=95u16 {
            let pmt_pid = 0x100 + n;
            body.extend_from_slice(&[
                (n >> 8) as u8,
                n as u8,
                0xE0 | (pmt_pid >> 8) as u8,
                pmt_pid as u8,
            ]);
        }
        let section = make_section_bytes(0x00, 1, &body);
        assert!(section.len() > 2 * 184);

        let mut eng = engine();
        eng.push_packet(&psi_packet(0x000, 0, &section[..183]))
            .unwrap();
        let middle = ts_packet(0x000, 1, false, &section[183..367]);
        eng.push_packet(&middle).unwrap();
        // one bit-identical repeat is legal and carries nothing new
        let r = eng.push_packet(&middle).unwrap();
        assert!(r.errors.is_clean(), "{:?}", r.errors);
        let r = eng
            .push_packet(&ts_packet(0x000, 2, false, &section[367..]))
            .unwrap();
        assert!(r.errors.is_clean(), "{:?}", r.errors);
        assert!(matches!(&r.tables[..], [Table::Pat(_)]));
        assert_eq!(eng.programs().len(), 95);
    }

    #[test]
    fn cc_skip_reported_once_with_lost_count() {
        let mut eng = engine();
        eng.push_packet(&ts_packet(0x101, 0, false, &[])).unwrap();
        eng.push_packet(&ts_packet(0x101, 1, false, &[])).unwrap();
        // counters 2 and 3 lost
        let r = eng.push_packet(&ts_packet(0x101, 4, false, &[])).unwrap();
        let cc = r.errors.continuity_count_error.expect("cc error");
        assert_eq!((cc.expected, cc.found, cc.lost), (2, 4, 2));
        // stream is consistent again from the found value
        let r = eng.push_packet(&ts_packet(0x101, 5, false, &[])).unwrap();
        assert!(r.errors.continuity_count_error.is_none());
        assert_eq!(eng.counters().continuity_count_error, 1);
    }

    #[test]
    fn bad_sync_byte_leaves_cc_state_alone() {
        let mut eng = engine();
        eng.push_packet(&ts_packet(0x101, 0, false, &[])).unwrap();

        let mut bad = ts_packet(0x101, 9, false, &[]);
        bad[0] = 0x48;
        let r = eng.push_packet(&bad).unwrap();
        assert!(r.errors.sync_byte_error);
        assert!(r.header.is_none());

        let r = eng.push_packet(&ts_packet(0x101, 1, false, &[])).unwrap();
        assert!(r.errors.continuity_count_error.is_none());
    }

    #[test]
    fn sustained_sync_loss_is_fatal() {
        let mut eng = engine();
        let mut bad = ts_packet(0x101, 0, false, &[]);
        bad[0] = 0x00;
        for _ in 0..SYNC_LOSS_THRESHOLD {
            assert!(eng.push_packet(&bad).is_ok());
        }
        assert!(matches!(
            eng.push_packet(&bad),
            Err(EngineError::SyncLoss(_))
        ));
        assert!(matches!(
            eng.push_packet(&bad),
            Err(EngineError::Finished)
        ));
    }

    #[test]
    fn crc_mutation_discards_table() {
        let mut eng = engine();
        let mut pat = pat_bytes(1, 0x100).to_vec();
        let len = pat.len();
        pat[len - 1] ^= 0xFF;
        let r = eng.push_packet(&psi_packet(0x000, 0, &pat)).unwrap();
        assert!(r.tables.is_empty());
        assert!(r.errors.crc_error.is_some());
        assert!(eng.programs().is_empty());
        assert_eq!(eng.counters().crc_error, 1);
    }

    #[test]
    fn size_and_window_validation() {
        assert!(matches!(
            TsEngine::new(EngineConfig {
                packet_size: 190,
                ..Default::default()
            }),
            Err(EngineError::UnsupportedPacketSize(190))
        ));
        assert!(matches!(
            TsEngine::new(EngineConfig {
                window_ms: 0,
                ..Default::default()
            }),
            Err(EngineError::WindowOutOfRange(0))
        ));
        let mut eng = engine();
        assert!(matches!(
            eng.push_packet(&[0x47; 204]),
            Err(EngineError::PacketSize {
                expected: 188,
                actual: 204
            })
        ));
    }

    #[test]
    fn start_offset_and_budget() {
        let mut eng = TsEngine::new(EngineConfig {
            start_offset: 2,
            max_packets: Some(1),
            ..Default::default()
        })
        .unwrap();
        let pkt = ts_packet(0x101, 0, false, &[]);
        assert!(eng.push_packet(&pkt).unwrap().skipped);
        assert!(eng.push_packet(&pkt).unwrap().skipped);
        assert!(!eng.push_packet(&pkt).unwrap().skipped);
        assert!(matches!(eng.push_packet(&pkt), Err(EngineError::Finished)));
    }

    #[test]
    fn pid_filter_narrows_reportable() {
        let mut eng = TsEngine::new(EngineConfig {
            filters: Filters {
                pid: Some(0x200),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let r = eng.push_packet(&ts_packet(0x101, 0, false, &[])).unwrap();
        assert!(!r.reportable);
        let r = eng.push_packet(&ts_packet(0x200, 0, false, &[])).unwrap();
        assert!(r.reportable);
        // errors override the filter
        eng.push_packet(&ts_packet(0x101, 1, false, &[])).unwrap();
        let r = eng.push_packet(&ts_packet(0x101, 7, false, &[])).unwrap();
        assert!(r.reportable);
    }

    #[test]
    fn foreign_table_on_pat_pid_is_flagged_not_applied() {
        let mut eng = engine();
        let sdt = make_section_bytes(0x42, 1, &[0x00, 0x02, 0xFF]);
        let r = eng.push_packet(&psi_packet(0x000, 0, &sdt)).unwrap();
        assert!(matches!(
            r.errors.pat_error,
            Some(crate::tr101::PatErrorKind::WrongTableId { table_id: 0x42 })
        ));
        assert!(r.tables.is_empty());
    }
}
