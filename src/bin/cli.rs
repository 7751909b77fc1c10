use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mpegts_analyzer::engine::PacketResult;
use mpegts_analyzer::packet::find_sync;
use mpegts_analyzer::pid::PidClass;
use mpegts_analyzer::psi::{Table, time::running_status};
use mpegts_analyzer::{EngineConfig, EngineError, ErrorCounters, Filters, Program, TrackKind, TsEngine};

#[derive(Parser)]
#[command(name = "mpegts-analyzer", about = "MPEG-TS decoder and TR 101 290 analyzer")]
struct Opt {
    /// TS file to analyze; omit to listen on --addr
    input: Option<PathBuf>,

    /// UDP socket to bind + listen (IPv4)
    #[clap(long)]
    addr: Option<SocketAddr>,

    /// Transmitted packet size (188, or 204 with RS parity)
    #[clap(long, default_value_t = 188)]
    packet_size: usize,

    /// Rate measurement window in milliseconds
    #[clap(long = "iv", default_value_t = 1000)]
    window_ms: u64,

    /// Packets to skip before analysis
    #[clap(long, default_value_t = 0)]
    start: u64,

    /// Analyze at most this many packets
    #[clap(long)]
    count: Option<u64>,

    /// Only report this PID (accepts 0x hex)
    #[clap(long, value_parser = parse_pid)]
    pid: Option<u16>,

    /// Only report packets completing this table_id (accepts 0x hex)
    #[clap(long, value_parser = parse_table_id)]
    table: Option<u8>,

    /// Only report PIDs of this program_number
    #[clap(long)]
    prog: Option<u16>,

    /// Only report this track kind
    #[clap(long, value_enum)]
    kind: Option<KindArg>,

    /// One JSON object per reportable packet instead of text lines
    #[clap(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Video,
    Audio,
    Other,
}

impl From<KindArg> for TrackKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Video => TrackKind::Video,
            KindArg::Audio => TrackKind::Audio,
            KindArg::Other => TrackKind::Other,
        }
    }
}

fn parse_pid(s: &str) -> Result<u16, String> {
    parse_maybe_hex(s).and_then(|v: u64| {
        (v <= 0x1FFF)
            .then_some(v as u16)
            .ok_or_else(|| format!("PID {v} out of 13-bit range"))
    })
}

fn parse_table_id(s: &str) -> Result<u8, String> {
    parse_maybe_hex(s).and_then(|v: u64| {
        (v <= 0xFF)
            .then_some(v as u8)
            .ok_or_else(|| format!("table_id {v} out of range"))
    })
}

fn parse_maybe_hex(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

/// Final report written to stdout when the run ends.
#[derive(Serialize)]
struct Summary {
    generated_at: chrono::DateTime<chrono::Utc>,
    packets_analyzed: u64,
    transport_stream_id: Option<u16>,
    psi_parse_finished: bool,
    programs: Vec<Program>,
    counters: ErrorCounters,
    pids: Vec<PidSummary>,
}

#[derive(Serialize)]
struct PidSummary {
    pid: u16,
    class: PidClass,
    description: &'static str,
    packets: u64,
    bytes: u64,
    program_number: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::parse();
    let mut engine = TsEngine::new(EngineConfig {
        packet_size: opt.packet_size,
        window_ms: opt.window_ms,
        start_offset: opt.start,
        max_packets: opt.count,
        filters: Filters {
            pid: opt.pid,
            table_id: opt.table,
            program: opt.prog,
            kind: opt.kind.map(Into::into),
        },
    })?;

    let mut analyzed: u64 = 0;
    let outcome = match (&opt.input, opt.addr) {
        (Some(path), None) => run_file(&mut engine, path, &opt, &mut analyzed),
        (None, Some(addr)) => run_udp(&mut engine, addr, &opt, &mut analyzed).await,
        (Some(_), Some(_)) => anyhow::bail!("give a file or --addr, not both"),
        (None, None) => anyhow::bail!("nothing to analyze: give a file or --addr"),
    };
    if let Err(e) = outcome {
        warn!(error = %e, "analysis stopped");
    }

    let summary = Summary {
        generated_at: chrono::Utc::now(),
        packets_analyzed: analyzed,
        transport_stream_id: engine.transport_stream_id(),
        psi_parse_finished: engine.is_psi_parse_finished(),
        programs: engine.programs().to_vec(),
        counters: *engine.counters(),
        pids: engine
            .registry()
            .iter()
            .map(|s| PidSummary {
                pid: s.pid,
                class: s.class,
                description: s.class.describe(),
                packets: s.packets,
                bytes: s.bytes,
                program_number: s.program_number,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_file(
    engine: &mut TsEngine,
    path: &PathBuf,
    opt: &Opt,
    analyzed: &mut u64,
) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let offset = find_sync(&data, opt.packet_size)
        .context("no packet sync found at the configured stride")?;
    if offset != 0 {
        info!(offset, "stream starts mid-packet");
    }

    for chunk in data[offset..].chunks_exact(opt.packet_size) {
        match feed(engine, chunk, opt, analyzed)? {
            Flow::Continue => {}
            Flow::Stop => break,
        }
    }
    Ok(())
}

async fn run_udp(
    engine: &mut TsEngine,
    addr: SocketAddr,
    opt: &Opt,
    analyzed: &mut u64,
) -> anyhow::Result<()> {
    let sock = mpegts_analyzer::net::bind_udp(&addr)?;
    info!(%addr, "listening");
    let mut buf = [0u8; 2048];
    loop {
        let n = tokio::select! {
            r = sock.recv(&mut buf) => r?,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };
        for chunk in buf[..n].chunks_exact(opt.packet_size) {
            match feed(engine, chunk, opt, analyzed)? {
                Flow::Continue => {}
                Flow::Stop => return Ok(()),
            }
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

fn feed(engine: &mut TsEngine, chunk: &[u8], opt: &Opt, analyzed: &mut u64) -> anyhow::Result<Flow> {
    let result = match engine.push_packet(chunk) {
        Ok(r) => r,
        Err(EngineError::Finished) => return Ok(Flow::Stop),
        Err(e @ EngineError::SyncLoss(_)) => {
            warn!(error = %e, "aborting");
            return Ok(Flow::Stop);
        }
        Err(e) => return Err(e.into()),
    };
    if result.skipped {
        return Ok(Flow::Continue);
    }
    *analyzed += 1;
    if result.reportable {
        emit(&result, opt.json);
    }
    Ok(Flow::Continue)
}

fn emit(result: &PacketResult, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(result) {
            println!("{line}");
        }
        return;
    }

    let pid = result.header.map(|h| h.pid);
    if !result.errors.is_clean() {
        println!(
            "pkt {:>8} pid {} errors {:?}",
            result.index,
            pid.map_or("----".into(), |p| format!("0x{p:04X}")),
            result.errors
        );
    }
    for table in &result.tables {
        println!(
            "pkt {:>8} pid 0x{:04X} table 0x{:02X} {:?}",
            result.index,
            pid.unwrap_or(0),
            table.table_id(),
            table
        );
        if let Table::Sdt(sdt) = table {
            for svc in &sdt.services {
                println!(
                    "             service {} {}",
                    svc.service_id,
                    running_status(svc.running_status)
                );
            }
        }
    }
    if let Some(rate) = &result.rate {
        println!(
            "pkt {:>8} rate window {:.1} ms: system {:.0} bps, psi/si {:.0} bps, null {:.0} bps",
            result.index, rate.interval_ms, rate.system_bps, rate.psi_si_bps, rate.null_bps
        );
    }
}
