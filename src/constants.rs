//! Constants for MPEG-TS decoding and TR 101 290 measurement

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_PACKET_SIZE_RS: usize = 204; // 188 + 16 bytes RS parity
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Well-known PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_CAT: u16 = 0x0001;
pub const PID_TSDT: u16 = 0x0002;
pub const PID_NIT: u16 = 0x0010;
pub const PID_SDT: u16 = 0x0011; // SDT/BAT/ST
pub const PID_EIT: u16 = 0x0012; // EIT/ST
pub const PID_RST: u16 = 0x0013; // RST/ST
pub const PID_TDT: u16 = 0x0014; // TDT/TOT/ST
pub const PID_DIT: u16 = 0x001E;
pub const PID_SIT: u16 = 0x001F;
pub const PID_NULL: u16 = 0x1FFF;

/// 27 MHz system clock
pub const STC_HZ: u64 = 27_000_000;
/// 27 ticks = 1 us
pub const STC_US: u64 = 27;
pub const STC_MS: u64 = 27_000;
/// 90 kHz PTS/DTS clock
pub const PTS_HZ: u64 = 90_000;

/// 33-bit PCR base / PTS counter width
pub const PCR_BASE_MAX: u64 = 1 << 33;
/// Full 27 MHz PCR counter: base * 300 + 9-bit extension
pub const PCR_MAX: u64 = PCR_BASE_MAX * 300;
pub const PTS_MAX: u64 = 1 << 33;

/// section_length is 12 bits but capped at 0xFFD by ISO 13818-1
pub const SECTION_LENGTH_MAX: usize = 4093;
/// Full section: 3 header bytes + section_length
pub const SECTION_SIZE_MAX: usize = SECTION_LENGTH_MAX + 3;

/// TR 101 290 maximum section intervals, in 27 MHz ticks
pub const PAT_INTERVAL_MAX: u64 = 500 * STC_MS;
pub const PMT_INTERVAL_MAX: u64 = 500 * STC_MS;
pub const CAT_INTERVAL_MAX: u64 = 2000 * STC_MS;

/// TR 101 290 PCR bounds
pub const PCR_REPETITION_MAX: u64 = 100 * STC_MS;
/// +-1 us jitter tolerance in 27 MHz ticks
pub const PCR_ACCURACY_TICKS: i64 = 27;
/// PTS repetition bound (2.5): 700 ms on the 90 kHz clock
pub const PTS_REPETITION_MAX: u64 = 700 * 90;

/// Consecutive sync failures tolerated before the run is aborted
pub const SYNC_LOSS_THRESHOLD: u64 = 10;

/// A PID referenced by a PMT must appear within 5 s (1.6)
pub const PID_TIMEOUT: u64 = 5000 * STC_MS;

/// Measurement window bounds (rate accounting), in milliseconds
pub const WINDOW_MS_MIN: u64 = 1;
pub const WINDOW_MS_MAX: u64 = 70_000;
pub const WINDOW_MS_DEFAULT: u64 = 1000;
