//! MPEG-2 transport stream decoding and TR 101 290 measurement.
//!
//! The library is push-driven: construct a [`TsEngine`] and feed it
//! packets from any source. File and UDP front ends live in the CLI;
//! [`net`] has the socket plumbing for live capture.

pub mod adaptation;
pub mod constants;
pub mod cursor;
pub mod engine;
pub mod net;
pub mod packet;
pub mod pes;
pub mod pid;
pub mod psi;
pub mod rate;
pub mod timing;
pub mod tr101;
pub mod types;

pub use engine::{EngineConfig, EngineError, Filters, PacketResult, TsEngine};
pub use tr101::{ErrorCounters, ErrorReport};
pub use types::{Program, Track, TrackKind};
