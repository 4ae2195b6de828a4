//! Writeback retirement traces for pipelined RISC-V processor testbenches.
//!
//! Each simulated cycle, the testbench either records what the writeback stage
//! retired (generate mode) or checks it against a previously captured golden
//! trace (compare mode). The first divergence fails the run, naming the cycle
//! of the reference record.
//!
//! # Example
//!
//! ```ignore
//! use rvtb_trace::{TraceConfig, TraceMode, TraceSession};
//!
//! let config = TraceConfig::new(TraceMode::Compare);
//! let mut session = TraceSession::for_binary(config, "..".as_ref(), &binary, None)?;
//! for cycle in 0..TIMEOUT_CYCLES {
//!     sim.step();
//!     session.step(&sim, cycle)?;
//! }
//! session.finish()?;
//! ```

mod compare;
mod probe;
mod record;
mod session;
mod status;

pub use compare::*;
pub use probe::*;
pub use record::*;
pub use session::*;
pub use status::*;

use thiserror::Error;

/// Trace errors.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("trace mismatch at cycle {cycle}: {field} expected {expected} but was {actual}")]
    Mismatch {
        cycle: u64,
        field: TraceField,
        expected: String,
        actual: String,
    },
    #[error("reference trace has {len} records, no record at index {index}")]
    TraceExhausted { index: usize, len: usize },
    #[error("unknown flag {flag} in {enum_name}")]
    UnknownFlag { flag: String, enum_name: String },
    #[error("no typedef enum named {0}")]
    EnumNotFound(String),
    #[error("enum member {name} has non-integer value {value}")]
    InvalidEnumValue { name: String, value: String },
    #[error("symbolic cycle status requires an enum table")]
    MissingEnumTable,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
