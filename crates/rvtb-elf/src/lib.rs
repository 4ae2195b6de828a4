//! ELF section tables and word extraction for RISC-V testbenches.

mod constants;
mod extract;
mod file;
mod header;
mod readelf;
mod section;
pub mod testing;

pub use constants::*;
pub use extract::*;
pub use file::*;
pub use header::*;
pub use readelf::*;
pub use section::*;

use std::path::PathBuf;

use thiserror::Error;

/// ELF loading errors.
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("binary not found: {}", .0.display())]
    BinaryNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run {tool}: {source}")]
    ToolSpawn {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with status {code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("ELF data too small")]
    TooSmall,
    #[error("Invalid ELF magic number")]
    InvalidMagic,
    #[error("Only little-endian ELF supported")]
    NotLittleEndian,
    #[error("Unsupported ELF class: {0}")]
    UnsupportedClass(u8),
    #[error("Section header out of bounds")]
    SectionOutOfBounds,
    #[error("{length} bytes at offset {offset:#x} extend beyond the {file_len}-byte file")]
    RangeBeyondFile { offset: u64, length: u64, file_len: u64 },
}

pub type Result<T> = std::result::Result<T, ElfError>;
