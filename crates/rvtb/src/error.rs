use thiserror::Error;

use crate::memory::MemoryError;

/// Testbench errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("ELF error: {0}")]
    Elf(#[from] rvtb_elf::ElfError),
    #[error("trace error: {0}")]
    Trace(#[from] rvtb_trace::TraceError),
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "section {section} reaches word {end_word} but the image can only hold {max_words} words"
    )]
    CapacityExceeded {
        section: String,
        end_word: u64,
        max_words: u64,
    },
    #[error("failed to run {tool}: {source}")]
    ToolSpawn {
        tool: String,
        source: std::io::Error,
    },
    #[error("assembler exited with status {code:?}: {stderr}")]
    AssemblerFailed { code: Option<i32>, stderr: String },
    #[error("{0} not found in PATH")]
    ToolNotFound(String),
    #[error("section {0} not found")]
    SectionNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
