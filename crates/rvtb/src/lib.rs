//! RVTB - RISC-V testbench support
//!
//! Places ELF binaries into a simulated processor's memory, writes
//! `$readmemh` images, and checks the writeback retirement stream against a
//! golden trace.
//!
//! # Example
//!
//! ```ignore
//! use rvtb::{LoadConfig, WordArrayWriter, WordMemory, load_binary_into_memory};
//!
//! let mut mem = WordMemory::new(1 << 14);
//! load_binary_into_memory(&mut WordArrayWriter::new(&mut mem), "rv32ui-p-add".as_ref(), &LoadConfig::riscv_tests())?;
//! ```

// Re-export from sub-crates
pub use rvtb_elf::{
    ElfError, Readelf, SectionInfo, SectionSource, SectionTable, extract_words, get_section_info,
    parse_readelf_sections, section_words,
};
pub use rvtb_trace::{
    CYCLE_STATUS_ENUM, EnumTable, RetireProbe, StatusField, StatusFormat, Trace, TraceConfig,
    TraceError, TraceMode, TraceRecord, TraceSession, WritebackState, describe_status, handle_trace,
    migrate_trace, trace_file_name,
};

mod error;
mod hexfile;
mod loader;
mod memory;
mod toolchain;

pub use error::*;
pub use hexfile::*;
pub use loader::*;
pub use memory::*;
pub use toolchain::*;
