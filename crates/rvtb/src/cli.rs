//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rvtb::{CYCLE_STATUS_ENUM, Readelf, SectionSource};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "rvtb")]
#[command(about = "RISC-V testbench support - ELF loading, memory images and retirement traces")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show warnings and errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the sections of an ELF binary
    Sections {
        /// Input ELF file
        #[arg(value_name = "ELF")]
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write a $readmemh memory image of a firmware binary
    Hexfile {
        /// Input ELF file
        #[arg(value_name = "ELF")]
        input: PathBuf,

        /// Output hex file
        #[arg(short, long, default_value = "mem_initial_contents.hex")]
        output: PathBuf,

        /// Size of the target memory in words
        #[arg(long, default_value = "1024")]
        max_words: u64,

        /// Sections to include, in order (comma-separated)
        #[arg(long, value_delimiter = ',')]
        sections: Option<Vec<String>>,

        /// Move sections linked at 0x80000000 and above down to address 0
        #[arg(long)]
        translate: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the words of one section as hex
    Dump {
        /// Input ELF file
        #[arg(value_name = "ELF")]
        input: PathBuf,

        /// Section to print
        #[arg(long, default_value = ".text")]
        section: String,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Decode or encode writeback cycle status flags
    Status {
        #[command(subcommand)]
        command: StatusCommands,
    },
    /// Inspect and convert retirement trace files
    Trace {
        #[command(subcommand)]
        command: TraceCommands,
    },
}

#[derive(Subcommand)]
pub enum StatusCommands {
    /// Print the flag names set in a status value
    Decode {
        /// Status value (decimal or 0x-prefixed hex)
        #[arg(value_name = "VALUE", value_parser = parse_status_value)]
        value: u32,

        #[command(flatten)]
        table: EnumArgs,
    },
    /// Combine comma-separated flag names into a status value
    Encode {
        /// Flag names, e.g. CYCLE_NO_STALL,CYCLE_DIV
        #[arg(value_name = "NAMES")]
        names: String,

        #[command(flatten)]
        table: EnumArgs,
    },
}

#[derive(Subcommand)]
pub enum TraceCommands {
    /// Print a trace file as a table
    Show {
        /// Trace JSON file
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// SystemVerilog source declaring the status enum, to print flag names
        #[arg(long, value_name = "FILE")]
        enum_file: Option<PathBuf>,

        /// Name of the status enum
        #[arg(long, default_value = CYCLE_STATUS_ENUM)]
        enum_name: String,
    },
    /// Rewrite a trace with symbolic statuses to raw integers
    Migrate {
        /// Trace JSON file
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// Output file (defaults to rewriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        table: EnumArgs,
    },
}

/// Where section headers are read from.
#[derive(clap::Args, Clone, Debug)]
pub struct SourceArgs {
    /// Parse section headers in-process instead of running readelf
    #[arg(long)]
    pub native: bool,

    /// readelf command (e.g. riscv32-unknown-elf-readelf)
    #[arg(long, conflicts_with = "native")]
    pub readelf: Option<Readelf>,
}

impl SourceArgs {
    pub fn source(&self) -> SectionSource {
        if self.native {
            SectionSource::Native
        } else {
            SectionSource::Readelf(self.readelf.clone().unwrap_or_default())
        }
    }
}

/// Location of the status enum declaration.
#[derive(clap::Args, Clone, Debug)]
pub struct EnumArgs {
    /// SystemVerilog source declaring the status enum
    #[arg(long, value_name = "FILE")]
    pub enum_file: PathBuf,

    /// Name of the status enum
    #[arg(long, default_value = CYCLE_STATUS_ENUM)]
    pub enum_name: String,
}

fn parse_status_value(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid status value {s:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_status_value() {
        assert_eq!(parse_status_value("9"), Ok(9));
        assert_eq!(parse_status_value("0x10"), Ok(16));
        assert!(parse_status_value("CYCLE_DIV").is_err());
    }

    #[test]
    fn test_hexfile_args() {
        let cli = Cli::parse_from([
            "rvtb",
            "hexfile",
            "fw.elf",
            "--max-words",
            "4096",
            "--sections",
            ".start,.text",
            "--native",
        ]);
        let Commands::Hexfile {
            max_words,
            sections,
            source,
            ..
        } = cli.command
        else {
            panic!("expected hexfile command");
        };
        assert_eq!(max_words, 4096);
        assert_eq!(sections.unwrap(), [".start", ".text"]);
        assert_eq!(source.source(), SectionSource::Native);
    }

    #[test]
    fn test_readelf_override() {
        let cli = Cli::parse_from([
            "rvtb",
            "sections",
            "a.out",
            "--readelf",
            "riscv32-unknown-elf-readelf",
        ]);
        let Commands::Sections { source, .. } = cli.command else {
            panic!("expected sections command");
        };
        assert_eq!(
            source.source(),
            SectionSource::Readelf(Readelf::new("riscv32-unknown-elf-readelf"))
        );
    }
}
