//! Section tables from `readelf --wide --sections`.
//!
//! The binutils tool is the reference for what a RISC-V GNU toolchain thinks
//! the sections are; [`SectionSource::Native`] reads the same information
//! without spawning a process.

use std::path::Path;
use std::process::Command;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error};

use crate::file::parse_sections;
use crate::section::{SectionInfo, SectionTable};
use crate::{ElfError, Result};

/// Default binutils `readelf` for bare-metal RISC-V.
pub const DEFAULT_READELF: &str = "riscv64-unknown-elf-readelf";

static SECTION_LINE: OnceLock<Regex> = OnceLock::new();

/// `readelf` command to invoke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Readelf {
    command: String,
}

impl Readelf {
    /// Create a wrapper around the given command (name or path).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Command to invoke.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the tool over `path` and parse its section listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be spawned or exits non-zero.
    pub fn sections(&self, path: &Path) -> Result<SectionTable> {
        debug!(tool = %self.command, path = %path.display(), "reading section headers");

        let output = Command::new(&self.command)
            .arg("--wide")
            .arg("--sections")
            .arg(path)
            .output()
            .map_err(|e| ElfError::ToolSpawn {
                tool: self.command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(tool = %self.command, "{}", stderr.trim_end());
            return Err(ElfError::ToolFailed {
                tool: self.command.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(parse_readelf_sections(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

impl Default for Readelf {
    fn default() -> Self {
        Self::new(DEFAULT_READELF)
    }
}

impl FromStr for Readelf {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("readelf command cannot be empty".to_string());
        }
        Ok(Self::new(s))
    }
}

impl std::fmt::Display for Readelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)
    }
}

/// Parse the tabular output of `readelf --wide --sections`.
///
/// Matches lines of the form
/// `[Nr] Name Type Addr Off Size ES ...` where the name starts with `.` and the
/// numeric columns are hexadecimal. Banner, header and flag-key lines don't
/// match and are skipped.
#[must_use]
pub fn parse_readelf_sections(output: &str) -> SectionTable {
    let pattern = SECTION_LINE.get_or_init(|| {
        Regex::new(
            r"\[\s*(\d+)\]\s+([.]\S+)\s+(\S*)\s+([0-9a-fA-F]+)\s+([0-9a-fA-F]+)\s+([0-9a-fA-F]+)\s+(\S*)",
        )
        .unwrap()
    });

    output
        .lines()
        .filter_map(|line| {
            let caps = pattern.captures(line)?;
            Some(SectionInfo {
                index: caps[1].parse().ok()?,
                name: caps[2].to_string(),
                section_type: caps[3].to_string(),
                address: u64::from_str_radix(&caps[4], 16).ok()?,
                offset: u64::from_str_radix(&caps[5], 16).ok()?,
                size: u64::from_str_radix(&caps[6], 16).ok()?,
                entry_size: u64::from_str_radix(&caps[7], 16).ok()?,
            })
        })
        .collect()
}

/// Where section information comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionSource {
    /// Spawn binutils `readelf`.
    Readelf(Readelf),
    /// Parse the section header table in-process.
    Native,
}

impl Default for SectionSource {
    fn default() -> Self {
        Self::Readelf(Readelf::default())
    }
}

/// Describe every named section of the binary at `path`.
///
/// # Errors
///
/// Returns [`ElfError::BinaryNotFound`] if the file doesn't exist, and
/// propagates tool failures or parse errors.
pub fn get_section_info(path: &Path, source: &SectionSource) -> Result<SectionTable> {
    if !path.exists() {
        return Err(ElfError::BinaryNotFound(path.to_path_buf()));
    }

    match source {
        SectionSource::Readelf(tool) => tool.sections(path),
        SectionSource::Native => parse_sections(&std::fs::read(path)?),
    }
}
