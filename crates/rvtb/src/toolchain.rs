//! GNU RISC-V toolchain front ends: assembling snippets and loading them.

use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::str::FromStr;

use rvtb_elf::{Readelf, SectionSource};
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::loader::{LoadConfig, MemoryImage, WordWriter, load_binary_into_memory};
use crate::{Error, Result};

/// Tool prefix of the bare-metal RISC-V GNU toolchain.
pub const DEFAULT_PREFIX: &str = "riscv64-unknown-elf-";

/// Default ISA string passed to the assembler.
pub const DEFAULT_MARCH: &str = "rv32im";

/// GNU `as` invocation for RISC-V snippets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembler {
    command: String,
    march: String,
}

impl Assembler {
    /// Create an assembler with the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            march: DEFAULT_MARCH.to_string(),
        }
    }

    /// Set the `-march` ISA string.
    #[must_use]
    pub fn with_march(mut self, march: impl Into<String>) -> Self {
        self.march = march.into();
        self
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn march(&self) -> &str {
        &self.march
    }

    /// Assemble `source` into a temporary object file.
    ///
    /// The source is fed on standard input, with a trailing newline added if
    /// missing. The object file is removed when the returned handle drops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssemblerFailed`] with the assembler's diagnostics if
    /// it exits non-zero.
    pub fn assemble(&self, source: &str) -> Result<NamedTempFile> {
        let object = tempfile::Builder::new()
            .prefix(".tmp.riscv")
            .suffix(".o")
            .tempfile()?;

        debug!(tool = %self.command, march = %self.march, object = %object.path().display(), "assembling");

        let mut child = Command::new(&self.command)
            .arg(format!("-march={}", self.march))
            .arg("-o")
            .arg(object.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ToolSpawn {
                tool: self.command.clone(),
                source: e,
            })?;

        // Stdin is fed from its own thread while the output pipes drain.
        let feeder = child.stdin.take().map(|mut stdin| {
            let mut text = source.to_owned();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            std::thread::spawn(move || stdin.write_all(text.as_bytes()))
        });

        let output = child.wait_with_output()?;
        if let Some(feeder) = feeder {
            let written = feeder
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            // An assembler that exits early closes the pipe; its status says why.
            written.or_else(|e| {
                if e.kind() == ErrorKind::BrokenPipe {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(tool = %self.command, "{}", stderr.trim_end());
            return Err(Error::AssemblerFailed {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(object)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(format!("{DEFAULT_PREFIX}as"))
    }
}

impl FromStr for Assembler {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("assembler command cannot be empty".to_string());
        }
        Ok(Self::new(s))
    }
}

impl std::fmt::Display for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)
    }
}

/// The external tools the loader drives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Toolchain {
    pub assembler: Assembler,
    pub readelf: Readelf,
}

impl Toolchain {
    /// Derive every tool from a GNU prefix, e.g. `riscv32-unknown-elf-`.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            assembler: Assembler::new(format!("{prefix}as")),
            readelf: Readelf::new(format!("{prefix}readelf")),
        }
    }

    /// Check that every tool can be found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] naming the first missing tool.
    pub fn verify(&self) -> Result<()> {
        for tool in [self.assembler.command(), self.readelf.command()] {
            let path =
                which::which(tool).map_err(|_| Error::ToolNotFound(tool.to_string()))?;
            debug!(tool, path = %path.display(), "found tool");
        }
        Ok(())
    }

    /// Section table source backed by this toolchain's `readelf`.
    #[must_use]
    pub fn section_source(&self) -> SectionSource {
        SectionSource::Readelf(self.readelf.clone())
    }
}

/// Assemble `source` for RV32IM and load it into a target memory.
///
/// # Errors
///
/// Propagates assembler, section table and target write failures.
pub fn asm<W: WordWriter + ?Sized>(
    writer: &mut W,
    source: &str,
    toolchain: &Toolchain,
) -> Result<MemoryImage> {
    let object = toolchain.assembler.assemble(source)?;
    let config = LoadConfig::riscv_tests().with_source(toolchain.section_source());
    load_binary_into_memory(writer, object.path(), &config)
}

/// Words of the section `name` in the binary at `path`.
///
/// # Errors
///
/// Returns [`Error::SectionNotFound`] if the binary has no such section.
pub fn dump_section(path: &Path, name: &str, source: &SectionSource) -> Result<Vec<u32>> {
    let table = rvtb_elf::get_section_info(path, source)?;
    let info = table
        .get(name)
        .ok_or_else(|| Error::SectionNotFound(name.to_string()))?;
    Ok(rvtb_elf::section_words(path, info)?)
}
