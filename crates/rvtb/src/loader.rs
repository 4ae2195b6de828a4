//! Loading ELF sections into simulated memory.
//!
//! A binary is turned into a [`MemoryImage`]: the allow-listed sections that
//! are present, in allow-list order, each with its target base address and
//! little-endian words. The image is then written through a [`WordWriter`]
//! into a live memory, or rendered as a `$readmemh` hex file.

use std::path::Path;

use rvtb_elf::{SectionSource, get_section_info, section_words};
use tracing::{debug, info};

use crate::Result;
use crate::memory::{BusInterface, MemoryError, WordArray};

/// Base address RISC-V test binaries are linked at.
///
/// The design's local memory starts at 0, so sections at or above this
/// address are moved down by it.
pub const LINKER_BASE_OFFSET: u64 = 0x8000_0000;

/// Sections loaded from riscv-tests style binaries, in load order.
pub const RISCV_TESTS_SECTIONS: &[&str] = &[
    ".text.init",
    ".text",
    ".text.startup",
    ".data",
    ".tohost",
    ".rodata",
    ".rodata.str1.4",
    ".sbss",
    ".bss",
    ".tbss",
];

/// Sections of a standalone firmware image, in load order.
pub const FIRMWARE_SECTIONS: &[&str] = &[".start", ".text", ".rodata", ".eh_frame"];

/// Map a linked address into the design's local address space.
#[must_use]
pub const fn translate_address(addr: u64) -> u64 {
    if addr >= LINKER_BASE_OFFSET {
        addr - LINKER_BASE_OFFSET
    } else {
        addr
    }
}

/// What to load from a binary and where to put it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadConfig {
    /// Section names to load, in order. Sections missing from the binary are skipped.
    pub sections: Vec<String>,
    /// Subtract [`LINKER_BASE_OFFSET`] from section addresses at or above it.
    pub translate_linker_offset: bool,
    /// How the section table is read.
    pub source: SectionSource,
}

impl LoadConfig {
    /// Loading riscv-tests and benchmark binaries into a processor's memory.
    #[must_use]
    pub fn riscv_tests() -> Self {
        Self {
            sections: RISCV_TESTS_SECTIONS.iter().map(ToString::to_string).collect(),
            translate_linker_offset: true,
            source: SectionSource::default(),
        }
    }

    /// Building a memory-initialization file for firmware linked at a low address.
    #[must_use]
    pub fn firmware() -> Self {
        Self {
            sections: FIRMWARE_SECTIONS.iter().map(ToString::to_string).collect(),
            translate_linker_offset: false,
            source: SectionSource::default(),
        }
    }

    /// Replace the section allow-list.
    #[must_use]
    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = sections.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_translation(mut self, translate: bool) -> Self {
        self.translate_linker_offset = translate;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: SectionSource) -> Self {
        self.source = source;
        self
    }

    /// Target address for a section linked at `addr`.
    #[must_use]
    pub const fn target_address(&self, addr: u64) -> u64 {
        if self.translate_linker_offset {
            translate_address(addr)
        } else {
            addr
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self::riscv_tests()
    }
}

/// One loaded section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSection {
    pub name: String,
    /// Target byte address of the first word.
    pub base_address: u64,
    pub words: Vec<u32>,
}

impl ImageSection {
    /// Target word address of the first word.
    #[must_use]
    pub const fn word_address(&self) -> u64 {
        self.base_address >> 2
    }

    /// Word address one past the last word.
    #[must_use]
    pub fn end_word(&self) -> u64 {
        self.word_address() + self.words.len() as u64
    }
}

/// Allow-listed sections of one binary, ready to be written to a target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryImage {
    sections: Vec<ImageSection>,
}

impl MemoryImage {
    /// Read the sections named by `config` out of the binary at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary is missing, its section table can't be
    /// read, or a section's contents lie outside the file.
    pub fn load(path: &Path, config: &LoadConfig) -> Result<Self> {
        let table = get_section_info(path, &config.source)?;

        let mut sections = Vec::new();
        for name in &config.sections {
            let Some(info) = table.get(name) else {
                debug!(section = %name, "section not present, skipping");
                continue;
            };
            sections.push(ImageSection {
                name: name.clone(),
                base_address: config.target_address(info.address),
                words: section_words(path, info)?,
            });
        }

        Ok(Self { sections })
    }

    #[must_use]
    pub fn sections(&self) -> &[ImageSection] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&ImageSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Total number of words across all sections.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.sections.iter().map(|s| s.words.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Write every section through `writer`, logging each one.
    ///
    /// # Errors
    ///
    /// Returns the first write the target rejects.
    pub fn write_to<W: WordWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        for section in &self.sections {
            info!(
                section = %section.name,
                words = section.words.len(),
                addr = %format!("{:#x}", writer.target_address(section.base_address)),
                "loading section"
            );
            writer.write_words(section.base_address, &section.words)?;
        }
        Ok(())
    }
}

impl FromIterator<ImageSection> for MemoryImage {
    fn from_iter<I: IntoIterator<Item = ImageSection>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

/// Strategy for writing consecutive words into a target memory.
pub trait WordWriter {
    /// Address the target is written at for a section based at byte address
    /// `base`, as reported in load messages.
    fn target_address(&self, base: u64) -> u64;

    /// Write `words` starting at byte address `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target rejects a write.
    fn write_words(&mut self, base: u64, words: &[u32]) -> Result<()>;
}

/// Writes into a word-indexed array; byte addresses become word indices.
#[derive(Debug)]
pub struct WordArrayWriter<'a, M: WordArray + ?Sized> {
    memory: &'a mut M,
}

impl<'a, M: WordArray + ?Sized> WordArrayWriter<'a, M> {
    #[must_use]
    pub const fn new(memory: &'a mut M) -> Self {
        Self { memory }
    }
}

impl<M: WordArray + ?Sized> WordWriter for WordArrayWriter<'_, M> {
    fn target_address(&self, base: u64) -> u64 {
        base >> 2
    }

    fn write_words(&mut self, base: u64, words: &[u32]) -> Result<()> {
        let start = base >> 2;
        let len = self.memory.len_words();
        let end = start.saturating_add(words.len() as u64);
        if end > len as u64 {
            return Err(MemoryError::IndexOutOfRange {
                index: start.max(len as u64),
                len,
            }
            .into());
        }
        for (index, &word) in (start..).zip(words) {
            self.memory.set_word(index, word)?;
        }
        Ok(())
    }
}

/// Writes through a bus model, one 4-byte write per word.
#[derive(Debug)]
pub struct BusWriter<'a, B: BusInterface + ?Sized> {
    bus: &'a mut B,
}

impl<'a, B: BusInterface + ?Sized> BusWriter<'a, B> {
    #[must_use]
    pub const fn new(bus: &'a mut B) -> Self {
        Self { bus }
    }
}

impl<B: BusInterface + ?Sized> WordWriter for BusWriter<'_, B> {
    fn target_address(&self, base: u64) -> u64 {
        base
    }

    fn write_words(&mut self, base: u64, words: &[u32]) -> Result<()> {
        for (addr, &word) in (base..).step_by(4).zip(words) {
            self.bus.write_dword(addr, word)?;
        }
        Ok(())
    }
}

/// Load the binary at `path` into a target memory.
///
/// # Errors
///
/// See [`MemoryImage::load`] and [`MemoryImage::write_to`].
pub fn load_binary_into_memory<W: WordWriter + ?Sized>(
    writer: &mut W,
    path: &Path,
    config: &LoadConfig,
) -> Result<MemoryImage> {
    let image = MemoryImage::load(path, config)?;
    image.write_to(writer)?;
    Ok(image)
}
