//! `$readmemh` memory-initialization files.
//!
//! One 8-digit hex word per line. An `@<word address>` line moves the load
//! position whenever a section doesn't start right after the previous word.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{error, info};

use crate::loader::{LoadConfig, MemoryImage};
use crate::{Error, Result};

impl MemoryImage {
    /// Check that every non-empty section fits below `max_words`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] for the first section that ends past
    /// the end of the target memory.
    pub fn check_capacity(&self, max_words: u64) -> Result<()> {
        for section in self.sections().iter().filter(|s| !s.words.is_empty()) {
            let end_word = section.end_word();
            if end_word > max_words {
                error!(
                    "code reaches address {end_word} but we can only handle up to {max_words}"
                );
                return Err(Error::CapacityExceeded {
                    section: section.name.clone(),
                    end_word,
                    max_words,
                });
            }
        }
        Ok(())
    }

    /// Render the image in `$readmemh` format.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_hex<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let mut cursor = 0u64;
        // Empty sections write nothing, so they never move the load position.
        for section in self.sections().iter().filter(|s| !s.words.is_empty()) {
            let start = section.word_address();
            if start != cursor {
                writeln!(out, "@{start:x}")?;
                cursor = start;
            }
            for word in &section.words {
                writeln!(out, "{word:08x}")?;
            }
            cursor += section.words.len() as u64;
        }
        Ok(())
    }
}

/// Write the sections of the binary at `path` to a `$readmemh` file for a
/// memory of `max_words` words.
///
/// Nothing is written if any section would land past the end of the memory.
///
/// # Errors
///
/// Returns [`Error::CapacityExceeded`] if the image doesn't fit, and
/// propagates load and IO errors.
pub fn load_binary_into_hex_file(
    path: &Path,
    hex_path: &Path,
    max_words: u64,
    config: &LoadConfig,
) -> Result<MemoryImage> {
    let image = MemoryImage::load(path, config)?;
    image.check_capacity(max_words)?;

    for section in image.sections() {
        info!(
            section = %section.name,
            words = section.words.len(),
            addr = %format!("{:#x}", section.base_address),
            "writing section"
        );
    }

    let mut out = BufWriter::new(File::create(hex_path)?);
    image.write_hex(&mut out)?;
    out.flush()?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ImageSection;
    use rvtb_elf::SectionSource;
    use rvtb_elf::testing::ElfBuilder;

    fn section(name: &str, base_address: u64, words: &[u32]) -> ImageSection {
        ImageSection {
            name: name.to_string(),
            base_address,
            words: words.to_vec(),
        }
    }

    fn image(sections: Vec<ImageSection>) -> MemoryImage {
        sections.into_iter().collect()
    }

    fn render(image: &MemoryImage) -> String {
        let mut out = Vec::new();
        image.write_hex(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_contiguous_sections_have_no_marker() {
        let image = image(vec![
            section(".start", 0, &[0x0000_0297, 0x0102_8293]),
            section(".text", 8, &[0x0000_0013]),
        ]);
        assert_eq!(render(&image), "00000297\n01028293\n00000013\n");
    }

    #[test]
    fn test_gap_emits_word_address_marker() {
        let image = image(vec![
            section(".text", 0, &[0x13]),
            section(".rodata", 0x100, &[0xdead_beef, 0x1]),
        ]);
        assert_eq!(render(&image), "00000013\n@40\ndeadbeef\n00000001\n");
    }

    #[test]
    fn test_first_section_above_zero() {
        let image = image(vec![
            section(".text", 0x20, &[0x13]),
            section(".rodata", 0x24, &[0x14]),
        ]);
        assert_eq!(render(&image), "@8\n00000013\n00000014\n");
    }

    #[test]
    fn test_empty_section_emits_no_marker() {
        let image = image(vec![
            section(".start", 0, &[1, 2]),
            section(".text", 0x100, &[]),
            section(".rodata", 8, &[3]),
        ]);
        assert_eq!(render(&image), "00000001\n00000002\n00000003\n");
        assert!(image.check_capacity(3).is_ok());
    }

    #[test]
    fn test_capacity() {
        let image = image(vec![
            section(".text", 0, &[0; 4]),
            section(".rodata", 0x40, &[0; 4]),
        ]);
        assert!(image.check_capacity(20).is_ok());
        let err = image.check_capacity(19).unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded { ref section, end_word: 20, max_words: 19 } if section == ".rodata"
        ));
    }

    #[test]
    fn test_hex_file_from_binary() {
        let dir = tempfile::tempdir().unwrap();
        let elf = dir.path().join("firmware.elf");
        let bytes = ElfBuilder::new()
            .section(".start", 0, &[0x97, 0x02, 0x00, 0x00])
            .section(".text", 4, &[0x13, 0x00, 0x00, 0x00])
            .section(".comment", 0, b"GCC: 13.2.0")
            .section(".rodata", 0x40, &[0x01, 0x00, 0x00, 0x00])
            .build();
        std::fs::write(&elf, bytes).unwrap();
        let hex = dir.path().join("mem_initial_contents.hex");

        let config = LoadConfig::firmware().with_source(SectionSource::Native);
        load_binary_into_hex_file(&elf, &hex, 1024, &config).unwrap();

        let text = std::fs::read_to_string(&hex).unwrap();
        assert_eq!(text, "00000297\n00000013\n@10\n00000001\n");
    }

    #[test]
    fn test_over_capacity_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let elf = dir.path().join("firmware.elf");
        std::fs::write(
            &elf,
            ElfBuilder::new().section(".text", 0x10, &[0; 16]).build(),
        )
        .unwrap();
        let hex = dir.path().join("mem_initial_contents.hex");

        let config = LoadConfig::firmware().with_source(SectionSource::Native);
        let err = load_binary_into_hex_file(&elf, &hex, 7, &config).unwrap_err();

        assert!(matches!(err, Error::CapacityExceeded { end_word: 8, .. }));
        assert!(!hex.exists());
    }
}
