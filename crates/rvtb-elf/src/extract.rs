//! Reading section contents as little-endian 32-bit words.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::section::SectionInfo;
use crate::{ElfError, Result};

/// Read `length / 4` consecutive little-endian words starting at byte `offset`.
///
/// A final word that runs past the end of the file is zero-filled; a word that
/// starts at or beyond the end of the file is an error.
///
/// # Panics
///
/// Panics if `length` is not a multiple of 4. Callers round section sizes up
/// before asking for words, so an unaligned length is a bug in the caller.
///
/// # Errors
///
/// Returns an error on I/O failure or if the range lies beyond the file.
pub fn extract_words(path: &Path, offset: u64, length: u64) -> Result<Vec<u32>> {
    assert!(
        length % 4 == 0,
        "can only read multiples of 4B words, but section length is {length} bytes"
    );

    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();
    if let Some(last_word) = (length / 4).checked_sub(1) {
        let last_start = offset.checked_add(last_word * 4);
        if last_start.is_none_or(|start| start >= file_len) {
            return Err(ElfError::RangeBeyondFile {
                offset,
                length,
                file_len,
            });
        }
    }

    file.seek(SeekFrom::Start(offset))?;
    let available = (file_len - offset.min(file_len)).min(length);
    let mut bytes = Vec::with_capacity(length as usize);
    file.take(available).read_to_end(&mut bytes)?;
    bytes.resize(length as usize, 0);

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Words making up one section, rounded up to a whole number of words.
///
/// `NOBITS` sections have no file contents and read as zeros.
///
/// # Errors
///
/// Propagates errors from [`extract_words`].
pub fn section_words(path: &Path, section: &SectionInfo) -> Result<Vec<u32>> {
    let length = section.word_len().ok_or(ElfError::SectionOutOfBounds)?;
    if section.is_nobits() {
        let words = usize::try_from(length / 4).map_err(|_| ElfError::SectionOutOfBounds)?;
        return Ok(vec![0; words]);
    }
    extract_words(path, section.offset, length)
}
