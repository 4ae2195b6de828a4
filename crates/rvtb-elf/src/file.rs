//! Native section header table parser.
//!
//! Produces the same [`SectionTable`] as the `readelf` front end, but straight
//! from the file bytes, so binaries can be loaded without binutils installed.

use crate::constants::*;
use crate::header::{ElfHeader, SectionHeader};
use crate::section::{SectionInfo, SectionTable};
use crate::{ElfError, Result};

/// Read little-endian u16 from bytes.
#[inline]
fn read_le16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Read little-endian u32 from bytes.
#[inline]
fn read_le32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Read little-endian u64 from bytes.
#[inline]
fn read_le64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Parse the section header table of an ELF image.
///
/// Sections with an empty name (the null section) are left out, matching what
/// the `readelf` front end reports.
///
/// # Errors
///
/// Returns an error if the header is truncated or malformed, or if the section
/// header table lies outside the data.
pub fn parse_sections(data: &[u8]) -> Result<SectionTable> {
    let header = parse_header(data)?;
    let headers = parse_section_headers(data, &header)?;

    let mut table = SectionTable::new();
    let Some(strtab) = headers.get(header.shstrndx as usize) else {
        return Ok(table);
    };
    let strtab_offset = usize::try_from(strtab.offset).unwrap_or(usize::MAX);

    for (index, sh) in headers.iter().enumerate() {
        let name = extract_string(data, strtab_offset, sh.name as usize);
        if name.is_empty() {
            continue;
        }
        table.insert(SectionInfo {
            index,
            name,
            section_type: section_type_name(sh.sh_type),
            address: sh.addr,
            offset: sh.offset,
            size: sh.size,
            entry_size: sh.entsize,
        });
    }

    Ok(table)
}

fn parse_header(data: &[u8]) -> Result<ElfHeader> {
    if data.len() < 6 {
        return Err(ElfError::TooSmall);
    }

    if read_le32(data, 0) != ELF_MAGIC {
        return Err(ElfError::InvalidMagic);
    }

    let class = data[4];
    let data_encoding = data[5];
    if data_encoding != ELF_DATA_LSB {
        return Err(ElfError::NotLittleEndian);
    }

    match class {
        ELF_CLASS_32 => {
            if data.len() < ELF32_HEADER_SIZE {
                return Err(ElfError::TooSmall);
            }
            Ok(ElfHeader {
                class,
                data: data_encoding,
                e_type: read_le16(data, 16),
                machine: read_le16(data, 18),
                shoff: u64::from(read_le32(data, 32)),
                shentsize: read_le16(data, 46),
                shnum: read_le16(data, 48),
                shstrndx: read_le16(data, 50),
            })
        }
        ELF_CLASS_64 => {
            if data.len() < ELF64_HEADER_SIZE {
                return Err(ElfError::TooSmall);
            }
            Ok(ElfHeader {
                class,
                data: data_encoding,
                e_type: read_le16(data, 16),
                machine: read_le16(data, 18),
                shoff: read_le64(data, 40),
                shentsize: read_le16(data, 58),
                shnum: read_le16(data, 60),
                shstrndx: read_le16(data, 62),
            })
        }
        other => Err(ElfError::UnsupportedClass(other)),
    }
}

fn parse_section_headers(data: &[u8], header: &ElfHeader) -> Result<Vec<SectionHeader>> {
    let mut sections = Vec::with_capacity(header.shnum as usize);

    let shoff = usize::try_from(header.shoff).map_err(|_| ElfError::SectionOutOfBounds)?;
    for i in 0..header.shnum {
        let offset = (i as usize)
            .checked_mul(header.shentsize as usize)
            .and_then(|rel| shoff.checked_add(rel))
            .ok_or(ElfError::SectionOutOfBounds)?;
        sections.push(parse_section_header(data, offset, header.is_64())?);
    }

    Ok(sections)
}

fn parse_section_header(data: &[u8], offset: usize, is_64: bool) -> Result<SectionHeader> {
    let size = if is_64 { ELF64_SHDR_SIZE } else { ELF32_SHDR_SIZE };
    if offset.checked_add(size).is_none_or(|end| end > data.len()) {
        return Err(ElfError::SectionOutOfBounds);
    }

    if is_64 {
        Ok(SectionHeader {
            name: read_le32(data, offset),
            sh_type: read_le32(data, offset + 4),
            flags: read_le64(data, offset + 8),
            addr: read_le64(data, offset + 16),
            offset: read_le64(data, offset + 24),
            size: read_le64(data, offset + 32),
            link: read_le32(data, offset + 40),
            info: read_le32(data, offset + 44),
            addralign: read_le64(data, offset + 48),
            entsize: read_le64(data, offset + 56),
        })
    } else {
        Ok(SectionHeader {
            name: read_le32(data, offset),
            sh_type: read_le32(data, offset + 4),
            flags: u64::from(read_le32(data, offset + 8)),
            addr: u64::from(read_le32(data, offset + 12)),
            offset: u64::from(read_le32(data, offset + 16)),
            size: u64::from(read_le32(data, offset + 20)),
            link: read_le32(data, offset + 24),
            info: read_le32(data, offset + 28),
            addralign: u64::from(read_le32(data, offset + 32)),
            entsize: u64::from(read_le32(data, offset + 36)),
        })
    }
}

fn extract_string(data: &[u8], strtab_offset: usize, string_offset: usize) -> String {
    let Some(start) = strtab_offset
        .checked_add(string_offset)
        .filter(|&start| start < data.len())
    else {
        return String::new();
    };

    let end = data[start..]
        .iter()
        .position(|&b| b == 0)
        .map_or(data.len(), |len| start + len);
    String::from_utf8_lossy(&data[start..end]).into_owned()
}
