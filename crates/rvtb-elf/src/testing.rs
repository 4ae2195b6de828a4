//! Minimal ELF32 image builder for tests.
//!
//! Lays out the file the way a linker would for a bare-metal RISC-V test:
//! file header, section contents from a page-aligned offset, the section name
//! table, then the section header table at the end.

use crate::constants::*;

const CONTENT_OFFSET: usize = 0x1000;

#[derive(Clone, Debug)]
struct PendingSection {
    name: String,
    sh_type: u32,
    flags: u32,
    addr: u32,
    data: Vec<u8>,
    nobits_size: u32,
    entsize: u32,
}

/// Builder for little-endian RISC-V ELF32 images with arbitrary sections.
#[derive(Clone, Debug)]
pub struct ElfBuilder {
    sections: Vec<PendingSection>,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation)]
impl ElfBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Add an allocated `PROGBITS` section.
    #[must_use]
    pub fn section(self, name: &str, addr: u32, data: &[u8]) -> Self {
        self.typed_section(name, SHT_PROGBITS, addr, data)
    }

    /// Add a section of an explicit type (e.g. `SHT_SYMTAB` for `.symtab`).
    #[must_use]
    pub fn typed_section(mut self, name: &str, sh_type: u32, addr: u32, data: &[u8]) -> Self {
        let flags = if sh_type == SHT_PROGBITS && addr != 0 {
            SHF_ALLOC as u32
        } else {
            0
        };
        self.sections.push(PendingSection {
            name: name.to_string(),
            sh_type,
            flags,
            addr,
            data: data.to_vec(),
            nobits_size: 0,
            entsize: 0,
        });
        self
    }

    /// Add a zero-initialized `NOBITS` section of `size` bytes.
    #[must_use]
    pub fn nobits(mut self, name: &str, addr: u32, size: u32) -> Self {
        self.sections.push(PendingSection {
            name: name.to_string(),
            sh_type: SHT_NOBITS,
            flags: (SHF_ALLOC | SHF_WRITE) as u32,
            addr,
            data: Vec::new(),
            nobits_size: size,
            entsize: 0,
        });
        self
    }

    /// Serialize the image.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut out = vec![0u8; CONTENT_OFFSET];

        // Section contents.
        let mut placed = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            align_to(&mut out, 4);
            let offset = out.len() as u32;
            let size = if section.sh_type == SHT_NOBITS {
                section.nobits_size
            } else {
                out.extend_from_slice(&section.data);
                section.data.len() as u32
            };
            placed.push((offset, size));
        }

        // Section name table: null name, user sections, then itself.
        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(section.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");
        let shstrtab_offset = out.len() as u32;
        out.extend_from_slice(&shstrtab);

        // Section header table.
        align_to(&mut out, 4);
        let shoff = out.len() as u32;
        out.extend_from_slice(&[0u8; ELF32_SHDR_SIZE]);
        for ((section, (offset, size)), name) in
            self.sections.iter().zip(&placed).zip(&name_offsets)
        {
            push_shdr(
                &mut out,
                &[
                    *name,
                    section.sh_type,
                    section.flags,
                    section.addr,
                    *offset,
                    *size,
                    0,
                    0,
                    4,
                    section.entsize,
                ],
            );
        }
        push_shdr(
            &mut out,
            &[
                shstrtab_name,
                SHT_STRTAB,
                0,
                0,
                shstrtab_offset,
                shstrtab.len() as u32,
                0,
                0,
                1,
                0,
            ],
        );

        let shnum = (self.sections.len() + 2) as u16;
        write_header(&mut out, shoff, shnum, shnum - 1);
        out
    }
}

fn align_to(out: &mut Vec<u8>, align: usize) {
    while out.len() % align != 0 {
        out.push(0);
    }
}

fn push_shdr(out: &mut Vec<u8>, fields: &[u32; 10]) {
    for field in fields {
        out.extend_from_slice(&field.to_le_bytes());
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_header(out: &mut [u8], shoff: u32, shnum: u16, shstrndx: u16) {
    out[0..4].copy_from_slice(&ELF_MAGIC.to_le_bytes());
    out[4] = ELF_CLASS_32;
    out[5] = ELF_DATA_LSB;
    out[6] = ELF_VERSION_CURRENT;
    out[16..18].copy_from_slice(&ELF_TYPE_EXEC.to_le_bytes());
    out[18..20].copy_from_slice(&ELF_MACHINE_RISCV.to_le_bytes());
    out[20..24].copy_from_slice(&1u32.to_le_bytes());
    out[32..36].copy_from_slice(&shoff.to_le_bytes());
    out[40..42].copy_from_slice(&(ELF32_HEADER_SIZE as u16).to_le_bytes());
    out[46..48].copy_from_slice(&(ELF32_SHDR_SIZE as u16).to_le_bytes());
    out[48..50].copy_from_slice(&shnum.to_le_bytes());
    out[50..52].copy_from_slice(&shstrndx.to_le_bytes());
}
