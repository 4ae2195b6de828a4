//! ELF header structures.

/// The subset of the ELF file header needed to walk the section table.
#[derive(Clone, Debug)]
pub struct ElfHeader {
    pub class: u8,
    pub data: u8,
    pub e_type: u16,
    pub machine: u16,
    pub shoff: u64,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl ElfHeader {
    /// Check whether this is a 64-bit ELF.
    #[must_use]
    pub const fn is_64(&self) -> bool {
        self.class == crate::ELF_CLASS_64
    }
}

/// Section header, widened to 64-bit fields for both ELF classes.
#[derive(Clone, Debug)]
pub struct SectionHeader {
    pub name: u32,
    pub sh_type: u32,
    pub flags: u64,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}
