//! Section descriptors and the name-keyed section table.

use rustc_hash::FxHashMap;

/// One named section from an ELF section header table.
///
/// Built fresh for every load request and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionInfo {
    /// Position in the section header table.
    pub index: usize,
    /// Section name, e.g. `.text` or `.rodata.str1.4`.
    pub name: String,
    /// Section type as spelled by `readelf` (`PROGBITS`, `NOBITS`, ...).
    pub section_type: String,
    /// Virtual address of the first byte.
    pub address: u64,
    /// Byte offset of the section contents within the file.
    pub offset: u64,
    /// Byte length of the section contents.
    pub size: u64,
    /// Element size for table-like sections, 0 otherwise.
    pub entry_size: u64,
}

impl SectionInfo {
    /// Sections of type `NOBITS` occupy memory but no file bytes.
    #[must_use]
    pub fn is_nobits(&self) -> bool {
        self.section_type == "NOBITS"
    }

    /// Byte length to request when reading this section as whole words.
    ///
    /// `None` if rounding the size up overflows.
    #[must_use]
    pub const fn word_len(&self) -> Option<u64> {
        self.size.checked_next_multiple_of(4)
    }

    /// Number of 32-bit words this section occupies once rounded up.
    #[must_use]
    pub const fn word_count(&self) -> Option<u64> {
        match self.word_len() {
            Some(len) => Some(len / 4),
            None => None,
        }
    }
}

/// Sections of one binary, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct SectionTable {
    sections: FxHashMap<String, SectionInfo>,
}

impl SectionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a section. A later section with the same name replaces the earlier one.
    pub fn insert(&mut self, info: SectionInfo) {
        self.sections.insert(info.name.clone(), info);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SectionInfo> {
        self.sections.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// All sections ordered by their position in the header table.
    #[must_use]
    pub fn iter_by_index(&self) -> Vec<&SectionInfo> {
        let mut sections: Vec<_> = self.sections.values().collect();
        sections.sort_by_key(|s| s.index);
        sections
    }
}

impl FromIterator<SectionInfo> for SectionTable {
    fn from_iter<I: IntoIterator<Item = SectionInfo>>(iter: I) -> Self {
        let mut table = Self::new();
        for info in iter {
            table.insert(info);
        }
        table
    }
}
