//! Status bit-flag names scraped from a SystemVerilog `typedef enum`.
//!
//! The pipeline reports a per-cycle writeback status as a set of bit flags
//! (`cycle_status_e`). The table maps flag names to their bit values so traces
//! can carry or display readable names instead of raw integers.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::{Result, TraceError};

/// Name of the writeback status enum in the processor sources.
pub const CYCLE_STATUS_ENUM: &str = "cycle_status_e";

static COMMENT: OnceLock<Regex> = OnceLock::new();
static TYPEDEF_ENUM: OnceLock<Regex> = OnceLock::new();
static IDENT: OnceLock<Regex> = OnceLock::new();

/// Ordered flag-name to bit-value mapping for one enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumTable {
    name: String,
    entries: Vec<(String, u32)>,
}

impl EnumTable {
    /// Build a table from explicit entries, kept in the given order.
    pub fn from_entries<N, I>(name: impl Into<String>, entries: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, u32)>,
    {
        Self {
            name: name.into(),
            entries: entries.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }

    /// Find `typedef enum ... { ... } <enum_name>;` in `source` and read its members.
    ///
    /// Members without an explicit value take the previous value plus one, as
    /// in SystemVerilog. Values may be plain decimal, `0x` hex, or based
    /// literals such as `4'b0010`, `'h8` or `8'd3`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::EnumNotFound`] if no such typedef exists and
    /// [`TraceError::InvalidEnumValue`] for values that aren't integer literals.
    pub fn parse(source: &str, enum_name: &str) -> Result<Self> {
        let comment = COMMENT.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").unwrap());
        let typedef = TYPEDEF_ENUM.get_or_init(|| {
            Regex::new(r"(?s)typedef\s+enum\b[^{;]*\{([^}]*)\}\s*(\w+)\s*;").unwrap()
        });
        let ident = IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_]\w*$").unwrap());

        let source = comment.replace_all(source, "");
        let body = typedef
            .captures_iter(&source)
            .find(|caps| &caps[2] == enum_name)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| TraceError::EnumNotFound(enum_name.to_string()))?;

        let mut entries = Vec::new();
        let mut next = 0u32;
        for member in body.split(',').map(str::trim).filter(|m| !m.is_empty()) {
            let (name, value) = match member.split_once('=') {
                Some((name, literal)) => {
                    let name = name.trim();
                    let value = parse_literal(literal.trim()).ok_or_else(|| {
                        TraceError::InvalidEnumValue {
                            name: name.to_string(),
                            value: literal.trim().to_string(),
                        }
                    })?;
                    (name, value)
                }
                None => (member, next),
            };
            if !ident.is_match(name) {
                continue;
            }
            entries.push((name.to_string(), value));
            next = value.wrapping_add(1);
        }

        Ok(Self {
            name: enum_name.to_string(),
            entries,
        })
    }

    /// Read and parse the enum from a source file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be read, or any error from [`Self::parse`].
    pub fn from_file(path: &Path, enum_name: &str) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, enum_name)
    }

    /// The `cycle_status_e` table from a processor source file.
    ///
    /// # Errors
    ///
    /// See [`Self::from_file`].
    pub fn cycle_status(path: &Path) -> Result<Self> {
        Self::from_file(path, CYCLE_STATUS_ENUM)
    }

    /// Enum type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    /// Bit value of a flag.
    #[must_use]
    pub fn value(&self, flag: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name == flag)
            .map(|(_, value)| *value)
    }

    /// Names of every flag sharing at least one set bit with `value`, in table order.
    #[must_use]
    pub fn decode_names(&self, value: u32) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, bits)| value & bits != 0)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Comma-joined flag names for `value`.
    #[must_use]
    pub fn decode(&self, value: u32) -> String {
        self.decode_names(value).join(",")
    }

    /// OR together the bit values of a comma-separated list of flag names.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::UnknownFlag`] for a name not in the table.
    pub fn encode(&self, names: &str) -> Result<u32> {
        names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .try_fold(0, |acc, name| {
                self.value(name)
                    .map(|bits| acc | bits)
                    .ok_or_else(|| TraceError::UnknownFlag {
                        flag: name.to_string(),
                        enum_name: self.name.clone(),
                    })
            })
    }
}

/// Parse a decimal, `0x` hex, or SystemVerilog based integer literal.
fn parse_literal(literal: &str) -> Option<u32> {
    let literal = literal.replace('_', "");
    if let Some((_size, based)) = literal.split_once('\'') {
        let based = based.strip_prefix(['s', 'S']).unwrap_or(based);
        let mut chars = based.chars();
        let radix = match chars.next()?.to_ascii_lowercase() {
            'b' => 2,
            'o' => 8,
            'd' => 10,
            'h' => 16,
            _ => return None,
        };
        return u32::from_str_radix(chars.as_str(), radix).ok();
    }
    if let Some(hex) = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16).ok();
    }
    literal.parse().ok()
}
