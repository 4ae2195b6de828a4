//! Trace records and their JSON file format.
//!
//! A trace file is a JSON array of objects:
//!
//! ```json
//! [
//!   {
//!     "cycle": 7,
//!     "trace_writeback_pc": "0x80000004",
//!     "trace_writeback_insn": "0x00100093",
//!     "trace_writeback_cycle_status": 1
//!   }
//! ]
//! ```
//!
//! Older traces store the status as comma-joined flag names
//! (`"CYCLE_NO_STALL"`); both forms are accepted when reading.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Result;
use crate::status::EnumTable;

/// Writeback cycle status as stored in a trace file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusField {
    /// Raw bit-flag value.
    Raw(u32),
    /// Comma-joined flag names (legacy format).
    Symbolic(String),
}

impl StatusField {
    /// Bit-flag value, resolving symbolic names through `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is symbolic and no table is given, or a
    /// name is missing from the table.
    pub fn to_bits(&self, table: Option<&EnumTable>) -> Result<u32> {
        match self {
            Self::Raw(bits) => Ok(*bits),
            Self::Symbolic(names) => table
                .ok_or(crate::TraceError::MissingEnumTable)?
                .encode(names),
        }
    }
}

/// One retired instruction as seen at the writeback stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Simulation cycle at retirement.
    pub cycle: u64,
    #[serde(
        rename = "trace_writeback_pc",
        serialize_with = "serialize_pc",
        deserialize_with = "deserialize_hex"
    )]
    pub writeback_pc: u32,
    #[serde(
        rename = "trace_writeback_insn",
        serialize_with = "serialize_insn",
        deserialize_with = "deserialize_hex"
    )]
    pub writeback_insn: u32,
    #[serde(rename = "trace_writeback_cycle_status")]
    pub cycle_status: StatusField,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_pc<S: Serializer>(pc: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{pc:#x}"))
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_insn<S: Serializer>(
    insn: &u32,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{insn:#010x}"))
}

fn deserialize_hex<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_hex(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid hex value {text:?}")))
}

/// Parse a hex string with or without a `0x` prefix.
#[must_use]
pub fn parse_hex(text: &str) -> Option<u32> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

/// Ordered, append-only sequence of trace records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    records: Vec<TraceRecord>,
}

impl Trace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TraceRecord> {
        self.records.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// Read a trace file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or isn't a valid trace.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the trace as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl FromIterator<TraceRecord> for Trace {
    fn from_iter<I: IntoIterator<Item = TraceRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TraceRecord;
    type IntoIter = std::slice::Iter<'a, TraceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
