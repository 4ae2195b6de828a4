//! Per-cycle trace capture and comparison.

use std::str::FromStr;

use tracing::{debug, error, trace};

use crate::probe::RetireProbe;
use crate::record::{StatusField, Trace, TraceRecord};
use crate::status::EnumTable;
use crate::{Result, TraceError};

/// What to do with the trace each cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceMode {
    /// Neither record nor check.
    #[default]
    Off,
    /// Append the writeback state to the trace.
    Generate,
    /// Check the writeback state against a reference trace.
    Compare,
}

impl TraceMode {
    /// Map a mode name to a mode. Anything other than `generate` or `compare`
    /// (including no name at all) turns tracing off.
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("generate") => Self::Generate,
            Some("compare") => Self::Compare,
            Some(other) => {
                debug!(mode = other, "unrecognized tracing mode, tracing disabled");
                Self::Off
            }
            None => Self::Off,
        }
    }
}

impl FromStr for TraceMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_name(Some(s)))
    }
}

impl std::fmt::Display for TraceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Generate => write!(f, "generate"),
            Self::Compare => write!(f, "compare"),
        }
    }
}

/// How generated traces store the cycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFormat {
    /// Raw integer.
    #[default]
    Raw,
    /// Comma-joined flag names; needs an enum table.
    Symbolic,
}

/// Trace handling configuration, built once per test run.
#[derive(Clone, Debug, Default)]
pub struct TraceConfig {
    pub mode: TraceMode,
    pub status_format: StatusFormat,
    /// Status flag names, used for symbolic traces and for readable mismatch messages.
    pub enum_table: Option<EnumTable>,
}

impl TraceConfig {
    #[must_use]
    pub fn new(mode: TraceMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_status_format(mut self, format: StatusFormat) -> Self {
        self.status_format = format;
        self
    }

    #[must_use]
    pub fn with_enum_table(mut self, table: EnumTable) -> Self {
        self.enum_table = Some(table);
        self
    }
}

/// Field of a trace record that diverged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceField {
    Pc,
    Insn,
    CycleStatus,
}

impl std::fmt::Display for TraceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pc => write!(f, "writeback PC"),
            Self::Insn => write!(f, "writeback insn"),
            Self::CycleStatus => write!(f, "writeback cycle status"),
        }
    }
}

/// Record or check one cycle of writeback state.
///
/// In generate mode a record is appended to `trace`; in compare mode
/// `trace[trace_idx]` is checked field by field against `dut`, failing on the
/// first difference with the reference record's cycle number.
///
/// # Errors
///
/// Returns [`TraceError::Mismatch`] on divergence, [`TraceError::TraceExhausted`]
/// if the reference trace has no record at `trace_idx`, and table errors for
/// symbolic statuses.
pub fn handle_trace<P: RetireProbe + ?Sized>(
    dut: &P,
    trace: &mut Trace,
    trace_idx: usize,
    config: &TraceConfig,
) -> Result<()> {
    match config.mode {
        TraceMode::Off => Ok(()),
        TraceMode::Generate => {
            let record = capture(dut, config)?;
            trace!(cycle = record.cycle, pc = %format!("{:#x}", record.writeback_pc), "trace record");
            trace.push(record);
            Ok(())
        }
        TraceMode::Compare => {
            let expected = trace.get(trace_idx).ok_or(TraceError::TraceExhausted {
                index: trace_idx,
                len: trace.len(),
            })?;
            compare_record(expected, dut, config.enum_table.as_ref()).inspect_err(|e| {
                error!(index = trace_idx, "{e}");
            })
        }
    }
}

fn capture<P: RetireProbe + ?Sized>(dut: &P, config: &TraceConfig) -> Result<TraceRecord> {
    let status = dut.writeback_cycle_status();
    let cycle_status = match config.status_format {
        StatusFormat::Raw => StatusField::Raw(status),
        StatusFormat::Symbolic => {
            let table = config
                .enum_table
                .as_ref()
                .ok_or(TraceError::MissingEnumTable)?;
            StatusField::Symbolic(table.decode(status))
        }
    };

    Ok(TraceRecord {
        cycle: dut.cycle(),
        writeback_pc: dut.writeback_pc(),
        writeback_insn: dut.writeback_insn(),
        cycle_status,
    })
}

/// Check one reference record against the live design state.
///
/// # Errors
///
/// Returns [`TraceError::Mismatch`] naming the first differing field.
pub fn compare_record<P: RetireProbe + ?Sized>(
    expected: &TraceRecord,
    dut: &P,
    table: Option<&EnumTable>,
) -> Result<()> {
    let cycle = expected.cycle;
    let mismatch = |field, want: String, got: String| TraceError::Mismatch {
        cycle,
        field,
        expected: want,
        actual: got,
    };

    let pc = dut.writeback_pc();
    if expected.writeback_pc != pc {
        return Err(mismatch(
            TraceField::Pc,
            format!("{:#x}", expected.writeback_pc),
            format!("{pc:#x}"),
        ));
    }

    let insn = dut.writeback_insn();
    if expected.writeback_insn != insn {
        return Err(mismatch(
            TraceField::Insn,
            format!("{:#010x}", expected.writeback_insn),
            format!("{insn:#010x}"),
        ));
    }

    let status = dut.writeback_cycle_status();
    let matches = match &expected.cycle_status {
        StatusField::Raw(bits) => *bits == status,
        StatusField::Symbolic(names) => {
            let table = table.ok_or(TraceError::MissingEnumTable)?;
            // Validates every name, then compares as flag sets since decoding is lossy.
            table.encode(names)?;
            let mut want: Vec<&str> = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .collect();
            let mut got = table.decode_names(status);
            want.sort_unstable();
            want.dedup();
            got.sort_unstable();
            want == got
        }
    };
    if !matches {
        return Err(mismatch(
            TraceField::CycleStatus,
            describe_status_field(&expected.cycle_status, table),
            describe_status(status, table),
        ));
    }

    Ok(())
}

/// Render a status value, with flag names when a table is available.
#[must_use]
pub fn describe_status(status: u32, table: Option<&EnumTable>) -> String {
    match table {
        Some(table) => format!("{status} ({})", table.decode(status)),
        None => status.to_string(),
    }
}

fn describe_status_field(field: &StatusField, table: Option<&EnumTable>) -> String {
    match field {
        StatusField::Raw(bits) => describe_status(*bits, table),
        StatusField::Symbolic(names) => names.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::WritebackState;

    fn table() -> EnumTable {
        EnumTable::from_entries(
            "cycle_status_e",
            [
                ("CYCLE_NO_STALL", 1),
                ("CYCLE_TAKEN_BRANCH", 2),
                ("CYCLE_LOAD2USE", 4),
                ("CYCLE_DIV", 8),
            ],
        )
    }

    /// A deterministic little instruction stream: one retirement per cycle,
    /// with a load-use bubble on cycle 3.
    fn program() -> Vec<WritebackState> {
        let insns = [0x1234_50b7, 0x0010_8093, 0x0000_a103, 0x0000_0013, 0x0020_8133];
        insns
            .iter()
            .enumerate()
            .map(|(i, &insn)| WritebackState {
                cycle: i as u64 + 2,
                pc: 0x8000_0000 + 4 * i as u32,
                insn,
                cycle_status: if i == 3 { 4 } else { 1 },
            })
            .collect()
    }

    fn generate(config: &TraceConfig) -> Trace {
        let mut trace = Trace::new();
        for (cycle, state) in program().iter().enumerate() {
            handle_trace(state, &mut trace, cycle, config).unwrap();
        }
        trace
    }

    #[test]
    fn test_off_mode_is_noop() {
        let mut trace = Trace::new();
        let state = program()[0];
        handle_trace(&state, &mut trace, 99, &TraceConfig::default()).unwrap();
        assert!(trace.is_empty());
    }

    #[test]
    fn test_generate_then_compare_round_trip() {
        let trace = generate(&TraceConfig::new(TraceMode::Generate));
        assert_eq!(trace.len(), 5);
        assert_eq!(trace.get(3).unwrap().cycle_status, StatusField::Raw(4));

        let json = serde_json::to_string(&trace).unwrap();
        let mut reference: Trace = serde_json::from_str(&json).unwrap();
        let config = TraceConfig::new(TraceMode::Compare);
        for (cycle, state) in program().iter().enumerate() {
            handle_trace(state, &mut reference, cycle, &config).unwrap();
        }
    }

    #[test]
    fn test_symbolic_round_trip() {
        let config = TraceConfig::new(TraceMode::Generate)
            .with_status_format(StatusFormat::Symbolic)
            .with_enum_table(table());
        let mut trace = generate(&config);
        assert_eq!(
            trace.get(3).unwrap().cycle_status,
            StatusField::Symbolic("CYCLE_LOAD2USE".to_string())
        );

        let config = TraceConfig::new(TraceMode::Compare).with_enum_table(table());
        for (cycle, state) in program().iter().enumerate() {
            handle_trace(state, &mut trace, cycle, &config).unwrap();
        }
    }

    #[test]
    fn test_symbolic_generate_needs_table() {
        let config = TraceConfig::new(TraceMode::Generate).with_status_format(StatusFormat::Symbolic);
        let err = handle_trace(&program()[0], &mut Trace::new(), 0, &config).unwrap_err();
        assert!(matches!(err, TraceError::MissingEnumTable));
    }

    #[test]
    fn test_flipped_insn_bit_names_reference_cycle() {
        let mut records: Vec<TraceRecord> = generate(&TraceConfig::new(TraceMode::Generate))
            .records()
            .to_vec();
        records[2].writeback_insn ^= 1 << 7;
        let mut reference: Trace = records.into_iter().collect();

        let config = TraceConfig::new(TraceMode::Compare);
        let program = program();
        handle_trace(&program[0], &mut reference, 0, &config).unwrap();
        handle_trace(&program[1], &mut reference, 1, &config).unwrap();
        let err = handle_trace(&program[2], &mut reference, 2, &config).unwrap_err();

        match err {
            TraceError::Mismatch { cycle, field, .. } => {
                // Reference record 2 was retired at cycle 4.
                assert_eq!(cycle, 4);
                assert_eq!(field, TraceField::Insn);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pc_checked_first() {
        let expected = TraceRecord {
            cycle: 10,
            writeback_pc: 0x8000_0010,
            writeback_insn: 0x13,
            cycle_status: StatusField::Raw(1),
        };
        let live = WritebackState {
            cycle: 11,
            pc: 0x8000_0014,
            insn: 0x93,
            cycle_status: 2,
        };
        let err = compare_record(&expected, &live, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "trace mismatch at cycle 10: writeback PC expected 0x80000010 but was 0x80000014"
        );
    }

    #[test]
    fn test_status_mismatch_is_decoded() {
        let expected = TraceRecord {
            cycle: 5,
            writeback_pc: 0,
            writeback_insn: 0,
            cycle_status: StatusField::Raw(1),
        };
        let live = WritebackState {
            cycle_status: 2,
            ..WritebackState::default()
        };
        let err = compare_record(&expected, &live, Some(&table())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "trace mismatch at cycle 5: writeback cycle status expected 1 (CYCLE_NO_STALL) \
             but was 2 (CYCLE_TAKEN_BRANCH)"
        );
    }

    #[test]
    fn test_reference_exhausted() {
        let mut reference = generate(&TraceConfig::new(TraceMode::Generate));
        let err = handle_trace(
            &program()[0],
            &mut reference,
            5,
            &TraceConfig::new(TraceMode::Compare),
        )
        .unwrap_err();
        assert!(matches!(err, TraceError::TraceExhausted { index: 5, len: 5 }));
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(TraceMode::from_name(Some("generate")), TraceMode::Generate);
        assert_eq!(TraceMode::from_name(Some("compare")), TraceMode::Compare);
        assert_eq!(TraceMode::from_name(Some("bogus")), TraceMode::Off);
        assert_eq!(TraceMode::from_name(None), TraceMode::Off);
        assert_eq!("compare".parse::<TraceMode>().unwrap(), TraceMode::Compare);
    }
}
