//! Access to the writeback-stage state of a simulated processor.

/// Architectural state the trace reads from the design each cycle.
///
/// Implemented by whatever drives the simulation: a handle onto the design's
/// `trace_writeback_*` and cycle-counter signals, or a recorded snapshot.
pub trait RetireProbe {
    /// Current value of the design's cycle counter.
    fn cycle(&self) -> u64;

    /// Program counter of the instruction in the writeback stage.
    fn writeback_pc(&self) -> u32;

    /// Raw instruction word in the writeback stage.
    fn writeback_insn(&self) -> u32;

    /// Writeback cycle status bit flags.
    fn writeback_cycle_status(&self) -> u32;
}

/// Snapshot of the writeback stage for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WritebackState {
    pub cycle: u64,
    pub pc: u32,
    pub insn: u32,
    pub cycle_status: u32,
}

impl WritebackState {
    /// Capture the current state of any probe.
    pub fn capture<P: RetireProbe + ?Sized>(probe: &P) -> Self {
        Self {
            cycle: probe.cycle(),
            pc: probe.writeback_pc(),
            insn: probe.writeback_insn(),
            cycle_status: probe.writeback_cycle_status(),
        }
    }
}

impl RetireProbe for WritebackState {
    fn cycle(&self) -> u64 {
        self.cycle
    }

    fn writeback_pc(&self) -> u32 {
        self.pc
    }

    fn writeback_insn(&self) -> u32 {
        self.insn
    }

    fn writeback_cycle_status(&self) -> u32 {
        self.cycle_status
    }
}
