//! Trace files tied to one test binary for the length of one run.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::compare::{TraceConfig, TraceMode, handle_trace};
use crate::probe::RetireProbe;
use crate::record::{StatusField, Trace, TraceRecord};
use crate::status::EnumTable;
use crate::Result;

/// File name of the trace for `binary`: `trace-<name>.json`, or
/// `trace-<variant>-<name>.json` when the same binary has per-configuration
/// traces (e.g. with and without a data cache).
#[must_use]
pub fn trace_file_name(binary: &Path, variant: Option<&str>) -> String {
    let name = binary
        .file_name()
        .map_or_else(|| binary.display().to_string(), |n| n.to_string_lossy().into_owned());
    match variant {
        Some(variant) => format!("trace-{variant}-{name}.json"),
        None => format!("trace-{name}.json"),
    }
}

/// The trace of one test run and the file it is read from or written to.
///
/// In compare mode the reference trace is loaded up front; in generate mode
/// records accumulate in memory and are written by [`TraceSession::finish`].
#[derive(Debug)]
pub struct TraceSession {
    config: TraceConfig,
    trace: Trace,
    path: PathBuf,
}

impl TraceSession {
    /// Start a session backed by the trace file at `path`.
    ///
    /// # Errors
    ///
    /// In compare mode, returns an error if the reference trace can't be loaded.
    pub fn open(config: TraceConfig, path: PathBuf) -> Result<Self> {
        let trace = if config.mode == TraceMode::Compare {
            let trace = Trace::load(&path)?;
            debug!(path = %path.display(), records = trace.len(), "loaded reference trace");
            trace
        } else {
            Trace::new()
        };

        Ok(Self {
            config,
            trace,
            path,
        })
    }

    /// Start a session for `binary`, with its trace file in `dir`.
    ///
    /// # Errors
    ///
    /// See [`Self::open`].
    pub fn for_binary(
        config: TraceConfig,
        dir: &Path,
        binary: &Path,
        variant: Option<&str>,
    ) -> Result<Self> {
        Self::open(config, dir.join(trace_file_name(binary, variant)))
    }

    /// Handle one simulated cycle.
    ///
    /// # Errors
    ///
    /// Propagates divergence and table errors from [`handle_trace`].
    pub fn step<P: RetireProbe + ?Sized>(&mut self, dut: &P, cycle: usize) -> Result<()> {
        handle_trace(dut, &mut self.trace, cycle, &self.config)
    }

    #[must_use]
    pub const fn mode(&self) -> TraceMode {
        self.config.mode
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn trace(&self) -> &Trace {
        &self.trace
    }

    /// End the run, writing the trace file in generate mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated trace can't be written.
    pub fn finish(self) -> Result<Trace> {
        if self.config.mode == TraceMode::Generate {
            self.trace.save(&self.path)?;
            info!(path = %self.path.display(), records = self.trace.len(), "wrote trace");
        }
        Ok(self.trace)
    }
}

/// Rewrite a trace with symbolic statuses into the raw integer format.
///
/// # Errors
///
/// Returns [`crate::TraceError::UnknownFlag`] if a record names a flag that
/// isn't in `table`.
pub fn migrate_trace(trace: &Trace, table: &EnumTable) -> Result<Trace> {
    trace
        .iter()
        .map(|record| {
            Ok(TraceRecord {
                cycle_status: StatusField::Raw(record.cycle_status.to_bits(Some(table))?),
                ..record.clone()
            })
        })
        .collect()
}
