//! Trace file inspection and migration.

use std::path::Path;

use rvtb::{EnumTable, StatusField, Trace, describe_status, migrate_trace};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS, TraceCommands};

pub fn run(command: &TraceCommands) -> i32 {
    let result = match command {
        TraceCommands::Show {
            trace,
            enum_file,
            enum_name,
        } => show(trace, enum_file.as_deref(), enum_name),
        TraceCommands::Migrate {
            trace,
            output,
            table,
        } => migrate(
            trace,
            output.as_deref().unwrap_or(trace.as_path()),
            &table.enum_file,
            &table.enum_name,
        ),
    };

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_FAILURE
        }
    }
}

fn show(path: &Path, enum_file: Option<&Path>, enum_name: &str) -> rvtb::Result<()> {
    let trace = Trace::load(path)?;
    let table = enum_file
        .map(|file| EnumTable::from_file(file, enum_name))
        .transpose()?;

    println!("{:>10}  {:<10}  {:<10}  status", "cycle", "pc", "insn");
    for record in &trace {
        let status = match &record.cycle_status {
            StatusField::Raw(bits) => describe_status(*bits, table.as_ref()),
            StatusField::Symbolic(names) => names.clone(),
        };
        println!(
            "{:>10}  {:<10}  {:<10}  {status}",
            record.cycle,
            format!("{:#x}", record.writeback_pc),
            format!("{:08x}", record.writeback_insn),
        );
    }
    eprintln!("{} records", trace.len());
    Ok(())
}

fn migrate(input: &Path, output: &Path, enum_file: &Path, enum_name: &str) -> rvtb::Result<()> {
    let table = EnumTable::from_file(enum_file, enum_name)?;
    let trace = Trace::load(input)?;
    let migrated = migrate_trace(&trace, &table)?;
    migrated.save(output)?;
    eprintln!(
        "Migrated {} records to raw status values in {}",
        migrated.len(),
        output.display()
    );
    Ok(())
}
