//! Command implementations.
//!
//! Each submodule handles a specific CLI command or group of commands.

mod image;
mod status;
mod trace;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Sections { input, source } => image::cmd_sections(input, &source.source()),
        Commands::Hexfile {
            input,
            output,
            max_words,
            sections,
            translate,
            source,
        } => image::cmd_hexfile(
            input,
            output,
            *max_words,
            sections.as_deref(),
            *translate,
            source.source(),
        ),
        Commands::Dump {
            input,
            section,
            source,
        } => image::cmd_dump(input, section, &source.source()),
        Commands::Status { command } => status::run(command),
        Commands::Trace { command } => trace::run(command),
    }
}
