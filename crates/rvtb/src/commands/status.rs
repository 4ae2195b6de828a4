//! Status flag decoding and encoding.

use rvtb::EnumTable;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS, EnumArgs, StatusCommands};

pub fn run(command: &StatusCommands) -> i32 {
    match command {
        StatusCommands::Decode { value, table } => with_table(table, |table| {
            println!("{}", table.decode(*value));
            Ok(())
        }),
        StatusCommands::Encode { names, table } => with_table(table, |table| {
            let value = table.encode(names)?;
            println!("{value} ({value:#x})");
            Ok(())
        }),
    }
}

fn with_table(
    args: &EnumArgs,
    f: impl FnOnce(&EnumTable) -> rvtb::Result<()>,
) -> i32 {
    let result = EnumTable::from_file(&args.enum_file, &args.enum_name)
        .map_err(rvtb::Error::from)
        .and_then(|table| f(&table));
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_FAILURE
        }
    }
}
