//! Section listing, hex images and section dumps.

use std::path::Path;

use rvtb::{LoadConfig, SectionSource, dump_section, get_section_info, load_binary_into_hex_file};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

/// Print the section table of `input`.
pub fn cmd_sections(input: &Path, source: &SectionSource) -> i32 {
    let table = match get_section_info(input, source) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error reading sections: {e}");
            return EXIT_FAILURE;
        }
    };

    println!(
        "{:>4}  {:<20} {:<16} {:>10} {:>8} {:>8} {:>4}",
        "Nr", "Name", "Type", "Addr", "Off", "Size", "ES"
    );
    for info in table.iter_by_index() {
        println!(
            "{:>4}  {:<20} {:<16} {:>10} {:>8} {:>8} {:>4}",
            info.index,
            info.name,
            info.section_type,
            format!("{:08x}", info.address),
            format!("{:06x}", info.offset),
            format!("{:06x}", info.size),
            format!("{:02x}", info.entry_size),
        );
    }
    EXIT_SUCCESS
}

/// Write a `$readmemh` image of `input` to `output`.
pub fn cmd_hexfile(
    input: &Path,
    output: &Path,
    max_words: u64,
    sections: Option<&[String]>,
    translate: bool,
    source: SectionSource,
) -> i32 {
    let mut config = LoadConfig::firmware()
        .with_translation(translate)
        .with_source(source);
    if let Some(sections) = sections {
        config = config.with_sections(sections.iter().cloned());
    }

    match load_binary_into_hex_file(input, output, max_words, &config) {
        Ok(image) => {
            eprintln!(
                "Wrote {} words from {} sections to {}",
                image.word_count(),
                image.sections().len(),
                output.display()
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_FAILURE
        }
    }
}

/// Print the words of one section, one per line.
pub fn cmd_dump(input: &Path, section: &str, source: &SectionSource) -> i32 {
    match dump_section(input, section, source) {
        Ok(words) => {
            for word in words {
                println!("{word:08x}");
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_FAILURE
        }
    }
}
