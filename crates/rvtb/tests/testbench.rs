//! End-to-end: load a binary, run a toy in-order core over it, and check its
//! retirement stream against a golden trace.

use std::path::{Path, PathBuf};

use rvtb::{
    BusRam, BusWriter, EnumTable, Error, LoadConfig, MemoryImage, Readelf, RetireProbe,
    SectionSource, TraceConfig, TraceError, TraceMode, TraceSession, WordArrayWriter, WordMemory,
    get_section_info, load_binary_into_hex_file, load_binary_into_memory,
};
use rvtb_elf::testing::ElfBuilder;

const CYCLE_STATUS_SV: &str = "
package cycle_status;
  // writeback stage status, one bit per condition
  typedef enum {
    CYCLE_NO_STALL = 4'b0001,
    CYCLE_TAKEN_BRANCH = 4'b0010,
    CYCLE_LOAD2USE = 4'b0100,
    CYCLE_DIV = 4'b1000
  } cycle_status_e;
endpackage
";

/// lui, addi, nop, nop, ecall
const PROGRAM: [u32; 5] = [0x2345_02b7, 0x0002_8293, 0x0000_0013, 0x0000_0013, 0x0000_0073];

fn program_bytes() -> Vec<u8> {
    PROGRAM.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn write_binary(dir: &Path) -> PathBuf {
    let path = dir.join("rv32ui-p-toy");
    let bytes = ElfBuilder::new()
        .section(".text.init", 0x8000_0000, &program_bytes())
        .section(".data", 0x8000_1000, &[0xaa, 0xbb, 0xcc, 0xdd])
        .section(".comment", 0, b"GCC: (GNU) 13.2.0\0")
        .nobits(".bss", 0x8000_1004, 8)
        .build();
    std::fs::write(&path, bytes).unwrap();
    path
}

fn native() -> LoadConfig {
    LoadConfig::riscv_tests().with_source(SectionSource::Native)
}

/// Single-issue core that retires one word per cycle after a two-cycle fill.
struct ToyCore<'a> {
    mem: &'a WordMemory,
    cycle: u64,
}

impl ToyCore<'_> {
    const FILL: u64 = 2;

    fn retiring(&self) -> Option<u32> {
        self.cycle
            .checked_sub(Self::FILL)
            .map(|i| u32::try_from(i).unwrap())
    }
}

impl RetireProbe for ToyCore<'_> {
    fn cycle(&self) -> u64 {
        self.cycle
    }

    fn writeback_pc(&self) -> u32 {
        self.retiring().map_or(0, |i| i * 4)
    }

    fn writeback_insn(&self) -> u32 {
        self.retiring()
            .and_then(|i| self.mem.word(i as usize))
            .unwrap_or(0)
    }

    fn writeback_cycle_status(&self) -> u32 {
        if self.retiring().is_some() { 1 } else { 4 }
    }
}

fn run(mem: &WordMemory, session: &mut TraceSession) -> Result<(), TraceError> {
    for cycle in 0..7u64 {
        let core = ToyCore { mem, cycle };
        session.step(&core, usize::try_from(cycle).unwrap())?;
    }
    Ok(())
}

#[test]
fn word_array_and_bus_targets_agree() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_binary(dir.path());

    let mut mem = WordMemory::new(0x800);
    load_binary_into_memory(&mut WordArrayWriter::new(&mut mem), &binary, &native()).unwrap();

    let mut ram = BusRam::new(0x2000);
    load_binary_into_memory(&mut BusWriter::new(&mut ram), &binary, &native()).unwrap();

    for (i, &word) in PROGRAM.iter().enumerate() {
        assert_eq!(mem.word(i), Some(word));
        assert_eq!(ram.read_dword(4 * i as u64).unwrap(), word);
    }
    assert_eq!(mem.word(0x400), Some(0xddcc_bbaa));
    assert_eq!(ram.read_dword(0x1000).unwrap(), 0xddcc_bbaa);
    assert_eq!(ram.read_dword(0x1004).unwrap(), 0);
}

#[test]
fn golden_trace_round_trip_and_divergence() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_binary(dir.path());
    let table = EnumTable::parse(CYCLE_STATUS_SV, "cycle_status_e").unwrap();

    let mut mem = WordMemory::new(0x800);
    load_binary_into_memory(&mut WordArrayWriter::new(&mut mem), &binary, &native()).unwrap();

    let config = TraceConfig::new(TraceMode::Generate).with_enum_table(table.clone());
    let mut session = TraceSession::for_binary(config, dir.path(), &binary, None).unwrap();
    run(&mem, &mut session).unwrap();
    let golden = session.finish().unwrap();
    assert_eq!(golden.len(), 7);
    assert_eq!(golden.get(3).unwrap().writeback_insn, 0x0002_8293);

    let trace_path = dir.path().join("trace-rv32ui-p-toy.json");
    assert!(trace_path.exists());

    let compare = TraceConfig::new(TraceMode::Compare).with_enum_table(table);
    let mut session =
        TraceSession::for_binary(compare.clone(), dir.path(), &binary, None).unwrap();
    run(&mem, &mut session).unwrap();

    // Flip bit 7 of the instruction retired at cycle 4 (nop -> addi x1).
    let text = std::fs::read_to_string(&trace_path).unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json[4]["trace_writeback_insn"], "0x00000013");
    json[4]["trace_writeback_insn"] = "0x00000093".into();
    std::fs::write(&trace_path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let mut session = TraceSession::for_binary(compare, dir.path(), &binary, None).unwrap();
    let err = run(&mem, &mut session).unwrap_err();
    assert!(matches!(err, TraceError::Mismatch { cycle: 4, .. }));
    assert!(err.to_string().contains("at cycle 4"));
}

#[test]
fn hex_image_of_firmware() {
    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("firmware.elf");
    let bytes = ElfBuilder::new()
        .section(".start", 0, &program_bytes()[..8])
        .section(".text", 8, &program_bytes()[8..])
        .section(".rodata", 0x100, b"ok\n\0")
        .section(".comment", 0, b"GCC: (GNU) 13.2.0\0")
        .build();
    std::fs::write(&binary, bytes).unwrap();
    let hex = dir.path().join("mem_initial_contents.hex");

    let config = LoadConfig::firmware().with_source(SectionSource::Native);
    let image = load_binary_into_hex_file(&binary, &hex, 1024, &config).unwrap();
    assert_eq!(image.word_count(), 6);

    let text = std::fs::read_to_string(&hex).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "234502b7", "00028293", "00000013", "00000013", "00000073", "@40", "000a6b6f"
        ]
    );

    std::fs::remove_file(&hex).unwrap();
    let err = load_binary_into_hex_file(&binary, &hex, 0x40, &config).unwrap_err();
    assert!(matches!(
        err,
        Error::CapacityExceeded { end_word: 0x41, max_words: 0x40, .. }
    ));
    assert!(!hex.exists());
}

#[test]
fn readelf_and_native_tables_agree() {
    let readelf = Readelf::default();
    if which::which(readelf.command()).is_err() {
        eprintln!("skipping: {readelf} not installed");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let binary = write_binary(dir.path());

    let native_table = get_section_info(&binary, &SectionSource::Native).unwrap();
    let tool_table = get_section_info(&binary, &SectionSource::Readelf(readelf.clone())).unwrap();
    for name in [".text.init", ".data", ".bss", ".comment"] {
        let (a, b) = (native_table.get(name).unwrap(), tool_table.get(name).unwrap());
        assert_eq!((a.address, a.offset, a.size), (b.address, b.offset, b.size));
        assert_eq!(a.section_type, b.section_type);
    }

    let via_tool = MemoryImage::load(
        &binary,
        &LoadConfig::riscv_tests().with_source(SectionSource::Readelf(readelf)),
    )
    .unwrap();
    assert_eq!(via_tool, MemoryImage::load(&binary, &native()).unwrap());
}
