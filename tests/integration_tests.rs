use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn mcpu() -> Command {
    Command::cargo_bin("mcpu").unwrap()
}

#[test]
fn runs_without_arguments() {
    mcpu().assert().success().stdout(contains("mcpu v"));
}

#[test]
fn runs_counting_loop() {
    let mut cmd = mcpu();
    cmd.arg("run").arg("tests/files/count.asm");
    cmd.assert()
        .success()
        .stdout(contains("GPA      0000"))
        .stdout(contains("GPB      0003"))
        .stdout(contains("Z 1"))
        .stdout(contains("halted after 15 cycles"));
}

#[test]
fn runs_path_shortcut() {
    let mut cmd = mcpu();
    cmd.arg("tests/files/add.asm");
    cmd.assert().success().stdout(contains("GPA      0008"));
}

#[test]
fn runs_hex_image() {
    let mut cmd = mcpu();
    cmd.arg("run").arg("tests/files/count.hex").arg("--minimal");
    cmd.assert()
        .success()
        .stdout(contains("GPB      0003"))
        .stderr(contains("Loaded 7 words at 0x00"));
}

#[test]
fn limit_stops_endless_program() {
    let mut cmd = mcpu();
    cmd.arg("run")
        .arg("tests/files/forever.asm")
        .arg("--limit")
        .arg("10");
    cmd.assert()
        .failure()
        .stderr(contains("did not halt within 10 cycles"));
}

#[test]
fn assembles_to_hex() {
    let dest = std::env::temp_dir().join("mcpu_assembles_to_hex.hex");
    let mut cmd = mcpu();
    cmd.arg("assemble").arg("tests/files/count.asm").arg(&dest);
    cmd.assert().success().stdout(contains("Saved"));

    let words = fs::read_to_string(&dest).unwrap();
    let expected = fs::read_to_string("tests/files/count.hex").unwrap();
    assert_eq!(words, expected);
    let _ = fs::remove_file(dest);
}

#[test]
fn checks_valid_file() {
    let mut cmd = mcpu();
    cmd.arg("check").arg("tests/files/count.asm");
    cmd.assert().success().stdout(contains("no errors found"));
}

#[test]
fn reports_every_error() {
    let mut cmd = mcpu();
    cmd.arg("check").arg("tests/files/broken.asm").arg("--minimal");
    cmd.assert()
        .failure()
        .stderr(contains("Error: Line 2: Unrecognised command"))
        .stderr(contains("Error: Line 3: Must only have 2 parameters"))
        .stderr(contains("Assembly failed with 2 errors"));

    let mut cmd = mcpu();
    cmd.arg("check").arg("tests/files/broken.asm");
    cmd.assert()
        .failure()
        .stderr(contains("Unrecognised command"))
        .stderr(contains("Error: Line").not());
}

#[test]
fn rejects_unknown_extension() {
    let mut cmd = mcpu();
    cmd.arg("run").arg("tests/files/tiny_isa.json");
    cmd.assert().failure().stderr(contains("unknown extension"));
}

#[test]
fn lists_instruction_set() {
    let mut cmd = mcpu();
    cmd.arg("isa");
    cmd.assert()
        .success()
        .stdout(contains("12  MOVE #n,A"))
        .stdout(contains("FF  HALT"));

    let mut cmd = mcpu();
    cmd.arg("isa").arg("--isa").arg("tests/files/tiny_isa.json");
    cmd.assert()
        .success()
        .stdout(contains("MOVE").not())
        .stdout(contains("00  ADD #n,A"));
}

#[test]
fn custom_instruction_set_rejects_unknown_opcodes() {
    let mut cmd = mcpu();
    cmd.arg("run")
        .arg("tests/files/add.asm")
        .arg("--isa")
        .arg("tests/files/tiny_isa.json");
    cmd.assert()
        .failure()
        .stderr(contains("No instruction has opcode 0x12"));
}

#[test]
fn trace_levels_from_environment() {
    let mut cmd = mcpu();
    cmd.env("MCPU_TRACE", "phases")
        .arg("run")
        .arg("tests/files/add.asm")
        .arg("--minimal");
    cmd.assert()
        .success()
        .stderr(contains("Fetching"))
        .stderr(contains("PC <- PC + 1").not());

    let mut cmd = mcpu();
    cmd.env("MCPU_TRACE", "micro")
        .arg("run")
        .arg("tests/files/add.asm")
        .arg("--minimal");
    cmd.assert()
        .success()
        .stderr(contains("Decoding"))
        .stderr(contains("  PC <- PC + 1"));

    let mut cmd = mcpu();
    cmd.env_remove("MCPU_TRACE").arg("run").arg("tests/files/add.asm");
    cmd.assert().success().stderr(contains("Fetching").not());
}

#[test]
fn instruction_set_from_environment() {
    let mut cmd = mcpu();
    cmd.env("MCPU_ISA", "tests/files/tiny_isa.json").arg("isa");
    cmd.assert().success().stdout(contains("MOVE").not());

    let mut cmd = mcpu();
    cmd.env("MCPU_ISA", "tests/files/tiny_isa.json")
        .arg("isa")
        .arg("--isa")
        .arg("src/instruction_set.json");
    cmd.assert().success().stdout(contains("12  MOVE #n,A"));
}
