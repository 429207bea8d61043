use assert_cmd::Command;
use predicates::str::{contains, diff};

fn console(file: &str, commands: &str) -> Command {
    let mut cmd = Command::cargo_bin("mcpu").unwrap();
    cmd.arg("console")
        .arg(file)
        .arg("--minimal")
        .arg("--command")
        .arg(commands);
    cmd
}

#[test]
fn multiplies_through_circuit() {
    let mut cmd = console("tests/files/add.asm", "set a 6; set b 7; circuit mul; flags");
    cmd.assert()
        .success()
        .stderr(diff(include_str!("expected/multiply").replace("\r\n", "\n")));
}

#[test]
fn steps_through_instruction() {
    let mut cmd = console("tests/files/add.asm", "fetch\ndecode\nexecute\nregisters");
    cmd.assert()
        .success()
        .stderr(contains("Fetched 1205 from 0x00"))
        .stderr(contains("Decoded 12  MOVE #n,A"))
        .stderr(contains("PC       0001"))
        .stderr(contains("GPA      0005"));
}

#[test]
fn runs_to_halt() {
    let mut cmd = console("tests/files/count.asm", "run; cycle");
    cmd.assert()
        .success()
        .stderr(contains("Halted after 15 cycles"))
        .stderr(contains("Warning: Program has halted"));
}

#[test]
fn reports_bad_commands() {
    let mut cmd = console("tests/files/add.asm", "fetcj; memory 100; poke 10 ffff; memory 10");
    cmd.assert()
        .success()
        .stderr(contains("Error: Not a command: `fetcj`. Did you mean `fetch`?"))
        .stderr(contains("Error: Invalid value `100` for argument `address`"))
        .stderr(contains("0x10  FFFF"));
}

#[test]
fn prints_help() {
    let mut cmd = console("tests/files/add.asm", "help");
    cmd.assert()
        .success()
        .stderr(contains("circuit add|sub|mul|div"));
}

#[test]
fn reads_commands_from_stdin() {
    let mut cmd = Command::cargo_bin("mcpu").unwrap();
    cmd.arg("console")
        .arg("tests/files/add.asm")
        .arg("--minimal")
        .write_stdin("cycle 2\nregisters\n");
    cmd.assert()
        .success()
        .stderr(contains("> cycle 2"))
        .stderr(contains("GPA      0008"));
}
