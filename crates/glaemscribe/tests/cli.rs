//! End-to-end test of the `glaemc` CLI binary: write a minimal mode and
//! charset file to a temp directory, invoke the compiled binary, and check
//! its stdout/exit code (SPEC_FULL.md §6's "CLI (thin collaborator)"
//! contract).

use std::fs;
use std::process::Command;

fn glaemc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_glaemc"))
}

#[test]
fn transcribes_a_minimal_mode_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("test.cst"), "\\char 0x41 a\n\\char 0x42 b\n").unwrap();
    fs::write(
        dir.path().join("test.glaem"),
        "\\version 1.0\n\\charset teng test\n\\rules main\n  a --> a\n  b --> b\n",
    )
    .unwrap();

    let output = glaemc().arg(dir.path().join("test.glaem")).arg("ab").output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ab");
}

#[test]
fn exits_nonzero_with_a_compile_error_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("test.cst"), "\\char 0x41 a\n").unwrap();
    fs::write(
        dir.path().join("test.glaem"),
        "\\version 1.0\n\\charset teng test\n\\rules main\n  [a/b] --> a\n",
    )
    .unwrap();

    let output = glaemc().arg(dir.path().join("test.glaem")).arg("a").output().unwrap();
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn debug_tree_flag_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("test.cst"), "\\char 0x41 a\n").unwrap();
    fs::write(dir.path().join("test.glaem"), "\\version 1.0\n\\charset teng test\n\\rules main\n  a --> a\n")
        .unwrap();

    let output =
        glaemc().arg(dir.path().join("test.glaem")).arg("a").arg("--debug-tree").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("\"ROOT\""));
    assert!(text.contains("\"effective\""));
}
