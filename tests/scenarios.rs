//! End-to-end scenarios run against the built binary, one per testable
//! property enumerated for the pipeline executor, expander, and builtins.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jsh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn jsh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "exit").expect("write exit");
    }

    child.wait_with_output().expect("wait output")
}

#[test]
fn echo_hello_prints_line_and_zero_status() {
    let output = run_shell(&["echo hello", "echo STATUS:${?}"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello"), "stdout was: {stdout}");
    assert!(stdout.contains("STATUS:0"), "stdout was: {stdout}");
}

#[test]
fn nonexistent_path_sets_nonzero_status() {
    let output = run_shell(&["ls /no/such/path/xyz", "echo STATUS:${?}"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("STATUS:0"), "stdout was: {stdout}");
}

#[test]
fn three_stage_pipeline_passes_output_through() {
    let output = run_shell(&["echo a | cat | cat", "echo STATUS:${?}"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains('a'), "stdout was: {stdout}");
    assert!(stdout.contains("STATUS:0"), "stdout was: {stdout}");
}

#[test]
fn stderr_redirection_leaves_stdout_untouched() {
    let dir = std::env::temp_dir().join(format!("jsh_scenario_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    let err_path = dir.join("err.txt");

    let line = format!("echo oops 2> {}", err_path.display());
    let output = run_shell(&[&line]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("oops"), "stdout was: {stdout}");

    let err_contents = std::fs::read_to_string(&err_path).expect("read err.txt");
    assert!(err_contents.is_empty(), "err.txt was: {err_contents:?}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cd_changes_directory_for_subsequent_pwd() {
    let output = run_shell(&["cd /tmp", "pwd"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let resolved = std::fs::canonicalize("/tmp").unwrap_or_else(|_| PathBuf::from("/tmp"));
    let printed = stdout.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let printed_resolved =
        std::fs::canonicalize(printed.trim()).unwrap_or_else(|_| PathBuf::from(printed.trim()));
    assert_eq!(printed_resolved, resolved, "stdout was: {stdout}");
}

#[test]
fn setenv_is_visible_to_variable_expansion() {
    let output = run_shell(&["setenv FOO bar", "echo ${FOO}"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bar"), "stdout was: {stdout}");
}

#[test]
fn background_pipeline_reprompts_without_blocking() {
    let started = Instant::now();
    let output = run_shell(&["sleep 2 &", "echo ALIVE"]);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "shell appears to have blocked on the background job"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[1]"), "stdout was: {stdout}");
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}

#[test]
fn command_substitution_inlines_inner_output() {
    let output = run_shell(&["echo $(echo inner)"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("inner"), "stdout was: {stdout}");
}

#[test]
fn empty_line_is_a_no_op() {
    let output = run_shell(&["", "   ", "echo STATUS:${?}"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("STATUS:0"), "stdout was: {stdout}");
}
