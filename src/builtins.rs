//! Built-in command dispatch.
//!
//! Each built-in receives the expanded argument vector with descriptors
//! 0/1/2 already redirected by the executor, exactly as if it were an
//! external program — see [`crate::executor`].

use crate::state::{self, ShellState};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

/// `setenv`/`unsetenv`/`printenv`/`cd`/`source` are the specified built-ins.
/// `pwd`, `exit`, `echo`, and `type` are supplemented: present in the
/// teacher, materially useful in any interactive shell, and excluded by no
/// Non-goal. `export`/`unset` are deliberately absent — this dispatcher
/// recognizes the csh-style `setenv`/`unsetenv` spelling only.
const BUILTINS: &[&str] = &[
    "printenv", "setenv", "unsetenv", "cd", "source", "pwd", "exit", "echo", "type",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Dispatch a built-in by name. `state` is threaded through for `source`
/// (recursive execution) and for the variable expander's "last_*" fields,
/// which several built-ins don't touch at all.
pub fn execute(
    program: &str,
    args: &[String],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    state: &mut ShellState,
) -> i32 {
    match program {
        "printenv" => builtin_printenv(stdout),
        "setenv" => builtin_setenv(args, stderr),
        "unsetenv" => builtin_unsetenv(args, stderr),
        "cd" => builtin_cd(args, stderr),
        "source" => builtin_source(args, stderr, state),
        "pwd" => builtin_pwd(stdout, stderr),
        "exit" => builtin_exit(args, stderr),
        "echo" => builtin_echo(args, stdout),
        "type" => builtin_type(args, stdout, stderr),
        _ => {
            let _ = writeln!(stderr, "jsh: unknown builtin: {program}");
            0
        }
    }
}

fn builtin_printenv(stdout: &mut dyn Write) -> i32 {
    for (key, value) in std::env::vars() {
        let _ = writeln!(stdout, "{key}={value}");
    }
    let _ = stdout.flush();
    0
}

fn builtin_setenv(args: &[String], stderr: &mut dyn Write) -> i32 {
    if args.len() < 2 {
        let _ = write!(stderr, "setenv: Too few arguments\n");
        return 0;
    }
    // SAFETY: env var mutation happens only on the shell's single thread.
    unsafe { std::env::set_var(&args[0], &args[1]) };
    0
}

fn builtin_unsetenv(args: &[String], stderr: &mut dyn Write) -> i32 {
    if args.is_empty() {
        let _ = write!(stderr, "unsetenv: Too few arguments\n");
        return 0;
    }
    // SAFETY: env var mutation happens only on the shell's single thread.
    unsafe { std::env::remove_var(&args[0]) };
    0
}

fn builtin_cd(args: &[String], stderr: &mut dyn Write) -> i32 {
    let target = match args.first() {
        Some(dir) => dir.clone(),
        None => match std::env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                let _ = write!(stderr, "cd: HOME not set\n");
                return 0;
            }
        },
    };

    if std::env::set_current_dir(&target).is_err() {
        let _ = writeln!(stderr, "cd: can't cd to {target}");
    }
    0
}

/// `source FILE`: suspend interactive input, re-enter the parser/executor
/// loop over the file's lines, then restore `is_terminal`/`command_running`.
/// Nested `source` works because each call saves and restores its own
/// snapshot of the two flags (see §4.5).
fn builtin_source(args: &[String], stderr: &mut dyn Write, state: &mut ShellState) -> i32 {
    let Some(filename) = args.first() else {
        let _ = write!(stderr, "source: Too few arguments\n");
        return 0;
    };

    let file = match std::fs::File::open(filename) {
        Ok(file) => file,
        Err(_) => {
            let _ = writeln!(stderr, "source: can't open {filename}");
            return 0;
        }
    };

    let saved_terminal = state::IS_TERMINAL.load(Ordering::SeqCst);
    let saved_running = state::COMMAND_RUNNING.load(Ordering::SeqCst);
    state::IS_TERMINAL.store(false, Ordering::SeqCst);
    state::COMMAND_RUNNING.store(false, Ordering::SeqCst);

    for line in BufReader::new(file).lines() {
        let Ok(line) = line else { break };
        if let Some(mut command) = crate::parser::parse_line(&line) {
            command.execute(state);
        }
    }

    state::IS_TERMINAL.store(saved_terminal, Ordering::SeqCst);
    state::COMMAND_RUNNING.store(saved_running, Ordering::SeqCst);
    0
}

fn builtin_pwd(stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    match std::env::current_dir() {
        Ok(path) => {
            let _ = writeln!(stdout, "{}", path.display());
            0
        }
        Err(e) => {
            let _ = writeln!(stderr, "pwd: {e}");
            1
        }
    }
}

fn builtin_exit(args: &[String], stderr: &mut dyn Write) -> i32 {
    match args.first() {
        None => std::process::exit(0),
        Some(s) => match s.parse::<i32>() {
            Ok(code) => std::process::exit(code),
            Err(_) => {
                let _ = writeln!(stderr, "exit: {s}: numeric argument required");
                std::process::exit(2);
            }
        },
    }
}

fn builtin_echo(args: &[String], stdout: &mut dyn Write) -> i32 {
    let _ = writeln!(stdout, "{}", args.join(" "));
    0
}

fn builtin_type(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    let mut exit_code = 0;
    for arg in args {
        if is_builtin(arg) {
            let _ = writeln!(stdout, "{arg} is a shell builtin");
        } else {
            match find_in_path(arg) {
                Some(path) => {
                    let _ = writeln!(stdout, "{arg} is {}", path.display());
                }
                None => {
                    let _ = writeln!(stderr, "{arg}: not found");
                    exit_code = 1;
                }
            }
        }
    }
    exit_code
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = path.metadata() else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

fn find_in_path(cmd: &str) -> Option<PathBuf> {
    let path_var = std::env::var("PATH").ok()?;
    for dir in path_var.split(':') {
        let full_path = Path::new(dir).join(cmd);
        if is_executable(&full_path) {
            return Some(full_path);
        }
    }
    None
}
