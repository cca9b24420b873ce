//! Process-wide shell state.
//!
//! `command_running`, `prompt_needed`, and `is_terminal` are observed from the
//! SIGINT/SIGCHLD handlers (see [`crate::signals`]), so they live as free
//! atomics rather than struct fields — a signal handler cannot safely borrow
//! `&mut ShellState`. Everything else here ("last_*") is touched only by the
//! main thread and lives on [`ShellState`] directly.

use std::sync::atomic::{AtomicBool, Ordering};

/// True from just before a pipeline is dispatched until all of its foreground
/// children have been reaped. Read by the SIGINT handler; written only here.
pub static COMMAND_RUNNING: AtomicBool = AtomicBool::new(false);

/// Set by the SIGCHLD handler when a background child exits; consumed at the
/// next safe point (the end of the handler itself, per spec).
pub static PROMPT_NEEDED: AtomicBool = AtomicBool::new(false);

/// Cached tty-ness of stdin, refreshed every time [`prompt`] runs.
pub static IS_TERMINAL: AtomicBool = AtomicBool::new(false);

pub fn command_running() -> bool {
    COMMAND_RUNNING.load(Ordering::SeqCst)
}

pub fn set_command_running(value: bool) {
    COMMAND_RUNNING.store(value, Ordering::SeqCst);
}

pub fn is_terminal() -> bool {
    IS_TERMINAL.load(Ordering::SeqCst)
}

/// Recompute and cache stdin's tty-ness. Called once at startup and again
/// whenever `source` suspends/resumes interactive input, since those are the
/// only points the original design re-derives it rather than trusting a
/// stale cached value.
pub fn refresh_is_terminal() {
    let tty = unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;
    IS_TERMINAL.store(tty, Ordering::SeqCst);
}

/// Write `jsh> ` to stdout and flush, but only when stdin is a tty. This is
/// the synchronous prompt draw used at startup; after that, the line editor
/// redraws the prompt itself on every `read_line` call (see `executor`'s
/// `Command::execute` doc comment for why the executor doesn't also call
/// this after every pipeline).
pub fn prompt() {
    if is_terminal() {
        use std::io::Write;
        print!("jsh> ");
        let _ = std::io::stdout().flush();
    }
}

/// Long-lived, main-thread-only shell state: the evaluator's "last_*"
/// variables and the shell's own executable path.
pub struct ShellState {
    /// Absolute path of the running shell binary, used for `${SHELL}` and to
    /// re-exec as the sub-shell for `$(...)` command substitution.
    pub shell_path: String,
    /// Exit status of the most recently completed foreground pipeline's last
    /// stage (0 for built-ins).
    pub last_return_code: i32,
    /// Pid of the most recently launched background pipeline's last stage.
    pub last_background_pid: i32,
    /// Final word of the last executed pipeline's last simple command, as it
    /// appeared before expansion of that line.
    pub last_argument: String,
}

impl ShellState {
    pub fn new(shell_path: String) -> Self {
        ShellState {
            shell_path,
            last_return_code: 0,
            last_background_pid: 0,
            last_argument: String::new(),
        }
    }
}
