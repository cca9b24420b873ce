//! SIGINT and SIGCHLD handling.
//!
//! Grounded on the original C implementation's `sigaction`-installed
//! handlers: SIGINT reprompts when idle and no-ops while a command is
//! running (the kernel already delivered it to the foreground child);
//! SIGCHLD drains every reapable background child with `waitpid(-1,
//! WNOHANG)`, prints `[<pid>] exited.` per pid on a tty, and flags that the
//! prompt needs to be redrawn.
//!
//! Handler bodies are restricted to async-signal-safe operations: atomic
//! loads/stores and raw `write(2)`, never Rust's buffered `print!`/`format!`
//! machinery, which may allocate or lock.

use crate::state::{self, IS_TERMINAL, PROMPT_NEEDED};
use std::sync::atomic::Ordering;

/// Install the SIGINT and SIGCHLD handlers. Failure is fatal at startup,
/// matching the original's "signal install failure is fatal" rule (§7).
pub fn install() {
    unsafe {
        if !install_handler(libc::SIGINT, handle_sigint) {
            eprintln!("jsh: failed to install SIGINT handler");
            std::process::exit(1);
        }
        if !install_handler(libc::SIGCHLD, handle_sigchld) {
            eprintln!("jsh: failed to install SIGCHLD handler");
            std::process::exit(1);
        }
        // The shell itself ignores SIGPIPE; each spawned child resets it to
        // SIG_DFL in `pre_exec` before exec (see `executor`), since SIG_IGN
        // survives exec() but a custom handler would not.
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

unsafe fn install_handler(signum: libc::c_int, handler: extern "C" fn(libc::c_int)) -> bool {
    let mut action: libc::sigaction = std::mem::zeroed();
    action.sa_sigaction = handler as usize;
    unsafe { libc::sigemptyset(&mut action.sa_mask) };
    action.sa_flags = libc::SA_RESTART;
    unsafe { libc::sigaction(signum, &action, std::ptr::null_mut()) == 0 }
}

/// Write a fixed string to stdout via a raw, unbuffered `write(2)`. The only
/// I/O a signal handler may safely perform.
fn write_stdout(bytes: &[u8]) {
    unsafe {
        libc::write(libc::STDOUT_FILENO, bytes.as_ptr() as *const libc::c_void, bytes.len());
    }
}

/// Format a non-negative integer into a stack buffer and write it, without
/// allocating — `format!`/`to_string` are not async-signal-safe.
fn write_decimal(mut value: libc::c_int) {
    if value == 0 {
        write_stdout(b"0");
        return;
    }
    let mut buf = [0u8; 12];
    let mut i = buf.len();
    while value > 0 {
        i -= 1;
        buf[i] = b'0' + (value % 10) as u8;
        value /= 10;
    }
    write_stdout(&buf[i..]);
}

extern "C" fn handle_sigint(_signum: libc::c_int) {
    if state::command_running() {
        return;
    }
    write_stdout(b"\n");
    if IS_TERMINAL.load(Ordering::SeqCst) {
        write_stdout(b"jsh> ");
    }
}

extern "C" fn handle_sigchld(_signum: libc::c_int) {
    let is_tty = IS_TERMINAL.load(Ordering::SeqCst);
    let mut reaped_any = false;

    loop {
        let mut status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if pid <= 0 {
            break;
        }
        reaped_any = true;
        if is_tty {
            write_stdout(b"[");
            write_decimal(pid);
            write_stdout(b"] exited.\n");
        }
    }

    if reaped_any {
        PROMPT_NEEDED.store(true, Ordering::SeqCst);
    }

    if PROMPT_NEEDED.load(Ordering::SeqCst) {
        if is_tty {
            write_stdout(b"jsh> ");
        }
        PROMPT_NEEDED.store(false, Ordering::SeqCst);
    }
}
