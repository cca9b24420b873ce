//! The pipeline executor: `Command::execute`.
//!
//! Grounded on the teacher's `executor.rs` pipe-wiring approach (`os_pipe`
//! plus `std::process::Command`), stripped of the teacher's job-control
//! layer (process groups, `ForegroundTerminalGuard`, stop/continue) since
//! that exceeds this crate's scope — see `DESIGN.md`. `std::process::Command`
//! performs the fork+exec atomically; `Stdio::from(file_or_pipe_end)` is the
//! dup2-equivalent wiring, so the shell's own fds 0/1/2 are never touched and
//! never need saving or restoring.

use crate::builtins;
use crate::expander;
use crate::model::Command;
use crate::state::{self, ShellState};
use os_pipe::{PipeReader, PipeWriter, pipe};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::process::{Command as Process, Stdio};

enum InputHandle {
    Inherit,
    Pipe(PipeReader),
    File(std::fs::File),
}

impl InputHandle {
    fn into_stdio(self) -> Stdio {
        match self {
            InputHandle::Inherit => Stdio::inherit(),
            InputHandle::Pipe(reader) => Stdio::from(reader),
            InputHandle::File(file) => Stdio::from(file),
        }
    }
}

enum OutputHandle {
    Inherit,
    Pipe(PipeWriter),
    File(std::fs::File),
}

impl OutputHandle {
    fn into_stdio(self) -> Stdio {
        match self {
            OutputHandle::Inherit => Stdio::inherit(),
            OutputHandle::Pipe(writer) => Stdio::from(writer),
            OutputHandle::File(file) => Stdio::from(file),
        }
    }

    /// `kind` disambiguates an unredirected `Inherit` handle, which otherwise
    /// carries no record of which descriptor it stands in for — needed so a
    /// built-in's stderr falls back to the shell's real stderr rather than
    /// its stdout.
    fn into_writer(self, kind: StreamKind) -> Box<dyn Write + Send> {
        match self {
            OutputHandle::Inherit => match kind {
                StreamKind::Stdout => Box::new(io::stdout()),
                StreamKind::Stderr => Box::new(io::stderr()),
            },
            OutputHandle::Pipe(writer) => Box::new(writer),
            OutputHandle::File(file) => Box::new(file),
        }
    }
}

#[derive(Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

enum PipelineResult {
    /// Sets `last_return_code`.
    Foreground(i32),
    /// Sets `last_background_pid`; the `[1] <pid>` line is already printed.
    Background(i32),
    /// Background pipeline whose every stage was a builtin — no pid to
    /// report, and per §4.1 step 8 neither "last_*" field is touched.
    NoExternalStage,
}

impl Command {
    /// Run this pipeline to completion (or registration, if backgrounded),
    /// then reset to a freshly constructed `Command`. Mirrors the 9-step
    /// algorithm: guard, capture last argument, mark running, run stages,
    /// await or announce, unmark, clear.
    ///
    /// The visible "reprompt" step is realized by the REPL driver's next
    /// `editor.read_line()` call rather than a second draw here — the line
    /// editor already redraws the prompt for every line it reads, so a call
    /// to [`state::prompt`] at this point would print it twice. `prompt()`
    /// still exists for the one case where no editor draw is imminent: an
    /// asynchronous SIGINT-while-idle or SIGCHLD background-exit reprompt,
    /// issued directly from `signals` via a raw `write(2)`.
    pub fn execute(&mut self, state: &mut ShellState) {
        if self.simple_commands.is_empty() || self.redirect_error {
            self.clear();
            return;
        }

        state.last_argument = self
            .simple_commands
            .last()
            .and_then(|sc| sc.words.last())
            .cloned()
            .unwrap_or_default();

        state::set_command_running(true);
        let result = run_pipeline(self, state);
        state::set_command_running(false);

        match result {
            PipelineResult::Foreground(code) => state.last_return_code = code,
            PipelineResult::Background(pid) => state.last_background_pid = pid,
            PipelineResult::NoExternalStage => {}
        }

        self.clear();
    }
}

fn run_pipeline(command: &Command, state: &mut ShellState) -> PipelineResult {
    let stage_count = command.simple_commands.len();

    let mut current_stdin = match &command.in_file {
        Some(path) => match open_input_file(path) {
            Ok(file) => InputHandle::File(file),
            Err(e) => {
                eprintln!("jsh: {path}: {e}");
                return PipelineResult::Foreground(1);
            }
        },
        None => InputHandle::Inherit,
    };

    let mut children: Vec<std::process::Child> = Vec::new();
    let mut builtin_threads: Vec<std::thread::JoinHandle<()>> = Vec::new();
    let mut last_stage_is_builtin = false;
    let mut last_builtin_code = 0;

    for (i, simple) in command.simple_commands.iter().enumerate() {
        let is_last = i + 1 == stage_count;
        let expanded = expander::expand_words(&simple.words, state);
        let program = expanded[0].clone();
        let args = expanded[1..].to_vec();

        let stdin_handle = std::mem::replace(&mut current_stdin, InputHandle::Inherit);

        let (stdout_handle, next_stdin) = if is_last {
            let handle = match &command.out_file {
                Some(path) => match open_output_file(path, command.append_out) {
                    Ok(file) => OutputHandle::File(file),
                    Err(e) => {
                        eprintln!("jsh: {path}: {e}");
                        return PipelineResult::Foreground(1);
                    }
                },
                None => OutputHandle::Inherit,
            };
            (handle, None)
        } else {
            match pipe() {
                Ok((reader, writer)) => (OutputHandle::Pipe(writer), Some(InputHandle::Pipe(reader))),
                Err(e) => {
                    eprintln!("jsh: failed to create pipe: {e}");
                    return PipelineResult::Foreground(1);
                }
            }
        };

        let stderr_handle = if is_last {
            match &command.err_file {
                Some(path) => match open_output_file(path, command.append_err) {
                    Ok(file) => OutputHandle::File(file),
                    Err(e) => {
                        eprintln!("jsh: {path}: {e}");
                        return PipelineResult::Foreground(1);
                    }
                },
                None => OutputHandle::Inherit,
            }
        } else {
            OutputHandle::Inherit
        };

        if let Some(next) = next_stdin {
            current_stdin = next;
        }

        if builtins::is_builtin(&program) {
            // None of the specified builtins read stdin; `stdin_handle` is
            // simply dropped here, closing its end (a pipe reader dropped
            // mid-pipeline breaks the upstream writer with EPIPE rather than
            // hanging it).
            drop(stdin_handle);

            if is_last {
                last_stage_is_builtin = true;
                let mut out_writer = stdout_handle.into_writer(StreamKind::Stdout);
                let mut err_writer = stderr_handle.into_writer(StreamKind::Stderr);
                last_builtin_code =
                    builtins::execute(&program, &args, out_writer.as_mut(), err_writer.as_mut(), state);
                let _ = out_writer.flush();
                let _ = err_writer.flush();
            } else {
                // Downstream stage isn't spawned yet, so running this builtin
                // synchronously could deadlock once its output exceeds the
                // pipe buffer. Run it on a thread instead, the same
                // workaround the teacher uses for this exact situation. A
                // throwaway `ShellState` snapshot is fine here: builtins
                // positioned before the last stage don't meaningfully
                // observe or update shared shell state.
                let mut out_writer = stdout_handle.into_writer(StreamKind::Stdout);
                let mut err_writer = stderr_handle.into_writer(StreamKind::Stderr);
                let mut local_state = ShellState {
                    shell_path: state.shell_path.clone(),
                    last_return_code: state.last_return_code,
                    last_background_pid: state.last_background_pid,
                    last_argument: state.last_argument.clone(),
                };
                let handle = std::thread::spawn(move || {
                    let _ = builtins::execute(&program, &args, out_writer.as_mut(), err_writer.as_mut(), &mut local_state);
                    let _ = out_writer.flush();
                    let _ = err_writer.flush();
                });
                builtin_threads.push(handle);
            }
            continue;
        }

        let mut process = Process::new(&program);
        process.args(&args);
        process.stdin(stdin_handle.into_stdio());
        process.stdout(stdout_handle.into_stdio());
        process.stderr(stderr_handle.into_stdio());

        // SAFETY: only async-signal-safe libc calls in the child between
        // fork and exec.
        unsafe {
            process.pre_exec(|| {
                // SIGPIPE is SIG_IGN in the shell itself (see `signals`);
                // exec() does not reset SIG_IGN, so without this reset every
                // spawned program would ignore SIGPIPE too, breaking
                // pipelines like `yes | head -1`.
                if libc::signal(libc::SIGPIPE, libc::SIG_DFL) == libc::SIG_ERR {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        match process.spawn() {
            Ok(child) => children.push(child),
            Err(e) => {
                // Fork/exec failure: report and abort mid-flight. Children
                // already spawned keep running; SIGCHLD reaps them later
                // rather than this call blocking on them.
                return PipelineResult::Foreground(command_error(&program, &e));
            }
        }
    }

    if command.background {
        // Detach the builtin threads (if any); they finish writing and close
        // their pipe ends naturally.
        drop(builtin_threads);

        return match children.pop() {
            Some(last_child) => {
                let pid = last_child.id() as i32;
                drop(last_child);
                drop(children);
                println!("[1] {pid}");
                PipelineResult::Background(pid)
            }
            None => PipelineResult::NoExternalStage,
        };
    }

    for handle in builtin_threads {
        let _ = handle.join();
    }

    let mut last_child_code = 0;
    let total = children.len();
    for (i, child) in children.iter_mut().enumerate() {
        let code = match child.wait() {
            Ok(status) => exit_code(&status),
            Err(_) => 1,
        };
        if i + 1 == total {
            last_child_code = code;
        }
    }

    PipelineResult::Foreground(if last_stage_is_builtin {
        last_builtin_code
    } else {
        last_child_code
    })
}

fn open_input_file(path: &str) -> io::Result<std::fs::File> {
    std::fs::File::open(path)
}

fn open_output_file(path: &str, append: bool) -> io::Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .mode(0o664)
        .open(path)
}

fn exit_code(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

fn command_error(program: &str, e: &io::Error) -> i32 {
    if e.kind() == io::ErrorKind::NotFound {
        eprintln!("jsh: command not found: {program}");
        127
    } else {
        eprintln!("jsh: {program}: {e}");
        126
    }
}
