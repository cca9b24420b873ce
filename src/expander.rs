//! Argument word expansion: tilde, `$(...)` command substitution, `${NAME}`
//! variable substitution, and glob expansion, applied in that order.
//!
//! Command substitution runs before variable substitution so that variable
//! references appearing in a sub-command's captured output are not
//! re-expanded — the sub-shell already expanded its own input.

use crate::state::ShellState;
use std::io::{Read, Write};
use std::process::{Command as Process, Stdio};

/// Expand every word of a simple command's argument list.
pub fn expand_words(words: &[String], state: &ShellState) -> Vec<String> {
    words.iter().flat_map(|word| expand_word(word, state)).collect()
}

fn expand_word(word: &str, state: &ShellState) -> Vec<String> {
    let word = expand_tilde(word);
    let word = expand_command_substitutions(&word, &state.shell_path);
    let word = expand_variables(&word, state);

    if contains_glob_chars(&word) {
        expand_globs(&word)
    } else {
        vec![word]
    }
}

// ── Tilde expansion [AMBIENT] ──

fn expand_tilde(token: &str) -> String {
    if !token.starts_with('~') {
        return token.to_string();
    }

    let home = home_dir();

    if token == "~" {
        return home;
    }

    if let Some(rest) = token.strip_prefix('~') {
        if rest.starts_with('/') || rest.starts_with('\\') {
            return format!("{home}{rest}");
        }
    }

    // ~username is not resolved; left as-is.
    token.to_string()
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| "~".to_string())
}

// ── Command substitution: $(...) ──

/// Scan `input` for balanced `$(...)` constructs, running each one through
/// the sub-shell protocol and splicing its captured output in place. An
/// unterminated `$(` is emitted literally, per the spec's balanced-nesting
/// rule.
fn expand_command_substitutions(input: &str, shell_path: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'(') {
            chars.next();
            let mut depth = 1;
            let mut inner = String::new();
            let mut closed = false;

            while let Some(c) = chars.next() {
                match c {
                    '$' if chars.peek() == Some(&'(') => {
                        chars.next();
                        depth += 1;
                        inner.push_str("$(");
                    }
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    c => inner.push(c),
                }
            }

            if closed {
                result.push_str(&run_subshell(&inner, shell_path));
            } else {
                result.push_str("$(");
                result.push_str(&inner);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Run `cmd_text` as a line of input to a freshly spawned instance of this
/// shell's own binary and return its post-processed stdout. Grounded on
/// `original_source/command.cc`'s `executeSubshell`/`processSubshell`: write
/// the command plus a trailing `exit`, read the child's interleaved
/// prompt+output to EOF, then strip the prompt, flatten newlines, and cut at
/// the echoed `exit`.
fn run_subshell(cmd_text: &str, shell_path: &str) -> String {
    let child = Process::new(shell_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(_) => return String::new(),
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = write!(stdin, "{cmd_text}\nexit\n");
    }

    let mut raw = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        let _ = stdout.read_to_string(&mut raw);
    }
    let _ = child.wait();

    postprocess_subshell_output(&raw)
}

fn postprocess_subshell_output(raw: &str) -> String {
    let stripped = raw.replace("jsh> ", "");
    let flattened = stripped.replace('\n', " ");
    let truncated = match flattened.find("exit") {
        Some(idx) => &flattened[..idx],
        None => flattened.as_str(),
    };
    truncated.trim_end().to_string()
}

// ── Variable expansion: ${NAME} ──

/// Expand every `${NAME}` reference. `NAME` is the longest run up to the
/// first `}`; an unterminated `${` is emitted literally. A bare `$` not
/// followed by `{` is left untouched — only the braced form is recognized.
fn expand_variables(input: &str, state: &ShellState) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }

            if closed {
                result.push_str(&resolve_variable(&name, state));
            } else {
                result.push_str("${");
                result.push_str(&name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn resolve_variable(name: &str, state: &ShellState) -> String {
    match name {
        "$" => std::process::id().to_string(),
        "?" => state.last_return_code.to_string(),
        "!" => state.last_background_pid.to_string(),
        "_" => state.last_argument.clone(),
        "SHELL" => std::fs::canonicalize(&state.shell_path)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| state.shell_path.clone()),
        _ => std::env::var(name).unwrap_or_default(),
    }
}

// ── Glob expansion [AMBIENT] ──

fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

fn expand_globs(pattern: &str) -> Vec<String> {
    match glob::glob(pattern) {
        Ok(paths) => {
            let mut matches: Vec<String> = paths
                .filter_map(|entry| entry.ok())
                .map(|path| path.to_string_lossy().into_owned())
                .collect();

            if matches.is_empty() {
                vec![pattern.to_string()]
            } else {
                matches.sort();
                matches
            }
        }
        Err(_) => vec![pattern.to_string()],
    }
}
