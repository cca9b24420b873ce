//! Tokenizer and grammar: the in-crate producer of [`Command`] values.
//!
//! Spec §1 treats the lexer/parser as an external collaborator and specifies
//! the core only at its interface (construct a `Command`, append
//! `SimpleCommand`s, set redirection/background fields, call `execute`).
//! Nothing upstream supplies that parser here, so this module plays the role:
//! quote-aware tokenizing, `|`-splitting into simple commands, and collecting
//! `<`/`>`/`>>`/`2>`/`2>>`/`>&` onto the pipeline's own redirection fields.

use crate::model::{Command, SimpleCommand};

/// Tokenizer states, mirroring a small hand-rolled state machine: unquoted
/// words split on whitespace, double quotes preserve spaces but still honor
/// a handful of backslash escapes, single quotes are fully literal.
enum State {
    Normal,
    InWord,
    InDoubleQuote,
    InSingleQuote,
}

/// Tokenize a shell input line into words. Whitespace outside quotes
/// separates tokens; `"..."` and `'...'` may appear mid-word.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match (&state, ch) {
            (State::Normal, ' ' | '\t') => {}
            (State::Normal, '"') => state = State::InDoubleQuote,
            (State::Normal, '\'') => state = State::InSingleQuote,
            (State::Normal, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                state = State::InWord;
            }
            (State::Normal, c) => {
                current.push(c);
                state = State::InWord;
            }

            (State::InWord, ' ' | '\t') => {
                tokens.push(std::mem::take(&mut current));
                state = State::Normal;
            }
            (State::InWord, '"') => state = State::InDoubleQuote,
            (State::InWord, '\'') => state = State::InSingleQuote,
            (State::InWord, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (State::InWord, c) => current.push(c),

            (State::InDoubleQuote, '"') => state = State::InWord,
            (State::InDoubleQuote, '\\') => match chars.peek() {
                Some(&('"' | '\\' | '$' | '`')) => current.push(chars.next().unwrap()),
                _ => current.push('\\'),
            },
            (State::InDoubleQuote, c) => current.push(c),

            (State::InSingleQuote, '\'') => state = State::InWord,
            (State::InSingleQuote, c) => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Parse one input line into a `Command`. Returns `None` for an empty (or
/// whitespace-only) line, matching the no-op round-trip in spec §8.
///
/// Syntax problems (a lone `|` with no command on one side, a missing
/// filename after a redirection operator, or two redirections targeting the
/// same stream) are reported as `Command::redirect_error`, per the error
/// taxonomy in spec §7: the executor's guard step discards such a command
/// silently and reprompts, rather than this function returning a `Result`.
pub fn parse_line(line: &str) -> Option<Command> {
    let mut tokens = tokenize(line);
    if tokens.is_empty() {
        return None;
    }

    let mut command = Command::new();

    if tokens.last().map(String::as_str) == Some("&") {
        tokens.pop();
        command.background = true;
    }

    if tokens.is_empty() {
        command.redirect_error = true;
        return Some(command);
    }

    let groups = split_on_pipe(&tokens);

    for group in groups {
        if group.is_empty() {
            command.redirect_error = true;
            continue;
        }

        let words = match extract_redirections(&group, &mut command) {
            Ok(words) => words,
            Err(()) => {
                command.redirect_error = true;
                continue;
            }
        };

        if words.is_empty() {
            command.redirect_error = true;
            continue;
        }

        let mut simple = SimpleCommand::new();
        simple.words = words;
        command.insert_simple_command(simple);
    }

    if command.simple_commands.is_empty() {
        command.redirect_error = true;
    }

    Some(command)
}

/// Split a token stream on bare `|` tokens into pipeline segments.
fn split_on_pipe(tokens: &[String]) -> Vec<Vec<String>> {
    let mut groups = vec![Vec::new()];
    for token in tokens {
        if token == "|" {
            groups.push(Vec::new());
        } else {
            groups.last_mut().unwrap().push(token.clone());
        }
    }
    groups
}

/// Pull redirection operators out of one pipeline segment's tokens, folding
/// them onto `command`'s pipeline-wide fields. Returns the remaining
/// (non-redirection) words for that segment, or `Err(())` on a syntax
/// problem (missing filename, or a redirection target already set).
fn extract_redirections(tokens: &[String], command: &mut Command) -> Result<Vec<String>, ()> {
    let mut words = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i].as_str();

        let (op, inline_target) = split_operator(token);
        match op {
            Some(op) => {
                let target = match inline_target {
                    Some(t) => t.to_string(),
                    None => {
                        i += 1;
                        if i >= tokens.len() {
                            return Err(());
                        }
                        tokens[i].clone()
                    }
                };
                apply_redirection(command, op, target)?;
            }
            None => words.push(token.to_string()),
        }

        i += 1;
    }

    Ok(words)
}

#[derive(Clone, Copy)]
enum Op {
    In,
    Out,
    OutAppend,
    Err,
    ErrAppend,
    Both,
}

/// Recognize a redirection operator token, optionally with its filename
/// fused on (`2>err.txt`, `>out.txt`) the way the grammar allows.
fn split_operator(token: &str) -> (Option<Op>, Option<&str>) {
    if let Some(rest) = token.strip_prefix(">>") {
        return (Some(Op::OutAppend), non_empty(rest));
    }
    if let Some(rest) = token.strip_prefix(">&") {
        return (Some(Op::Both), non_empty(rest));
    }
    if let Some(rest) = token.strip_prefix('>') {
        return (Some(Op::Out), non_empty(rest));
    }
    if let Some(rest) = token.strip_prefix("2>>") {
        return (Some(Op::ErrAppend), non_empty(rest));
    }
    if let Some(rest) = token.strip_prefix("2>") {
        return (Some(Op::Err), non_empty(rest));
    }
    if let Some(rest) = token.strip_prefix('<') {
        return (Some(Op::In), non_empty(rest));
    }
    (None, None)
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

fn apply_redirection(command: &mut Command, op: Op, target: String) -> Result<(), ()> {
    match op {
        Op::In => {
            if command.in_file.is_some() {
                return Err(());
            }
            command.in_file = Some(target);
        }
        Op::Out => {
            if command.out_file.is_some() {
                return Err(());
            }
            command.out_file = Some(target);
            command.append_out = false;
        }
        Op::OutAppend => {
            if command.out_file.is_some() {
                return Err(());
            }
            command.out_file = Some(target);
            command.append_out = true;
        }
        Op::Err => {
            if command.err_file.is_some() {
                return Err(());
            }
            command.err_file = Some(target);
            command.append_err = false;
        }
        Op::ErrAppend => {
            if command.err_file.is_some() {
                return Err(());
            }
            command.err_file = Some(target);
            command.append_err = true;
        }
        Op::Both => {
            // `>&TARGET`: stdout and stderr both go to TARGET, each field
            // owning its own copy of the path (see spec §3/§9).
            if command.out_file.is_some() || command.err_file.is_some() {
                return Err(());
            }
            command.out_file = Some(target.clone());
            command.err_file = Some(target);
            command.append_out = false;
            command.append_err = false;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_none() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn simple_command() {
        let cmd = parse_line("echo hello world").unwrap();
        assert_eq!(cmd.simple_commands.len(), 1);
        assert_eq!(cmd.simple_commands[0].words, vec!["echo", "hello", "world"]);
        assert!(!cmd.redirect_error);
    }

    #[test]
    fn pipeline_splits_on_pipe() {
        let cmd = parse_line("echo a | cat | cat").unwrap();
        assert_eq!(cmd.simple_commands.len(), 3);
        assert_eq!(cmd.simple_commands[1].words, vec!["cat"]);
    }

    #[test]
    fn trailing_ampersand_sets_background() {
        let cmd = parse_line("sleep 5 &").unwrap();
        assert!(cmd.background);
        assert_eq!(cmd.simple_commands[0].words, vec!["sleep", "5"]);
    }

    #[test]
    fn redirections_attach_to_pipeline() {
        let cmd = parse_line("echo oops 2> err.txt").unwrap();
        assert_eq!(cmd.err_file.as_deref(), Some("err.txt"));
        assert_eq!(cmd.simple_commands[0].words, vec!["echo", "oops"]);
    }

    #[test]
    fn append_redirection() {
        let cmd = parse_line("echo hi >> out.txt").unwrap();
        assert_eq!(cmd.out_file.as_deref(), Some("out.txt"));
        assert!(cmd.append_out);
    }

    #[test]
    fn redirect_both_duplicates_path() {
        let cmd = parse_line("ls >& both.txt").unwrap();
        assert_eq!(cmd.out_file.as_deref(), Some("both.txt"));
        assert_eq!(cmd.err_file.as_deref(), Some("both.txt"));
    }

    #[test]
    fn conflicting_redirection_sets_redirect_error() {
        let cmd = parse_line("echo hi > a.txt > b.txt").unwrap();
        assert!(cmd.redirect_error);
    }

    #[test]
    fn missing_filename_sets_redirect_error() {
        let cmd = parse_line("echo hi >").unwrap();
        assert!(cmd.redirect_error);
    }

    #[test]
    fn dangling_pipe_sets_redirect_error() {
        let cmd = parse_line("echo hi |").unwrap();
        assert!(cmd.redirect_error);
    }

    #[test]
    fn quoted_words_preserve_spaces() {
        let cmd = parse_line(r#"echo "hello   world""#).unwrap();
        assert_eq!(cmd.simple_commands[0].words, vec!["echo", "hello   world"]);
    }

    #[test]
    fn single_quotes_no_escaping() {
        let tokens = tokenize(r"'hello\nworld'");
        assert_eq!(tokens, vec![r"hello\nworld"]);
    }
}
