//! The command data model: [`SimpleCommand`] and [`Command`].
//!
//! Construction is the parser's job (see [`crate::parser`]); this module only
//! defines the shape and the reset-to-fresh lifecycle. `Command::execute` is
//! implemented in [`crate::executor`] so the pipeline machinery stays next to
//! the code it operates on.

/// A single program invocation: name plus argument words, pre-expansion.
#[derive(Debug, Default, Clone)]
pub struct SimpleCommand {
    pub words: Vec<String>,
}

impl SimpleCommand {
    pub fn new() -> Self {
        SimpleCommand { words: Vec::new() }
    }

    pub fn push_word(&mut self, word: String) {
        self.words.push(word);
    }

    pub fn program(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        if self.words.is_empty() {
            &[]
        } else {
            &self.words[1..]
        }
    }
}

/// One pipeline: an ordered sequence of [`SimpleCommand`]s plus the outer
/// redirections and background flag that apply to the pipeline as a whole.
#[derive(Debug, Default)]
pub struct Command {
    pub simple_commands: Vec<SimpleCommand>,
    pub in_file: Option<String>,
    pub out_file: Option<String>,
    pub err_file: Option<String>,
    pub append_out: bool,
    pub append_err: bool,
    pub background: bool,
    /// Sticky flag: the parser detected a contradictory redirection and this
    /// command must be discarded without running anything.
    pub redirect_error: bool,
}

impl Command {
    pub fn new() -> Self {
        Command::default()
    }

    pub fn insert_simple_command(&mut self, simple_command: SimpleCommand) {
        self.simple_commands.push(simple_command);
    }

    /// Reset to the same state as a freshly constructed `Command`.
    /// Dropping the old `Vec`/`Option<String>` contents releases their
    /// storage exactly once each — no aliasing, no manual refcounting.
    pub fn clear(&mut self) {
        *self = Command::default();
    }
}
