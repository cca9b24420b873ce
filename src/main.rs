mod builtins;
mod editor;
mod executor;
mod expander;
mod model;
mod parser;
mod signals;
mod state;

use state::ShellState;

fn main() {
    let shell_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "jsh".to_string());

    let mut shell_state = ShellState::new(shell_path);
    state::refresh_is_terminal();
    signals::install();

    let mut editor = editor::LineEditor::new();

    loop {
        match editor.read_line("jsh> ") {
            Ok(Some(line)) => {
                if !line.trim().is_empty() {
                    editor.add_to_history(&line);
                }
                if let Some(mut command) = parser::parse_line(&line) {
                    command.execute(&mut shell_state);
                }
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }

    std::process::exit(shell_state.last_return_code);
}
