//! Terminal input for the interactive mode.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

/// One thing the player asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Text typed against the prompt
    Line(String),
    /// `/start`: ask the server to start now (host only)
    Start,
    /// `/quit`
    Quit,
}

pub fn parse_input(line: &str) -> Option<InputEvent> {
    match line.trim_end() {
        "" => None,
        "/start" => Some(InputEvent::Start),
        "/quit" => Some(InputEvent::Quit),
        text => Some(InputEvent::Line(text.to_string())),
    }
}

/// Redisplay the prompt after receiving a message
pub fn redisplay_prompt(participant_id: &str) {
    print!("{}> ", participant_id);
    std::io::stdout().flush().ok();
}

/// Read lines on a dedicated thread (rustyline is blocking).
///
/// The channel closes on Ctrl+C, Ctrl+D or a readline failure.
pub fn spawn_input_reader(participant_id: String) -> mpsc::UnboundedReceiver<InputEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };
        let prompt = format!("{}> ", participant_id);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let Some(event) = parse_input(&line) else {
                        continue;
                    };
                    rl.add_history_entry(line.as_str()).ok();
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_commands_and_text() {
        // テスト項目: コマンドと通常の入力が区別され、空行は無視される
        // given (前提条件):
        let lines = ["/start", "/quit", "the quick", "   "];

        // when (操作):
        let events: Vec<Option<InputEvent>> = lines.iter().map(|l| parse_input(l)).collect();

        // then (期待する結果):
        assert_eq!(
            events,
            vec![
                Some(InputEvent::Start),
                Some(InputEvent::Quit),
                Some(InputEvent::Line("the quick".to_string())),
                None,
            ]
        );
    }
}
