use anyhow::Result;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::{Input, InputType, Prompt};

const PROMPT: &str = "\x1b[1m\x1b[38;5;33m❯ \x1b[0m";

pub struct RustylinePrompt {
    editor: DefaultEditor,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

/// Map a trimmed line to the input it stands for
fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::command(InputType::AskAgain);
    }
    match line.to_ascii_lowercase().as_str() {
        "exit" | "quit" | "/exit" | "/quit" => Input::command(InputType::Exit),
        "/reset" => Input::command(InputType::Reset),
        _ => Input::message(line),
    }
}

fn is_help(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("/help") || line == "/?"
}

fn print_help() {
    println!("Commands:");
    println!("exit | quit - Exit the session");
    println!("/reset - Forget the conversation so far");
    println!("/? | /help - Display this help message");
    println!("Ctrl+C | Ctrl+D - Exit the session");
}

impl Prompt for RustylinePrompt {
    fn get_input(&mut self) -> Result<Input> {
        let line = match self.editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return Ok(Input::command(InputType::Exit));
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                return Ok(Input::command(InputType::Exit));
            }
        };

        if is_help(&line) {
            print_help();
            return Ok(Input::command(InputType::AskAgain));
        }

        let input = parse_line(&line);
        if input.input_type == InputType::Message {
            let _ = self.editor.add_history_entry(line.trim());
        }
        if input.input_type == InputType::Reset {
            println!("{}", style("Conversation cleared").dim());
        }
        Ok(input)
    }

    fn close(&self) {
        println!("{}", style("Goodbye!").dim());
    }
}
