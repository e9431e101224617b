use anyhow::Result;

pub mod rustyline;

/// Source of user input for an interactive session
pub trait Prompt {
    fn get_input(&mut self) -> Result<Input>;

    fn ready(&self) {
        println!();
        println!("agentline is running! Type your message, or /help to see the commands.");
        println!();
    }

    fn close(&self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub input_type: InputType,
    // Commands such as Exit carry no content
    pub content: Option<String>,
}

impl Input {
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            input_type: InputType::Message,
            content: Some(content.into()),
        }
    }

    pub fn command(input_type: InputType) -> Self {
        Self {
            input_type,
            content: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// Nothing to send, read the next line
    AskAgain,
    Message,
    Exit,
    /// Start a new conversation
    Reset,
}
