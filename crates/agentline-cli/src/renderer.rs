use std::collections::HashMap;
use std::io::Write;

use agentline::consumer::EventHandler;
use agentline::protocol::{Event, Frame, ToolOutput};
use console::style;
use serde_json::Value;

use crate::spinner::Spinner;

const THINKING: &str = "Thinking...";
const EXECUTING: &str = "Executing...";

/// Renders the event stream on a terminal
pub struct ConsoleHandler<W: Write> {
    out: W,
    spinner: Spinner,
    open_text: Option<String>,
    // tool call id -> tool name
    pending_tools: HashMap<String, String>,
    show_input: bool,
}

impl<W: Write> ConsoleHandler<W> {
    pub fn new(out: W, spinner: Spinner) -> Self {
        Self {
            out,
            spinner,
            open_text: None,
            pending_tools: HashMap::new(),
            show_input: false,
        }
    }

    /// Also print the input each tool is called with
    pub fn with_tool_input(mut self, show: bool) -> Self {
        self.show_input = show;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn announce_tool(&mut self, tool_call_id: &str, tool_name: &str) -> std::io::Result<()> {
        self.spinner.stop();
        self.pending_tools
            .insert(tool_call_id.to_string(), tool_name.to_string());
        writeln!(
            self.out,
            "\n{}{}{}",
            style("⚙").blue().bold(),
            style(" Calling tool:").dim(),
            style(format!(" {}", tool_name)).blue().bold()
        )
    }

    fn render(&mut self, event: &Event) -> std::io::Result<()> {
        match event {
            Event::Start { .. } => self.spinner.start(THINKING),
            Event::TextStart { id } => {
                self.spinner.stop();
                self.open_text = Some(id.clone());
            }
            Event::TextDelta { id, delta } => {
                if self.open_text.as_ref() == Some(id) {
                    write!(self.out, "{}", delta)?;
                    self.out.flush()?;
                }
            }
            Event::TextEnd { id } => {
                if self.open_text.as_ref() == Some(id) {
                    self.open_text = None;
                    writeln!(self.out)?;
                }
            }
            Event::ToolInputStart {
                tool_call_id,
                tool_name,
            } => {
                self.announce_tool(tool_call_id, tool_name)?;
                self.spinner.start(EXECUTING);
            }
            Event::ToolInputDelta { .. } => {}
            Event::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => {
                // Providers that send no id until the end announce the call here
                if !self.pending_tools.contains_key(tool_call_id) {
                    self.announce_tool(tool_call_id, tool_name)?;
                }
                if self.show_input {
                    self.spinner.stop();
                    writeln!(self.out, "{}", style(format_input(input)).dim())?;
                }
                self.spinner.start(EXECUTING);
            }
            Event::ToolOutputAvailable {
                tool_call_id,
                output,
            } => {
                if self.pending_tools.remove(tool_call_id).is_none() {
                    return Ok(());
                }
                self.spinner.stop();
                match output {
                    ToolOutput::Result(result) => writeln!(
                        self.out,
                        "{}{} {}\n",
                        style("✓").green(),
                        style(" Result:").dim(),
                        result
                    )?,
                    ToolOutput::Error(error) => writeln!(
                        self.out,
                        "{}{} {}\n",
                        style("✗").red().bold(),
                        style(" Error:").dim(),
                        style(error).red().bold()
                    )?,
                }
                self.spinner.start(THINKING);
            }
            Event::Finish => {
                self.spinner.stop();
                if self.open_text.take().is_some() {
                    writeln!(self.out)?;
                }
            }
            Event::Error { error_text } => {
                self.spinner.stop();
                writeln!(
                    self.out,
                    "{}{} {}",
                    style("✗").red().bold(),
                    style(" Error:").dim(),
                    style(error_text).red().bold()
                )?;
            }
        }
        Ok(())
    }
}

fn format_input(input: &Value) -> String {
    match input {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

impl<W: Write> EventHandler for ConsoleHandler<W> {
    fn handle(&mut self, frame: &Frame) {
        let result = match frame {
            Frame::Event(event) => self.render(event),
            Frame::Done => {
                self.spinner.stop();
                self.pending_tools.clear();
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write to the console");
        }
    }

    fn finish(&mut self) {
        self.spinner.stop();
        self.open_text = None;
        self.pending_tools.clear();
        let _ = self.out.flush();
    }
}
