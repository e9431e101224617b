use anyhow::Result;
use std::io::Write;

use agentline::agent::Agent;
use agentline::consumer::StreamConsumer;

use crate::prompt::{InputType, Prompt};
use crate::renderer::ConsoleHandler;

#[cfg(test)]
mod mock_provider;

/// Drives an agent from a prompt, rendering its event stream on a console.
///
/// `/reset` starts over with a fresh agent from `new_agent`.
pub struct Session<'a, W: Write + Send> {
    new_agent: Box<dyn Fn() -> Agent + 'a>,
    agent: Agent,
    prompt: Box<dyn Prompt + 'a>,
    console: StreamConsumer<ConsoleHandler<W>>,
}

impl<'a, W: Write + Send> Session<'a, W> {
    pub fn new<F>(new_agent: F, prompt: Box<dyn Prompt + 'a>, console: ConsoleHandler<W>) -> Self
    where
        F: Fn() -> Agent + 'a,
    {
        Session {
            agent: new_agent(),
            new_agent: Box::new(new_agent),
            prompt,
            console: StreamConsumer::new(console),
        }
    }

    /// Read inputs until the user leaves. A failed reply is shown and the
    /// session carries on.
    pub async fn start(&mut self) -> Result<()> {
        self.prompt.ready();

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = input.content {
                        if let Err(e) = self.process(&content).await {
                            tracing::error!(error = %e, "reply failed");
                        }
                    }
                }
                InputType::Reset => self.agent = (self.new_agent)(),
                InputType::AskAgain => continue,
                InputType::Exit => break,
            }
        }
        self.prompt.close();
        Ok(())
    }

    /// Answer a single input, failing if the reply fails
    pub async fn headless_start(&mut self, input: &str) -> Result<()> {
        self.process(input).await
    }

    async fn process(&mut self, input: &str) -> Result<()> {
        let result = self.agent.chat(input, &mut self.console).await;
        self.console.finish();
        result?;
        Ok(())
    }
}
