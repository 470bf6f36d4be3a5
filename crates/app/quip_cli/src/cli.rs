use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "quip", version, about = "Send prompts through a logged chat pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a prompt and print the reply.
    Ask(AskArgs),
    /// Print name and version.
    Version,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Print the reply chunk by chunk as it arrives.
    #[arg(long)]
    pub stream: bool,

    /// System message sent before the prompt.
    #[arg(long, value_name = "TEXT")]
    pub system: Option<String>,

    /// Prompt words; joined with spaces. Defaults to a startup joke.
    pub prompt: Vec<String>,
}

impl AskArgs {
    pub fn prompt_text(&self) -> String {
        if self.prompt.is_empty() {
            quip_core::DEFAULT_PROMPT.to_string()
        } else {
            self.prompt.join(" ")
        }
    }
}
