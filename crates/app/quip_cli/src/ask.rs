//! `quip ask` — run one prompt through the logging advisor.

use std::io::Write;

use futures_util::StreamExt;
use quip_core::{ChatClient, LoggingAdvisor, ModelConfig};

use crate::Result;
use crate::cli::AskArgs;

pub fn run(args: &AskArgs) -> Result<()> {
    let config = ModelConfig::from_env();
    log::debug!("provider={} model={}", config.provider, config.model);

    let model = quip_core::build_model(&config)?;
    let client = ChatClient::builder(model)
        .default_options(config.default_options())
        .default_advisor(LoggingAdvisor::new())
        .build();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(ask(&client, args))
}

async fn ask(client: &ChatClient, args: &AskArgs) -> Result<()> {
    let mut spec = client.prompt().user(args.prompt_text());
    if let Some(system) = &args.system {
        spec = spec.system(system.clone());
    }

    let mut out = std::io::stdout().lock();
    if args.stream {
        let mut chunks = spec.stream();
        while let Some(chunk) = chunks.next().await {
            if let Some(text) = chunk?.content() {
                out.write_all(text.as_bytes())?;
                out.flush()?;
            }
        }
        writeln!(out)?;
    } else {
        writeln!(out, "{}", spec.content().await?)?;
    }

    Ok(())
}
