//! Quip API server binary.
//!
//! Serves `GET /ai` over a chat model wrapped in the logging advisor.

use clap::Parser;
use quip_api::config::ApiConfig;
use quip_core::model::config::{DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL, default_provider};
use quip_core::{ChatClient, LoggingAdvisor, ModelConfig};
use tracing::info;

const DEFAULT_LOG_FILTER: &str = "info,quip_api=debug,quip_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "quip_api_server", about = "Quip API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Chat provider (`openai` or `local`). Defaults to `openai` when an API
    /// key is present.
    #[arg(long, env = "CHAT_PROVIDER")]
    provider: Option<String>,

    /// Model name sent to the provider.
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    base_url: String,

    /// API key for the openai provider.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature.
    #[arg(long, env = "CHAT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Maximum tokens to generate.
    #[arg(long, env = "CHAT_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Position of the logging advisor in the chain.
    #[arg(long, env = "LOG_ADVISOR_ORDER", default_value_t = 0, allow_negative_numbers = true)]
    advisor_order: i32,
}

impl Args {
    /// Environment config with command-line overrides applied.
    fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::from_env();
        if let Some(addr) = &self.bind_addr {
            config.bind_addr = addr.clone();
        }
        config
    }

    fn model_config(&self) -> ModelConfig {
        let api_key = self.api_key.clone().filter(|k| !k.is_empty());
        let provider = self
            .provider
            .clone()
            .unwrap_or_else(|| default_provider(api_key.is_some()).to_string());
        ModelConfig {
            provider,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received, shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    let model_config = args.model_config();

    info!(
        provider = %model_config.provider,
        model = %model_config.model,
        advisor_order = args.advisor_order,
        "starting quip_api_server"
    );

    let model = quip_core::build_model(&model_config)?;
    let client = ChatClient::builder(model)
        .default_options(model_config.default_options())
        .default_advisor(LoggingAdvisor::with_order(args.advisor_order))
        .build();

    let config = args.api_config();
    let app = quip_api::router(quip_api::AppState { client });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
