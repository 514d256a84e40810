use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visiongen::dispatcher::Dispatcher;
use visiongen::history::{HistoryStore, HttpHistoryStore, MockHistoryStore};
use visiongen::keys::KeyRing;
use visiongen::models::{Config, GenerationOutcome, ParamMap};
use visiongen::provider::FalClient;

#[derive(Debug, Parser)]
#[command(name = "visiongen")]
#[command(about = "Dispatch an image-generation request with key rotation")]
struct CliArgs {
    /// Text prompt for the generation.
    #[arg(value_name = "PROMPT")]
    prompt: String,

    /// Model identifier to invoke.
    #[arg(long, default_value = "fal-ai/flux/dev")]
    model: String,

    /// Number of images to request (clamped to 4).
    #[arg(long)]
    num_images: Option<u32>,

    /// Fixed seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Named image size preset (e.g. square_hd, landscape_4_3).
    #[arg(long)]
    image_size: Option<String>,
}

fn build_params(args: &CliArgs) -> ParamMap {
    let mut params = ParamMap::new();
    params.insert("prompt".to_string(), serde_json::json!(args.prompt));
    if let Some(num_images) = args.num_images {
        params.insert("num_images".to_string(), serde_json::json!(num_images));
    }
    if let Some(seed) = args.seed {
        params.insert("seed".to_string(), serde_json::json!(seed));
    }
    if let Some(image_size) = &args.image_size {
        params.insert("image_size".to_string(), serde_json::json!(image_size));
    }
    params
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visiongen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let keys = KeyRing::new(config.api_keys.clone());
    info!("Loaded {} API key(s)", keys.len());

    let provider = Arc::new(FalClient::new().with_base_url(config.base_url.clone()));

    let history: Arc<dyn HistoryStore> = match &config.history_endpoint {
        Some(endpoint) => Arc::new(HttpHistoryStore::new(
            endpoint.clone(),
            config.history_api_key.clone(),
        )),
        None => {
            warn!("HISTORY_ENDPOINT not set — generation history will not be persisted");
            Arc::new(MockHistoryStore::new())
        }
    };

    let mut dispatcher = Dispatcher::new(provider, history, keys);
    if let Some(user_id) = &config.user_id {
        dispatcher = dispatcher.with_user_id(user_id.clone());
    }

    let outcome = dispatcher.dispatch(&args.model, build_params(&args)).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    match outcome {
        GenerationOutcome::Success(_) => Ok(()),
        GenerationOutcome::Failure { message, .. } => {
            tracing::error!("Generation failed: {}", message);
            std::process::exit(1);
        }
    }
}
