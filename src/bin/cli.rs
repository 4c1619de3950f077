//! Phone Pilot - language-model driven iOS automation
//!
//! This is the CLI entry point for the phone-pilot tool.
//! Run with: cargo run --bin phone-pilot

use anyhow::Context;
use phone_pilot::{
    AgentConfig, AppSettings, FileCache, MemoryCache, ModelClient, ModelConfig, PhonePilot,
    ResponseCache, WdaClient,
};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
    let task = env::var("TASK").context("TASK must be set")?;

    let first_run = AppSettings::settings_path().is_some_and(|path| !path.exists());
    let mut settings = AppSettings::load();
    if first_run {
        if let Err(e) = settings.save() {
            tracing::warn!("Could not save default settings: {}", e);
        }
    }

    // Environment overrides saved settings
    if let Ok(base_url) = env::var("MODEL_BASE_URL") {
        settings.base_url = base_url;
    }
    if let Ok(model_name) = env::var("MODEL_NAME") {
        settings.model_name = model_name;
    }
    if let Ok(wda_url) = env::var("WDA_URL") {
        settings.wda_url = wda_url;
    }
    if let Ok(cache_dir) = env::var("PILOT_CACHE_DIR") {
        settings.cache_dir = cache_dir;
    }
    if env::var("PILOT_NO_CACHE")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
    {
        settings.use_cache = false;
    }
    let max_steps: Option<u32> = env::var("PILOT_MAX_STEPS")
        .ok()
        .and_then(|s| s.parse().ok());

    let model_config = ModelConfig::default()
        .with_base_url(&settings.base_url)
        .with_api_key(&api_key)
        .with_model_name(&settings.model_name);

    let mut agent_config = AgentConfig::default();
    if let Some(max_steps) = max_steps {
        agent_config = agent_config.with_max_steps(max_steps);
    }
    if !settings.verbose {
        agent_config = agent_config.quiet();
    }

    let cache: Arc<dyn ResponseCache> = match settings.resolved_cache_dir() {
        Some(dir) if settings.use_cache => Arc::new(
            FileCache::new(&dir)
                .with_context(|| format!("Failed to open cache at {}", dir.display()))?,
        ),
        _ => Arc::new(MemoryCache::new()),
    };

    println!("🤖 Phone Pilot - Language-model driven iOS Automation");
    println!("================================================");
    println!("Model: {} @ {}", settings.model_name, settings.base_url);
    println!("WebDriverAgent: {}", settings.wda_url);
    match settings.resolved_cache_dir() {
        Some(dir) if settings.use_cache => println!("Cache: {}", dir.display()),
        _ => println!("Cache: in memory"),
    }
    if let Some(max_steps) = max_steps {
        println!("Max steps: {}", max_steps);
    }
    println!("================================================\n");

    let backend = WdaClient::connect(&settings.wda_url)
        .await
        .with_context(|| format!("Failed to connect to WebDriverAgent at {}", settings.wda_url))?;

    let mut pilot = PhonePilot::new(
        Arc::new(backend),
        Arc::new(ModelClient::new(model_config.clone())),
        cache,
        model_config,
        agent_config,
    );

    println!("📝 Task: {}\n", task);

    match pilot.run(&task).await {
        Ok(summary) => {
            println!(
                "\n✅ Result: done in {} after {} actions ({} steps)",
                summary.app, summary.actions, summary.steps
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            Err(e.into())
        }
    }
}
