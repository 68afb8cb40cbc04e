//! Main Entrypoint for the Parley API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading the assistant persona from the prompts directory.
//! 3. Building the collaborators (language model, language detector, speech synthesizer).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use parley_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use parley_core::{
    gemini::GeminiClient,
    language::WhatlangDetector,
    llm_client::{EchoClient, LLMClient, OpenAICompatibleClient},
    speech::GoogleTranslateTts,
    turn::Collaborators,
};
use std::{collections::HashMap, fs, net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Upper bound on how often idle REST sessions are swept.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path).with_context(|| {
        format!(
            "Could not read prompts directory '{}'",
            prompts_path.display()
        )
    })?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content.trim().to_string());
        }
    }
    Ok(prompts)
}

/// Picks the language model backend named by the configuration.
fn build_llm_client(config: &Config, system_prompt: String) -> anyhow::Result<Arc<dyn LLMClient>> {
    let settings = config.generation_settings(system_prompt);
    let client: Arc<dyn LLMClient> = match &config.provider {
        Provider::Gemini => {
            info!("Using Gemini provider.");
            let api_key = config
                .gemini_api_key
                .as_ref()
                .context("GEMINI_API_KEY is required for the gemini provider")?;
            Arc::new(GeminiClient::new(api_key, settings))
        }
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let api_key = config
                .openai_api_key
                .as_ref()
                .context("OPENAI_API_KEY is required for the openai provider")?;
            let openai_config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base("https://api.openai.com/v1");
            Arc::new(OpenAICompatibleClient::new(openai_config, settings))
        }
        Provider::Echo => {
            warn!("Using offline echo provider; replies repeat the user's text.");
            Arc::new(EchoClient)
        }
    };
    Ok(client)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Load the Persona ---
    let mut prompts = load_prompts(&config.prompts_path)?;
    let system_prompt = prompts
        .remove("system_prompt")
        .context("system_prompt.md not found in prompts directory")?;

    // --- 4. Initialize Collaborators ---
    let collaborators = Collaborators {
        llm: build_llm_client(&config, system_prompt)?,
        detector: Arc::new(WhatlangDetector),
        synthesizer: Arc::new(GoogleTranslateTts::new(
            config.tts_base_url.clone(),
            config.tts_slow,
        )),
    };

    let app_state = Arc::new(AppState::new(collaborators, config.clone()));
    app_state.sessions.spawn_sweeper(
        config.session_idle_timeout,
        config.session_idle_timeout.min(MAX_SWEEP_PERIOD),
    );

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        transcript_limit = config.transcript_limit,
        session_idle_timeout_secs = config.session_idle_timeout.as_secs(),
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
