mod analyze_cmd;
mod api;
mod config;
mod history;
mod shell;
mod terminal_output;
mod tips_cmd;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use nitrilens_core::ConcentrationUnit;
use nitrilens_logging::init_logger;
use nitrilens_understanding::{Analyzer, GeminiBackend, PromptTemplate};

use analyze_cmd::AnalyzeOptions;
use api::AppState;
use config::Config;
use history::SessionHistory;

#[derive(Parser)]
#[command(name = "nitrilens")]
#[command(about = "NitriLens: read nitrite test kits with a vision model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more test-kit photos
    Analyze {
        /// JPG or PNG images to analyze
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Gemini API key (defaults to GEMINI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
        /// Unit to report the reading in (mg/L or ppm)
        #[arg(short, long)]
        unit: Option<ConcentrationUnit>,
        /// Gemini model name
        #[arg(short, long)]
        model: Option<String>,
        /// File containing a custom prompt template
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        /// Print one JSON object per image instead of a report
        #[arg(long)]
        json: bool,
    },
    /// Start the local HTTP shell
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show photo tips and how the analysis works
    Tips,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_logger(config.log_dir.as_deref(), &config.log_level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            images,
            api_key,
            unit,
            model,
            prompt_file,
            json,
        } => {
            let config = Config {
                model: model.unwrap_or(config.model),
                prompt_file: prompt_file.or(config.prompt_file),
                ..config
            };
            let analyzer = build_analyzer(&config)?;
            let options = AnalyzeOptions {
                images,
                api_key: api_key.or(config.api_key),
                unit: unit.unwrap_or(config.unit),
                json,
            };
            if !analyze_cmd::run(analyzer, options).await? {
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Tips => tips_cmd::run(),
    }

    Ok(())
}

fn build_analyzer(config: &Config) -> Result<Analyzer> {
    let backend = GeminiBackend::new()
        .with_base_url(&config.base_url)
        .with_timeout(Duration::from_secs(config.timeout_secs));

    let template = match &config.prompt_file {
        Some(path) => PromptTemplate::from_file(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display()))?,
        None => PromptTemplate::default(),
    };

    Ok(Analyzer::new(Arc::new(backend))
        .with_model(&config.model)
        .with_template(template))
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        model = %config.model,
        unit = %config.unit,
        "Starting NitriLens shell"
    );

    let state = Arc::new(AppState {
        analyzer: build_analyzer(&config)?,
        default_api_key: config.api_key.clone(),
        default_unit: config.unit,
        history: RwLock::new(SessionHistory::new()),
    });

    if state.default_api_key.is_none() {
        info!("No GEMINI_API_KEY set; callers must send x-goog-api-key");
    }

    let app = api::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let addr = format!("{}:{}", config.bind_address, config.port);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
