//! scan-project - AI-assisted overview of a codebase
//!
//! A CLI tool that scans a project directory into a nested map of
//! files (optionally with their contents) and asks an OpenAI-compatible
//! model to analyze either that map or a single file.
//!
//! Exit codes:
//!   0 - Success (including a placeholder reply after a failed model call)
//!   1 - Runtime error (missing API key, unreadable directory, bad config, etc.)

mod analyzer;
mod cli;
mod config;
mod models;
mod scanner;

use analyzer::{reply_or_sentinel, ClientSettings, CodeAnalyzer, OpenAiClient};
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::ScanSummary;
use scanner::{FileScanner, ScanConfig};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // ./.env must be loaded before clap reads OPENAI_API_KEY and friends
    let dotenv = dotenvy::from_filename(".env");

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("scan-project v{}", env!("CARGO_PKG_VERSION"));
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!("Failed to load .env: {}", e),
    }

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .scan-project.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, extensions and excludes.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout only carries the structure and the reply.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run a file or project analysis. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    debug!(
        "Model: {} at {} (timeout: {:?})",
        config.model.name, config.model.base_url, config.model.timeout_seconds
    );

    let file_scanner = FileScanner::new(ScanConfig::from(&config.scanner));

    let exit_code = match args.file {
        Some(ref file) => analyze_file(&args, &config, &file_scanner, file).await?,
        None => analyze_project(&args, &config, &file_scanner).await?,
    };

    debug!("Finished in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(exit_code)
}

/// Read one file and send its content to the model.
async fn analyze_file(
    args: &Args,
    config: &Config,
    file_scanner: &FileScanner,
    file: &Path,
) -> Result<i32> {
    println!("Reading file: {}\n", file.display());

    let content = match file_scanner.read_file(file) {
        Ok(content) => content,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => {
            let path = e.path().unwrap_or(file);
            warn!("Cannot analyze {}: {}", path.display(), e);
            println!("{}", e);
            return Ok(1);
        }
    };
    println!("{}", content);

    if args.dry_run {
        println!("\n✅ Dry run complete. No model calls were made.");
        return Ok(0);
    }

    println!("\n🔍 Analyzing File Content:\n");
    let analyzer = build_analyzer(args, config)?;
    let result = with_spinner(
        !args.quiet,
        "Waiting for the model...",
        analyzer.analyze_text(&content, &config.model.name, args.prompt.as_deref()),
    )
    .await;

    println!("{}", reply_or_sentinel(result)?);
    Ok(0)
}

/// Scan the project and send its structure to the model.
async fn analyze_project(args: &Args, config: &Config, file_scanner: &FileScanner) -> Result<i32> {
    info!("Scanning {}", args.path.display());

    let structure = file_scanner
        .scan(&args.path, args.read)
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;
    info!("Scanned {}", ScanSummary::from_map(&structure));

    println!("\n🔍 Project Structure:\n");
    println!(
        "{}",
        serde_json::to_string_pretty(&structure).context("Failed to render project structure")?
    );

    if args.dry_run {
        println!("\n✅ Dry run complete. No model calls were made.");
        return Ok(0);
    }

    println!("\n🔍 Analyzing Project Structure:\n");
    let analyzer = build_analyzer(args, config)?;
    let result = with_spinner(
        !args.quiet,
        "Waiting for the model...",
        analyzer.analyze_structure(&structure, &config.model.name, args.prompt.as_deref()),
    )
    .await;

    println!("{}", reply_or_sentinel(result)?);
    Ok(0)
}

fn build_analyzer(args: &Args, config: &Config) -> Result<CodeAnalyzer<OpenAiClient>> {
    let mut settings = ClientSettings::from(&config.model);
    settings.api_key = args.api_key.clone();

    let client = OpenAiClient::new(settings)?;
    Ok(CodeAnalyzer::new(client))
}

/// Await `fut` while showing a spinner on stderr.
async fn with_spinner<F: Future>(enabled: bool, message: &str, fut: F) -> F::Output {
    let spinner = enabled.then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });

    let output = fut.await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    output
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default(Path::new(".")) {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
