//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// scan-project - ask an LLM about your codebase
///
/// Scans the project tree (skipping node_modules, .git, .env and
/// package-lock.json) and sends the structure, or a single file,
/// to an OpenAI-compatible model for analysis.
///
/// Examples:
///   scan-project
///   scan-project --read --model gpt-4o
///   scan-project --file src/app.js --prompt "Find bugs in this file"
///   scan-project --path ../other-project --dry-run
///   scan-project --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Analyze a single file instead of scanning the project
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Inline the contents of allowed files in the project structure
    #[arg(short, long)]
    pub read: bool,

    /// Model to use for analysis
    ///
    /// Defaults to gpt-4o-mini, or the model set in .scan-project.toml.
    #[arg(short, long, env = "SCAN_PROJECT_MODEL")]
    pub model: Option<String>,

    /// Custom prompt sent instead of the default instruction
    #[arg(short, long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Project directory to scan
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub path: PathBuf,

    /// API key for the model endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds (no timeout by default)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Dry run: print the structure or file content without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .scan-project.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Generate a default .scan-project.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no spinner)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref model) = self.model {
            if model.trim().is_empty() {
                return Err("Model name must not be empty".to_string());
            }
        }

        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
