//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod extract;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "cedula-ocr")]
#[command(about = "OCR service that extracts Colombian cédula numbers from documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP upload server
    Serve {
        /// Bind address: PORT, HOST, or HOST:PORT (default: 127.0.0.1:3000)
        #[arg(env = "CEDULA_OCR_BIND")]
        bind: Option<String>,
    },

    /// Run OCR on a local file and print the text and cédula
    Extract {
        /// Image or PDF to process
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Tesseract language code (overrides config)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Check that tesseract, pdftoppm and the language pack are installed
    Check,
}

/// Parse arguments, load settings and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let mut settings = load_settings(options).await?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&mut settings, bind.as_deref()).await,
        Commands::Extract {
            file,
            json,
            language,
        } => {
            if let Some(language) = language {
                settings.language = language;
            }
            extract::cmd_extract(&settings, &file, json).await
        }
        Commands::Check => check::cmd_check(&settings).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "cedula-ocr",
            "extract",
            "scan.pdf",
            "--json",
            "-l",
            "eng",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                file,
                json,
                language,
            } => {
                assert_eq!(file, PathBuf::from("scan.pdf"));
                assert!(json);
                assert_eq!(language.as_deref(), Some("eng"));
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cedula-ocr", "check", "-v", "--config", "c.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }
}
