use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use receipt_ocr_rust::{compare, server, settings};

#[derive(Parser, Debug)]
#[command(
    name = "receipt-ocr-rust",
    version,
    about = "Receipt OCR service: image preprocessing + tesseract behind HTTP"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (POST /api/ocr, GET /health)
    Serve {
        /// Listen address (default from settings: 0.0.0.0:5000)
        #[arg(short = 'a', long = "addr")]
        addr: Option<String>,

        /// Save every preprocessed image to the debug directory
        #[arg(long = "save-debug")]
        save_debug: bool,
    },
    /// Run the OCR pipeline on a local image and print the text
    Recognize {
        /// Image file to read
        file: PathBuf,

        /// Parse receipt line items and print JSON
        #[arg(long = "items")]
        items: bool,

        /// Save the preprocessed image to the debug directory
        #[arg(long = "save-debug")]
        save_debug: bool,
    },
    /// Check whether a remote OCR API answers on /health
    Check {
        /// Base URL of the OCR API (default: $OCR_API_URL)
        #[arg(long = "api-base", env = "OCR_API_URL")]
        api_base: String,
    },
    /// Upload an image to a remote OCR API and print its JSON reply
    Submit {
        /// Base URL of the OCR API (default: $OCR_API_URL)
        #[arg(long = "api-base", env = "OCR_API_URL")]
        api_base: String,

        /// Image file to upload
        file: PathBuf,
    },
    /// Compare supplier prices across receipts exported as JSON
    Compare {
        /// JSON file with `suppliers` and `receipts`
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    receipt_ocr_rust::logging::init(cli.verbose)?;

    match cli.command {
        Command::Serve { addr, save_debug } => {
            let mut settings = settings::load_settings(cli.read_settings.as_deref())?;
            if let Some(addr) = addr {
                settings.server_addr = addr;
            }
            settings.debug_save_images |= save_debug;
            server::run_server(settings).await
        }
        Command::Recognize {
            file,
            items,
            save_debug,
        } => {
            let mut settings = settings::load_settings(cli.read_settings.as_deref())?;
            settings.debug_save_images |= save_debug;
            let recognition = tokio::task::spawn_blocking(move || {
                receipt_ocr_rust::recognize_file(&file, &settings, items)
            })
            .await??;
            if items {
                println!("{}", serde_json::to_string_pretty(&recognition)?);
            } else {
                println!("{}", recognition.output.text);
            }
            Ok(())
        }
        Command::Check { api_base } => {
            let report = server::check_health(&api_base).await?;
            if !report.connected {
                return Err(anyhow!("{}", report.message));
            }
            println!("{}", report.message);
            if let Some(data) = report.data {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            Ok(())
        }
        Command::Submit { api_base, file } => {
            let outcome = server::submit_file(&api_base, &file).await?;
            println!("{}", serde_json::to_string_pretty(&outcome.body)?);
            if !(200..300).contains(&outcome.status) {
                return Err(anyhow!("OCR backend answered with status {}", outcome.status));
            }
            Ok(())
        }
        Command::Compare { file } => {
            let input = compare::load_comparison_input(&file)?;
            let rows = compare::compare_prices(&input);
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
    }
}
