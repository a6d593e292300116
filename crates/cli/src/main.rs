//! WeChat Pay V3 signing CLI.
//!
//! This tool provides commands for:
//! - Signing arbitrary text with the merchant private key
//! - Building the client-side payment invocation payload
//! - Building the `Authorization` header for outbound API requests
//! - Verifying gateway callbacks against a local platform key file
//! - Validating settings files

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod error;
mod sign;
#[cfg(test)]
mod test_support;
mod verify;

use error::CliError;
use verify::CallbackInput;

#[derive(Parser)]
#[command(name = "tpcli")]
#[command(about = "WeChat Pay V3 request signing and callback verification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a message with the merchant private key
    Sign {
        /// Path to the TOML settings file
        #[arg(long, short, env = "TENPAY_CONFIG")]
        config: PathBuf,

        /// Exact text to sign
        message: String,
    },

    /// Build the signed payment invocation payload for a prepay package
    PaySign {
        /// Path to the TOML settings file
        #[arg(long, short, env = "TENPAY_CONFIG")]
        config: PathBuf,

        /// Package string, e.g. `prepay_id=wx2017...`
        #[arg(long)]
        package: String,

        /// Unix timestamp in seconds (defaults to now)
        #[arg(long)]
        timestamp: Option<String>,

        /// Nonce string (defaults to a random 32 character string)
        #[arg(long)]
        nonce: Option<String>,
    },

    /// Build the Authorization header for an outbound API request
    Authorize {
        /// Path to the TOML settings file
        #[arg(long, short, env = "TENPAY_CONFIG")]
        config: PathBuf,

        /// HTTP method
        #[arg(long, default_value = "GET")]
        method: String,

        /// Request path including query string, e.g. `/v3/certificates`
        #[arg(long)]
        url: String,

        /// File containing the request body
        #[arg(long)]
        body_file: Option<PathBuf>,
    },

    /// Verify a callback signature against a platform key file
    VerifyCallback {
        /// Path to the TOML settings file
        #[arg(long, short, env = "TENPAY_CONFIG")]
        config: PathBuf,

        /// Path to the TOML platform key file
        #[arg(long, short)]
        keys: PathBuf,

        /// `Wechatpay-Timestamp` header value
        #[arg(long)]
        timestamp: String,

        /// `Wechatpay-Nonce` header value
        #[arg(long)]
        nonce: String,

        /// `Wechatpay-Signature` header value
        #[arg(long)]
        signature: String,

        /// `Wechatpay-Serial` header value
        #[arg(long)]
        serial: String,

        /// File containing the raw callback body
        #[arg(long)]
        body_file: PathBuf,
    },

    /// Validate a settings file
    Validate {
        /// Path to the TOML settings file
        #[arg(long, short, env = "TENPAY_CONFIG")]
        config: PathBuf,
    },
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .expect("Failed to initialize logger");
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let verbose = cli.verbose;
    match cli.command {
        Commands::Sign { config, message } => {
            sign::sign_message(&config, &message, verbose).map(|_| ())
        }
        Commands::PaySign {
            config,
            package,
            timestamp,
            nonce,
        } => sign::pay_sign(&config, &package, timestamp, nonce, verbose).map(|_| ()),
        Commands::Authorize {
            config,
            method,
            url,
            body_file,
        } => sign::authorize(&config, &method, &url, body_file.as_deref(), verbose).map(|_| ()),
        Commands::VerifyCallback {
            config,
            keys,
            timestamp,
            nonce,
            signature,
            serial,
            body_file,
        } => {
            let input = CallbackInput {
                timestamp,
                nonce,
                signature,
                serial,
            };
            verify::verify_callback(&config, &keys, &input, &body_file, verbose)
        }
        Commands::Validate { config } => config::validate(&config, verbose),
    }
}
