//! # Visitor Beacon CLI (`beacon`)
//!
//! ## Usage
//!
//! ```bash
//! beacon --config ./config/beacon.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `beacon check` | Validate the configuration file |
//! | `beacon sign <json>` | Sign a value with the configured salt |
//! | `beacon verify <token>` | Verify a token and print its value |
//! | `beacon url --visitor <id>` | Print the beacon URL for a visitor |
//! | `beacon serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! beacon sign '"abc123"'
//! beacon url --visitor abc123 --referrer https://example.com/ \
//!     --conversion ABC-1=19.99 --conversion XYZ-2=4.50
//! RUST_LOG=debug beacon serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use visitor_beacon::beacon::BeaconBuilder;
use visitor_beacon::models::ConversionEvent;
use visitor_beacon::{config, server, signer};

/// Tamper-evident visitor identification and conversion beacons.
#[derive(Parser)]
#[command(name = "beacon", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/beacon.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print a summary.
    Check,

    /// Sign a value with the configured salt.
    ///
    /// The argument is parsed as JSON; anything that is not valid JSON is
    /// signed as a plain string.
    Sign {
        value: String,
    },

    /// Verify a signed token and print the embedded JSON value.
    Verify {
        token: String,
    },

    /// Print the beacon URL for a visitor.
    Url {
        /// Visitor id to embed as `uid`.
        #[arg(long)]
        visitor: String,

        /// Referring page.
        #[arg(long)]
        referrer: Option<String>,

        /// Conversion as `SKU=VALUE`; repeat for several, in order.
        #[arg(long = "conversion", value_parser = parse_key_val)]
        conversions: Vec<(String, String)>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

/// Parse a `key=value` pair for `--conversion` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid SKU=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let settings = cfg.settings()?;

    match cli.command {
        Commands::Check => {
            println!("Configuration OK: {}", cli.config.display());
            println!("  enabled:   {}", settings.enabled);
            println!("  site:      {}", settings.site_shortname);
            println!("  endpoint:  {}", settings.endpoint);
            println!("  lifetime:  {} days", settings.cookie_lifetime.num_days());
            println!("  bind:      {}", cfg.server.bind);
        }
        Commands::Sign { value } => {
            let value: serde_json::Value =
                serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            println!("{}", signer::sign(&value, &settings.salt)?);
        }
        Commands::Verify { token } => {
            let value: serde_json::Value = signer::verify(&token, &settings.salt)?;
            println!("{}", value);
        }
        Commands::Url {
            visitor,
            referrer,
            conversions,
        } => {
            let conversions: Vec<ConversionEvent> = conversions
                .into_iter()
                .map(|(sku, value)| ConversionEvent { sku, value })
                .collect();
            let request = BeaconBuilder::new(settings.endpoint.clone()).build(
                settings.enabled,
                &settings.site_shortname,
                &visitor,
                referrer.as_deref(),
                &conversions,
            );
            match request {
                Some(request) => println!("{}", request.url()),
                None => println!("beacon disabled"),
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
