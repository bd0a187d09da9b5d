// ABOUTME: Entry point for wabridge — a multi-session messaging bridge with an HTTP control surface.
// ABOUTME: Parses CLI args, loads config, installs logging, and runs the app.

use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use wabridge::app::App;
use wabridge::config::{Config, TOKEN_ENV};
use wabridge::logging;

const ABOUT: &str = "Multi-session messaging bridge. \
No network driver is linked: sessions use the in-process transport, \
so pairing QR codes are placeholders that cannot be scanned.";

#[derive(Debug, Parser)]
#[command(name = "wabridge", version, about = ABOUT)]
struct Cli {
    /// Config file (defaults to ~/.wabridge/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding server.bind.
    #[arg(long)]
    bind: Option<String>,

    /// Credential root directory, overriding credentials.root.
    #[arg(long)]
    auth_dir: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_token_override(std::env::var(TOKEN_ENV).ok());
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(root) = &cli.auth_dir {
        config.credentials.root = root.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("wabridge: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(cli.verbose, &config.logging.level) {
        eprintln!("wabridge: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = App::new(config).run().await {
        error!(error = %format!("{e:#}"), "wabridge exited with an error");
        std::process::exit(1);
    }
}
