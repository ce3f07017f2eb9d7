//! Cloud build Discord bot binary.
//!
//! Start the bot with:
//! ```bash
//! DISCORD_TOKEN=xxx UCB_API_KEY=yyy cargo run -p cloudbuild-discord -- --config config/config.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use cloudbuild_core::config::{self, CONFIG_PATH_ENV};
use cloudbuild_discord::DiscordBot;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Cloud build bot - trigger Unity Cloud Build builds from Discord
#[derive(Parser, Debug)]
#[command(name = "cloudbuild-bot")]
#[command(about = "Discord bot that starts Unity Cloud Build builds and relays build results")]
struct Args {
    /// Path to the JSON config file (default: config/config.json)
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Secrets referenced as ${NAME} in the config usually live in .env
    let _ = dotenvy::dotenv();

    init_logging(args.verbose);

    let config_path = args.config.unwrap_or_else(config::config_path);
    let app_config = match config::load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(path = %config_path.display(), error = %e, "Failed to load config");
            return Err(e.into());
        }
    };
    tracing::info!(
        path = %config_path.display(),
        project = %app_config.unity_cloud_build.project_name,
        targets = app_config.unity_cloud_build.cloud_build_targets.len(),
        "Config loaded"
    );

    let bot = DiscordBot::new(app_config)?;
    bot.run().await?;

    Ok(())
}

/// Initialize logging. Warnings and errors go to stderr, the rest to stdout.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "cloudbuild_discord=info,cloudbuild_core=info,serenity=warn",
        1 => "cloudbuild_discord=debug,cloudbuild_core=debug,serenity=info",
        2 => "cloudbuild_discord=trace,cloudbuild_core=trace,serenity=debug",
        _ => "trace",
    };

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .init();
}
