use std::path::PathBuf;

use clap::{Parser, Subcommand};
use foodgram_sdk::{config::Config, server};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "foodgram", version, about = "Recipe sharing backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (the default)
    Serve,
    /// Load a JSON array of {name, measurement_unit} into the ingredient catalog
    ImportIngredients {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::start_server(config).await?,
        Command::ImportIngredients { path } => {
            let inserted = server::import_ingredients_file(&config, &path).await?;
            log::info!("{inserted} new ingredients from {}", path.display());
        }
    }

    Ok(())
}
