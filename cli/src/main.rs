mod config;
mod seed;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use grove_core::{Clock, SystemClock};
use grove_daemon::{db, insights, Services, Store};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Tree adoption and carbon-offset tracking service")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "grove.toml", env = "GROVE_CONFIG")]
    config: PathBuf,

    /// Data directory (overrides config file)
    #[arg(short, long, env = "GROVE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep all data in memory
    #[arg(long)]
    in_memory: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Insert the demo user and tree
    Seed,
    /// Print the current leaderboard
    Leaderboard,
    /// Print a user's trees
    Trees {
        #[arg(short, long)]
        user: u64,
    },
    /// Print the species catalog
    Species {
        #[arg(short, long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }
    if cli.in_memory {
        config.storage.in_memory = true;
    }
    init_logging(&config);

    let store = open_store(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let generator = config.generator();
    let timeout = generator.timeout + Duration::from_secs(1);
    let services = Services::new(
        store.clone(),
        clock.clone(),
        insights::generator_from_config(generator),
        timeout,
    );

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            grove_daemon::serve(services, &host, port)
                .await
                .with_context(|| format!("serving on {host}:{port}"))?;
        }
        Command::Seed => match seed::seed(store, clock.now()).await? {
            Some(report) => print_json(&report)?,
            None => println!("demo data already present"),
        },
        Command::Leaderboard => print_json(&services.leaderboard.compute().await?)?,
        Command::Trees { user } => print_json(&services.ledger.list_for_user(user).await?)?,
        Command::Species { region } => {
            print_json(&services.ledger.available_species(region.as_deref()).await?)?
        }
    }
    Ok(())
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let file_layer = config.logging.log_dir.as_ref().map(|dir| {
        std::fs::create_dir_all(dir).ok();
        let file_appender = tracing_appender::rolling::never(dir, "grove.log");
        fmt::layer().with_ansi(false).with_writer(file_appender)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    if config.storage.in_memory {
        info!("using in-memory database");
        return Ok(Arc::new(db::open_in_memory().await?));
    }
    let dir = config.data_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("grove.db");
    info!(path = %path.display(), "opening database");
    Ok(Arc::new(db::open(&path).await?))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
