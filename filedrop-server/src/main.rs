use clap::{Parser, Subcommand};
use filedrop_server::{Config, init_storage, run_server};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "filedrop")]
#[command(about = "Upload, list and download files over S3 and DynamoDB")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Server {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Create the metadata table or schema, then exit
    Init {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> Config {
    match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedrop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config } => {
            let cfg = load_config(config.as_deref());
            tracing::info!(
                "Starting Filedrop server. bind={} bucket={} table={}",
                cfg.server.bind_addr,
                cfg.storage.bucket,
                cfg.storage.table
            );

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Init { config } => {
            let cfg = load_config(config.as_deref());
            if let Err(e) = init_storage(&cfg).await {
                tracing::error!("Initialization failed: {}", e);
                std::process::exit(1);
            }
            tracing::info!("Initialization completed");
        }
    }
}
