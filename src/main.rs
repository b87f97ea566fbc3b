use clap::Parser;
use querypatterns::{config, server};

/// QueryPatterns - Query-pattern analysis engine for data warehouses
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address
    #[arg(long, default_value = "0.0.0.0")]
    http_host: String,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Directory for the file-backed pattern store (in-memory when omitted)
    #[arg(long)]
    store_path: Option<String>,

    /// Time-bucket granularity for access counts (day, week, month)
    #[arg(long, default_value = "week")]
    bucket: String,

    /// Minimum predicate hits before a column becomes a candidate
    #[arg(long, default_value_t = 2)]
    min_hit_threshold: u64,

    /// Default analysis window length in days
    #[arg(long, default_value_t = 30)]
    window_days: u64,

    /// Load configuration from a YAML file instead (CLI flags ignored)
    #[arg(long)]
    config: Option<String>,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            http_host: cli.http_host,
            http_port: cli.http_port,
            store_path: cli.store_path,
            bucket: cli.bucket,
            min_hit_threshold: cli.min_hit_threshold,
            window_days: cli.window_days,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    println!("\nQueryPatterns v{}\n", env!("CARGO_PKG_VERSION"));

    let config = if let Some(path) = &cli.config {
        config::ServerConfig::from_yaml_file(path)
    } else {
        config::ServerConfig::from_cli(cli.into())
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    server::run_with_config(config).await;
}
