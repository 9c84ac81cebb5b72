//! HelloWorld message service entry point.

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hello_service::config::Config;
use hello_service::lifecycle::{DrainOutcome, Lifecycle, LifecycleState};
use hello_service::metrics;
use hello_service::server::{open_store, start};
use hello_service::utils::shutdown_signal;

/// HelloWorld message CRUD service.
#[derive(Parser, Debug)]
#[command(name = "hello-service")]
#[command(about = "CRUD HTTP service for HelloWorld messages")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Check configuration and database connectivity.
    CheckConfig,

    /// Create the messages table and exit.
    Migrate,

    /// Insert messages through the normal validated create path.
    Seed {
        /// Messages to insert.
        #[arg(default_value = "Hello, World!")]
        messages: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap so env-backed flags see it
    let dotenv_found = dotenvy::dotenv().is_ok();

    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("hello_service=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if args.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    if !dotenv_found {
        info!("No .env file found or error loading .env file");
    }

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Migrate) => cmd_migrate().await,
        Some(Command::Seed { messages }) => cmd_seed(messages).await,
        Some(Command::Serve) | None => cmd_serve().await,
    }
}

/// Load and validate configuration, logging why it was rejected.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Run the HTTP server until SIGINT/SIGTERM.
async fn cmd_serve() -> anyhow::Result<()> {
    let config = load_config()?;

    let metrics_handle = match metrics::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
            None
        }
    };

    let server = start(&config, metrics_handle).await?;

    match server.shutdown_on(shutdown_signal()).await? {
        DrainOutcome::Completed => info!("All in-flight requests completed"),
        DrainOutcome::TimedOut { abandoned } => {
            warn!(abandoned, "Stopped with requests still in flight")
        }
    }

    Ok(())
}

/// Check configuration validity and database connectivity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("HELLO SERVICE - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Connecting to database... ");
    let lifecycle = Lifecycle::new();
    let store = match open_store(&config, &lifecycle).await {
        Ok(store) => {
            println!("OK");
            store
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Database check failed"));
        }
    };

    let count = store.count().await?;

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Database: {}", config.redacted_dsn());
    println!(
        "  Listen Address: {}{}",
        config.listen_addr(),
        if config.port_defaulted() { " (default port)" } else { "" }
    );
    println!("  Connect Timeout: {}s", config.db_connect_timeout_secs);
    println!("  Stored Messages: {}", count);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Create the schema and exit.
async fn cmd_migrate() -> anyhow::Result<()> {
    let config = load_config()?;
    let lifecycle = Lifecycle::new();
    open_store(&config, &lifecycle).await?;
    lifecycle.advance(LifecycleState::Stopped);
    info!("Schema is up to date");
    Ok(())
}

/// Insert the given messages.
async fn cmd_seed(messages: Vec<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let lifecycle = Lifecycle::new();
    let store = open_store(&config, &lifecycle).await?;

    for text in &messages {
        match store.create(text).await {
            Ok(record) => println!("  #{} {}", record.id, record.message),
            Err(e) => {
                error!(message = %text, error = %e, "Failed to seed message");
                return Err(e.into());
            }
        }
    }

    lifecycle.advance(LifecycleState::Stopped);
    info!(count = messages.len(), "Seeded messages");
    Ok(())
}
