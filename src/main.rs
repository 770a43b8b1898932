mod config;
mod counter;
mod sampler;
mod serve;
mod watchdog;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// A long-running axum server wrapped in a request-counting memory watchdog:
/// count every handled request, sample the process footprint on a cadence,
/// and exit with a clean status on breach so an external supervisor restarts
/// the process with a fresh memory state.
#[derive(Parser, Debug)]
#[command(name = "memwatch", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "memwatch.toml")]
    config: PathBuf,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Memory ceiling in megabytes (overrides config)
    #[arg(long)]
    max_memory_mb: Option<u64>,

    /// Validate config and print resolved settings, don't serve
    #[arg(long)]
    dry_run: bool,

    /// Extra logging (per-tick memory checks, config resolution)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("memwatch v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?cli, "parsed CLI arguments");

    let mut app_config = match config::AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    if let Some(bind) = cli.bind {
        app_config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        app_config.server.port = port;
    }
    if let Some(mb) = cli.max_memory_mb {
        app_config.watchdog.max_memory_bytes = mb.saturating_mul(1024 * 1024);
    }

    if cli.dry_run {
        println!("memwatch v{}", env!("CARGO_PKG_VERSION"));
        println!("Config file: {}", cli.config.display());
        println!("Resolved settings:");
        println!("  server.bind = {}", app_config.server.bind);
        println!("  server.port = {}", app_config.server.port);
        println!("  watchdog.active = {}", app_config.watchdog.active);
        println!(
            "  watchdog.check_interval = {}",
            app_config
                .watchdog
                .check_interval
                .map_or("unset".to_string(), |n| n.to_string())
        );
        println!(
            "  watchdog.min_handled_requests = {}",
            app_config.watchdog.min_handled_requests
        );
        println!(
            "  watchdog.max_memory_bytes = {}",
            app_config.watchdog.max_memory_bytes
        );
        println!("Dry run mode — config validated, not serving.");
        return;
    }

    let dog = Arc::new(watchdog::Watchdog::new(
        app_config.watchdog.clone(),
        Arc::new(sampler::SystemSampler::new()),
    ));

    // Exit status 0 on purpose: the supervisor treats any exit as "respawn",
    // and a breach is the intended outcome, not a crash. Log delivery right
    // before exit is best-effort only.
    let terminate: serve::Terminator = Arc::new(|| {
        tracing::warn!("memory ceiling breached, exiting for supervisor restart");
        std::process::exit(0);
    });

    if let Err(e) = serve::run(&app_config, dog, terminate).await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
