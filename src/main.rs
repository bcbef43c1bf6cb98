//! Binary entrypoint for the saloonkeep CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `start` - run the write-back flusher until SIGINT/SIGTERM, then drain to storage
//! - `inventory --user <id>` - print a user's inventory
//! - `grant`, `take`, `transfer`, `upgrade` - one-shot administrative mutations
//!
//! See the library crate docs for module-level details: `saloonkeep::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};

use saloonkeep::app::App;
use saloonkeep::config::Config;
use saloonkeep::economy::{total_weight, BackpackUpgrade};

#[derive(Parser)]
#[command(name = "saloonkeep")]
#[command(about = "Write-back inventory and currency store for a multiplayer game economy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Run the background flusher until interrupted
    Start,
    /// Show a user's inventory
    Inventory {
        #[arg(short, long)]
        user: String,
    },
    /// Give items to a user
    Grant {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        item: String,
        #[arg(short, long, default_value_t = 1)]
        qty: u64,
    },
    /// Take items from a user
    Take {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        item: String,
        #[arg(short, long, default_value_t = 1)]
        qty: u64,
    },
    /// Move items between users
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        item: String,
        #[arg(short, long, default_value_t = 1)]
        qty: u64,
    },
    /// Buy a backpack tier, or grant an exact capacity with --capacity
    Upgrade {
        #[arg(short, long)]
        user: String,
        #[arg(short, long, conflicts_with = "capacity")]
        tier: Option<usize>,
        #[arg(long)]
        capacity: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        Config::create_default(&cli.config).await?;
        println!("Wrote default configuration to {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&config, cli.verbose);
    info!("Starting saloonkeep v{}", env!("CARGO_PKG_VERSION"));

    let app = App::open(config).await?;
    let outcome = run(&app, cli.command).await;

    // One-shot commands also end here: everything they changed is written back.
    let report = app.shutdown().await;
    if report.failed > 0 {
        error!("{} write-back operation(s) failed during shutdown", report.failed);
    }
    outcome
}

async fn run(app: &App, command: Commands) -> Result<()> {
    let store = &app.store;
    match command {
        Commands::Init => {}
        Commands::Start => {
            app.start();
            info!("saloonkeep running; press Ctrl+C to stop");
            wait_for_shutdown_signal().await;
            info!("Received shutdown signal");
        }
        Commands::Inventory { user } => {
            let record = store.get_inventory(&user).await;
            let weight = total_weight(&record, store.catalog());
            println!("{}: {}/{} weight", user, weight, record.max_weight);
            if record.is_empty() {
                println!("  (empty)");
            }
            for (id, qty) in &record.items {
                let def = store.catalog().get(id);
                let name = def.map(|d| d.name.as_str()).unwrap_or(id.as_str());
                let marker = match def {
                    Some(d) if !d.stackable => " (single)",
                    _ => "",
                };
                println!("  {:>6} x {} [{}]{}", qty, name, id, marker);
            }
        }
        Commands::Grant { user, item, qty } => {
            let outcome = store.add_item(&user, &item, qty).await?;
            println!(
                "{} now holds {} {} (weight {})",
                user, outcome.quantity, item, outcome.total_weight
            );
        }
        Commands::Take { user, item, qty } => {
            let outcome = store.remove_item(&user, &item, qty).await?;
            println!(
                "{} now holds {} {} (weight {})",
                user, outcome.remaining, item, outcome.total_weight
            );
        }
        Commands::Transfer { from, to, item, qty } => {
            let outcome = store.transfer_item(&from, &to, &item, qty).await?;
            println!(
                "moved {} {}: {} has {}, {} has {}",
                qty, item, from, outcome.sender_remaining, to, outcome.recipient_quantity
            );
        }
        Commands::Upgrade {
            user,
            tier,
            capacity,
        } => {
            let upgrade = match (tier, capacity) {
                (Some(index), _) => BackpackUpgrade::Tier(index),
                (None, Some(capacity)) => BackpackUpgrade::Capacity(capacity),
                (None, None) => anyhow::bail!("pass either --tier or --capacity"),
            };
            let outcome = store.upgrade_backpack(&user, upgrade).await?;
            println!(
                "{} backpack capacity is now {} ({} silver spent)",
                user, outcome.max_weight, outcome.silver_spent
            );
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!("cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .logging
            .level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.logging.file.as_ref().and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    });

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Mirror to the console only when attached to a terminal
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
