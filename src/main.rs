//! Binary entrypoint for the Mallpoints CLI.
//!
//! Commands:
//! - `maintain [--watch] [--interval <s>]` - run the maintenance sweep once or on a schedule
//! - `init` - create a starter `config.toml` and seed the achievement catalog
//! - `status` - print store and cache statistics
//! - `backup [--list] [--verify <id>] [--prune]` - manage data-directory archives
//! - `restore --id <id> --target <dir>` - unpack an archive
//! - `admin-passwd` - interactively set the admin password (argon2 hashed)
//!
//! See the library crate docs for module-level details: `mallpoints::`.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use mallpoints::backup::{BackupKind, BackupManager};
use mallpoints::config::Config;
use mallpoints::engine::{maintenance, GamificationEngine, LeaderboardMetric};

#[derive(Parser)]
#[command(name = "mallpoints")]
#[command(about = "A gamified customer engagement backend for shopping malls")]
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
    /// Initialize a new configuration and data directory
    Init,
    /// Show store, session, and cache statistics
    Status,
    /// Run the maintenance sweep (mission expiry, companion upkeep)
    Maintain {
        /// Keep running on an interval instead of sweeping once
        #[arg(short, long)]
        watch: bool,
        /// Seconds between sweeps in watch mode
        #[arg(short, long, default_value_t = 3600)]
        interval: u64,
    },
    /// Create or inspect backups of the data directory
    Backup {
        /// Backup storage directory
        #[arg(short, long, default_value = "backups")]
        dir: String,
        /// List existing backups instead of creating one
        #[arg(short, long)]
        list: bool,
        /// Verify the named backup's checksum
        #[arg(long)]
        verify: Option<String>,
        /// Apply the retention policy to scheduled backups
        #[arg(long)]
        prune: bool,
    },
    /// Restore a backup into a directory
    Restore {
        /// Backup storage directory
        #[arg(short, long, default_value = "backups")]
        dir: String,
        /// Backup id to restore
        #[arg(long)]
        id: String,
        /// Directory to unpack into
        #[arg(long)]
        target: String,
    },
    /// Set or update the admin password in the config file
    AdminPasswd,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("initializing new mallpoints configuration");
            let config = Config::create_default(&cli.config).await?;
            info!("configuration file created at {}", cli.config);

            // Opening the store seeds the achievement catalog.
            let engine = GamificationEngine::open(config)?;
            println!(
                "Initialized '{}' with {} achievements in the catalog.",
                engine.config().mall.name,
                engine.store().list_achievements()?.len()
            );
        }
        Commands::Status => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let engine = GamificationEngine::open(config)?;
            let store = engine.store();
            let now = chrono::Utc::now();

            println!("Mall: {}", engine.config().mall.name);
            println!("Members: {}", store.list_usernames()?.len());
            println!("Achievements in catalog: {}", store.list_achievements()?.len());
            println!("Active event multiplier: {:.2}", engine.active_event_multiplier(now)?);
            println!("Active sessions: {}", engine.auth().active_sessions());
            let stats = engine.cache().stats();
            println!(
                "Cache: {} memory hits, {} fallback hits, {} misses",
                stats.memory_hits, stats.fallback_hits, stats.misses
            );
            let top = engine.leaderboard(LeaderboardMetric::Coins, now)?;
            if !top.is_empty() {
                println!("Top member by coins: {} ({})", top[0].display_name, top[0].score);
            }
            for line in store.recent_audit(5)? {
                println!("audit: {}", line);
            }
        }
        Commands::Maintain { watch, interval } => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let engine = Arc::new(GamificationEngine::open(config)?);

            if watch {
                let shutdown = Arc::new(AtomicBool::new(false));
                let flag = shutdown.clone();
                let worker = tokio::spawn(maintenance::run_periodic(
                    engine.clone(),
                    interval,
                    shutdown.clone(),
                ));
                tokio::signal::ctrl_c().await?;
                flag.store(true, Ordering::Relaxed);
                worker.abort();
                info!("maintenance watch stopped");
            } else {
                let report = engine.run_maintenance(chrono::Utc::now())?;
                println!(
                    "Swept {} accounts: {} missions expired, {} companion decay days, {} sessions pruned.",
                    report.users_scanned,
                    report.missions_expired,
                    report.companion_decay_days,
                    report.sessions_pruned
                );
            }
        }
        Commands::Backup {
            dir,
            list,
            verify,
            prune,
        } => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let mut manager = BackupManager::new(&config.storage.data_dir, &dir, 7)?;

            if let Some(id) = verify {
                let ok = manager.verify(&id)?;
                println!("{}: {}", id, if ok { "ok" } else { "CHECKSUM MISMATCH" });
                std::process::exit(if ok { 0 } else { 1 });
            }
            if list {
                for entry in manager.list() {
                    println!(
                        "{}  {:?}  {}  {} bytes",
                        entry.id, entry.kind, entry.created_at, entry.size_bytes
                    );
                }
                return Ok(());
            }
            if prune {
                let removed = manager.prune()?;
                println!("Pruned {} scheduled backups.", removed.len());
                return Ok(());
            }
            let entry = manager.create(BackupKind::Manual)?;
            println!("Created backup {} ({} bytes).", entry.id, entry.size_bytes);
        }
        Commands::Restore { dir, id, target } => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let manager = BackupManager::new(&config.storage.data_dir, &dir, 7)?;
            manager.restore(&id, std::path::Path::new(&target))?;
            println!("Restored {} to {}.", id, target);
        }
        Commands::AdminPasswd => {
            use argon2::Argon2;
            use password_hash::{PasswordHasher, SaltString};

            let mut config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            println!("Setting admin password for '{}'.", config.mall.name);
            let pass1 = rpassword::prompt_password("New password: ")?;
            if pass1.len() < 8 {
                println!("Error: password too short (min 8).");
                return Ok(());
            }
            if pass1.len() > 128 {
                println!("Error: password too long.");
                return Ok(());
            }
            let pass2 = rpassword::prompt_password("Confirm password: ")?;
            if pass1 != pass2 {
                println!("Error: passwords do not match.");
                return Ok(());
            }
            let salt = SaltString::generate(&mut rand::thread_rng());
            let argon = Argon2::default();
            let hash = match argon.hash_password(pass1.as_bytes(), &salt) {
                Ok(h) => h.to_string(),
                Err(e) => {
                    println!("Hash error: {e}");
                    return Ok(());
                }
            };
            config.security.admin_password_hash = Some(hash);
            config.save(&cli.config).await?;
            println!("Admin password updated successfully.");
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if verbosity == 0 {
        if let Some(cfg) = config {
            if let Ok(level) = cfg.logging.level.parse() {
                builder.filter_level(level);
            }
        }
    }

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(path) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            let file = std::sync::Arc::new(std::sync::Mutex::new(f));
            // When stdout is not a terminal (piped, service manager), the
            // file is the only sink; duplicating into the pipe is noise.
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
