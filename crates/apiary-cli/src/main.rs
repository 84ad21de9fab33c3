mod api;
mod config;
mod daemon;

use apiary_db::ApiaryDb;
use apiary_fake::WalletForge;
use clap::{Parser, Subcommand};
use config::ApiaryConfig;
use std::io::Write;

#[derive(Parser)]
#[command(name = "apiary")]
#[command(about = "Crypto-wallet honeypot that records and analyzes attacker behavior")]
struct Cli {
    #[arg(
        short = 'f',
        long,
        default_value = "apiary.toml",
        help = "Path to config file"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the honeypot server with its housekeeping loops
    Serve {
        #[arg(short, long, help = "Override the configured listen port")]
        port: Option<u16>,
    },
    /// Populate the store with fake wallets
    Seed {
        #[arg(short, long, help = "Override the configured wallet count")]
        count: Option<usize>,
    },
    /// Prune old attack events, or wipe the store entirely
    Cleanup {
        #[arg(long, help = "Delete events older than this many days")]
        days: Option<i64>,
        #[arg(long, help = "Delete all stored events and wallets")]
        wipe: bool,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apiary=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match ApiaryConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load config {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve { port } => {
            let mut cfg = config;
            if let Some(p) = port {
                cfg.server.port = p;
            }
            daemon::run_daemon(cfg).await
        }
        Commands::Seed { count } => run_seed(&config, count),
        Commands::Cleanup { days, wipe, yes } => run_cleanup(&config, days, wipe, yes),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn open_store(config: &ApiaryConfig) -> Result<ApiaryDb, Box<dyn std::error::Error>> {
    if let Some(parent) = std::path::Path::new(&config.db.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(ApiaryDb::open(&config.db.path)?)
}

fn run_seed(
    config: &ApiaryConfig,
    count_override: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let count = count_override.unwrap_or(config.wallets.seed_count);
    let db = open_store(config)?;
    let forge = WalletForge::new(config.wallets.balance_min, config.wallets.balance_max);

    println!("seeding {} fake wallets...", count);

    let mut created = 0;
    for wallet in forge.wallets(count) {
        if db.wallet_exists(&wallet.address)? {
            println!("  skip, already exists: {}", short_address(&wallet.address));
            continue;
        }
        db.insert_wallet(&wallet)?;
        created += 1;
        println!("  created: {}", short_address(&wallet.address));
    }

    let (_, total) = db.list_wallets(1, 0)?;
    println!("created {}/{} wallets ({} total in store)", created, count, total);
    Ok(())
}

fn run_cleanup(
    config: &ApiaryConfig,
    days: Option<i64>,
    wipe: bool,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if wipe {
        if !yes && !confirm("delete ALL stored events and wallets? (yes/no): ")? {
            println!("aborted.");
            return Ok(());
        }
        let db = open_store(config)?;
        db.wipe()?;
        println!("store wiped");
        return Ok(());
    }

    let days = days.unwrap_or(config.retention.log_retention_days);
    let db = open_store(config)?;
    let deleted = db.delete_events_older_than(days)?;
    println!("deleted {} events older than {} days", deleted, days);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}

fn short_address(address: &str) -> String {
    if address.len() > 18 {
        format!("{}...{}", &address[..10], &address[address.len() - 8..])
    } else {
        address.to_string()
    }
}
