use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vibescan_core::badges::CATALOG;
use vibescan_core::scan::Side;
use vibescan_core::store::{self, KEY_PREMIUM};
use vibescan_core::{KeyValueStore, Mode, ScanReport, StoreEntitlement, Vibe};
use vibescan_engine::{spawn_engine, Config, SqliteStore};

mod replay;

#[derive(Parser)]
#[command(name = "vibescan", about = "VibeScan facial vibe scoring CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a recorded detection stream
    Scan {
        /// Recording JSON: { width, height, frames: [[face, ...], ...] }
        #[arg(short, long)]
        recording: PathBuf,
        /// solo, duo, squad or glowup
        #[arg(short, long, default_value = "solo")]
        mode: Mode,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent scans
    History {
        /// Number of entries to show, newest first
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// List badges and which are unlocked
    Badges,
    /// Set or clear the premium flag
    Premium {
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },
    /// Show configuration and counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Scan { recording, mode, json } => {
            let (detector, frames) = replay::Recording::load(&recording)?.into_replay();
            let store = SqliteStore::open(&config.db_path).context("opening store")?;
            let entitlement = StoreEntitlement::new(SqliteStore::open(&config.db_path).context("opening store")?);

            let engine = spawn_engine(&config, detector, frames, store, entitlement)?;
            let report = engine.scan(mode).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::History { limit } => {
            let store = SqliteStore::open(&config.db_path).context("opening store")?;
            let history = store::history(&store);
            if history.is_empty() {
                println!("No scans yet");
            }
            for entry in history.iter().rev().take(limit) {
                let when = chrono::DateTime::from_timestamp_millis(entry.timestamp)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("{when}  {:<7} {:<6} aura {}", entry.mode, entry.vibe, entry.aura);
            }
        }
        Commands::Badges => {
            let store = SqliteStore::open(&config.db_path).context("opening store")?;
            let unlocked = store::unlocked_badges(&store);
            for badge in &CATALOG {
                let mark = if unlocked.iter().any(|id| id == badge.id) { "x" } else { " " };
                let premium = if badge.premium { " (premium)" } else { "" };
                println!("[{mark}] {}  {}{premium}", badge.label(), badge.description);
            }
        }
        Commands::Premium { enabled } => {
            let mut store = SqliteStore::open(&config.db_path).context("opening store")?;
            store.set(KEY_PREMIUM, serde_json::json!(enabled))?;
            println!("premium: {}", if enabled { "on" } else { "off" });
        }
        Commands::Status => {
            let store = SqliteStore::open(&config.db_path).context("opening store")?;
            let entitlement = StoreEntitlement::new(SqliteStore::open(&config.db_path).context("opening store")?);
            let engine = spawn_engine(&config, replay::Idle, replay::Idle, store, entitlement)?;
            let summary = engine.summary().await?;

            println!("database:      {}", config.db_path.display());
            println!("window frames: {}", config.window_frames);
            println!("premium:       {}", summary.premium);
            println!("total scans:   {}", summary.scan_count);
            if summary.premium {
                println!("today:         {} (unlimited)", summary.daily_count);
            } else {
                println!("today:         {}/{}", summary.daily_count, config.free_daily_scans);
            }
            println!("badges:        {}/{}", summary.badges.len(), CATALOG.len());
            println!("history:       {} entries", summary.history.len());
        }
    }

    Ok(())
}

fn print_report(report: &ScanReport) {
    println!("{} scan ({} face(s))", report.mode, report.results.len());
    for (i, result) in report.results.iter().enumerate() {
        println!();
        if report.results.len() > 1 {
            println!("Player {}", i + 1);
        }
        println!("  {}  aura {}", result.main_vibe, result.aura);
        println!("  \"{}\"", result.phrase);
        for vibe in Vibe::ALL {
            println!("  {:<8} {:>3}", vibe.as_str(), result.scores.get(vibe));
        }
        if let Some(beauty) = result.beauty_score {
            println!("  beauty   {beauty:>3}");
        }
        if !result.badges.is_empty() {
            println!("  badges: {}", result.badges.join(", "));
        }
    }
    println!();
    if let Some(side) = report.duo_winner {
        let winner = match side {
            Side::Left => "player 1",
            Side::Right => "player 2",
        };
        println!("winner: {winner}");
    }
    if let Some(tier) = report.beauty_tier {
        println!("{}", tier.caption());
    }
    for id in &report.new_badges {
        if let Some(badge) = vibescan_core::badges::find(id) {
            println!("badge unlocked: {}", badge.label());
        }
    }
    println!("rank #{} of your scans", report.local_rank);
}
