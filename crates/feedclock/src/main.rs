//! `fdclk` - CLI for feedclock
//!
//! This binary drives the feeding timer: start a feed, switch sides, watch
//! the live display, and end the feed into the household feeding log.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::sync::Mutex;

use feedclock::cli::{BottleCommand, Cli, Command, ConfigCommand, StartCommand};
use feedclock::refresher::Renderer;
use feedclock::{
    clock, init_logging, Config, DisplayFrame, DisplayRefresher, FeedingCreate, FeedingLog,
    FeedingSide, FeedingTimer, HttpFeedingLog, SqliteStore, StateStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Start(start_cmd) => handle_start(&config, &start_cmd),
        Command::Switch => handle_switch(&config),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::End(end_cmd) => handle_end(&config, end_cmd.yes).await,
        Command::Watch => handle_watch(&config).await,
        Command::Bottle(bottle_cmd) => handle_bottle(&config, bottle_cmd).await,
        Command::Last => handle_last(&config).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_timer(config: &Config) -> feedclock::Result<FeedingTimer<SqliteStore, HttpFeedingLog>> {
    let store = SqliteStore::open(config.state_path())?;
    let log = HttpFeedingLog::new(config.api.base_url.clone(), config.request_timeout())?;
    FeedingTimer::new(store, log, config.noise_threshold_ms())
}

fn handle_start(config: &Config, cmd: &StartCommand) -> anyhow::Result<()> {
    let mut timer = open_timer(config)?;
    let side = FeedingSide::from(cmd.side);
    match timer.start(side) {
        Ok(_) => {
            println!("Started timing: {}", side.label());
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            Err(err.into())
        }
    }
}

fn handle_switch(config: &Config) -> anyhow::Result<()> {
    let mut timer = open_timer(config)?;
    match timer.switch_side()? {
        Some(side) => println!("Switched to {}", side.short_label()),
        None => println!("Nothing to switch."),
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut timer = open_timer(config)?;
    let state = timer.state()?.filter(feedclock::TimerState::is_active);

    let Some(state) = state else {
        if json {
            println!("{}", serde_json::json!({ "active": false }));
        } else {
            println!("No active feeding timer.");
        }
        return Ok(());
    };

    let now = Utc::now();
    let total_ms = clock::total_elapsed(&state.segments, now);

    if json {
        let status = serde_json::json!({
            "active": true,
            "side": state.current_side().map(|side| side.to_string()),
            "totalMs": total_ms,
            "segments": state.segments,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if let Some(side) = state.current_side() {
        println!("Side:     {}", side.label());
        println!("Total:    {}", clock::format_long(total_ms));
        if side.is_switchable() {
            let times = clock::breast_times(&state.segments, now);
            println!(
                "Breasts:  L {} | R {}",
                clock::format_short(times.left_ms),
                clock::format_short(times.right_ms)
            );
        }
        println!("Segments: {}", state.segments.len());
    }
    Ok(())
}

async fn handle_end(config: &Config, yes: bool) -> anyhow::Result<()> {
    let mut timer = open_timer(config)?;

    if !timer.request_end() {
        println!("No active feeding timer.");
        return Ok(());
    }

    if !yes {
        if let Some(state) = timer.state()? {
            let total = clock::format_long(clock::total_elapsed(&state.segments, Utc::now()));
            println!("Feed running for {total}.");
        }
        print!("End feeding and log it? [y/N] ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            timer.cancel_end();
            println!("Kept the timer running.");
            return Ok(());
        }
    }

    match timer.confirm_end().await {
        Ok(outcome) if outcome.is_empty() => {
            println!("Timer cleared; nothing long enough to log.");
            Ok(())
        }
        Ok(outcome) => {
            println!("Feeding logged: {}", outcome.summary);
            Ok(())
        }
        Err(err) => {
            eprintln!("Error saving feeding: {err}");
            if err.is_api_failure() {
                eprintln!("The timer was kept; run `fdclk end` again to retry.");
            }
            Err(err.into())
        }
    }
}

/// Renders each frame over the previous one on a single terminal line.
#[derive(Debug)]
struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn render(&self, frame: &DisplayFrame) {
        if let Some(breast) = &frame.breast {
            print!(
                "\r{}  {}  [L {} | R {}]   ",
                frame.side_label, frame.total, breast.left, breast.right
            );
        } else {
            print!("\r{}  {}   ", frame.side_label, frame.total);
        }
        let _ = io::stdout().flush();
    }

    fn clear(&self) {
        println!("\nFeed ended; timer is no longer active.");
    }
}

async fn handle_watch(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config.state_path())?;
    let store = Arc::new(Mutex::new(store));

    let active = {
        let mut guard = store.lock().await;
        guard.load()?.is_some_and(|state| state.is_active())
    };
    if !active {
        println!("No active feeding timer.");
        return Ok(());
    }

    println!("Watching the feeding timer; press Ctrl-C to stop.");
    let refresher = DisplayRefresher::new(config.tick_interval());
    refresher.start(store, Arc::new(ConsoleRenderer)).await;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
        }
        () = async {
            // The refresher stops on its own when the timer ends elsewhere.
            while refresher.is_running().await {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
        } => {}
    }

    refresher.stop().await;
    Ok(())
}

async fn handle_bottle(
    config: &Config,
    cmd: BottleCommand,
) -> anyhow::Result<()> {
    if cmd.oz <= 0.0 {
        anyhow::bail!("bottle amount must be greater than zero");
    }

    let log = HttpFeedingLog::new(config.api.base_url.clone(), config.request_timeout())?;
    let mut entry = FeedingCreate::bottle(cmd.oz);
    entry.notes = cmd.notes;

    match log.create_feeding(&entry).await {
        Ok(_) => {
            println!("Bottle feeding logged: {} oz", cmd.oz);
            Ok(())
        }
        Err(err) => {
            eprintln!("Error saving feeding: {err}");
            Err(err.into())
        }
    }
}

fn format_ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes().max(0);
    if minutes >= 60 {
        format!("{}h {}m ago", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m ago")
    }
}

async fn handle_last(config: &Config) -> anyhow::Result<()> {
    let log = HttpFeedingLog::new(config.api.base_url.clone(), config.request_timeout())?;
    let records = log.recent_feedings(20).await?;
    let now = Utc::now();
    let last = feedclock::api::last_per_side(&records, now);

    if last.left.is_none() && last.right.is_none() {
        println!("No breast feedings logged yet.");
        return Ok(());
    }

    for (label, record) in [("Left", last.left), ("Right", last.right)] {
        match record {
            Some(record) => println!(
                "{label}:  {} ({} min)",
                format_ago(now, record.timestamp),
                record.duration_minutes.unwrap_or(0)
            ),
            None => println!("{label}:  never"),
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Api]");
                println!("  Base URL:         {}", config.api.base_url);
                println!("  Timeout (secs):   {}", config.api.timeout_secs);
                println!();
                println!("[Storage]");
                println!("  State path:       {}", config.state_path().display());
                println!();
                println!("[Timer]");
                println!("  Tick interval:    {} ms", config.timer.tick_interval_ms);
                println!("  Noise threshold:  {} ms", config.timer.noise_threshold_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
