//! # shiftminus: staffing shortfall board and group chat notifier
//!
//! Usage:
//!   shiftminus notify                        # One scheduled run (cron / /run_notify)
//!   shiftminus serve --port 8000             # Trigger endpoint + JSON API
//!   shiftminus deadline set 2025-07-25       # Replace the submission deadline
//!   shiftminus shortfall add 販売 2025-07-10 09:00 13:00 2
//!   shiftminus send-notice sales             # Push the open list to a group

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use shiftminus_channels::LineMessenger;
use shiftminus_core::{Department, ShiftConfig};
use shiftminus_scheduler::{DeadlineState, Desk, NotifyJob, Services};
use shiftminus_store::PostgrestStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "shiftminus",
    version,
    about = "📋 Shift shortfall board with LINE group notifications"
)]
struct Cli {
    /// Config file (default: ~/.shiftminus/config.toml or $SHIFTMINUS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduled notification job once
    Notify,
    /// Serve the trigger endpoint and JSON API
    Serve {
        /// Listen port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Submission deadline management
    Deadline {
        #[command(subcommand)]
        action: DeadlineAction,
    },
    /// Shortfall management
    Shortfall {
        #[command(subcommand)]
        action: ShortfallAction,
    },
    /// Push a department's open shortfalls to its group
    SendNotice { department: Department },
}

#[derive(Subcommand)]
enum DeadlineAction {
    /// Print the current deadline
    Show,
    /// Replace the deadline (YYYY-MM-DD)
    Set { date: NaiveDate },
    /// Announce the current deadline to the deadline group
    Announce,
}

#[derive(Subcommand)]
enum ShortfallAction {
    /// List open shortfalls for a department
    List { department: Department },
    /// Register a shortfall
    Add {
        category: String,
        date: NaiveDate,
        #[arg(value_parser = parse_hhmm)]
        start: NaiveTime,
        #[arg(value_parser = parse_hhmm)]
        end: NaiveTime,
        count: u32,
    },
    /// Record helpers found: `filled` out of `remaining`
    Fill { id: i64, remaining: u32, filled: u32 },
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

fn build_services(config: ShiftConfig) -> Result<Services> {
    config.validate()?;
    let store = Arc::new(PostgrestStore::new(&config.store)?);
    let messenger = Arc::new(LineMessenger::new(&config.line)?);
    Ok(Services::new(config, store.clone(), store, messenger))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "shiftminus=debug,shiftminus_core=debug,shiftminus_store=debug,shiftminus_channels=debug,shiftminus_scheduler=debug,shiftminus_gateway=debug,tower_http=debug"
    } else {
        "info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli
        .config
        .as_deref()
        .map(|p| PathBuf::from(shellexpand::tilde(p).to_string()));
    let mut config = ShiftConfig::load(config_path.as_deref())?;
    if let Command::Serve { port: Some(port) } = &cli.command {
        config.gateway.port = *port;
    }
    let services = build_services(config)?;
    let today = services.config.today();
    tracing::debug!("Today is {today} (UTC{:+})", services.config.utc_offset_hours);

    match cli.command {
        Command::Notify => {
            let report = NotifyJob::new(services).run(today).await;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Serve { .. } => {
            println!("📋 shiftminus v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "   🌐 Trigger: http://{}:{}/run_notify",
                services.config.gateway.host, services.config.gateway.port
            );
            println!();
            shiftminus_gateway::start(services, config_path).await?;
        }
        Command::Deadline { action } => {
            let desk = Desk::new(services);
            match action {
                DeadlineAction::Show => match desk.deadline(today).await? {
                    DeadlineState::Active(date) => {
                        println!("📅 {date} ({} days left)", (date - today).num_days())
                    }
                    DeadlineState::Absent => println!("No submission deadline set"),
                },
                DeadlineAction::Set { date } => {
                    desk.set_deadline(date).await?;
                    println!("✅ Deadline set to {date}");
                }
                DeadlineAction::Announce => match desk.announce_deadline(today).await? {
                    Some(delivery) => println!("📨 {delivery:?}"),
                    None => println!("No submission deadline set, nothing announced"),
                },
            }
        }
        Command::Shortfall { action } => {
            let desk = Desk::new(services);
            match action {
                ShortfallAction::List { department } => {
                    let records = desk.open_for(department, today).await?;
                    if records.is_empty() {
                        println!("No open shortfalls for {department}");
                    }
                    for r in records {
                        println!(
                            "#{:<5} {} {} {} ▲{}",
                            r.id, r.category, r.date_display, r.time_range, r.minus_count
                        );
                    }
                }
                ShortfallAction::Add {
                    category,
                    date,
                    start,
                    end,
                    count,
                } => {
                    let new = desk.register(&category, date, start, end, count).await?;
                    println!(
                        "✅ Registered {} {} {} ▲{}",
                        new.category, new.date_display, new.time_range, new.minus_count
                    );
                }
                ShortfallAction::Fill {
                    id,
                    remaining,
                    filled,
                } => {
                    let outcome = desk.fill(id, remaining, filled).await?;
                    println!("✅ #{id}: {outcome:?}");
                }
            }
        }
        Command::SendNotice { department } => {
            match Desk::new(services).send_notice(department, today).await? {
                Some(delivery) => println!("📨 {department}: {delivery:?}"),
                None => println!("No open shortfalls for {department}, nothing sent"),
            }
        }
    }

    Ok(())
}
