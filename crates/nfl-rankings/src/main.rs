// NFL rankings command-line entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Load config (copying defaults on first run)
// 3. Initialize tracing (log file, or stderr with --verbose)
// 4. Open database and seed the schedule if needed
// 5. Dispatch the subcommand

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use nfl_rankings::config::{self, Config, UploadLimits};
use nfl_rankings::consensus::table::{render_consensus, render_tiered, render_user_view, MISSING};
use nfl_rankings::db::Database;
use nfl_rankings::import::UploadMode;
use nfl_rankings::ranking::{PlayerId, Position, RankingItem, Week};
use nfl_rankings::schedule::{parse_timestamp, ScheduleEntry, DATETIME_FORMAT};
use nfl_rankings::service::RankingService;

#[derive(Parser)]
#[command(name = "nfl-rankings")]
#[command(about = "Collect per-user NFL player rankings and compute the consensus")]
#[command(version)]
struct Cli {
    /// Directory containing config/ and defaults/ (default: current directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Log to stderr instead of logs/nfl-rankings.log
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a roster CSV for a position and week
    Import {
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
        /// CSV file with name, team, and opponent columns
        file: PathBuf,
        /// append or override
        #[arg(short, long, default_value = "append")]
        mode: String,
    },

    /// List the roster of a position and week
    Players {
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
    },

    /// Save a user's ranking from a JSON file
    Save {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
        /// JSON array of tier and player items
        file: PathBuf,
    },

    /// Delete a user's ranking
    Delete {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
    },

    /// Print a user's ranking (or the starter template) as JSON
    Show {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
    },

    /// Consensus table for a position and week
    Consensus {
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
        /// Include tier placement
        #[arg(long)]
        tiers: bool,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// A user's ranking with differentials against the consensus
    View {
        #[arg(short, long)]
        user: i64,
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// List stored rankings for a position and week
    Rankings {
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        week: Option<String>,
    },

    /// Delete rankings by id
    DeleteRankings {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Delete players by id
    DeletePlayers {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Create or rename a user
    User {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
    },

    /// Inspect or edit the week schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Inspect or edit per-position upload limits
    Limits {
        #[command(subcommand)]
        action: LimitsAction,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Print every schedule entry
    Show,
    /// Print the week in effect now
    Current,
    /// Set one week's window
    Set {
        #[arg(short, long)]
        week: String,
        /// Window start, YYYY-MM-DD HH:MM:SS
        #[arg(long)]
        start: String,
        /// Window end, YYYY-MM-DD HH:MM:SS
        #[arg(long)]
        end: String,
        #[arg(long)]
        active: bool,
    },
}

#[derive(Subcommand)]
enum LimitsAction {
    /// Print effective limits
    Show,
    /// Set the limit for one position (0 = unlimited)
    Set {
        #[arg(short, long)]
        position: String,
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let config = config::load_config_in(&base_dir).context("failed to load configuration")?;

    init_tracing(&base_dir, &config, cli.verbose)?;
    info!("nfl-rankings starting");

    let db_path = config
        .database_path()
        .context("failed to resolve database path")?;
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database opened at {db_path}");

    let service = RankingService::new(&db, &config);
    service.init().context("failed to initialize schedule")?;

    run(cli.command, &service, &db)
}

fn run(command: Commands, service: &RankingService, db: &Database) -> anyhow::Result<()> {
    match command {
        Commands::Import {
            position,
            week,
            file,
            mode,
        } => {
            let Some(mode) = UploadMode::from_str_mode(&mode) else {
                bail!("unknown upload mode '{mode}': expected append or override");
            };
            let reader = File::open(&file)
                .with_context(|| format!("failed to open {}", file.display()))?;
            let stored = service.import_roster(&position, week.as_deref(), reader, mode)?;
            println!("Imported {stored} players");
        }

        Commands::Players { position, week } => {
            for p in service.players(&position, week.as_deref())? {
                println!("{:>6}  {:<26} {:<5} {}", p.id.0, p.name, p.team, p.opponent);
            }
        }

        Commands::Save {
            user,
            position,
            week,
            file,
        } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let bucket = service.save_ranking(user, &position, week.as_deref(), &body)?;
            println!("Saved ranking for user {user} ({})", bucket.title());
        }

        Commands::Delete {
            user,
            position,
            week,
        } => {
            if service.delete_ranking(user, &position, week.as_deref())? {
                println!("Deleted");
            } else {
                println!("No ranking to delete");
            }
        }

        Commands::Show {
            user,
            position,
            week,
        } => {
            let items: Vec<RankingItem> = service.user_ranking(user, &position, week.as_deref())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&items).context("failed to encode ranking")?
            );
        }

        Commands::Consensus {
            position,
            week,
            tiers,
            json,
        } => {
            if tiers {
                let (bucket, entries) = service.tiered_consensus(&position, week.as_deref())?;
                if json {
                    print_json(&entries)?;
                } else {
                    print!("{}", render_tiered(&bucket.title(), &entries));
                }
                return Ok(());
            }

            let view = service.consensus(&position, week.as_deref())?;
            if json {
                print_json(&view)?;
            } else if view.rows.is_empty() {
                println!("No rankings submitted yet for {}", view.bucket.title());
            } else {
                print!("{}", render_consensus(&view.bucket.title(), &view.rows));
                let names: Vec<&str> = view.rankers.iter().map(|r| r.display_name.as_str()).collect();
                println!("{} rankings: {}", view.submissions, names.join(", "));
            }
        }

        Commands::View {
            user,
            position,
            week,
            json,
        } => match service.user_view(user, &position, week.as_deref())? {
            Some(view) if json => print_json(&view)?,
            Some(view) => print!(
                "{}",
                render_user_view(&format!("User {user}, {}", view.bucket.title()), &view.rows)
            ),
            None => println!("User {user} has no saved ranking"),
        },

        Commands::Rankings { position, week } => {
            let bucket = service.bucket(&position, week.as_deref())?;
            for r in db.get_all_rankings(bucket.position, bucket.week)? {
                let players = r.items.iter().filter(|i| i.as_player().is_some()).count();
                println!(
                    "{:>6}  {:<24} {:>3} players  {}",
                    r.ranking_id, r.user_display_name, players, r.updated_at
                );
            }
        }

        Commands::DeleteRankings { ids } => {
            let removed = db.delete_rankings(&ids)?;
            println!("Deleted {removed} rankings");
        }

        Commands::DeletePlayers { ids } => {
            let ids: Vec<PlayerId> = ids.into_iter().map(PlayerId).collect();
            let removed = db.delete_players(&ids)?;
            println!("Deleted {removed} players");
        }

        Commands::User { id, name } => {
            db.upsert_user(id, &name)?;
            println!("User {id} is now '{name}'");
        }

        Commands::Schedule { action } => run_schedule(action, service, db)?,

        Commands::Limits { action } => run_limits(action, service)?,
    }
    Ok(())
}

fn run_schedule(action: ScheduleAction, service: &RankingService, db: &Database) -> anyhow::Result<()> {
    match action {
        ScheduleAction::Show => {
            for e in db.load_schedule()? {
                println!(
                    "{:<10} {}  {}  {}",
                    e.week.key(),
                    e.start.format(DATETIME_FORMAT),
                    e.end.format(DATETIME_FORMAT),
                    if e.is_active { "active" } else { MISSING }
                );
            }
        }
        ScheduleAction::Current => {
            println!("{}", service.current_week()?.label());
        }
        ScheduleAction::Set {
            week,
            start,
            end,
            active,
        } => {
            let Some(week) = Week::parse(&week) else {
                bail!("unknown week '{week}'");
            };
            let entry = ScheduleEntry {
                week,
                start: parse_timestamp(&start)?,
                end: parse_timestamp(&end)?,
                is_active: active,
            };
            db.replace_schedule(&[entry])?;
            println!("Updated {}", week.label());
        }
    }
    Ok(())
}

fn run_limits(action: LimitsAction, service: &RankingService) -> anyhow::Result<()> {
    match action {
        LimitsAction::Show => {
            let limits = service.upload_limits()?;
            for pos in Position::ALL {
                println!("{pos}: {}", format_limit(&limits, pos));
            }
        }
        LimitsAction::Set { position, limit } => {
            let Some(pos) = Position::from_str_pos(&position) else {
                bail!("invalid position '{position}'");
            };
            let mut limits = service.upload_limits()?;
            limits.set(pos, limit);
            service.set_upload_limits(limits)?;
            println!("{pos}: {}", format_limit(&limits, pos));
        }
    }
    Ok(())
}

fn format_limit(limits: &UploadLimits, pos: Position) -> String {
    match limits.limit_for(pos) {
        0 => "unlimited".to_string(),
        n => n.to_string(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to encode JSON")?
    );
    Ok(())
}

/// Initialize tracing. Logs go to `logs/nfl-rankings.log` under the base
/// directory, or to stderr when `verbose` is set. `RUST_LOG` overrides the
/// configured filter.
fn init_tracing(base_dir: &std::path::Path, config: &Config, verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    if verbose {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
        return Ok(());
    }

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir).context("failed to create logs directory")?;
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(log_dir.join("nfl-rankings.log"))
        .context("failed to open log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
