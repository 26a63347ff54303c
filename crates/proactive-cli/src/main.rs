mod alerts;
mod cmd;
mod output;
mod root;
mod workspace;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "proactive",
    about = "Proactive schedule analysis: detect problems early and act on them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .shiftplanner/ or .git/)
    #[arg(long, global = true, env = "PROACTIVE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .shiftplanner/ with a default config and an empty fixture
    Init,

    /// Turn proactive analysis on (persists across restarts)
    Enable,

    /// Turn proactive analysis off and stop all cadences
    Disable,

    /// Show engine state, thresholds, and the last performance report
    Status,

    /// Inspect and modify proactive configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run a single cadence tick immediately
    Tick {
        /// continuous, hourly, daily, or weekly
        cadence: String,
    },

    /// List alerts raised for human review
    Alerts {
        /// Show only the most recent N alerts
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start all cadence timers and run until Ctrl-C
    Run,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Enable => cmd::toggle::run(&root, true, cli.json),
        Commands::Disable => cmd::toggle::run(&root, false, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Tick { cadence } => cmd::tick::run(&root, &cadence, cli.json),
        Commands::Alerts { limit } => cmd::alerts::run(&root, limit, cli.json),
        Commands::Run => cmd::run::run(&root),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
