mod process;
mod terminal;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dbswitch_core::LocalDevType;
use dbswitch_engine::{
    Console, LinkStatus, MigrationOutcome, SwitchConfig, SwitchOptions, SwitchOutcome, Switcher,
    WriteLock, link_env_files, run_env_config,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::process::ProcessRunner;
use crate::terminal::TerminalConsole;

/// Exit status after SIGINT, as a shell would report it.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Parser)]
#[command(name = "settings", version)]
#[command(about = "Switch the monorepo's database provider and manage its environment")]
struct Cli {
    /// Project root.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Configuration file (default: dbswitch.yml under the root, if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging on stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Switch the database provider: preview, write, install, migrate.
    DbSwitch(DbSwitchArgs),
    /// Add or remove env schema variables interactively.
    EnvConfig,
    /// Link each app's .env to the consolidated env file.
    EnvLinks(EnvLinksArgs),
}

#[derive(Debug, Args)]
struct DbSwitchArgs {
    /// Provider id (sqlite, postgres, prisma-postgres, turso, supabase, neon).
    #[arg(long)]
    provider: Option<String>,
    /// Local development type (local-file, managed-dev-server, container,
    /// vendor-local-stack, remote).
    #[arg(long, value_parser = parse_local_dev)]
    local: Option<LocalDevType>,
    /// Print diffs and planned commands without writing anything.
    #[arg(long)]
    dry_run: bool,
    /// Skip confirmation prompts.
    #[arg(short, long)]
    yes: bool,
}

#[derive(Debug, Args)]
struct EnvLinksArgs {
    /// Env file to link to, relative to the root.
    #[arg(long)]
    source: Option<PathBuf>,
    /// Comma-separated target directories (e.g. apps/web,apps/mobile).
    #[arg(long)]
    targets: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let lock = WriteLock::new();
    install_interrupt_handler(lock.clone());

    let result = match cli.command {
        Command::DbSwitch(args) => run_db_switch(&cli.root, cli.config.as_deref(), &lock, args),
        Command::EnvConfig => run_env_config_command(&cli.root, cli.config.as_deref(), &lock),
        Command::EnvLinks(args) => run_env_links(&cli.root, cli.config.as_deref(), args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Process setup
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Exits on SIGINT, but never in the middle of a write phase: the handler
/// waits for the lock the writers hold.
fn install_interrupt_handler(lock: WriteLock) {
    let result = ctrlc::set_handler(move || {
        let _guard = lock.hold();
        eprintln!("\n{}", "Interrupted.".yellow());
        std::process::exit(INTERRUPTED_EXIT_CODE);
    });
    if let Err(err) = result {
        warn!(error = %err, "could not install interrupt handler");
    }
}

fn load_config(root: &Path, explicit: Option<&Path>) -> Result<SwitchConfig, String> {
    if !root.is_dir() {
        return Err(format!("Project root '{}' is not a directory", root.display()));
    }
    SwitchConfig::load_or_default(root, explicit).map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// db-switch
// ---------------------------------------------------------------------------

fn run_db_switch(
    root: &Path,
    config_path: Option<&Path>,
    lock: &WriteLock,
    args: DbSwitchArgs,
) -> Result<(), String> {
    let config = load_config(root, config_path)?;
    let options = SwitchOptions {
        provider: args.provider,
        local: args.local,
        dry_run: args.dry_run,
        yes: args.yes,
    };
    debug!(?options, root = %root.display(), "db-switch");

    let mut console = TerminalConsole::new();
    let mut runner = ProcessRunner::new(root);
    let outcome = Switcher::new(root, &config, &mut console, &mut runner)
        .with_lock(lock.clone())
        .run(&options)
        .map_err(|err| err.to_string())?;

    match outcome {
        SwitchOutcome::DryRun(_) => console.info("Dry run complete; no files were written."),
        SwitchOutcome::Cancelled | SwitchOutcome::NoChanges => {}
        SwitchOutcome::Applied(report) => {
            if report.migration == MigrationOutcome::Failed {
                console.warn("Provider switched, but the initial migration did not run.");
            }
        }
    }
    Ok(())
}

fn parse_local_dev(raw: &str) -> Result<LocalDevType, String> {
    raw.parse::<LocalDevType>().map_err(|err| {
        let known: Vec<&str> = LocalDevType::ALL.iter().map(|kind| kind.as_str()).collect();
        format!("{err} (expected one of: {})", known.join(", "))
    })
}

// ---------------------------------------------------------------------------
// env-config
// ---------------------------------------------------------------------------

fn run_env_config_command(
    root: &Path,
    config_path: Option<&Path>,
    lock: &WriteLock,
) -> Result<(), String> {
    let config = load_config(root, config_path)?;
    let mut console = TerminalConsole::new();
    run_env_config(&mut console, root, &config, lock).map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// env-links
// ---------------------------------------------------------------------------

fn run_env_links(
    root: &Path,
    config_path: Option<&Path>,
    args: EnvLinksArgs,
) -> Result<(), String> {
    let config = load_config(root, config_path)?;
    let source = args.source.unwrap_or_else(|| config.env_links.source.clone());
    let targets = match parse_csv_list(args.targets) {
        targets if targets.is_empty() => config.env_links.targets.clone(),
        targets => targets.into_iter().map(PathBuf::from).collect(),
    };

    let reports = link_env_files(root, &source, &targets).map_err(|err| err.to_string())?;
    let mut console = TerminalConsole::new();
    let source = source.display();
    for report in reports {
        let target = report.target.display();
        match report.status {
            LinkStatus::Created => console.success(&format!("{target}/.env -> {source}")),
            LinkStatus::Unchanged => console.info(&format!("{target}/.env already linked")),
            LinkStatus::Replaced { previous } => console.success(&format!(
                "{target}/.env -> {source} (was -> {})",
                previous.display()
            )),
            LinkStatus::Copied => console.success(&format!("{target}/.env copied from {source}")),
            LinkStatus::SkippedRegularFile => console.warn(&format!(
                "{target}/.env is a regular file; left untouched. Remove it to link."
            )),
            LinkStatus::MissingTarget => {
                console.warn(&format!("{target} does not exist; skipped."))
            }
        }
    }
    Ok(())
}

fn parse_csv_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}
