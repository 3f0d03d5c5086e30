use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use att_core::{AttendanceError, Clock, ErrorKind, ExportFilter, SystemClock};
use att_db::DbError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use att_cli::commands::employees::AddEmployee;
use att_cli::commands::{employees, events, export, ingest, stats, summary};
use att_cli::server::{self, AppState};
use att_cli::{Cli, Commands, Config, EmployeesAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(att_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = att_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

/// Maps a failure to the process exit code.
fn exit_code(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<AttendanceError>() {
            return match err.kind() {
                ErrorKind::Decode => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::Validation => 4,
                ErrorKind::Storage => 5,
                ErrorKind::Export => 1,
            };
        }
        if cause.downcast_ref::<DbError>().is_some() {
            return 5;
        }
    }
    1
}

/// Resolves `--output`: a directory receives the default export filename.
fn export_path(output: PathBuf, filter: &ExportFilter) -> PathBuf {
    if output.is_dir() {
        output.join(filter.filename())
    } else {
        output
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(exit_code(&error))
        }
    }
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn run(cli: Cli) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    let clock = SystemClock;

    match cli.command {
        Some(Commands::Ingest {
            identifier,
            action,
            json,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            ingest::run(
                &mut stdout,
                &mut db,
                &clock,
                &config.recorder_policy(),
                &identifier,
                action,
                json,
            )?;
        }
        Some(Commands::Events {
            filters,
            limit,
            annotate,
            json,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let query = filters
                .to_query(Some(limit.unwrap_or(config.default_query_limit)))
                .map_err(AttendanceError::from)?;
            events::run(
                &mut stdout,
                &db,
                &query,
                annotate,
                &config.break_policy(),
                json,
            )?;
        }
        Some(Commands::Summary { filters, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let query = filters.to_query(None).map_err(AttendanceError::from)?;
            summary::run(
                &mut stdout,
                &db,
                &query,
                clock.now(),
                &config.summary_policy(),
                json,
            )?;
        }
        Some(Commands::Export { filters, output }) => {
            let filter = filters
                .to_export_filter()
                .map_err(AttendanceError::from)?;
            let (db, config) = open_database(cli.config.as_deref())?;
            match output {
                Some(output) => {
                    let path = export_path(output, &filter);
                    let csv = export::render(&db, &filter, &config.break_policy())?;
                    std::fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Exported attendance to {}", path.display());
                }
                None => export::run(&mut stdout, &db, &filter, &config.break_policy())?,
            }
        }
        Some(Commands::Stats { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let today = clock.now().date_naive();
            stats::run(&mut stdout, &db, today, json)?;
        }
        Some(Commands::Employees(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                EmployeesAction::Add {
                    name,
                    identifier,
                    role,
                    department,
                    external_id,
                    inactive,
                } => {
                    let request = AddEmployee {
                        name,
                        identifier,
                        role,
                        department,
                        external_id,
                        active: !inactive,
                    };
                    employees::run_add(&mut stdout, &mut db, &request)?;
                }
                EmployeesAction::List { json } => employees::run_list(&mut stdout, &db, json)?,
            }
        }
        Some(Commands::Serve { bind }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let address = bind.unwrap_or_else(|| config.bind_address.clone());
            let state = AppState::new(db, Arc::new(clock), config);
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(server::serve(state, &address))?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
