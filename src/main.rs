//! Prismatic - parallel multi-database query runner and exporter.

use prismatic::cli::{Cli, Command, ConfigCommand};
use prismatic::config::{Config, Installer};
use prismatic::db::{CommandKind, Executor, Manager, QueryCache, RunOptions, RunOutcome};
use prismatic::error::{PrismaticError, Result};
use prismatic::export::{self, ExportOptions, OutputFormat};
use prismatic::logging;
use prismatic::outcome::{RunStatus, EXIT_SUCCESS};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {e}", e.category());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    // Installation must work before any configuration file exists.
    if let Command::Config(ConfigCommand::Install) = &cli.command {
        Installer::default().install()?;
        println!("Configuration installed to ./config");
        return Ok(EXIT_SUCCESS);
    }

    let mut config = Config::from_file(&cli.config)?;
    logging::init(&config.logging)?;

    match cli.command {
        Command::Export {
            query,
            output,
            output_format,
            no_cache,
            no_single_sheet,
            no_single_file,
        } => {
            let format = match output_format {
                Some(value) => value.parse::<OutputFormat>()?,
                None => OutputFormat::from_path(&output)?,
            };

            config.load_connections()?;
            let options = RunOptions {
                use_cache: !no_cache,
                commit: false,
                command: CommandKind::Export,
            };
            let (outcome, manager) =
                run_fanout(&config, &query, &cli.environment, options, &cli.connections).await;
            manager.close().await;

            if outcome.results.is_empty() {
                return Err(PrismaticError::usage("no data returned"));
            }

            let export_options = ExportOptions::new(
                no_single_file,
                no_single_sheet,
                config.connection_column_name.clone(),
            );
            let status = RunStatus::from_summary(outcome.summary);

            match export::export(&outcome.results, &output, format, &export_options) {
                Ok(()) => info!(output = %output.display(), "Export complete"),
                // The run itself already completed; the exit code reflects
                // the per-connection outcomes.
                Err(e) => eprintln!("{}: {e}", e.category()),
            }

            println!("{}", status.message());
            Ok(status.exit_code())
        }

        Command::Run { query, commit } => {
            config.load_connections()?;
            let options = RunOptions {
                use_cache: false,
                commit,
                command: CommandKind::Run,
            };
            let (outcome, manager) =
                run_fanout(&config, &query, &cli.environment, options, &cli.connections).await;
            manager.close().await;

            let status = RunStatus::from_summary(outcome.summary);
            println!("{}", status.message());
            Ok(status.exit_code())
        }

        Command::Config(ConfigCommand::Show { key }) => {
            if key.eq_ignore_ascii_case("connections") {
                config.load_connections()?;
            }
            config.show(&key);
            Ok(EXIT_SUCCESS)
        }

        Command::Config(ConfigCommand::Edit) => {
            edit_config(&cli.config)?;
            Ok(EXIT_SUCCESS)
        }

        Command::Config(ConfigCommand::Install) => unreachable!("handled before config load"),
    }
}

/// Loads the fleet for the selected environment and fans the query out.
///
/// Ctrl-C cancels the root token, which propagates into every in-flight
/// execution.
async fn run_fanout(
    config: &Config,
    query: &str,
    environment: &str,
    options: RunOptions,
    subset: &[String],
) -> (RunOutcome, Manager) {
    let cancel = CancellationToken::new();
    let interrupt_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling in-flight queries");
            interrupt_cancel.cancel();
        }
    });

    let mut manager = Manager::new();
    manager.load(config, environment, subset).await;
    if manager.is_empty() {
        warn!(environment = %environment, "No connections available for the selected environment");
    }

    let outcome = if config.cache.use_cache {
        let cache = Arc::new(QueryCache::new(config.cache.max_age()));
        Executor::with_cache(&manager, cache)
            .run(&cancel, config.max_workers, query, options, subset)
            .await
    } else {
        Executor::new(&manager)
            .run(&cancel, config.max_workers, query, options, subset)
            .await
    };

    (outcome, manager)
}

/// Opens the configuration file in the user's editor.
fn edit_config(path: &Path) -> Result<()> {
    let editor = std::env::var("EDITOR")
        .map_err(|_| PrismaticError::usage("EDITOR is not set"))?;

    let status = std::process::Command::new(editor)
        .arg(path)
        .status()
        .map_err(|e| PrismaticError::usage(format!("failed to launch editor: {e}")))?;

    if !status.success() {
        return Err(PrismaticError::usage("editor exited with an error"));
    }
    Ok(())
}
