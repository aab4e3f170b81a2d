//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{render_csv, DatasetService, PredictionSummary};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{ConsoleObserver, ConsolePrompter, CANCEL_WORDS};
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".into()));
    };
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = load_settings(cli)?;
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Run { input, output } => _run(&container, input, output),
        Commands::Enrich { input, output } => _enrich(&container, input, output.as_deref()),
        Commands::Attributes { input } => _attributes(&container, input),
        Commands::Config { command } => _config(&container, command),
        Commands::Completion { .. } => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(max_depth) = cli.max_depth {
        settings.max_depth = max_depth;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

#[instrument(skip(container))]
fn _run(container: &ServiceContainer, input: &Path, output: &Path) -> CliResult<()> {
    let mut session = container.session();

    let rows = session.load(input)?.len();
    output::action("Loaded", &format!("{} transactions from {}", rows, input.display()));

    output::header("Build decision tree");
    output::detail(&format!(
        "answer '{}' to make a leaf, {} to cancel",
        session.settings().leaf_sentinel,
        CANCEL_WORDS.join(" or ")
    ));
    let mut prompter = ConsolePrompter::stdio(session.settings().leaf_sentinel.clone());
    let mut observer = ConsoleObserver::stderr();
    let rendered = session
        .build(&mut prompter, &mut observer)?
        .to_term_tree()
        .to_string();
    output::success("The decision tree has been built");
    output::info(rendered.trim_end());

    let predictions = session.predict()?;
    let written = session.export(output, Some(&predictions))?;
    output::action("Exported", &written.display());
    output::info(&PredictionSummary::from_predictions(&predictions));
    Ok(())
}

#[instrument(skip(container))]
fn _enrich(container: &ServiceContainer, input: &Path, output: Option<&Path>) -> CliResult<()> {
    let mut session = container.session();
    session.load(input)?;
    match output {
        Some(path) => {
            let written = session.export(path, None)?;
            output::action("Exported", &written.display());
        }
        None => {
            let table = session
                .table()
                .ok_or_else(|| ApplicationError::Precondition("no table loaded".into()))?;
            let csv = render_csv(table, None, &container.settings.results_column)?;
            print!("{}", csv);
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn _attributes(container: &ServiceContainer, input: &Path) -> CliResult<()> {
    let table = container
        .dataset_service()
        .load(input)
        .map_err(|e| e.during("load"))?;
    let attributes = DatasetService::attributes(&table);
    let width = attributes.iter().map(|a| a.name.len()).max().unwrap_or(0);
    for attribute in &attributes {
        output::attribute_row(&attribute.name, &attribute.kind, &attribute.example, width);
    }
    Ok(())
}

fn _config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                let state = if path.exists() { "exists" } else { "not created" };
                output::action("Global", &format!("{} ({})", path.display(), state));
            }
            None => output::warning("no home directory, global config unavailable"),
        },
        ConfigCommands::Init { force } => {
            let path = global_config_path().ok_or_else(|| {
                CliError::Usage("no home directory, global config unavailable".into())
            })?;
            if path.exists() && !force {
                return Err(CliError::Usage(format!(
                    "config already exists: {} (use --force to overwrite)",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .map_err(|e| InfraError::io(format!("create {}", path.display()), e))?;
            container
                .fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Created {}", path.display()));
        }
    }
    Ok(())
}
