//! Command dispatch for the dupemark binary.
//!
//! Each subcommand opens the session into a fresh [`Engine`], runs the
//! commands the flags ask for, prints or saves the result and maps the
//! outcome to an [`ExitCode`].

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};

use crate::actions::{ActionKind, ActionOutcome, ActionProgressCallback, DeleteOptions};
use crate::cli::{
    ApplyAction, ApplyArgs, Cli, Commands, IgnoreCommand, MarkArgs, OutputFormat, RenameArgs,
    ShowArgs,
};
use crate::config::Config;
use crate::engine::{Command, Engine, Outcome};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::BatchProgress;
use crate::results::{Directories, FileKey, FilterState, IgnoreList};
use crate::session::Session;
use crate::signal::install_handler;

/// Run the parsed command line.
///
/// # Errors
///
/// Returns an error for unreadable sessions or configuration, unknown paths
/// and commands the engine rejects. Per-file action failures are not
/// errors; they yield [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Configuration: {:?}", config);

    match &cli.command {
        Commands::Show(args) => run_show(&config, args),
        Commands::Mark(args) => run_mark(&config, args),
        Commands::Apply(args) => run_apply(&config, args, cli.quiet),
        Commands::Rename(args) => run_rename(&config, args),
        Commands::Ignore(cmd) => run_ignore(&config, cmd),
    }
}

fn build_engine(config: &Config) -> Result<Engine> {
    let ignore_path = config.ignore_list_path()?;
    let ignore_list = IgnoreList::load_or_default(&ignore_path);

    let mut engine = Engine::new(Arc::new(config.file_operations()))
        .with_ignore_list(ignore_list, Some(ignore_path));
    match install_handler() {
        Ok(handler) => engine = engine.with_cancel_flag(handler.get_flag()),
        Err(e) => log::warn!("{}; Ctrl+C will not cancel file actions", e),
    }
    if let Some(path) = &config.directories_path {
        engine = engine.with_directories(Directories::load(path)?);
    }
    Ok(engine)
}

fn open_session(config: &Config, path: &Path) -> Result<Engine> {
    let mut engine = build_engine(config)?;
    let session = Session::load(path)?;
    if let Outcome::Loaded { groups, ignored } = session.restore_into(&mut engine)? {
        log::info!(
            "Loaded {} group(s) from {} ({} ignored file(s) left out)",
            groups,
            path.display(),
            ignored
        );
    }
    if config.power_marker && !engine.power_marker().is_on() {
        engine.execute(Command::TogglePowerMarker)?;
    }
    Ok(engine)
}

fn save_session(engine: &Engine, path: &Path) -> Result<()> {
    Session::from_engine(engine)
        .save(path)
        .with_context(|| format!("Failed to save session: {}", path.display()))
}

fn key_for(engine: &Engine, path: &Path) -> Result<FileKey> {
    engine
        .key_for_path(path)
        .ok_or_else(|| anyhow::anyhow!("{} is not in the results", path.display()))
}

fn run_show(config: &Config, args: &ShowArgs) -> Result<ExitCode> {
    let mut engine = open_session(config, &args.session)?;
    if args.filter.is_some() || args.delta {
        let filter = FilterState::new(args.filter.clone().unwrap_or_default(), args.delta);
        engine.execute(Command::SetFilter(filter))?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Text => TextOutput::new(&engine).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&engine).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&engine).write_to(&mut out)?,
    }
    out.flush()?;

    if engine.groups().is_empty() {
        return Ok(ExitCode::NothingToDo);
    }
    Ok(ExitCode::Success)
}

fn run_mark(config: &Config, args: &MarkArgs) -> Result<ExitCode> {
    let mut engine = open_session(config, &args.session)?;
    if engine.groups().is_empty() {
        log::warn!("No duplicate groups in {}", args.session.display());
        return Ok(ExitCode::NothingToDo);
    }

    if let Some(switch) = args.power_marker {
        if engine.power_marker().is_on() != switch.is_on() {
            engine.execute(Command::TogglePowerMarker)?;
        }
    }

    let criteria = if args.default_criteria {
        config.reprioritize.clone()
    } else {
        args.reprioritize.clone()
    };
    if !criteria.is_empty() {
        if let Outcome::Reprioritized { changed } = engine.execute(Command::Reprioritize(criteria))? {
            log::info!("{} group(s) got a new reference", changed);
        }
    }

    for path in &args.references {
        let key = key_for(&engine, path)?;
        engine.execute(Command::MakeReference(key))?;
    }

    let bulk = if args.all {
        Some(Command::MarkAllGroups)
    } else if args.none {
        Some(Command::UnmarkAll)
    } else if args.invert {
        Some(Command::InvertAll)
    } else {
        None
    };
    if let Some(command) = bulk {
        engine.execute(command)?;
    }

    if !args.files.is_empty() {
        let keys = args
            .files
            .iter()
            .map(|p| key_for(&engine, p))
            .collect::<Result<Vec<_>>>()?;
        engine.execute(Command::MarkSelected(keys))?;
    }

    save_session(&engine, &args.session)?;
    log::info!("{}", engine.stats());
    Ok(ExitCode::Success)
}

fn action_kind(config: &Config, args: &ApplyArgs) -> Result<ActionKind> {
    let dest = || {
        args.dest
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--dest is required for {:?}", args.action))
    };
    Ok(match args.action {
        ApplyAction::Delete => ActionKind::Delete(DeleteOptions {
            use_trash: config.use_trash && !args.permanent,
            direct_only: config.direct_only || args.direct_only,
        }),
        ApplyAction::Move => ActionKind::Move { dest: dest()? },
        ApplyAction::Copy => ActionKind::Copy { dest: dest()? },
        ApplyAction::Ignore | ApplyAction::Remove => {
            anyhow::bail!("{:?} does not touch files on disk", args.action)
        }
    })
}

fn run_apply(config: &Config, args: &ApplyArgs, quiet: bool) -> Result<ExitCode> {
    let mut engine = open_session(config, &args.session)?;
    if engine.marks().is_empty() {
        log::warn!("No marked files in {}", args.session.display());
        return Ok(ExitCode::NothingToDo);
    }

    let code = match args.action {
        ApplyAction::Ignore => {
            if let Outcome::Ignored { pairs, dissolved } = engine.execute(Command::IgnoreMarked)? {
                log::info!(
                    "Ignored {} pair(s), {} group(s) dissolved",
                    pairs,
                    dissolved.len()
                );
            }
            ExitCode::Success
        }
        ApplyAction::Remove => {
            if let Outcome::Removed { files, dissolved } = engine.execute(Command::RemoveMarked)? {
                log::info!(
                    "Removed {} file(s) from the results, {} group(s) dissolved",
                    files,
                    dissolved.len()
                );
            }
            ExitCode::Success
        }
        ApplyAction::Delete | ApplyAction::Move | ApplyAction::Copy => {
            let kind = action_kind(config, args)?;
            run_batch(&mut engine, kind, quiet)?
        }
    };

    save_session(&engine, &args.session)?;
    Ok(code)
}

/// Run an action batch on a worker thread and fold the report back in.
fn run_batch(engine: &mut Engine, kind: ActionKind, quiet: bool) -> Result<ExitCode> {
    let label = match &kind {
        ActionKind::Delete(_) => "Deleting",
        ActionKind::Move { .. } => "Moving",
        ActionKind::Copy { .. } => "Copying",
    };
    if let ActionKind::Delete(options) = &kind {
        if !options.use_trash {
            log::warn!("Deleting permanently; files cannot be recovered");
        }
    }

    let batch = engine.begin_action(kind)?;
    let ops = engine.file_operations();
    let progress = BatchProgress::new(label, quiet);

    let worker = thread::spawn(move || {
        let callback: &dyn ActionProgressCallback = &progress;
        batch.run_with_progress(ops.as_ref(), Some(callback))
    });
    let report = match worker.join() {
        Ok(report) => report,
        Err(_) => anyhow::bail!("Action worker thread panicked"),
    };

    let Outcome::ActionCompleted { report, .. } = engine.complete_action(report)? else {
        anyhow::bail!("Unexpected outcome from action completion");
    };

    for entry in &report.entries {
        if let ActionOutcome::Failed(reason) = &entry.outcome {
            log::warn!("{}: {}", entry.file.path().display(), reason);
        }
    }

    if report.cancelled {
        Ok(ExitCode::Interrupted)
    } else if report.failed_count() > 0 {
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}

fn run_rename(config: &Config, args: &RenameArgs) -> Result<ExitCode> {
    let mut engine = open_session(config, &args.session)?;
    let key = key_for(&engine, &args.path)?;
    let command = Command::Rename {
        file: key,
        new_name: args.new_name.clone(),
    };
    if let Outcome::Renamed { path, .. } = engine.execute(command)? {
        log::info!("Renamed {} to {}", args.path.display(), path.display());
    }
    save_session(&engine, &args.session)?;
    Ok(ExitCode::Success)
}

fn run_ignore(config: &Config, command: &IgnoreCommand) -> Result<ExitCode> {
    let path = config.ignore_list_path()?;
    let mut list = IgnoreList::load(&path)?;

    match command {
        IgnoreCommand::List => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for (a, b) in list.iter() {
                writeln!(out, "{}\t{}", a.display(), b.display())?;
            }
            if list.is_empty() {
                return Ok(ExitCode::NothingToDo);
            }
        }
        IgnoreCommand::Remove { first, second } => {
            if !list.remove(first, second) {
                log::warn!(
                    "{} and {} are not an ignored pair",
                    first.display(),
                    second.display()
                );
                return Ok(ExitCode::NothingToDo);
            }
            list.save(&path)?;
        }
        IgnoreCommand::Clear => {
            let cleared = list.len();
            list.clear();
            list.save(&path)?;
            log::info!("Cleared {} ignored pair(s)", cleared);
        }
    }
    Ok(ExitCode::Success)
}
