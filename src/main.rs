mod color;
mod config;
mod project;
mod services;
mod ui;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::color::{contrast_color, lighten_or_darken, mix, random_color, with_alpha, HexColor};
use crate::config::Config;
use crate::project::error::{ProjectColorsError, Result};
use crate::project::generator::{generate, to_json};
use crate::project::settings::{resolve_with, SettingKey};
use crate::project::writer::{apply, ApplyOutcome};
use crate::services::launcher::{open_project, OpenMode};
use crate::services::registry::{self, overview, Registry, WorkspaceReference};
use crate::services::session::{ApplyReport, Session};
use crate::services::store::{ConfigTarget, FileStore, MemoryStore, ProjectLocation, SettingsFile};
use crate::ui::report;

const LOG_ENV: &str = "PROJECT_COLORS_LOG";

#[derive(Debug, Parser)]
#[command(name = "project-colors", version, about = "Give every project its own color in the editor")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Global store holding the project list and groups
    #[arg(long, env = "PROJECT_COLORS_GLOBAL", global = true)]
    global_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ProjectArg {
    /// Project directory or .code-workspace file
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a project's resolved settings
    Show {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        json: bool,
    },
    /// Print the color customizations that `apply` would write
    Preview {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long)]
        json: bool,
    },
    /// Write the project's colors into its editor settings
    Apply {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Change one project setting and re-apply the colors
    Set {
        /// Setting name, e.g. mainColor or isTitleBarColored
        key: String,
        value: String,
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },
    /// Keep re-applying colors whenever the project's settings change
    Watch {
        #[command(flatten)]
        project: ProjectArg,
    },
    /// Open a project in the editor
    Open {
        path: PathBuf,
        #[arg(long)]
        new_window: bool,
    },
    /// Manage the list of known projects
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Manage project groups
    #[command(subcommand)]
    Group(GroupCommand),
    /// Color utilities
    #[command(subcommand)]
    Color(ColorCommand),
    /// Show or initialize the application config
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum WorkspaceCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Add { path: PathBuf },
    Remove { path: PathBuf },
    /// Move DRAGGED to TARGET's position
    Reorder { dragged: PathBuf, target: PathBuf },
}

#[derive(Debug, Subcommand)]
enum GroupCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Create { name: String },
    Rename { old: String, new: String },
    Delete { name: String },
    Add { group: String, path: PathBuf },
    Remove { group: String, path: PathBuf },
    /// Move DRAGGED to TARGET's position, across groups if needed
    Move { dragged: PathBuf, target: PathBuf },
}

#[derive(Debug, Subcommand)]
enum ColorCommand {
    Contrast { color: String },
    /// Lighten (positive) or darken (negative) by a percentage
    Shift {
        color: String,
        #[arg(allow_hyphen_values = true)]
        percent: f64,
    },
    /// Blend A toward B; WEIGHT is the percentage of B
    Mix { a: String, b: String, weight: f64 },
    Alpha { color: String, alpha: f64 },
    Random,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    Show,
    /// Write the default config file if none exists
    Init,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Absolute form of a user-supplied path; registry identity is string equality.
fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn directory_key(path: &Path) -> String {
    normalize_path(path).to_string_lossy().into_owned()
}

fn global_path(cli_override: &Option<PathBuf>) -> Option<PathBuf> {
    cli_override.clone().or_else(Config::global_store_path)
}

fn print_warnings(warnings: Vec<String>) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

fn describe_outcome(outcome: Option<ApplyOutcome>) -> String {
    match outcome {
        Some(o) if o.changed => format!("{} colors set, {} removed", o.set, o.removed),
        Some(_) => "colors already up to date".to_string(),
        None => "colors not written".to_string(),
    }
}

fn print_apply_report(report: &ApplyReport, color: bool) {
    println!(
        "{} {}: {}",
        report::swatch(&report.settings.main_color, &format!(" {} ", report.settings.name), color),
        report.settings.main_color,
        describe_outcome(report.outcome)
    );
    if report.title_changed {
        if report.settings.set_window_title {
            println!("window title set to \"{}\"", report.settings.name);
        } else {
            println!("window title restored");
        }
    }
}

fn open_session(path: &Path, global: Option<PathBuf>, config: &Config) -> Result<Session<FileStore>> {
    let location = ProjectLocation::from_path(&normalize_path(path));
    if !location.exists() {
        return Err(ProjectColorsError::NotAProject(location.path().to_path_buf()));
    }
    let store = FileStore::new(Some(&location), global);
    if let Some(file) = store.project_file().filter(|f| f.is_missing()) {
        tracing::info!(path = %file.path().display(), "no settings file yet, it will be created");
    }
    Ok(Session::new(store, location, config.main_color_default(), config.debounce()))
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load();
    let color = report::stdout_supports_color();
    let global = global_path(&cli.global_file);

    match cli.command {
        Command::Show { project, json } => {
            let path = normalize_path(&project.path);
            let resolved = resolve_with(&path, &config.main_color_default(), &mut rand::thread_rng());
            if json {
                println!("{}", serde_json::to_string_pretty(&resolved.settings)?);
            } else {
                print!("{}", report::settings_report(&resolved.settings, color));
                if !resolved.generated.is_empty() {
                    println!("(main color generated; run `apply` to keep it)");
                }
            }
        }
        Command::Preview { project, json } => {
            let path = normalize_path(&project.path);
            let location = ProjectLocation::from_path(&path);
            let resolved = resolve_with(&path, &config.main_color_default(), &mut rand::thread_rng());
            let generated = generate(&resolved.settings);
            if json {
                println!("{}", serde_json::to_string_pretty(&to_json(&generated))?);
            } else {
                print!("{}", report::customization_report(&generated, color));
                let current = SettingsFile::for_project(&location).settings().cloned().unwrap_or_default();
                let mut dry_run = MemoryStore::new().with_values(ConfigTarget::Project, current);
                let outcome = apply(&mut dry_run, &generated)?;
                println!("apply would leave: {}", describe_outcome(Some(outcome)));
            }
        }
        Command::Apply { project } => {
            let mut session = open_session(&project.path, global, &config)?;
            let report = session.activate(&mut rand::thread_rng());
            print_apply_report(&report, color);
            print_warnings(session.take_warnings());
        }
        Command::Set { key, value, project } => {
            let key = SettingKey::parse(&key).ok_or(ProjectColorsError::UnknownSetting(key))?;
            let mut session = open_session(&project, global, &config)?;
            session.prepare(&mut rand::thread_rng());
            let report = session.update_setting(key, &value)?;
            println!("{} = {}", key, report.settings.value_of(key));
            print_apply_report(&report, color);
            print_warnings(session.take_warnings());
        }
        Command::Watch { project } => {
            let mut session = open_session(&project.path, global, &config)?;
            let report = session.activate(&mut rand::thread_rng());
            print_apply_report(&report, color);
            print_warnings(session.take_warnings());
            println!("watching {} (Ctrl+C to stop)", session.location().settings_file().display());

            let modified = |s: &Session<FileStore>| s.store().project_file().and_then(|f| f.modified());
            let mut last_seen = modified(&session);
            loop {
                std::thread::sleep(config.poll_interval());
                let current = modified(&session);
                if current != last_seen {
                    last_seen = current;
                    session.on_configuration_changed(Instant::now());
                }
                if !session.has_pending_change() {
                    continue;
                }
                if let Some(report) = session.flush(Instant::now()) {
                    print_apply_report(&report, color);
                    print_warnings(session.take_warnings());
                    // our own write must not count as an external change
                    last_seen = modified(&session);
                }
            }
        }
        Command::Open { path, new_window } => {
            let path = normalize_path(&path);
            if !ProjectLocation::from_path(&path).exists() {
                return Err(ProjectColorsError::NotAProject(path));
            }
            let mode = if new_window { OpenMode::NewWindow } else { OpenMode::SameWindow };
            open_project(&config.editor_command, &path, mode)?;
        }
        Command::Workspace(cmd) => run_workspace(cmd, global, color)?,
        Command::Group(cmd) => run_group(cmd, global, color)?,
        Command::Color(cmd) => run_color(cmd, color)?,
        Command::Config(ConfigCommand::Show) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if let Some(path) = Config::config_path() {
                println!("({})", path.display());
            }
        }
        Command::Config(ConfigCommand::Init) => match Config::config_path() {
            Some(path) if path.exists() => println!("{} already exists", path.display()),
            Some(path) => {
                Config::default().save()?;
                println!("wrote {}", path.display());
            }
            None => println!("could not determine the config directory"),
        },
    }
    Ok(())
}

fn registry_store(global: Option<PathBuf>) -> Result<FileStore> {
    match global {
        Some(path) => Ok(FileStore::new(None, Some(path))),
        None => Err(crate::project::error::StoreError::NoGlobalLocation.into()),
    }
}

fn report_change(changed: bool, done: &str) {
    if changed {
        println!("{}", done);
    } else {
        println!("nothing to change");
    }
}

fn run_workspace(cmd: WorkspaceCommand, global: Option<PathBuf>, color: bool) -> Result<()> {
    let mut store = registry_store(global)?;
    match cmd {
        WorkspaceCommand::List { json } => {
            let registry = Registry::load(&store);
            if json {
                println!("{}", serde_json::to_string_pretty(&registry.workspaces)?);
            } else {
                print!("{}", report::workspace_report(&overview(&registry.workspaces), color));
            }
        }
        WorkspaceCommand::Add { path } => {
            let directory = directory_key(&path);
            if !ProjectLocation::from_path(Path::new(&directory)).exists() {
                return Err(ProjectColorsError::NotAProject(PathBuf::from(directory)));
            }
            let reference = WorkspaceReference::new(directory.clone());
            let changed = registry::update(&mut store, |r| r.save_workspace(reference))?;
            report_change(changed, &format!("added {}", directory));
        }
        WorkspaceCommand::Remove { path } => {
            let directory = directory_key(&path);
            let changed = registry::update(&mut store, |r| r.delete_workspace(&directory))?;
            report_change(changed, &format!("removed {}", directory));
        }
        WorkspaceCommand::Reorder { dragged, target } => {
            let (dragged, target) = (directory_key(&dragged), directory_key(&target));
            let changed = registry::update(&mut store, |r| r.reorder_workspace(&dragged, &target))?;
            report_change(changed, "reordered");
        }
    }
    Ok(())
}

fn run_group(cmd: GroupCommand, global: Option<PathBuf>, color: bool) -> Result<()> {
    let mut store = registry_store(global)?;
    match cmd {
        GroupCommand::List { json } => {
            let registry = Registry::load(&store);
            if json {
                println!("{}", serde_json::to_string_pretty(&registry::to_json(&registry))?);
            } else {
                print!("{}", report::group_report(&registry, color, overview));
            }
        }
        GroupCommand::Create { name } => {
            let changed = registry::update(&mut store, |r| r.create_group(&name))?;
            report_change(changed, &format!("created group {}", name.trim()));
        }
        GroupCommand::Rename { old, new } => {
            let changed = registry::update(&mut store, |r| r.rename_group(&old, &new))?;
            report_change(changed, &format!("renamed {} to {}", old, new.trim()));
        }
        GroupCommand::Delete { name } => {
            let changed = registry::update(&mut store, |r| r.delete_group(&name))?;
            report_change(changed, &format!("deleted group {}", name));
        }
        GroupCommand::Add { group, path } => {
            let directory = directory_key(&path);
            let changed = registry::update(&mut store, |r| r.add_to_group(&group, &directory))?;
            report_change(changed, &format!("added {} to {}", directory, group));
        }
        GroupCommand::Remove { group, path } => {
            let directory = directory_key(&path);
            let changed = registry::update(&mut store, |r| r.remove_from_group(&group, &directory))?;
            report_change(changed, &format!("removed {} from {}", directory, group));
        }
        GroupCommand::Move { dragged, target } => {
            let (dragged, target) = (directory_key(&dragged), directory_key(&target));
            let changed = registry::update(&mut store, |r| r.move_workspace(&dragged, &target))?;
            report_change(changed, "moved");
        }
    }
    Ok(())
}

fn print_color(c: &HexColor, color: bool) {
    println!("{} {}", report::swatch(c, "    ", color), c);
}

fn run_color(cmd: ColorCommand, color: bool) -> Result<()> {
    match cmd {
        ColorCommand::Contrast { color: c } => print_color(&contrast_color(&HexColor::parse(&c)?), color),
        ColorCommand::Shift { color: c, percent } => {
            print_color(&lighten_or_darken(&HexColor::parse(&c)?, percent), color)
        }
        ColorCommand::Mix { a, b, weight } => {
            print_color(&mix(&HexColor::parse(&a)?, &HexColor::parse(&b)?, weight), color)
        }
        ColorCommand::Alpha { color: c, alpha } => {
            println!("{}", with_alpha(&HexColor::parse(&c)?, alpha))
        }
        ColorCommand::Random => print_color(&random_color(&mut rand::thread_rng()), color),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
