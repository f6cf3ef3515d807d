#![cfg_attr(not(windows), forbid(unsafe_code))]

mod cli;
mod constants;
mod display;
mod paths;
mod profile;
mod reconcile;
mod report;
mod settings;
mod topology;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level as TraceLevel, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cli::{Args, Cmd, HotkeyCmd};
use constants::exit;
use display::{DisplayConfigApi, SubmitError, SubmitMode};
use profile::ProfileRepository;
use settings::Settings;

/// Handles shared by every command
struct App {
    profiles: ProfileRepository,
    settings: Settings,
    settings_path: PathBuf,
    api: Box<dyn DisplayConfigApi>,
}

fn parse_level(level: &str) -> Option<TraceLevel> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(TraceLevel::TRACE),
        "debug" => Some(TraceLevel::DEBUG),
        "info" => Some(TraceLevel::INFO),
        "warn" => Some(TraceLevel::WARN),
        "error" => Some(TraceLevel::ERROR),
        _ => None,
    }
}

/// `--verbose` beats `LOG_LEVEL`, which beats the settings file
fn init_logging(verbose: bool, configured: Option<&str>) -> Result<()> {
    let log_level = if verbose {
        TraceLevel::DEBUG
    } else {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|level| parse_level(&level))
            .or_else(|| configured.and_then(parse_level))
            .unwrap_or(TraceLevel::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let base = args.config_dir.clone().unwrap_or_else(paths::default_base_dir);
    let settings_path = paths::settings_file(&base);

    // Settings are read before logging exists so their log level can apply
    let settings_read = Settings::read(&settings_path);
    let configured_level = match &settings_read {
        Ok(Some(settings)) => Some(settings.log_level.clone()),
        _ => None,
    };
    if let Err(err) = init_logging(args.verbose, configured_level.as_deref()) {
        eprintln!("Failed to initialise logging: {err:#}");
    }

    let profiles = match &args.config_dir {
        Some(base) => ProfileRepository::new(paths::profiles_dir(base)),
        None => ProfileRepository::default_location(),
    };
    let mut app = App {
        profiles,
        settings: Settings::resolve(settings_read),
        settings_path,
        api: display::system(),
    };
    info!(base = %base.display(), profiles = %app.profiles.dir().display(), "Using settings directory");

    match run(&mut app, args.cmd) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!("Command failed: {err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::from(exit::FAILURE)
        }
    }
}

fn run(app: &mut App, cmd: Cmd) -> Result<u8> {
    app.profiles
        .ensure_created()
        .context("Could not create the profile directory")?;

    match cmd {
        Cmd::List => {
            let names = app.profiles.names().context("Could not list profiles")?;
            println!("Profile list:");
            for name in names {
                match app.settings.find_hotkey(&name) {
                    Some(accelerator) => println!("  {name} ({accelerator})"),
                    None => println!("  {name}"),
                }
            }
        }
        Cmd::Save { name } => save(app, &name)?,
        Cmd::Load { name } => load(app, &name)?,
        Cmd::Validate { name } => return validate(app, &name),
        Cmd::Detail { name } => {
            let snapshot = app
                .profiles
                .load(&name)
                .with_context(|| format!("Could not display details for profile {name}"))?;
            for line in report::describe(&snapshot) {
                println!("{line}");
            }
        }
        Cmd::Delete { name } => delete(app, &name)?,
        Cmd::Hotkey { cmd } => hotkey(app, cmd)?,
        Cmd::Current => {
            let snapshot = display::acquire(app.api.as_ref(), true)
                .context("Could not read the current display configuration")?;
            for line in report::describe(&snapshot) {
                println!("{line}");
            }
        }
    }
    Ok(exit::SUCCESS)
}

fn save(app: &App, name: &str) -> Result<()> {
    // Reject bad names before touching the display API
    profile::validate_name(name)?;

    let snapshot = display::acquire(app.api.as_ref(), true)
        .with_context(|| format!("Could not save profile {name}"))?;
    app.profiles
        .save(name, &snapshot)
        .with_context(|| format!("Could not save profile {name}"))?;
    println!("Successfully saved profile {name}");
    Ok(())
}

fn load(app: &App, name: &str) -> Result<()> {
    let context = || format!("Could not load profile {name}");

    let stored = app.profiles.load(name).with_context(context)?;
    let reconciled = reconcile::reconcile(app.api.as_ref(), &stored).with_context(context)?;
    if !reconciled.is_complete() {
        warn!(profile = %name, missing = reconciled.missing.len(), "Applying profile with missing adapters");
        if let Some(message) = reconciled.missing_adapters_message() {
            eprintln!("Warning: {message}");
        }
    }

    display::submit(app.api.as_ref(), &reconciled.snapshot, SubmitMode::Apply).with_context(context)?;
    println!("Successfully loaded profile {name}");
    Ok(())
}

fn validate(app: &App, name: &str) -> Result<u8> {
    let context = || format!("Could not validate profile {name}");

    let stored = app.profiles.load(name).with_context(context)?;
    let reconciled = reconcile::reconcile(app.api.as_ref(), &stored).with_context(context)?;

    match display::submit(app.api.as_ref(), &reconciled.snapshot, SubmitMode::Validate) {
        Ok(_) => {
            println!("Profile {name} passed validation.");
            Ok(exit::SUCCESS)
        }
        Err(err) => {
            warn!(profile = %name, code = ?err.native_code(), "Profile failed validation");
            println!("Profile {name} failed validation:");
            match &err {
                SubmitError::Rejected(native) => println!("{} (status {})", native.message(), native.code),
                SubmitError::Malformed(_) => println!("{err}"),
            }
            if let Some(message) = reconciled.missing_adapters_message() {
                println!("{message}");
            }
            Ok(exit::REJECTED)
        }
    }
}

fn delete(app: &mut App, name: &str) -> Result<()> {
    app.profiles
        .delete(name)
        .with_context(|| format!("Could not delete profile {name}"))?;

    if app.settings.set_hotkey(name, None).is_some() {
        app.settings.save(&app.settings_path)?;
    }
    println!("Deleted profile {name}");
    Ok(())
}

fn hotkey(app: &mut App, cmd: HotkeyCmd) -> Result<()> {
    match cmd {
        HotkeyCmd::List => {
            for binding in &app.settings.hotkeys {
                println!("  {:<20} {}", binding.accelerator.to_string(), binding.profile);
            }
        }
        HotkeyCmd::Set { name, accelerator } => {
            if !app.profiles.exists(&name) {
                bail!("profile '{name}' does not exist");
            }
            match app.settings.profile_for_accelerator(&accelerator) {
                Some(other) if other != name => {
                    warn!(accelerator = %accelerator, profile = %other, "Accelerator is already bound to another profile");
                }
                _ => {}
            }

            app.settings.set_hotkey(&name, Some(accelerator.clone()));
            app.settings.save(&app.settings_path)?;
            println!("Bound {accelerator} to profile {name}");
        }
        HotkeyCmd::Clear { name } => match app.settings.set_hotkey(&name, None) {
            Some(previous) => {
                app.settings.save(&app.settings_path)?;
                println!("Removed hotkey {previous} from profile {name}");
            }
            None => println!("Profile {name} has no hotkey"),
        },
    }
    Ok(())
}
