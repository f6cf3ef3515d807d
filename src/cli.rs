use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::settings::Accelerator;

#[derive(Debug, Parser)]
#[command(
    name = "display-profiles",
    version,
    about = "Save and restore multi-monitor display layouts"
)]
pub struct Args {
    /// Override the settings directory (default: <config dir>/display-profiles)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Debug logging, overrides LOG_LEVEL and settings
    #[arg(short = 'v', long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Debug, Subcommand)]
pub enum Cmd {
    /// List saved profiles
    List,

    /// Save the current active layout as a profile
    Save { name: String },

    /// Restore a profile onto this machine
    Load { name: String },

    /// Check whether a profile could be applied, without applying it
    Validate { name: String },

    /// Show the monitors stored in a profile
    Detail { name: String },

    /// Delete a profile and its hotkey
    Delete { name: String },

    /// Manage profile hotkeys
    Hotkey {
        #[command(subcommand)]
        cmd: HotkeyCmd,
    },

    /// Show the layout currently in use
    Current,
}

#[derive(Debug, Subcommand)]
pub enum HotkeyCmd {
    /// List hotkey bindings
    List,

    /// Bind an accelerator (e.g. Ctrl+Alt+1) to a profile
    Set { name: String, accelerator: Accelerator },

    /// Remove a profile's hotkey
    Clear { name: String },
}
