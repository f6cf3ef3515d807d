use std::path::{Path, PathBuf};

use crate::constants::config;

/// `<platform config dir>/display-profiles`, or `./display-profiles` when the
/// platform has no config dir
pub fn default_base_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(config::APP_DIR);
    path
}

pub fn profiles_dir(base: &Path) -> PathBuf {
    base.join(config::PROFILES_DIR)
}

pub fn settings_file(base: &Path) -> PathBuf {
    base.join(config::SETTINGS_FILENAME)
}

pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
