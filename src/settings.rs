//! Application settings: log level and profile hotkey bindings
//!
//! Registering the accelerators with the OS is left to whatever key-event
//! loop hosts the tool; this module only keeps the profile -> accelerator
//! table and answers lookups in both directions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub hotkeys: Vec<HotkeyBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub profile: String,
    pub accelerator: Accelerator,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            hotkeys: Vec::new(),
        }
    }
}

impl Settings {
    /// Raw read: `Ok(None)` when the file does not exist
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("Failed to read settings from {:?}", path)),
        };
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings JSON from {:?}", path))?;
        Ok(Some(settings))
    }

    /// Settings from a [`Settings::read`] result, defaults when absent or broken
    pub fn resolve(read: Result<Option<Self>>) -> Self {
        match read {
            Ok(Some(settings)) => {
                debug!(hotkeys = settings.hotkeys.len(), "Loaded settings");
                settings
            }
            Ok(None) => {
                debug!("Settings file not found, using defaults");
                Self::default()
            }
            Err(err) => {
                warn!("Could not load settings, using defaults: {err:#}");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        paths::ensure_parent_dir(path)
            .with_context(|| format!("Failed to create settings directory for {:?}", path))?;
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;
        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    pub fn find_hotkey(&self, profile: &str) -> Option<&Accelerator> {
        self.hotkeys
            .iter()
            .find(|b| b.profile == profile)
            .map(|b| &b.accelerator)
    }

    /// Bind `accelerator` to `profile`, or drop the binding when `None`
    ///
    /// Returns the accelerator previously bound to the profile.
    pub fn set_hotkey(&mut self, profile: &str, accelerator: Option<Accelerator>) -> Option<Accelerator> {
        let existing = self.hotkeys.iter().position(|b| b.profile == profile);
        match (existing, accelerator) {
            (Some(i), Some(accelerator)) => Some(std::mem::replace(&mut self.hotkeys[i].accelerator, accelerator)),
            (Some(i), None) => Some(self.hotkeys.remove(i).accelerator),
            (None, Some(accelerator)) => {
                self.hotkeys.push(HotkeyBinding {
                    profile: profile.to_string(),
                    accelerator,
                });
                None
            }
            (None, None) => None,
        }
    }

    /// Profile bound to `accelerator`; the earliest binding wins
    pub fn profile_for_accelerator(&self, accelerator: &Accelerator) -> Option<&str> {
        self.hotkeys
            .iter()
            .find(|b| &b.accelerator == accelerator)
            .map(|b| b.profile.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceleratorError {
    #[error("accelerator is empty")]
    Empty,
    #[error("accelerator '{0}' has an empty part")]
    EmptyPart(String),
    #[error("accelerator '{0}' repeats a modifier")]
    RepeatedModifier(String),
    #[error("accelerator '{0}' has no key")]
    MissingKey(String),
    #[error("accelerator '{0}' has more than one key")]
    MultipleKeys(String),
}

/// Key chord such as `Ctrl+Alt+1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Accelerator {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub win: bool,
    pub key: String,
}

impl FromStr for Accelerator {
    type Err = AcceleratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(AcceleratorError::Empty);
        }

        let mut accel = Accelerator {
            ctrl: false,
            alt: false,
            shift: false,
            win: false,
            key: String::new(),
        };
        for part in s.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(AcceleratorError::EmptyPart(s.to_string()));
            }
            let flag = match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => Some(&mut accel.ctrl),
                "alt" => Some(&mut accel.alt),
                "shift" => Some(&mut accel.shift),
                "win" | "super" | "meta" => Some(&mut accel.win),
                _ => None,
            };
            match flag {
                Some(flag) if *flag => return Err(AcceleratorError::RepeatedModifier(s.to_string())),
                Some(flag) => *flag = true,
                None if !accel.key.is_empty() => return Err(AcceleratorError::MultipleKeys(s.to_string())),
                None => accel.key = normalize_key(part),
            }
        }

        if accel.key.is_empty() {
            return Err(AcceleratorError::MissingKey(s.to_string()));
        }
        Ok(accel)
    }
}

/// `a` -> `A`, `f5` -> `F5`, `pageup` -> `Pageup`
fn normalize_key(key: &str) -> String {
    let is_function_key = key.len() > 1
        && key.starts_with(['f', 'F'])
        && key[1..].chars().all(|c| c.is_ascii_digit());
    if key.chars().count() == 1 || is_function_key {
        return key.to_uppercase();
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = [
            (self.ctrl, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.win, "Win"),
        ];
        for (_, name) in modifiers.iter().filter(|(on, _)| *on) {
            write!(f, "{name}+")?;
        }
        f.write_str(&self.key)
    }
}

impl TryFrom<String> for Accelerator {
    type Error = AcceleratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Accelerator> for String {
    fn from(value: Accelerator) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accel(s: &str) -> Accelerator {
        s.parse().unwrap()
    }

    #[test]
    fn test_accelerator_parse_and_canonical_order() {
        let a = accel("shift+CTRL+f5");
        assert!(a.ctrl && a.shift && !a.alt && !a.win);
        assert_eq!(a.key, "F5");
        assert_eq!(a.to_string(), "Ctrl+Shift+F5");

        assert_eq!(accel("Win + Alt + 1").to_string(), "Alt+Win+1");
        assert_eq!(accel("q").to_string(), "Q");
        assert_eq!(accel("ctrl+pageup").to_string(), "Ctrl+Pageup");
    }

    #[test]
    fn test_accelerator_rejects_bad_input() {
        assert_eq!("".parse::<Accelerator>(), Err(AcceleratorError::Empty));
        assert!(matches!("Ctrl+".parse::<Accelerator>(), Err(AcceleratorError::EmptyPart(_))));
        assert!(matches!("Ctrl+Alt".parse::<Accelerator>(), Err(AcceleratorError::MissingKey(_))));
        assert!(matches!("Ctrl+A+B".parse::<Accelerator>(), Err(AcceleratorError::MultipleKeys(_))));
        assert!(matches!("Ctrl+ctrl+A".parse::<Accelerator>(), Err(AcceleratorError::RepeatedModifier(_))));
    }

    #[test]
    fn test_set_find_and_clear_hotkey() {
        let mut settings = Settings::default();
        assert_eq!(settings.set_hotkey("Desk", Some(accel("Ctrl+Alt+1"))), None);
        assert_eq!(settings.find_hotkey("Desk"), Some(&accel("Ctrl+Alt+1")));

        let previous = settings.set_hotkey("Desk", Some(accel("Ctrl+Alt+2")));
        assert_eq!(previous, Some(accel("Ctrl+Alt+1")));
        assert_eq!(settings.hotkeys.len(), 1);

        assert_eq!(settings.set_hotkey("Desk", None), Some(accel("Ctrl+Alt+2")));
        assert_eq!(settings.find_hotkey("Desk"), None);
        assert_eq!(settings.set_hotkey("Desk", None), None);
    }

    #[test]
    fn test_profile_for_accelerator() {
        let mut settings = Settings::default();
        settings.set_hotkey("Desk", Some(accel("Ctrl+Alt+1")));
        settings.set_hotkey("Couch", Some(accel("Ctrl+Alt+2")));

        assert_eq!(settings.profile_for_accelerator(&accel("alt+ctrl+2")), Some("Couch"));
        assert_eq!(settings.profile_for_accelerator(&accel("Ctrl+Alt+3")), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings {
            log_level: "debug".to_string(),
            ..Settings::default()
        };
        settings.set_hotkey("Desk", Some(accel("Ctrl+Alt+1")));
        settings.save(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["hotkeys"][0]["accelerator"], "Ctrl+Alt+1");

        assert_eq!(Settings::resolve(Settings::read(&path)), settings);
    }

    #[test]
    fn test_missing_or_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert!(Settings::read(&path).unwrap().is_none());
        assert_eq!(Settings::resolve(Settings::read(&path)), Settings::default());

        fs::write(&path, "{ nope").unwrap();
        assert!(Settings::read(&path).is_err());
        assert_eq!(Settings::resolve(Settings::read(&path)), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "hotkeys": [] }"#).unwrap();

        assert_eq!(Settings::resolve(Settings::read(&path)).log_level, "info");
    }
}
