use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{ProfileError, validate_name};
use crate::constants::config::{PROFILE_EXTENSION, PROFILE_FORMAT_VERSION};
use crate::paths;
use crate::topology::TopologySnapshot;

/// On-disk envelope, written
#[derive(Serialize)]
struct ProfileFileRef<'a> {
    version: u32,
    topology: &'a TopologySnapshot,
}

/// On-disk envelope, read; the topology is decoded once the version is known
#[derive(Deserialize)]
struct ProfileFile {
    version: u32,
    topology: serde_json::Value,
}

/// Directory of `<name>.json` profile files
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    dir: PathBuf,
}

impl ProfileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_location() -> Self {
        Self::new(paths::profiles_dir(&paths::default_base_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_created(&self) -> Result<(), ProfileError> {
        fs::create_dir_all(&self.dir).map_err(|source| ProfileError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, ProfileError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{PROFILE_EXTENSION}")))
    }

    /// Profile names, sorted case-insensitively
    ///
    /// A profile directory that does not exist yet holds no profiles.
    pub fn names(&self) -> Result<Vec<String>, ProfileError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ProfileError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ProfileError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort_by_key(|name| name.to_ascii_lowercase());
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read the stored topology as-is
    ///
    /// Structural problems are logged, not rejected, so a broken profile can
    /// still be inspected. Submitting it fails before any native call.
    pub fn load(&self, name: &str) -> Result<TopologySnapshot, ProfileError> {
        let path = self.path_for(name)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ProfileError::NotFound(name.to_string()));
            }
            Err(source) => return Err(ProfileError::Io { path, source }),
        };

        let file: ProfileFile = serde_json::from_str(&contents).map_err(|source| ProfileError::Parse {
            path: path.clone(),
            source,
        })?;
        if file.version != PROFILE_FORMAT_VERSION {
            return Err(ProfileError::UnsupportedVersion {
                path,
                version: file.version,
            });
        }
        let snapshot: TopologySnapshot =
            serde_json::from_value(file.topology).map_err(|source| ProfileError::Parse {
                path: path.clone(),
                source,
            })?;

        for violation in snapshot.violations() {
            warn!(profile = %name, error = %violation, "Stored profile is inconsistent");
        }
        debug!(
            profile = %name,
            paths = snapshot.paths.len(),
            modes = snapshot.modes.len(),
            adapters = snapshot.adapters.len(),
            "Loaded profile"
        );
        Ok(snapshot)
    }

    pub fn save(&self, name: &str, snapshot: &TopologySnapshot) -> Result<PathBuf, ProfileError> {
        let path = self.path_for(name)?;
        paths::ensure_parent_dir(&path).map_err(|source| ProfileError::Io {
            path: path.clone(),
            source,
        })?;

        let envelope = ProfileFileRef {
            version: PROFILE_FORMAT_VERSION,
            topology: snapshot,
        };
        let json = serde_json::to_string_pretty(&envelope).map_err(|source| ProfileError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| ProfileError::Io {
            path: path.clone(),
            source,
        })?;

        info!(profile = %name, path = %path.display(), "Saved profile");
        Ok(path)
    }

    pub fn delete(&self, name: &str) -> Result<(), ProfileError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(profile = %name, "Deleted profile");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Err(ProfileError::NotFound(name.to_string())),
            Err(source) => Err(ProfileError::Io { path, source }),
        }
    }
}
