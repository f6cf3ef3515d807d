use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::path;

/// Volatile adapter handle (a LUID on Windows)
///
/// Assigned at enumeration time; it may change across reboots, driver
/// updates or device changes. `AdapterId(0)` means "currently invalid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterId(pub i64);

impl AdapterId {
    pub const INVALID: AdapterId = AdapterId(0);

    #[cfg(any(windows, test))]
    pub fn from_luid_parts(low: u32, high: i32) -> Self {
        Self(((high as i64) << 32) | low as i64)
    }

    #[cfg(any(windows, test))]
    pub fn luid_parts(self) -> (u32, i32) {
        (self.0 as u32, (self.0 >> 32) as i32)
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    /// Value as a float, `None` for a zero denominator
    pub fn to_f64(self) -> Option<f64> {
        if self.denominator == 0 {
            None
        } else {
            Some(self.numerator as f64 / self.denominator as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub cx: u32,
    pub cy: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Source half of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSource {
    pub adapter_id: AdapterId,
    pub id: u32,
    pub mode_info_idx: u32,
    pub status_flags: u32,
}

/// Target half of a path, with the rendering attributes of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTarget {
    pub adapter_id: AdapterId,
    pub id: u32,
    pub mode_info_idx: u32,
    pub output_technology: u32,
    pub rotation: u32,
    pub scaling: u32,
    pub refresh_rate: Rational,
    pub scan_line_ordering: u32,
    pub target_available: bool,
    pub status_flags: u32,
}

/// Directed edge from one source to one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub source: PathSource,
    pub target: PathTarget,
    pub flags: u32,
}

impl Path {
    pub fn is_active(&self) -> bool {
        self.flags & path::ACTIVE != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceMode {
    pub width: u32,
    pub height: u32,
    pub pixel_format: u32,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoSignalInfo {
    pub pixel_rate: u64,
    pub h_sync_freq: Rational,
    pub v_sync_freq: Rational,
    pub active_size: Region,
    pub total_size: Region,
    pub video_standard: u32,
    pub scan_line_ordering: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetMode {
    pub signal: VideoSignalInfo,
}

/// The two shapes a mode can take; the tag is the native `infoType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeKind {
    Source(SourceMode),
    Target(TargetMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub adapter_id: AdapterId,
    /// Source id or target id, depending on `info`
    pub id: u32,
    pub info: ModeKind,
}

impl Mode {
    pub fn as_source(&self) -> Option<&SourceMode> {
        match &self.info {
            ModeKind::Source(mode) => Some(mode),
            ModeKind::Target(_) => None,
        }
    }

    pub fn as_target(&self) -> Option<&TargetMode> {
        match &self.info {
            ModeKind::Target(mode) => Some(mode),
            ModeKind::Source(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Source {
    /// GDI device name, e.g. `\\.\DISPLAY1`
    pub gdi_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Target {
    pub friendly_name: String,
    pub device_path: String,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.friendly_name.is_empty() {
            f.write_str(&self.device_path)
        } else {
            f.write_str(&self.friendly_name)
        }
    }
}

/// Display output controller, keyed in a snapshot by its volatile id
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Adapter {
    /// Stable device path; the adapter's identity across snapshots
    pub name: String,
    #[serde(default)]
    pub sources: BTreeMap<u32, Source>,
    #[serde(default)]
    pub targets: BTreeMap<u32, Target>,
}

impl Adapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: BTreeMap::new(),
            targets: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Full set of paths, modes and adapter metadata at one point in time
///
/// Paths and modes are correlated by position (`mode_info_idx`) and by the
/// embedded adapter/source/target ids, exactly as the native API expects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub paths: Vec<Path>,
    pub modes: Vec<Mode>,
    pub adapters: BTreeMap<AdapterId, Adapter>,
}

impl TopologySnapshot {
    pub fn new(paths: Vec<Path>, modes: Vec<Mode>, adapters: BTreeMap<AdapterId, Adapter>) -> Self {
        Self { paths, modes, adapters }
    }

    /// Distinct valid adapter ids in the order they first appear
    /// (path sources and targets first, then modes)
    pub fn referenced_adapter_ids(&self) -> Vec<AdapterId> {
        let mut seen = Vec::new();
        let embedded = self
            .paths
            .iter()
            .flat_map(|p| [p.source.adapter_id, p.target.adapter_id])
            .chain(self.modes.iter().map(|m| m.adapter_id));
        for id in embedded {
            if id.is_valid() && !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    pub fn adapter_name(&self, id: AdapterId) -> Option<&str> {
        self.adapters.get(&id).map(|a| a.name.as_str())
    }

    pub fn mode_at(&self, index: u32) -> Option<&Mode> {
        if index == path::MODE_IDX_INVALID {
            return None;
        }
        self.modes.get(index as usize)
    }

    pub fn source_mode(&self, path: &Path) -> Option<&SourceMode> {
        self.mode_at(path.source.mode_info_idx).and_then(Mode::as_source)
    }

    pub fn target_mode(&self, path: &Path) -> Option<&TargetMode> {
        self.mode_at(path.target.mode_info_idx).and_then(Mode::as_target)
    }

    pub fn target(&self, adapter: AdapterId, target_id: u32) -> Option<&Target> {
        self.adapters.get(&adapter).and_then(|a| a.targets.get(&target_id))
    }

    pub fn active_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().filter(|p| p.is_active())
    }

    /// Rewrite every embedded adapter id according to `mapping`
    ///
    /// Paths and modes keep their positions, so `mode_info_idx` links stay
    /// positionally valid. The adapter map is re-keyed as well; ids absent
    /// from `mapping` are left alone.
    pub fn rewrite_adapter_ids(&mut self, mapping: &BTreeMap<AdapterId, AdapterId>) {
        let remap = |id: AdapterId| mapping.get(&id).copied().unwrap_or(id);

        for path in &mut self.paths {
            path.source.adapter_id = remap(path.source.adapter_id);
            path.target.adapter_id = remap(path.target.adapter_id);
        }
        for mode in &mut self.modes {
            mode.adapter_id = remap(mode.adapter_id);
        }

        let old = std::mem::take(&mut self.adapters);
        for (id, adapter) in old {
            match self.adapters.entry(remap(id)) {
                std::collections::btree_map::Entry::Vacant(slot) => {
                    slot.insert(adapter);
                }
                // Two stored adapters collapsed onto one live id
                std::collections::btree_map::Entry::Occupied(mut slot) => {
                    let merged = slot.get_mut();
                    merged.sources.extend(adapter.sources);
                    merged.targets.extend(adapter.targets);
                }
            }
        }
    }
}
