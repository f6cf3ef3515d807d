//! Structural checks for a topology snapshot
//!
//! The native API correlates paths and modes purely by array position and
//! embedded ids. These checks catch snapshots that would be submitted with
//! dangling links, before any native call is made.

use std::fmt;
use thiserror::Error;

use super::model::{AdapterId, ModeKind, Path, TopologySnapshot};
use crate::constants::path;

/// Which half of a path a mode link belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathHalf {
    Source,
    Target,
}

impl fmt::Display for PathHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathHalf::Source => f.write_str("source"),
            PathHalf::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("adapter {adapter} is referenced but has no adapter entry")]
    UnknownAdapter { adapter: AdapterId },

    #[error("path {path} {half} mode index {index} is out of range ({modes} modes)")]
    ModeIndexOutOfRange {
        path: usize,
        half: PathHalf,
        index: u32,
        modes: usize,
    },

    #[error("path {path} {half} mode index {index} points at a mode of the wrong kind")]
    ModeKindMismatch { path: usize, half: PathHalf, index: u32 },

    #[error("path {path} {half} mode index {index} belongs to a different adapter or id")]
    ModeOwnerMismatch { path: usize, half: PathHalf, index: u32 },
}

impl TopologySnapshot {
    /// First invariant violation, if any
    pub fn check(&self) -> Result<(), TopologyError> {
        match self.violations().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every invariant violation in the snapshot
    pub fn violations(&self) -> Vec<TopologyError> {
        let mut errors = self.check_adapters();
        errors.extend(self.check_mode_links());
        errors
    }

    /// Every valid adapter id embedded in a path or mode must have an
    /// adapter entry
    pub fn check_adapters(&self) -> Vec<TopologyError> {
        self.referenced_adapter_ids()
            .into_iter()
            .filter(|id| !self.adapters.contains_key(id))
            .map(|adapter| TopologyError::UnknownAdapter { adapter })
            .collect()
    }

    /// Every `mode_info_idx` must be invalid-by-convention or point at a
    /// mode of the matching kind owned by the same adapter/id
    pub fn check_mode_links(&self) -> Vec<TopologyError> {
        let mut errors = Vec::new();
        for (i, p) in self.paths.iter().enumerate() {
            if let Some(err) = self.check_link(i, p, PathHalf::Source) {
                errors.push(err);
            }
            if let Some(err) = self.check_link(i, p, PathHalf::Target) {
                errors.push(err);
            }
        }
        errors
    }

    fn check_link(&self, path_index: usize, p: &Path, half: PathHalf) -> Option<TopologyError> {
        let (adapter_id, id, index) = match half {
            PathHalf::Source => (p.source.adapter_id, p.source.id, p.source.mode_info_idx),
            PathHalf::Target => (p.target.adapter_id, p.target.id, p.target.mode_info_idx),
        };
        if index == path::MODE_IDX_INVALID {
            return None;
        }

        let Some(mode) = self.modes.get(index as usize) else {
            return Some(TopologyError::ModeIndexOutOfRange {
                path: path_index,
                half,
                index,
                modes: self.modes.len(),
            });
        };

        let kind_matches = matches!(
            (half, &mode.info),
            (PathHalf::Source, ModeKind::Source(_)) | (PathHalf::Target, ModeKind::Target(_))
        );
        if !kind_matches {
            return Some(TopologyError::ModeKindMismatch {
                path: path_index,
                half,
                index,
            });
        }

        if mode.adapter_id != adapter_id || mode.id != id {
            return Some(TopologyError::ModeOwnerMismatch {
                path: path_index,
                half,
                index,
            });
        }
        None
    }
}
