//! Snapshot builder shared by unit tests

use super::model::*;
use crate::constants::path;

pub struct SnapshotBuilder {
    snapshot: TopologySnapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: TopologySnapshot::default(),
        }
    }

    pub fn adapter(mut self, id: i64, name: &str) -> Self {
        self.snapshot.adapters.insert(AdapterId(id), Adapter::new(name));
        self
    }

    /// Active 1920x1080@60 path; desktops are laid out left to right
    pub fn path(self, source: (i64, u32), target: (i64, u32)) -> Self {
        self.path_with_flags(source, target, path::ACTIVE)
    }

    pub fn inactive_path(self, source: (i64, u32), target: (i64, u32)) -> Self {
        self.path_with_flags(source, target, 0)
    }

    fn path_with_flags(mut self, source: (i64, u32), target: (i64, u32), flags: u32) -> Self {
        let (source_adapter, source_id) = (AdapterId(source.0), source.1);
        let (target_adapter, target_id) = (AdapterId(target.0), target.1);
        let slot = self.snapshot.paths.len() as i32;

        let source_idx = self.snapshot.modes.len() as u32;
        self.snapshot.modes.push(Mode {
            adapter_id: source_adapter,
            id: source_id,
            info: ModeKind::Source(SourceMode {
                width: 1920,
                height: 1080,
                pixel_format: 5,
                position: Point { x: slot * 1920, y: 0 },
            }),
        });
        let target_idx = self.snapshot.modes.len() as u32;
        self.snapshot.modes.push(Mode {
            adapter_id: target_adapter,
            id: target_id,
            info: ModeKind::Target(TargetMode {
                signal: VideoSignalInfo {
                    pixel_rate: 148_500_000,
                    h_sync_freq: Rational::new(67_500, 1),
                    v_sync_freq: Rational::new(60, 1),
                    active_size: Region { cx: 1920, cy: 1080 },
                    total_size: Region { cx: 2200, cy: 1125 },
                    video_standard: 255,
                    scan_line_ordering: 1,
                },
            }),
        });

        self.snapshot.paths.push(Path {
            source: PathSource {
                adapter_id: source_adapter,
                id: source_id,
                mode_info_idx: source_idx,
                status_flags: 1,
            },
            target: PathTarget {
                adapter_id: target_adapter,
                id: target_id,
                mode_info_idx: target_idx,
                output_technology: 5,
                rotation: 1,
                scaling: 1,
                refresh_rate: Rational::new(60_000, 1_000),
                scan_line_ordering: 1,
                target_available: true,
                status_flags: 1,
            },
            flags,
        });

        if let Some(adapter) = self.snapshot.adapters.get_mut(&source_adapter) {
            adapter.sources.insert(
                source_id,
                Source {
                    gdi_name: format!("\\\\.\\DISPLAY{}", slot + 1),
                },
            );
        }
        if let Some(adapter) = self.snapshot.adapters.get_mut(&target_adapter) {
            adapter.targets.insert(
                target_id,
                Target {
                    friendly_name: format!("Monitor {target_id}"),
                    device_path: format!("\\\\?\\DISPLAY#MON{target_id}#{}", target.0),
                },
            );
        }
        self
    }

    pub fn build(self) -> TopologySnapshot {
        self.snapshot
    }
}
