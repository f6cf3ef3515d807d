//! Windows backend over the Connecting and Configuring Displays (CCD) API
//!
//! Marshals between the crate's topology model and the `DISPLAYCONFIG_*`
//! structs. Union members are only read through the arm selected by the
//! accompanying type tag.

use std::mem::{size_of, zeroed};
use std::ptr::null_mut;

use windows_sys::Win32::Devices::Display::{
    DISPLAYCONFIG_2DREGION, DISPLAYCONFIG_ADAPTER_NAME, DISPLAYCONFIG_DEVICE_INFO_GET_ADAPTER_NAME,
    DISPLAYCONFIG_DEVICE_INFO_GET_SOURCE_NAME, DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME,
    DISPLAYCONFIG_DEVICE_INFO_HEADER, DISPLAYCONFIG_DEVICE_INFO_TYPE, DISPLAYCONFIG_MODE_INFO,
    DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE, DISPLAYCONFIG_MODE_INFO_TYPE_TARGET, DISPLAYCONFIG_PATH_INFO,
    DISPLAYCONFIG_RATIONAL, DISPLAYCONFIG_SOURCE_DEVICE_NAME, DISPLAYCONFIG_SOURCE_MODE,
    DISPLAYCONFIG_TARGET_DEVICE_NAME, DISPLAYCONFIG_TARGET_MODE, DISPLAYCONFIG_VIDEO_SIGNAL_INFO,
    DISPLAYCONFIG_VIDEO_SIGNAL_INFO_0, DisplayConfigGetDeviceInfo, GetDisplayConfigBufferSizes,
    QueryDisplayConfig, SetDisplayConfig,
};
use windows_sys::Win32::Foundation::{LUID, POINTL};

use super::error::check_status;
use super::{BufferSizes, DisplayConfigApi, NativeCall, NativeError, QueryScope, TargetName};
use crate::constants::status;
use crate::topology::{
    AdapterId, Mode, ModeKind, Path, PathSource, PathTarget, Point, Rational, Region, SourceMode,
    TargetMode, VideoSignalInfo,
};

pub struct WindowsDisplayConfig;

impl DisplayConfigApi for WindowsDisplayConfig {
    fn buffer_sizes(&self, scope: QueryScope) -> Result<BufferSizes, NativeError> {
        let mut paths = 0u32;
        let mut modes = 0u32;
        let code = unsafe { GetDisplayConfigBufferSizes(scope.flags() as _, &mut paths, &mut modes) };
        check_status(NativeCall::BufferSizes, code as i32)?;
        Ok(BufferSizes { paths, modes })
    }

    fn query_config(
        &self,
        scope: QueryScope,
        capacity: BufferSizes,
    ) -> Result<(Vec<Path>, Vec<Mode>), NativeError> {
        let mut path_count = capacity.paths;
        let mut mode_count = capacity.modes;
        // SAFETY: plain C structs, all-zero is a valid bit pattern
        let mut native_paths: Vec<DISPLAYCONFIG_PATH_INFO> =
            vec![unsafe { zeroed() }; path_count as usize];
        let mut native_modes: Vec<DISPLAYCONFIG_MODE_INFO> =
            vec![unsafe { zeroed() }; mode_count as usize];

        let code = unsafe {
            QueryDisplayConfig(
                scope.flags() as _,
                &mut path_count,
                native_paths.as_mut_ptr(),
                &mut mode_count,
                native_modes.as_mut_ptr(),
                null_mut(),
            )
        };
        check_status(NativeCall::QueryConfig, code as i32)?;

        native_paths.truncate(path_count as usize);
        native_modes.truncate(mode_count as usize);

        let paths = native_paths.iter().map(path_from_native).collect();
        let modes = native_modes
            .iter()
            .map(mode_from_native)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((paths, modes))
    }

    fn set_config(&self, paths: &[Path], modes: &[Mode], flags: u32) -> Result<(), NativeError> {
        let native_paths: Vec<DISPLAYCONFIG_PATH_INFO> = paths.iter().map(path_to_native).collect();
        let native_modes: Vec<DISPLAYCONFIG_MODE_INFO> = modes.iter().map(mode_to_native).collect();

        let code = unsafe {
            SetDisplayConfig(
                native_paths.len() as u32,
                native_paths.as_ptr(),
                native_modes.len() as u32,
                native_modes.as_ptr(),
                flags as _,
            )
        };
        check_status(NativeCall::SetConfig, code as i32)
    }

    fn adapter_name(&self, adapter: AdapterId) -> Result<String, NativeError> {
        let mut packet: DISPLAYCONFIG_ADAPTER_NAME = unsafe { zeroed() };
        packet.header = header(
            DISPLAYCONFIG_DEVICE_INFO_GET_ADAPTER_NAME,
            size_of::<DISPLAYCONFIG_ADAPTER_NAME>(),
            adapter,
            0,
        );
        unsafe { get_device_info(NativeCall::AdapterName, &mut packet)? };
        Ok(wide_to_string(&packet.adapterDevicePath))
    }

    fn source_name(&self, adapter: AdapterId, source_id: u32) -> Result<String, NativeError> {
        let mut packet: DISPLAYCONFIG_SOURCE_DEVICE_NAME = unsafe { zeroed() };
        packet.header = header(
            DISPLAYCONFIG_DEVICE_INFO_GET_SOURCE_NAME,
            size_of::<DISPLAYCONFIG_SOURCE_DEVICE_NAME>(),
            adapter,
            source_id,
        );
        unsafe { get_device_info(NativeCall::SourceName, &mut packet)? };
        Ok(wide_to_string(&packet.viewGdiDeviceName))
    }

    fn target_name(&self, adapter: AdapterId, target_id: u32) -> Result<TargetName, NativeError> {
        let mut packet: DISPLAYCONFIG_TARGET_DEVICE_NAME = unsafe { zeroed() };
        packet.header = header(
            DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME,
            size_of::<DISPLAYCONFIG_TARGET_DEVICE_NAME>(),
            adapter,
            target_id,
        );
        unsafe { get_device_info(NativeCall::TargetName, &mut packet)? };
        Ok(TargetName {
            friendly_name: wide_to_string(&packet.monitorFriendlyDeviceName),
            device_path: wide_to_string(&packet.monitorDevicePath),
        })
    }
}

fn header(
    kind: DISPLAYCONFIG_DEVICE_INFO_TYPE,
    size: usize,
    adapter: AdapterId,
    id: u32,
) -> DISPLAYCONFIG_DEVICE_INFO_HEADER {
    DISPLAYCONFIG_DEVICE_INFO_HEADER {
        r#type: kind,
        size: size as u32,
        adapterId: luid(adapter),
        id,
    }
}

/// # Safety
///
/// `T` must be a `DISPLAYCONFIG_*` request packet whose first field is a
/// header describing `T` itself.
unsafe fn get_device_info<T>(call: NativeCall, packet: &mut T) -> Result<(), NativeError> {
    let code = unsafe { DisplayConfigGetDeviceInfo((packet as *mut T).cast()) };
    check_status(call, code as i32)
}

/// UTF-16 buffer up to the first NUL
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

fn luid(id: AdapterId) -> LUID {
    let (low, high) = id.luid_parts();
    LUID {
        LowPart: low,
        HighPart: high,
    }
}

fn adapter_id(luid: LUID) -> AdapterId {
    AdapterId::from_luid_parts(luid.LowPart, luid.HighPart)
}

fn rational(native: DISPLAYCONFIG_RATIONAL) -> Rational {
    Rational::new(native.Numerator, native.Denominator)
}

fn native_rational(value: Rational) -> DISPLAYCONFIG_RATIONAL {
    DISPLAYCONFIG_RATIONAL {
        Numerator: value.numerator,
        Denominator: value.denominator,
    }
}

fn path_from_native(native: &DISPLAYCONFIG_PATH_INFO) -> Path {
    let source = &native.sourceInfo;
    let target = &native.targetInfo;
    // Queries never ask for virtual-mode awareness, so the plain index arm is live
    let (source_idx, target_idx) =
        unsafe { (source.Anonymous.modeInfoIdx, target.Anonymous.modeInfoIdx) };

    Path {
        source: PathSource {
            adapter_id: adapter_id(source.adapterId),
            id: source.id,
            mode_info_idx: source_idx,
            status_flags: source.statusFlags,
        },
        target: PathTarget {
            adapter_id: adapter_id(target.adapterId),
            id: target.id,
            mode_info_idx: target_idx,
            output_technology: target.outputTechnology as u32,
            rotation: target.rotation as u32,
            scaling: target.scaling as u32,
            refresh_rate: rational(target.refreshRate),
            scan_line_ordering: target.scanLineOrdering as u32,
            target_available: target.targetAvailable != 0,
            status_flags: target.statusFlags,
        },
        flags: native.flags,
    }
}

fn path_to_native(path: &Path) -> DISPLAYCONFIG_PATH_INFO {
    let mut native: DISPLAYCONFIG_PATH_INFO = unsafe { zeroed() };

    let source = &mut native.sourceInfo;
    source.adapterId = luid(path.source.adapter_id);
    source.id = path.source.id;
    source.Anonymous.modeInfoIdx = path.source.mode_info_idx;
    source.statusFlags = path.source.status_flags;

    let target = &mut native.targetInfo;
    target.adapterId = luid(path.target.adapter_id);
    target.id = path.target.id;
    target.Anonymous.modeInfoIdx = path.target.mode_info_idx;
    target.outputTechnology = path.target.output_technology as _;
    target.rotation = path.target.rotation as _;
    target.scaling = path.target.scaling as _;
    target.refreshRate = native_rational(path.target.refresh_rate);
    target.scanLineOrdering = path.target.scan_line_ordering as _;
    target.targetAvailable = i32::from(path.target.target_available) as _;
    target.statusFlags = path.target.status_flags;

    native.flags = path.flags;
    native
}

fn mode_from_native(native: &DISPLAYCONFIG_MODE_INFO) -> Result<Mode, NativeError> {
    let info = if native.infoType == DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE {
        let mode = unsafe { native.Anonymous.sourceMode };
        ModeKind::Source(SourceMode {
            width: mode.width,
            height: mode.height,
            pixel_format: mode.pixelFormat as u32,
            position: Point {
                x: mode.position.x,
                y: mode.position.y,
            },
        })
    } else if native.infoType == DISPLAYCONFIG_MODE_INFO_TYPE_TARGET {
        let signal = unsafe { native.Anonymous.targetMode.targetVideoSignalInfo };
        ModeKind::Target(TargetMode {
            signal: VideoSignalInfo {
                pixel_rate: signal.pixelRate,
                h_sync_freq: rational(signal.hSyncFreq),
                v_sync_freq: rational(signal.vSyncFreq),
                active_size: Region {
                    cx: signal.activeSize.cx,
                    cy: signal.activeSize.cy,
                },
                total_size: Region {
                    cx: signal.totalSize.cx,
                    cy: signal.totalSize.cy,
                },
                video_standard: unsafe { signal.Anonymous.videoStandard },
                scan_line_ordering: signal.scanLineOrdering as u32,
            },
        })
    } else {
        // Desktop image modes only appear for virtual-mode-aware queries
        return Err(NativeError::new(NativeCall::QueryConfig, status::NOT_SUPPORTED));
    };

    Ok(Mode {
        adapter_id: adapter_id(native.adapterId),
        id: native.id,
        info,
    })
}

fn mode_to_native(mode: &Mode) -> DISPLAYCONFIG_MODE_INFO {
    let mut native: DISPLAYCONFIG_MODE_INFO = unsafe { zeroed() };
    native.adapterId = luid(mode.adapter_id);
    native.id = mode.id;

    match &mode.info {
        ModeKind::Source(source) => {
            native.infoType = DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE;
            native.Anonymous.sourceMode = DISPLAYCONFIG_SOURCE_MODE {
                width: source.width,
                height: source.height,
                pixelFormat: source.pixel_format as _,
                position: POINTL {
                    x: source.position.x,
                    y: source.position.y,
                },
            };
        }
        ModeKind::Target(target) => {
            let signal = &target.signal;
            native.infoType = DISPLAYCONFIG_MODE_INFO_TYPE_TARGET;
            native.Anonymous.targetMode = DISPLAYCONFIG_TARGET_MODE {
                targetVideoSignalInfo: DISPLAYCONFIG_VIDEO_SIGNAL_INFO {
                    pixelRate: signal.pixel_rate,
                    hSyncFreq: native_rational(signal.h_sync_freq),
                    vSyncFreq: native_rational(signal.v_sync_freq),
                    activeSize: DISPLAYCONFIG_2DREGION {
                        cx: signal.active_size.cx,
                        cy: signal.active_size.cy,
                    },
                    totalSize: DISPLAYCONFIG_2DREGION {
                        cx: signal.total_size.cx,
                        cy: signal.total_size.cy,
                    },
                    Anonymous: DISPLAYCONFIG_VIDEO_SIGNAL_INFO_0 {
                        videoStandard: signal.video_standard,
                    },
                    scanLineOrdering: signal.scan_line_ordering as _,
                },
            };
        }
    }
    native
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::fixtures::SnapshotBuilder;

    #[test]
    fn test_wide_to_string_stops_at_nul() {
        let mut buffer = [0u16; 16];
        for (slot, unit) in buffer.iter_mut().zip("DISPLAY1".encode_utf16()) {
            *slot = unit;
        }
        assert_eq!(wide_to_string(&buffer), "DISPLAY1");
        assert_eq!(wide_to_string(&[0x41, 0x42]), "AB");
    }

    #[test]
    fn test_native_conversion_preserves_paths_and_modes() {
        let snapshot = SnapshotBuilder::new()
            .adapter(0x1_0000_0010, "AdapterA")
            .path((0x1_0000_0010, 0), (0x1_0000_0010, 3))
            .build();

        let path = snapshot.paths[0];
        assert_eq!(path_from_native(&path_to_native(&path)), path);
        for mode in &snapshot.modes {
            assert_eq!(mode_from_native(&mode_to_native(mode)).unwrap(), *mode);
        }
    }
}
