//! Application-wide constants
//!
//! Native status codes, flag bits and storage names used throughout the
//! application, kept in one place so the backends and the fake agree.

/// Win32 status codes returned by the display configuration calls
pub mod status {
    /// Call succeeded
    pub const SUCCESS: i32 = 0;

    /// Caller lacks access to the console session
    pub const ACCESS_DENIED: i32 = 5;

    /// Unspecified driver failure
    pub const GEN_FAILURE: i32 = 31;

    /// Operation not supported on this system
    pub const NOT_SUPPORTED: i32 = 50;

    /// A parameter (path, mode or flag combination) was rejected
    pub const INVALID_PARAMETER: i32 = 87;

    /// Supplied arrays are too small for the current topology
    pub const INSUFFICIENT_BUFFER: i32 = 122;

    /// The supplied topology cannot be realised by the display driver
    pub const BAD_CONFIGURATION: i32 = 1610;
}

/// `QueryDisplayConfig` flags
#[cfg(windows)]
pub mod query {
    /// Every path the adapters could drive, active or not
    pub const ALL_PATHS: u32 = 0x0000_0001;

    /// Only paths currently driving a monitor
    pub const ONLY_ACTIVE_PATHS: u32 = 0x0000_0002;
}

/// `SetDisplayConfig` flags
pub mod set {
    pub const USE_SUPPLIED_DISPLAY_CONFIG: u32 = 0x0000_0020;
    pub const VALIDATE: u32 = 0x0000_0040;
    pub const APPLY: u32 = 0x0000_0080;
    pub const SAVE_TO_DATABASE: u32 = 0x0000_0200;
    pub const ALLOW_CHANGES: u32 = 0x0000_0400;
}

/// Path and mode bookkeeping values
pub mod path {
    /// `DISPLAYCONFIG_PATH_ACTIVE`
    pub const ACTIVE: u32 = 0x0000_0001;

    /// `DISPLAYCONFIG_PATH_MODE_IDX_INVALID`
    pub const MODE_IDX_INVALID: u32 = 0xFFFF_FFFF;
}

/// Snapshot acquisition limits
pub mod acquire {
    /// Upper bound on size-query/fill-query rounds when the topology keeps
    /// changing between the two calls
    pub const MAX_QUERY_ATTEMPTS: u32 = 32;
}

/// On-disk layout
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "display-profiles";

    /// Sub-directory holding one file per profile
    pub const PROFILES_DIR: &str = "profiles";

    /// Extension of profile files
    pub const PROFILE_EXTENSION: &str = "json";

    /// Application settings file name
    pub const SETTINGS_FILENAME: &str = "settings.json";

    /// Current profile envelope version
    pub const PROFILE_FORMAT_VERSION: u32 = 1;

    /// Characters never allowed in a profile name
    pub const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
}

/// Process exit codes
pub mod exit {
    pub const SUCCESS: u8 = 0;

    /// `validate` ran but the native layer rejected the profile
    pub const REJECTED: u8 = 1;

    /// Anything else went wrong
    pub const FAILURE: u8 = 2;
}
