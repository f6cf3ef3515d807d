//! Boundary to the platform display configuration API
//!
//! Everything that talks to the native subsystem goes through
//! [`DisplayConfigApi`], so acquisition, reconciliation and submission can be
//! driven by the real backend or by a scripted fake in tests.

mod acquire;
mod error;
mod submit;
#[cfg(not(windows))]
mod unsupported;
#[cfg(windows)]
mod windows;

#[cfg(test)]
pub mod fake;

pub use acquire::acquire;
pub use error::{NativeCall, NativeError, SubmitError};
pub use submit::{SubmitMode, submit};
#[cfg(test)]
pub use submit::SubmitOutcome;

#[cfg(windows)]
use crate::constants::query;
use crate::topology::{AdapterId, Mode, Path};

/// Which paths a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Paths currently driving a monitor (used when saving)
    ActiveOnly,
    /// Every possible path, so inactive but known adapters still show up
    AllPaths,
}

impl QueryScope {
    pub fn from_active_only(active_only: bool) -> Self {
        if active_only {
            QueryScope::ActiveOnly
        } else {
            QueryScope::AllPaths
        }
    }

    #[cfg(windows)]
    pub fn flags(self) -> u32 {
        match self {
            QueryScope::ActiveOnly => query::ONLY_ACTIVE_PATHS,
            QueryScope::AllPaths => query::ALL_PATHS,
        }
    }
}

/// Element counts reported by the size query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizes {
    pub paths: u32,
    pub modes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetName {
    pub friendly_name: String,
    pub device_path: String,
}

/// Native display configuration subsystem
///
/// All calls are synchronous. The machine-wide configuration is a single
/// shared resource, so callers serialize access.
pub trait DisplayConfigApi {
    fn buffer_sizes(&self, scope: QueryScope) -> Result<BufferSizes, NativeError>;

    /// Fill arrays allocated for exactly `capacity` elements. Fails with
    /// `INSUFFICIENT_BUFFER` when the topology grew since the size query.
    fn query_config(
        &self,
        scope: QueryScope,
        capacity: BufferSizes,
    ) -> Result<(Vec<Path>, Vec<Mode>), NativeError>;

    fn set_config(&self, paths: &[Path], modes: &[Mode], flags: u32) -> Result<(), NativeError>;

    /// Stable device path of an adapter
    fn adapter_name(&self, adapter: AdapterId) -> Result<String, NativeError>;

    /// GDI device name of a source
    fn source_name(&self, adapter: AdapterId, source_id: u32) -> Result<String, NativeError>;

    fn target_name(&self, adapter: AdapterId, target_id: u32) -> Result<TargetName, NativeError>;
}

/// Backend for the platform this binary runs on
pub fn system() -> Box<dyn DisplayConfigApi> {
    #[cfg(windows)]
    {
        Box::new(windows::WindowsDisplayConfig)
    }
    #[cfg(not(windows))]
    {
        Box::new(unsupported::UnsupportedDisplayConfig)
    }
}
