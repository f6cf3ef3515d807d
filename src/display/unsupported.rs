//! Backend for platforms without a display configuration API
//!
//! Every native call answers `ERROR_NOT_SUPPORTED`, so profile management
//! commands still work and the native ones fail with a clear message.

use super::{BufferSizes, DisplayConfigApi, NativeCall, NativeError, QueryScope, TargetName};
use crate::constants::status;
use crate::topology::{AdapterId, Mode, Path};

pub struct UnsupportedDisplayConfig;

fn unsupported<T>(call: NativeCall) -> Result<T, NativeError> {
    Err(NativeError::new(call, status::NOT_SUPPORTED))
}

impl DisplayConfigApi for UnsupportedDisplayConfig {
    fn buffer_sizes(&self, _scope: QueryScope) -> Result<BufferSizes, NativeError> {
        unsupported(NativeCall::BufferSizes)
    }

    fn query_config(
        &self,
        _scope: QueryScope,
        _capacity: BufferSizes,
    ) -> Result<(Vec<Path>, Vec<Mode>), NativeError> {
        unsupported(NativeCall::QueryConfig)
    }

    fn set_config(&self, _paths: &[Path], _modes: &[Mode], _flags: u32) -> Result<(), NativeError> {
        unsupported(NativeCall::SetConfig)
    }

    fn adapter_name(&self, _adapter: AdapterId) -> Result<String, NativeError> {
        unsupported(NativeCall::AdapterName)
    }

    fn source_name(&self, _adapter: AdapterId, _source_id: u32) -> Result<String, NativeError> {
        unsupported(NativeCall::SourceName)
    }

    fn target_name(&self, _adapter: AdapterId, _target_id: u32) -> Result<TargetName, NativeError> {
        unsupported(NativeCall::TargetName)
    }
}
