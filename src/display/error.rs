use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

use crate::constants::status;
use crate::topology::TopologyError;

/// Native entry point that produced a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCall {
    BufferSizes,
    QueryConfig,
    SetConfig,
    AdapterName,
    SourceName,
    TargetName,
}

impl fmt::Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeCall::BufferSizes => "GetDisplayConfigBufferSizes",
            NativeCall::QueryConfig => "QueryDisplayConfig",
            NativeCall::SetConfig => "SetDisplayConfig",
            NativeCall::AdapterName => "DisplayConfigGetDeviceInfo(adapter name)",
            NativeCall::SourceName => "DisplayConfigGetDeviceInfo(source name)",
            NativeCall::TargetName => "DisplayConfigGetDeviceInfo(target name)",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Retried internally by acquisition, never surfaced on its own
    Transient,
    Fatal,
}

/// Non-zero status from a native display configuration call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{call} failed: {} (status {code})", status_message(.code))]
pub struct NativeError {
    pub call: NativeCall,
    pub code: i32,
}

impl NativeError {
    pub fn new(call: NativeCall, code: i32) -> Self {
        Self { call, code }
    }

    pub fn category(&self) -> ErrorCategory {
        if self.code == status::INSUFFICIENT_BUFFER {
            ErrorCategory::Transient
        } else {
            ErrorCategory::Fatal
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn message(&self) -> Cow<'static, str> {
        status_message(&self.code)
    }
}

/// Map a status code to `Ok` / typed error
#[cfg(any(windows, test))]
pub fn check_status(call: NativeCall, code: i32) -> Result<(), NativeError> {
    if code == status::SUCCESS {
        Ok(())
    } else {
        Err(NativeError::new(call, code))
    }
}

fn status_message(code: &i32) -> Cow<'static, str> {
    match *code {
        status::SUCCESS => "success".into(),
        status::ACCESS_DENIED => "access denied (no access to the console session)".into(),
        status::GEN_FAILURE => "the display driver reported an unspecified failure".into(),
        status::NOT_SUPPORTED => "display configuration is not supported on this system".into(),
        status::INVALID_PARAMETER => "the supplied paths, modes or flags are invalid".into(),
        status::INSUFFICIENT_BUFFER => "the display topology changed while it was being queried".into(),
        status::BAD_CONFIGURATION => "the display configuration cannot be applied on this hardware".into(),
        other => format!("native error {other}").into(),
    }
}

/// Failure of a validate/apply submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The native setter refused the configuration
    #[error(transparent)]
    Rejected(#[from] NativeError),

    /// The snapshot was never handed to the native setter
    #[error("topology cannot be submitted: {0}")]
    Malformed(#[from] TopologyError),
}

impl SubmitError {
    pub fn native_code(&self) -> Option<i32> {
        match self {
            SubmitError::Rejected(err) => Some(err.code),
            SubmitError::Malformed(_) => None,
        }
    }
}
