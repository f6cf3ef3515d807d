//! Validate / apply a topology through the native setter

use tracing::{debug, error, info};

use super::{DisplayConfigApi, SubmitError};
use crate::constants::set;
use crate::topology::TopologySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Dry run: every feasibility check, nothing committed
    Validate,
    /// Commit, persist to the platform database, allow minor adjustments
    Apply,
}

impl SubmitMode {
    pub fn flags(self) -> u32 {
        match self {
            SubmitMode::Validate => set::VALIDATE | set::USE_SUPPLIED_DISPLAY_CONFIG | set::ALLOW_CHANGES,
            SubmitMode::Apply => {
                set::APPLY | set::USE_SUPPLIED_DISPLAY_CONFIG | set::ALLOW_CHANGES | set::SAVE_TO_DATABASE
            }
        }
    }
}

/// Successful end state of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validate succeeded: the configuration would commit
    Feasible,
    /// Apply succeeded: the configuration is installed
    Committed,
}

/// Hand the snapshot's paths and modes to the native setter
///
/// The snapshot is checked first; a snapshot with dangling adapter or mode
/// links is refused as [`SubmitError::Malformed`] without a native call.
/// Application is all-or-nothing on the native side.
pub fn submit(
    api: &dyn DisplayConfigApi,
    snapshot: &TopologySnapshot,
    mode: SubmitMode,
) -> Result<SubmitOutcome, SubmitError> {
    if let Err(err) = snapshot.check() {
        error!(mode = ?mode, error = %err, "Refusing to submit malformed topology");
        return Err(SubmitError::Malformed(err));
    }

    debug!(
        mode = ?mode,
        flags = mode.flags(),
        paths = snapshot.paths.len(),
        modes = snapshot.modes.len(),
        "Submitting display configuration"
    );

    match api.set_config(&snapshot.paths, &snapshot.modes, mode.flags()) {
        Ok(()) => {
            let outcome = match mode {
                SubmitMode::Validate => SubmitOutcome::Feasible,
                SubmitMode::Apply => SubmitOutcome::Committed,
            };
            info!(mode = ?mode, outcome = ?outcome, "Display configuration accepted");
            Ok(outcome)
        }
        Err(err) => {
            error!(mode = ?mode, code = err.code, error = %err, "Display configuration rejected");
            Err(SubmitError::Rejected(err))
        }
    }
}
