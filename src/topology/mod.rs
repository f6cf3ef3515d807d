//! Display topology model
//!
//! A snapshot of adapters, sources, targets and the paths/modes that wire
//! them together, as reported by (or destined for) the display
//! configuration API.

pub mod invariants;
pub mod model;

#[cfg(test)]
pub mod fixtures;

pub use invariants::TopologyError;
pub use model::{Adapter, AdapterId, Mode, ModeKind, Path, Rational, Source, Target, TopologySnapshot};
#[cfg(windows)]
pub use model::{PathSource, PathTarget, Point, Region, SourceMode, TargetMode, VideoSignalInfo};
