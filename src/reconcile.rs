//! Adapter identity reconciliation
//!
//! Adapter ids are volatile; the adapter's device path is not. A stored
//! snapshot is made applicable again by looking each stored adapter up by
//! name on the live machine and rewriting its id everywhere it appears.
//!
//! Matching is adapter-level only. Source and target ids are assumed to stay
//! put for as long as their adapter matches by name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use tracing::{debug, info, warn};

use crate::display::{self, DisplayConfigApi, NativeError};
use crate::topology::{AdapterId, TopologySnapshot};

/// Outcome of reconciling a stored snapshot against the live machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Stored snapshot with every matched adapter id rewritten to its live value
    pub snapshot: TopologySnapshot,
    /// Stable names of stored adapters with no live counterpart
    pub missing: BTreeSet<String>,
    /// Monitors each missing adapter drove, taken from the stored snapshot
    /// before any id was rewritten
    pub missing_targets: BTreeMap<String, Vec<String>>,
    /// Stored id -> live id for every matched adapter
    pub mapping: BTreeMap<AdapterId, AdapterId>,
}

impl Reconciliation {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Missing adapters together with the monitors they used to drive
    ///
    /// `None` when nothing is missing.
    pub fn missing_adapters_message(&self) -> Option<String> {
        if self.missing.is_empty() {
            return None;
        }

        let mut message = String::from("The following display adapters are not present:");
        for name in &self.missing {
            let monitors = self.missing_targets.get(name).map(Vec::as_slice).unwrap_or_default();

            let _ = write!(message, "\n  {name}");
            if !monitors.is_empty() {
                let _ = write!(message, " (monitors: {})", monitors.join(", "));
            }
        }
        Some(message)
    }
}

/// Acquire the live topology (all paths) and reconcile `stored` against it
///
/// Only acquisition failures are errors; missing adapters are reported in
/// [`Reconciliation::missing`].
pub fn reconcile(api: &dyn DisplayConfigApi, stored: &TopologySnapshot) -> Result<Reconciliation, NativeError> {
    let live = display::acquire(api, false)?;
    Ok(reconcile_against(stored, &live))
}

/// Rewrite `stored`'s adapter ids to match `live`
pub fn reconcile_against(stored: &TopologySnapshot, live: &TopologySnapshot) -> Reconciliation {
    let lookup = live_lookup(live);
    let mut mapping = BTreeMap::new();
    let mut missing = BTreeSet::new();
    let mut missing_targets: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for stored_id in stored.referenced_adapter_ids() {
        let Some(name) = stored.adapter_name(stored_id) else {
            warn!(adapter = %stored_id, "Stored adapter id has no adapter entry, leaving it unchanged");
            continue;
        };

        match lookup.get(name) {
            Some(&live_id) => {
                debug!(adapter = %name, stored = %stored_id, live = %live_id, "Matched adapter");
                mapping.insert(stored_id, live_id);
            }
            None => {
                warn!(adapter = %name, id = %stored_id, "Adapter not found on this machine");
                missing.insert(name.to_string());
                if let Some(adapter) = stored.adapters.get(&stored_id) {
                    missing_targets
                        .entry(name.to_string())
                        .or_default()
                        .extend(adapter.targets.values().map(ToString::to_string));
                }
            }
        }
    }

    // A missing adapter keeps its stored id, which may now belong to a matched one
    for (stored_id, live_id) in &mapping {
        let Some(name) = stored.adapter_name(*live_id) else {
            continue;
        };
        if *stored_id != *live_id && missing.contains(name) {
            warn!(
                adapter = %name,
                id = %live_id,
                matched = %stored_id,
                "Missing adapter id collides with a matched adapter's live id"
            );
        }
    }

    let mut snapshot = stored.clone();
    snapshot.rewrite_adapter_ids(&mapping);

    for violation in snapshot.check_mode_links() {
        warn!(error = %violation, "Mode link broken after adapter rewrite");
    }

    info!(
        matched = mapping.len(),
        missing = missing.len(),
        "Reconciled stored topology against live adapters"
    );
    Reconciliation {
        snapshot,
        missing,
        missing_targets,
        mapping,
    }
}

/// Stable name -> live id, first match in enumeration order wins
fn live_lookup(live: &TopologySnapshot) -> HashMap<&str, AdapterId> {
    let enumeration_order = live
        .referenced_adapter_ids()
        .into_iter()
        .chain(live.adapters.keys().copied())
        .filter(|id| id.is_valid());

    let mut lookup = HashMap::new();
    for id in enumeration_order {
        let Some(name) = live.adapter_name(id) else {
            continue;
        };
        let chosen = *lookup.entry(name).or_insert(id);
        if chosen != id {
            debug!(adapter = %name, chosen = %chosen, ignored = %id, "Ambiguous adapter name");
        }
    }
    lookup
}
