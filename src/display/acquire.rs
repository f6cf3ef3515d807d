//! Live snapshot acquisition
//!
//! The native query is a two-call protocol: ask for buffer sizes, then fill
//! buffers of exactly that size. A monitor plugged in between the two calls
//! makes the fill report `INSUFFICIENT_BUFFER`, in which case the whole
//! sequence starts over from the size query.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{DisplayConfigApi, NativeError, QueryScope};
use crate::constants::acquire::MAX_QUERY_ATTEMPTS;
use crate::topology::{Adapter, AdapterId, Mode, ModeKind, Path, Source, Target, TopologySnapshot};

/// Query the live topology and resolve every adapter/source/target name
pub fn acquire(api: &dyn DisplayConfigApi, active_only: bool) -> Result<TopologySnapshot, NativeError> {
    acquire_with_limit(api, active_only, MAX_QUERY_ATTEMPTS)
}

/// [`acquire`] with an explicit cap on size/fill rounds
///
/// When the cap is hit the last `INSUFFICIENT_BUFFER` error is returned.
pub fn acquire_with_limit(
    api: &dyn DisplayConfigApi,
    active_only: bool,
    max_attempts: u32,
) -> Result<TopologySnapshot, NativeError> {
    let scope = QueryScope::from_active_only(active_only);
    let (paths, modes) = query_with_retry(api, scope, max_attempts)?;
    let snapshot = resolve_names(api, paths, modes)?;

    info!(
        scope = ?scope,
        paths = snapshot.paths.len(),
        active = snapshot.active_paths().count(),
        modes = snapshot.modes.len(),
        adapters = snapshot.adapters.len(),
        "Acquired live display topology"
    );
    Ok(snapshot)
}

fn query_with_retry(
    api: &dyn DisplayConfigApi,
    scope: QueryScope,
    max_attempts: u32,
) -> Result<(Vec<Path>, Vec<Mode>), NativeError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let sizes = api.buffer_sizes(scope)?;
        debug!(attempt, paths = sizes.paths, modes = sizes.modes, "Display config buffer sizes");

        match api.query_config(scope, sizes) {
            Ok(arrays) => return Ok(arrays),
            Err(err) if err.is_transient() && attempt < max_attempts.max(1) => {
                warn!(attempt, "Display topology changed between size and fill queries, retrying");
            }
            Err(err) => return Err(err),
        }
    }
}

fn resolve_names(
    api: &dyn DisplayConfigApi,
    paths: Vec<Path>,
    modes: Vec<Mode>,
) -> Result<TopologySnapshot, NativeError> {
    let mut snapshot = TopologySnapshot::new(paths, modes, BTreeMap::new());

    for id in snapshot.referenced_adapter_ids() {
        let name = api.adapter_name(id)?;
        debug!(adapter = %id, name = %name, "Resolved adapter name");
        snapshot.adapters.insert(id, Adapter::new(name));
    }

    let mut sources: Vec<(AdapterId, u32)> = snapshot
        .paths
        .iter()
        .map(|p| (p.source.adapter_id, p.source.id))
        .collect();
    let mut targets: Vec<(AdapterId, u32)> = snapshot
        .paths
        .iter()
        .map(|p| (p.target.adapter_id, p.target.id))
        .collect();
    for mode in &snapshot.modes {
        match mode.info {
            ModeKind::Source(_) => sources.push((mode.adapter_id, mode.id)),
            ModeKind::Target(_) => targets.push((mode.adapter_id, mode.id)),
        }
    }

    for (adapter_id, source_id) in sources {
        let Some(adapter) = snapshot.adapters.get_mut(&adapter_id) else {
            continue;
        };
        if adapter.sources.contains_key(&source_id) {
            continue;
        }
        let gdi_name = api.source_name(adapter_id, source_id)?;
        adapter.sources.insert(source_id, Source { gdi_name });
    }

    for (adapter_id, target_id) in targets {
        let Some(adapter) = snapshot.adapters.get_mut(&adapter_id) else {
            continue;
        };
        if adapter.targets.contains_key(&target_id) {
            continue;
        }
        let names = api.target_name(adapter_id, target_id)?;
        adapter.targets.insert(
            target_id,
            Target {
                friendly_name: names.friendly_name,
                device_path: names.device_path,
            },
        );
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::status;
    use crate::display::NativeCall;
    use crate::display::fake::FakeDisplayConfig;
    use crate::topology::fixtures::SnapshotBuilder;

    fn machine() -> FakeDisplayConfig {
        FakeDisplayConfig::new(
            SnapshotBuilder::new()
                .adapter(10, "AdapterA")
                .adapter(20, "AdapterB")
                .path((10, 0), (20, 0))
                .path((10, 1), (10, 3))
                .inactive_path((20, 1), (20, 4))
                .build(),
        )
    }

    #[test]
    fn test_acquire_populates_names() {
        let api = machine();
        let snapshot = acquire(&api, false).unwrap();

        assert_eq!(snapshot.paths.len(), 3);
        assert_eq!(snapshot.adapter_name(AdapterId(10)), Some("AdapterA"));
        assert_eq!(snapshot.adapter_name(AdapterId(20)), Some("AdapterB"));

        let adapter_a = &snapshot.adapters[&AdapterId(10)];
        assert_eq!(adapter_a.sources.len(), 2);
        assert_eq!(adapter_a.targets[&3].friendly_name, "Monitor 3");

        let adapter_b = &snapshot.adapters[&AdapterId(20)];
        assert!(adapter_b.targets.contains_key(&0));
        assert!(adapter_b.targets.contains_key(&4));
        assert_eq!(snapshot.check(), Ok(()));
    }

    #[test]
    fn test_acquire_active_only_drops_inactive_paths() {
        let api = machine();
        let snapshot = acquire(&api, true).unwrap();

        assert_eq!(snapshot.paths.len(), 2);
        assert!(snapshot.paths.iter().all(|p| p.is_active()));
        assert_eq!(snapshot.modes.len(), 4);
        assert_eq!(snapshot.check(), Ok(()));
        // Target 4 only hangs off the inactive path
        assert!(!snapshot.adapters[&AdapterId(20)].targets.contains_key(&4));
    }

    #[test]
    fn test_acquire_is_idempotent_without_changes() {
        let api = machine();
        let first = acquire(&api, false).unwrap();
        let second = acquire(&api, false).unwrap();

        assert_eq!(first.adapters, second.adapters);
        for path in &first.paths {
            assert!(second.paths.contains(path));
        }
        for mode in &first.modes {
            assert!(second.modes.contains(mode));
        }
        assert_eq!(first.paths.len(), second.paths.len());
        assert_eq!(first.modes.len(), second.modes.len());
    }

    #[test]
    fn test_retry_after_single_hotplug() {
        let api = machine();
        // A monitor appears between the first size query and the fill
        api.hotplug_after_size_query(|live| {
            let extra = SnapshotBuilder::new()
                .adapter(20, "AdapterB")
                .path((20, 2), (20, 5))
                .build();
            let offset = live.modes.len() as u32;
            for mut path in extra.paths {
                path.source.mode_info_idx += offset;
                path.target.mode_info_idx += offset;
                live.paths.push(path);
            }
            live.modes.extend(extra.modes);
            let adapter = live.adapters.get_mut(&AdapterId(20)).unwrap();
            adapter.sources.extend(extra.adapters[&AdapterId(20)].sources.clone());
            adapter.targets.extend(extra.adapters[&AdapterId(20)].targets.clone());
        });

        let snapshot = acquire(&api, false).unwrap();

        assert_eq!(api.size_queries(), 2);
        // Sized by the second round, which saw the new monitor
        assert_eq!(snapshot.paths.len(), 4);
        assert_eq!(snapshot.modes.len(), 8);
        assert_eq!(snapshot.adapters[&AdapterId(20)].targets[&5].friendly_name, "Monitor 5");
    }

    #[test]
    fn test_retry_gives_up_under_continuous_churn() {
        let api = machine();
        api.set_churn(true);

        let err = acquire_with_limit(&api, false, 3).unwrap_err();

        assert_eq!(err, NativeError::new(NativeCall::QueryConfig, status::INSUFFICIENT_BUFFER));
        assert_eq!(api.size_queries(), 3);
    }

    #[test]
    fn test_fatal_size_query_error_is_not_retried() {
        let api = machine();
        api.fail_call(NativeCall::BufferSizes, status::ACCESS_DENIED);

        let err = acquire(&api, true).unwrap_err();

        assert_eq!(err.code, status::ACCESS_DENIED);
        assert_eq!(api.size_queries(), 1);
    }

    #[test]
    fn test_fatal_fill_error_is_not_retried() {
        let api = machine();
        api.fail_call(NativeCall::QueryConfig, status::GEN_FAILURE);

        let err = acquire(&api, true).unwrap_err();

        assert_eq!(err, NativeError::new(NativeCall::QueryConfig, status::GEN_FAILURE));
        assert_eq!(api.size_queries(), 1);
    }

    #[test]
    fn test_adapter_name_failure_surfaces() {
        let api = machine();
        api.fail_call(NativeCall::AdapterName, status::INVALID_PARAMETER);

        let err = acquire(&api, false).unwrap_err();
        assert_eq!(err.call, NativeCall::AdapterName);
    }

    #[test]
    fn test_invalid_adapter_ids_are_not_resolved() {
        let api = machine();
        api.edit_live(|live| {
            live.paths[2].source.adapter_id = AdapterId::INVALID;
            live.paths[2].source.mode_info_idx = crate::constants::path::MODE_IDX_INVALID;
        });

        let snapshot = acquire(&api, false).unwrap();
        assert!(!snapshot.adapters.contains_key(&AdapterId::INVALID));
    }
}
