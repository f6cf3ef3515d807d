//! Scripted in-memory display subsystem for unit tests
//!
//! Holds a "live" topology and answers the native calls from it. Hot-plug
//! events can be queued to fire between the size query and the fill, and
//! `set_config` applies the same feasibility rule for validate and apply.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use super::{BufferSizes, DisplayConfigApi, NativeCall, NativeError, QueryScope, TargetName};
use crate::constants::{path, set, status};
use crate::topology::{AdapterId, Mode, Path, TopologySnapshot};

type Hotplug = Box<dyn FnOnce(&mut TopologySnapshot)>;

pub struct FakeDisplayConfig {
    live: RefCell<TopologySnapshot>,
    hotplugs: RefCell<VecDeque<Hotplug>>,
    churn: Cell<bool>,
    failures: RefCell<BTreeMap<&'static str, i32>>,
    size_queries: Cell<u32>,
    submissions: RefCell<Vec<u32>>,
    committed: RefCell<Option<(Vec<Path>, Vec<Mode>)>>,
}

impl FakeDisplayConfig {
    pub fn new(live: TopologySnapshot) -> Self {
        Self {
            live: RefCell::new(live),
            hotplugs: RefCell::new(VecDeque::new()),
            churn: Cell::new(false),
            failures: RefCell::new(BTreeMap::new()),
            size_queries: Cell::new(0),
            submissions: RefCell::new(Vec::new()),
            committed: RefCell::new(None),
        }
    }

    /// Mutate the live topology after the next size query
    pub fn hotplug_after_size_query(&self, change: impl FnOnce(&mut TopologySnapshot) + 'static) {
        self.hotplugs.borrow_mut().push_back(Box::new(change));
    }

    /// Make every fill report `INSUFFICIENT_BUFFER`
    pub fn set_churn(&self, churn: bool) {
        self.churn.set(churn);
    }

    pub fn fail_call(&self, call: NativeCall, code: i32) {
        self.failures.borrow_mut().insert(key(call), code);
    }

    pub fn edit_live(&self, change: impl FnOnce(&mut TopologySnapshot)) {
        change(&mut *self.live.borrow_mut());
    }

    pub fn size_queries(&self) -> u32 {
        self.size_queries.get()
    }

    /// Flags of every `set_config` call, in order
    pub fn submissions(&self) -> Vec<u32> {
        self.submissions.borrow().clone()
    }

    pub fn committed(&self) -> Option<(Vec<Path>, Vec<Mode>)> {
        self.committed.borrow().clone()
    }

    fn injected(&self, call: NativeCall) -> Result<(), NativeError> {
        match self.failures.borrow().get(key(call)) {
            Some(&code) => Err(NativeError::new(call, code)),
            None => Ok(()),
        }
    }

    fn view(&self, scope: QueryScope) -> (Vec<Path>, Vec<Mode>) {
        let live = self.live.borrow();
        match scope {
            QueryScope::AllPaths => (live.paths.clone(), live.modes.clone()),
            QueryScope::ActiveOnly => {
                let mut paths = Vec::new();
                let mut modes = Vec::new();
                for p in live.active_paths() {
                    let mut p = *p;
                    p.source.mode_info_idx = relink(&live, &mut modes, p.source.mode_info_idx);
                    p.target.mode_info_idx = relink(&live, &mut modes, p.target.mode_info_idx);
                    paths.push(p);
                }
                (paths, modes)
            }
        }
    }

    fn feasible(&self, paths: &[Path], modes: &[Mode]) -> bool {
        let live = self.live.borrow();
        let submitted = TopologySnapshot::new(paths.to_vec(), modes.to_vec(), live.adapters.clone());
        submitted.check_adapters().is_empty() && submitted.check_mode_links().is_empty()
    }
}

fn key(call: NativeCall) -> &'static str {
    match call {
        NativeCall::BufferSizes => "sizes",
        NativeCall::QueryConfig => "query",
        NativeCall::SetConfig => "set",
        NativeCall::AdapterName => "adapter",
        NativeCall::SourceName => "source",
        NativeCall::TargetName => "target",
    }
}

fn relink(live: &TopologySnapshot, out: &mut Vec<Mode>, index: u32) -> u32 {
    let Some(mode) = live.mode_at(index) else {
        return path::MODE_IDX_INVALID;
    };
    match out.iter().position(|m| m == mode) {
        Some(pos) => pos as u32,
        None => {
            out.push(*mode);
            (out.len() - 1) as u32
        }
    }
}

impl DisplayConfigApi for FakeDisplayConfig {
    fn buffer_sizes(&self, scope: QueryScope) -> Result<BufferSizes, NativeError> {
        self.size_queries.set(self.size_queries.get() + 1);
        self.injected(NativeCall::BufferSizes)?;
        let (paths, modes) = self.view(scope);
        Ok(BufferSizes {
            paths: paths.len() as u32,
            modes: modes.len() as u32,
        })
    }

    fn query_config(
        &self,
        scope: QueryScope,
        capacity: BufferSizes,
    ) -> Result<(Vec<Path>, Vec<Mode>), NativeError> {
        self.injected(NativeCall::QueryConfig)?;
        if let Some(change) = self.hotplugs.borrow_mut().pop_front() {
            change(&mut *self.live.borrow_mut());
        }
        if self.churn.get() {
            return Err(NativeError::new(NativeCall::QueryConfig, status::INSUFFICIENT_BUFFER));
        }

        let (paths, modes) = self.view(scope);
        if paths.len() > capacity.paths as usize || modes.len() > capacity.modes as usize {
            return Err(NativeError::new(NativeCall::QueryConfig, status::INSUFFICIENT_BUFFER));
        }
        Ok((paths, modes))
    }

    fn set_config(&self, paths: &[Path], modes: &[Mode], flags: u32) -> Result<(), NativeError> {
        self.submissions.borrow_mut().push(flags);
        self.injected(NativeCall::SetConfig)?;

        let validate = flags & set::VALIDATE != 0;
        let apply = flags & set::APPLY != 0;
        if validate == apply || flags & set::USE_SUPPLIED_DISPLAY_CONFIG == 0 {
            return Err(NativeError::new(NativeCall::SetConfig, status::INVALID_PARAMETER));
        }
        if !self.feasible(paths, modes) {
            return Err(NativeError::new(NativeCall::SetConfig, status::BAD_CONFIGURATION));
        }
        if apply {
            *self.committed.borrow_mut() = Some((paths.to_vec(), modes.to_vec()));
        }
        Ok(())
    }

    fn adapter_name(&self, adapter: AdapterId) -> Result<String, NativeError> {
        self.injected(NativeCall::AdapterName)?;
        self.live
            .borrow()
            .adapter_name(adapter)
            .map(str::to_string)
            .ok_or(NativeError::new(NativeCall::AdapterName, status::INVALID_PARAMETER))
    }

    fn source_name(&self, adapter: AdapterId, source_id: u32) -> Result<String, NativeError> {
        self.injected(NativeCall::SourceName)?;
        self.live
            .borrow()
            .adapters
            .get(&adapter)
            .and_then(|a| a.sources.get(&source_id))
            .map(|s| s.gdi_name.clone())
            .ok_or(NativeError::new(NativeCall::SourceName, status::INVALID_PARAMETER))
    }

    fn target_name(&self, adapter: AdapterId, target_id: u32) -> Result<TargetName, NativeError> {
        self.injected(NativeCall::TargetName)?;
        self.live
            .borrow()
            .target(adapter, target_id)
            .map(|t| TargetName {
                friendly_name: t.friendly_name.clone(),
                device_path: t.device_path.clone(),
            })
            .ok_or(NativeError::new(NativeCall::TargetName, status::INVALID_PARAMETER))
    }
}
