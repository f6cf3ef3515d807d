//! Human-readable topology description, one line per path

use std::cmp::Ordering;

use crate::topology::{AdapterId, Path, Rational, TopologySnapshot};

/// Describe `snapshot` grouped by source adapter
///
/// Paths are ordered by their desktop origin (x, then y) so monitors read
/// left to right. Each adapter group starts with an `<adapter>:` line.
pub fn describe(snapshot: &TopologySnapshot) -> Vec<String> {
    let mut paths: Vec<&Path> = snapshot.paths.iter().collect();
    paths.sort_by(|a, b| desktop_order(snapshot, a, b));

    let mut groups: Vec<(AdapterId, Vec<&Path>)> = Vec::new();
    for p in paths {
        match groups.iter_mut().find(|(id, _)| *id == p.source.adapter_id) {
            Some((_, members)) => members.push(p),
            None => groups.push((p.source.adapter_id, vec![p])),
        }
    }

    let mut lines = Vec::new();
    for (adapter, members) in groups {
        lines.push(format!("{}:", adapter_label(snapshot, adapter)));
        for p in members {
            lines.push(path_line(snapshot, p));
        }
    }
    lines
}

fn desktop_order(snapshot: &TopologySnapshot, a: &Path, b: &Path) -> Ordering {
    let origin = |p: &Path| {
        snapshot
            .source_mode(p)
            .map(|m| (m.position.x, m.position.y))
            .unwrap_or((i32::MAX, i32::MAX))
    };
    origin(a).cmp(&origin(b))
}

fn adapter_label(snapshot: &TopologySnapshot, adapter: AdapterId) -> String {
    match snapshot.adapter_name(adapter) {
        Some(name) => name.to_string(),
        None => format!("unknown adapter {adapter}"),
    }
}

fn path_line(snapshot: &TopologySnapshot, p: &Path) -> String {
    let target = match snapshot.target(p.target.adapter_id, p.target.id) {
        Some(target) => target.to_string(),
        None => format!("target {}", p.target.id),
    };

    let mut line = format!("  {target}");
    if p.source.adapter_id != p.target.adapter_id {
        line.push_str(&format!(" ({})", adapter_label(snapshot, p.target.adapter_id)));
    }

    match snapshot.source_mode(p) {
        Some(mode) => line.push_str(&format!(
            " {}x{} offset {},{}",
            mode.width, mode.height, mode.position.x, mode.position.y
        )),
        None => line.push_str(" unknown mode"),
    }
    line.push_str(&format!(" @{}Hz", format_refresh(refresh_rate(snapshot, p))));
    line
}

/// Path refresh rate, or the target mode's vertical sync when the path leaves it unset
fn refresh_rate(snapshot: &TopologySnapshot, p: &Path) -> Rational {
    if p.target.refresh_rate.to_f64().is_some() {
        return p.target.refresh_rate;
    }
    snapshot
        .target_mode(p)
        .map(|mode| mode.signal.v_sync_freq)
        .unwrap_or(p.target.refresh_rate)
}

/// Rounded to two decimals, trailing zeros dropped
fn format_refresh(rate: Rational) -> String {
    match rate.to_f64() {
        Some(hz) => format!("{}", (hz * 100.0).round() / 100.0),
        None => "?".to_string(),
    }
}
