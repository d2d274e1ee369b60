use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::strategy::planning_strategy::{Allocation, try_window};
use crate::domain::strategy::tdp_pools::TdpPools;
use crate::domain::utils::id::JobId;

/// Load balanced spatial shifting.
///
/// The horizon is split into segments at the pool markers. Segment `k` covers the window starts
/// `[marker_k, marker_k+1)` (the last one runs to the end of the horizon) and may use the pools
/// `0..=k`, so expensive nodes only take work that would otherwise be delayed too far. Windows of
/// a segment are scanned chronologically, each one offered to the cheaper pools first. Nodes
/// without TDP information are the fallback over the whole horizon.
pub fn allocate(job_id: &JobId, hours: usize, timetable: &mut Timetable, nodes: &[NodeInfo], uses_gpu: bool, balance_grade: f64) -> Option<Allocation> {
    let pools = TdpPools::new(nodes, uses_gpu);
    let windows = timetable.windows(hours);
    if windows.is_empty() {
        return None;
    }

    let max_start = windows.len() - 1;
    let markers = pools.markers(balance_grade, max_start);

    for (segment, segment_start) in markers.iter().enumerate() {
        let segment_end = markers.get(segment + 1).copied().unwrap_or(max_start + 1);
        let segment_windows = &windows[*segment_start..segment_end.max(*segment_start)];

        let usable = &pools.pools[..=segment];

        for window in segment_windows {
            if let Some(allocation) = try_window(timetable, window, job_id, usable.iter().flat_map(|pool| pool.nodes.iter())) {
                return Some(allocation);
            }
        }
    }

    windows.iter().find_map(|window| try_window(timetable, window, job_id, &pools.blackbox))
}
