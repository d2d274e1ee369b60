use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::strategy::planning_strategy::{Allocation, carbon_ranked_windows, try_window};
use crate::domain::strategy::tdp_pools::TdpPools;
use crate::domain::utils::id::JobId;

/// Combines temporal and spatial shifting.
///
/// 1. The cheapest `ceil(switch_threshold * windows)` windows are tried on the cheapest pool.
/// 2. All windows by carbon rank, every pool in TDP order per window.
/// 3. Nodes without TDP information over all windows by carbon rank.
pub fn allocate(job_id: &JobId, hours: usize, timetable: &mut Timetable, nodes: &[NodeInfo], uses_gpu: bool, switch_threshold: f64) -> Option<Allocation> {
    let pools = TdpPools::new(nodes, uses_gpu);
    let ranked = carbon_ranked_windows(timetable, hours);
    log::trace!("Spatiotemporal shifting over {} pools and {} windows.", pools.pools.len(), ranked.len());

    if let Some(cheapest) = pools.pools.first() {
        let preferred = ((switch_threshold.clamp(0.0, 1.0) * ranked.len() as f64).ceil() as usize).min(ranked.len());

        if let Some(allocation) = ranked[..preferred].iter().find_map(|window| try_window(timetable, window, job_id, &cheapest.nodes)) {
            return Some(allocation);
        }
    }

    if let Some(allocation) = ranked.iter().find_map(|window| try_window(timetable, window, job_id, pools.known_nodes())) {
        return Some(allocation);
    }

    ranked.iter().find_map(|window| try_window(timetable, window, job_id, &pools.blackbox))
}
