use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::strategy::planning_strategy::{Allocation, try_window};
use crate::domain::strategy::tdp_pools::TdpPools;
use crate::domain::utils::id::JobId;

/// Most efficient node first: every window of the cheapest known-TDP node is tried before the
/// next node. Nodes without TDP information come last.
pub fn allocate(job_id: &JobId, hours: usize, timetable: &mut Timetable, nodes: &[NodeInfo], uses_gpu: bool) -> Option<Allocation> {
    let pools = TdpPools::new(nodes, uses_gpu);
    let windows = timetable.windows(hours);

    for node in pools.known_nodes().chain(pools.blackbox.iter()) {
        if let Some(allocation) = windows.iter().find_map(|window| try_window(timetable, window, job_id, [node])) {
            return Some(allocation);
        }
    }

    None
}
