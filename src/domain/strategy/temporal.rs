use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::strategy::planning_strategy::{Allocation, carbon_ranked_windows, try_window};
use crate::domain::utils::id::JobId;

/// Cheapest window first. Every candidate node is tried on a window before moving on.
pub fn allocate(job_id: &JobId, hours: usize, timetable: &mut Timetable, nodes: &[NodeInfo]) -> Option<Allocation> {
    carbon_ranked_windows(timetable, hours).iter().find_map(|window| try_window(timetable, window, job_id, nodes.iter().map(|node| &node.name)))
}
