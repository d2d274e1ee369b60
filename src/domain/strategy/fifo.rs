use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::schedule::timetable::Timetable;
use crate::domain::strategy::planning_strategy::{Allocation, try_window};
use crate::domain::utils::id::JobId;

/// Carbon agnostic baseline: earliest window first, nodes in resolver order.
pub fn allocate(job_id: &JobId, hours: usize, timetable: &mut Timetable, nodes: &[NodeInfo]) -> Option<Allocation> {
    for window in timetable.windows(hours) {
        let exhausted = timetable.timeslots[window.clone()].iter().any(|slot| slot.is_exhausted(nodes.iter().map(|node| &node.name)));
        if exhausted {
            continue;
        }

        if let Some(allocation) = try_window(timetable, &window, job_id, nodes.iter().map(|node| &node.name)) {
            return Some(allocation);
        }
    }

    None
}
