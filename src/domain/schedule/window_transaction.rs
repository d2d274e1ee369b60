use std::ops::Range;

use crate::domain::schedule::timetable::Timetable;
use crate::domain::utils::id::{JobId, NodeName, ReservationId};

/// Reservation of one node over a window of timeslots, staged before it touches the timetable.
///
/// Every slot of the window is checked first; the timetable is only mutated by [`commit`] once
/// the whole window accepted the node. A rejected window therefore never leaves partial
/// reservations behind.
///
/// [`commit`]: WindowTransaction::commit
#[derive(Debug)]
pub struct WindowTransaction<'a> {
    timetable: &'a mut Timetable,
    window: Range<usize>,
    job_id: &'a JobId,
    node: &'a NodeName,
    staged: Vec<usize>,
}

impl<'a> WindowTransaction<'a> {
    pub fn new(timetable: &'a mut Timetable, window: Range<usize>, job_id: &'a JobId, node: &'a NodeName) -> Self {
        WindowTransaction { timetable, window, job_id, node, staged: Vec::new() }
    }

    /// Stages every slot of the window.
    ///
    /// # Returns
    /// `false` as soon as one slot can't take the node, `true` if the whole window is staged.
    pub fn stage(&mut self) -> bool {
        if self.window.end > self.timetable.len() || self.window.is_empty() {
            return false;
        }

        for index in self.window.clone() {
            let slot = &self.timetable.timeslots[index];
            if !slot.is_node_free(self.node, slot.start, slot.end) {
                self.staged.clear();
                return false;
            }
            self.staged.push(index);
        }

        true
    }

    /// Writes the staged reservations into the timetable.
    ///
    /// # Returns
    /// The ids of the new reservations, or `None` if the window was not fully staged. If a slot
    /// rejects its reservation at this point the already written ones are removed again.
    pub fn commit(self) -> Option<Vec<ReservationId>> {
        if self.staged.len() != self.window.len() {
            return None;
        }

        let mut reservation_ids = Vec::with_capacity(self.staged.len());

        for index in &self.staged {
            match self.timetable.timeslots[*index].allocate_node(self.job_id, self.node) {
                Some(reservation_id) => reservation_ids.push(reservation_id),
                None => {
                    log::error!("Staged timeslot {} rejected job {} on node {}; discarding the window.", index, self.job_id, self.node);
                    for written in &self.staged[..reservation_ids.len()] {
                        self.timetable.timeslots[*written].remove(self.job_id);
                    }
                    return None;
                }
            }
        }

        Some(reservation_ids)
    }
}

/// Reserves `node` for `job_id` over the whole `window` or not at all.
pub fn reserve_window(timetable: &mut Timetable, window: Range<usize>, job_id: &JobId, node: &NodeName) -> bool {
    let mut transaction = WindowTransaction::new(timetable, window, job_id, node);

    transaction.stage() && transaction.commit().is_some()
}
