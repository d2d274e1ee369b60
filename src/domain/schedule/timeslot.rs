use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::utils::id::{JobId, NodeName, ReservationId};

/// Exclusive commitment of one node to one job for a time range inside a single timeslot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub node: NodeName,
    pub job_id: JobId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Reservation {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// One hour of the scheduling horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeslot {
    /// Inclusive start of the slot.
    pub start: DateTime<Utc>,

    /// Exclusive end of the slot.
    pub end: DateTime<Utc>,

    /// Grid carbon intensity (gCO2-eq/kWh) expected or observed during the slot.
    pub gci: f64,

    /// All reservations inside this slot, keyed by their process-unique id.
    /// Different nodes may be reserved concurrently, one node never twice for overlapping ranges.
    pub reservations: BTreeMap<ReservationId, Reservation>,
}

impl Timeslot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, gci: f64) -> Self {
        Timeslot { start, end, gci, reservations: BTreeMap::new() }
    }

    /// Timeslot covering exactly one hour starting at `start`.
    pub fn hourly(start: DateTime<Utc>, gci: f64) -> Self {
        Timeslot::new(start, start + Duration::hours(1), gci)
    }

    /// Checks whether `node` could be reserved for `[start, end)` inside this slot.
    pub fn is_node_free(&self, node: &NodeName, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start < self.start || end > self.end || start >= end {
            return false;
        }

        !self.reservations.values().any(|reservation| &reservation.node == node && reservation.overlaps(start, end))
    }

    /// Reserves `node` exclusively for `job_id` during `[start, end)`.
    ///
    /// # Returns
    /// The id of the new reservation, or `None` if the range leaves the slot bounds or the node
    /// already holds an overlapping reservation.
    pub fn allocate_exclusive(&mut self, job_id: &JobId, node: &NodeName, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<ReservationId> {
        if !self.is_node_free(node, start, end) {
            log::trace!("Node {} is not available in timeslot {} for job {}.", node, self.start, job_id);
            return None;
        }

        let reservation_id = ReservationId::generate();
        self.reservations.insert(reservation_id.clone(), Reservation { node: node.clone(), job_id: job_id.clone(), start, end });

        Some(reservation_id)
    }

    /// Reserves `node` for the whole slot.
    pub fn allocate_node(&mut self, job_id: &JobId, node: &NodeName) -> Option<ReservationId> {
        self.allocate_exclusive(job_id, node, self.start, self.end)
    }

    /// Removes every reservation of `job_id` from this slot.
    ///
    /// # Returns
    /// `true` if at least one reservation was removed.
    pub fn remove(&mut self, job_id: &JobId) -> bool {
        let before = self.reservations.len();
        self.reservations.retain(|_, reservation| &reservation.job_id != job_id);

        if before == self.reservations.len() {
            log::debug!("Job {} holds no reservation in timeslot {}.", job_id, self.start);
            return false;
        }

        true
    }

    /// Coarse pruning signal: true once any reservation exists in this slot.
    pub fn is_full(&self) -> bool {
        !self.reservations.is_empty()
    }

    /// True if every node of `nodes` already holds a reservation in this slot, so no candidate
    /// could take it.
    pub fn is_exhausted<'a>(&self, nodes: impl IntoIterator<Item = &'a NodeName>) -> bool {
        if !self.is_full() {
            return false;
        }

        nodes.into_iter().all(|node| self.reservations.values().any(|reservation| &reservation.node == node))
    }

    pub fn get_reservation(&self, job_id: &JobId) -> Option<&Reservation> {
        self.reservations.values().find(|reservation| &reservation.job_id == job_id)
    }

    pub fn reserved_nodes(&self) -> Vec<&NodeName> {
        self.reservations.values().map(|reservation| &reservation.node).collect()
    }
}
