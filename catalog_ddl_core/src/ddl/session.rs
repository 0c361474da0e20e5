use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

use crate::catalog::{ObjectId, ObjectKind};
use crate::error::{DdlError, DdlResult};

use super::action::ActionKind;
use super::deferred::DeferredError;

/// Per-statement scheduling state. Every touched object sits in exactly one
/// of `scheduling`, `transit` or `validated`; insertion order is discovery
/// order and is kept from round to round. `transit` is stored back to front
/// so the next object pops off its end.
#[derive(Debug, Default)]
pub struct ValidationSession {
    scheduling: IndexMap<ObjectId, ActionKind>,
    transit: Option<IndexMap<ObjectId, ActionKind>>,
    validated: IndexMap<ObjectId, ActionKind>,
    delete_queue: VecDeque<(ObjectId, ObjectKind)>,
    /// Dependents of a replaced element, validated again from scratch.
    revalidating: IndexSet<ObjectId>,
    deferred: Option<DeferredError>,
}

impl ValidationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletion overrides whatever else is pending for the object.
    pub fn schedule_deletion(&mut self, id: ObjectId) {
        if let Some(transit) = self.transit.as_mut() {
            transit.shift_remove(&id);
        }
        self.validated.shift_remove(&id);
        self.scheduling.insert(id, ActionKind::Deletion);
    }

    /// Schedules creation or modification unless the object is already
    /// tracked. Returns whether anything was scheduled.
    pub fn schedule_modification(&mut self, id: ObjectId, is_new: bool) -> bool {
        if self.contains(id) {
            return false;
        }
        let action = if is_new {
            ActionKind::Creation
        } else {
            ActionKind::Modification
        };
        self.scheduling.insert(id, action);
        true
    }

    pub fn schedule_truncation(&mut self, id: ObjectId) -> DdlResult<()> {
        if self.contains(id) {
            return Err(DdlError::Internal(format!(
                "{id} is already scheduled in this statement"
            )));
        }
        self.scheduling.insert(id, ActionKind::Truncation);
        Ok(())
    }

    /// Queues a dependent of a replaced element for full definition checks,
    /// overriding anything but a deletion. Each object is queued once.
    pub fn schedule_revalidation(&mut self, id: ObjectId) -> bool {
        if self.action_of(id) == Some(ActionKind::Deletion) || !self.revalidating.insert(id) {
            return false;
        }
        if let Some(transit) = self.transit.as_mut() {
            transit.shift_remove(&id);
        }
        self.validated.shift_remove(&id);
        self.scheduling.insert(id, ActionKind::Creation);
        true
    }

    pub fn revalidating(&self) -> &IndexSet<ObjectId> {
        &self.revalidating
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.action_of(id).is_some()
    }

    /// Action recorded for the object in whichever set holds it.
    pub fn action_of(&self, id: ObjectId) -> Option<ActionKind> {
        self.scheduling
            .get(&id)
            .or_else(|| self.transit.as_ref().and_then(|t| t.get(&id)))
            .or_else(|| self.validated.get(&id))
            .copied()
    }

    pub fn scheduled_action(&self, id: ObjectId) -> Option<ActionKind> {
        self.scheduling.get(&id).copied()
    }

    /// Scheduled or in transit, i.e. not validated yet.
    pub fn is_pending(&self, id: ObjectId) -> bool {
        self.scheduling.contains_key(&id)
            || self.transit.as_ref().is_some_and(|t| t.contains_key(&id))
    }

    pub fn scheduling(&self) -> &IndexMap<ObjectId, ActionKind> {
        &self.scheduling
    }

    pub fn transit(&self) -> Option<&IndexMap<ObjectId, ActionKind>> {
        self.transit.as_ref()
    }

    pub fn validated(&self) -> &IndexMap<ObjectId, ActionKind> {
        &self.validated
    }

    /// Moves everything scheduled into transit; new work lands in a fresh map.
    pub(crate) fn begin_round(&mut self) {
        let mut round = std::mem::take(&mut self.scheduling);
        round.reverse();
        self.transit = Some(round);
    }

    pub(crate) fn next_in_transit(&mut self) -> Option<(ObjectId, ActionKind)> {
        self.transit.as_mut()?.pop()
    }

    pub(crate) fn end_round(&mut self) {
        self.transit = None;
    }

    pub(crate) fn mark_validated(&mut self, id: ObjectId, action: ActionKind) {
        self.validated.insert(id, action);
    }

    /// Undoes the pre-mark and queues the object for the next round.
    pub(crate) fn reschedule(&mut self, id: ObjectId, action: ActionKind) {
        self.validated.shift_remove(&id);
        self.scheduling.insert(id, action);
    }

    /// The queue may hold an object twice; the cascade loop skips repeats.
    pub(crate) fn enqueue_delete(&mut self, id: ObjectId, kind: ObjectKind) {
        self.delete_queue.push_back((id, kind));
    }

    pub(crate) fn pop_delete(&mut self) -> Option<(ObjectId, ObjectKind)> {
        self.delete_queue.pop_front()
    }

    pub fn delete_queue_len(&self) -> usize {
        self.delete_queue.len()
    }

    /// Only the first deferred error is kept.
    pub(crate) fn defer(&mut self, error: DeferredError) {
        if self.deferred.is_none() {
            self.deferred = Some(error);
        }
    }

    pub(crate) fn take_deferred(&mut self) -> Option<DeferredError> {
        self.deferred.take()
    }

    pub fn deferred(&self) -> Option<&DeferredError> {
        self.deferred.as_ref()
    }
}
