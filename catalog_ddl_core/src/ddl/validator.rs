use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::catalog::util::{
    describe, new_creation_grant, now, update_annotated_element, SYSTEM_USER_NAME,
};
use crate::catalog::{
    CatalogRepository, ChangeEvent, ChangeListener, LinkEnd, ListenerId, ObjectId, ObjectKind,
    RelationshipType, Visibility,
};
use crate::config::EngineConfig;
use crate::error::{DdlError, DdlResult};
use crate::storage::StorageEngine;

use super::action::ActionKind;
use super::deferred::DeferredError;
use super::dispatch::{DdlRegistry, HandlerContext, HandlerMethod};
use super::drop_rule::DropAction;
use super::lock::DdlLockManager;
use super::session::ValidationSession;
use super::statement::{DdlStatement, StatementContext};

/// Collects planned changes between sync points. Shared with the repository
/// through `Rc`, which also keeps the validator on the thread that built it.
#[derive(Debug, Default)]
struct ChangeInbox {
    events: RefCell<Vec<ChangeEvent>>,
}

impl ChangeListener for ChangeInbox {
    fn planned_change(&self, event: &ChangeEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

impl ChangeInbox {
    fn drain(&self) -> Vec<ChangeEvent> {
        self.events.take()
    }
}

/// Outcome of the storage-commit pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageReport {
    /// Elements made public, in discovery order.
    pub promoted: Vec<ObjectId>,
    /// Elements removed from the repository, in removal order.
    pub deleted: Vec<ObjectId>,
    /// Deletions left to their container's composite delete.
    pub subsumed: Vec<ObjectId>,
    /// Creation grants issued for new elements.
    pub grants: Vec<ObjectId>,
    /// Dependents of a replaced element that were validated again.
    pub revalidated: Vec<ObjectId>,
}

/// Change scheduler for one statement. Lives from `apply` to
/// `execute_storage` and unsubscribes when dropped.
pub struct DdlValidator<'a> {
    repo: &'a mut dyn CatalogRepository,
    storage: &'a mut dyn StorageEngine,
    registry: &'a DdlRegistry,
    locks: &'a DdlLockManager,
    config: &'a EngineConfig,
    session: ValidationSession,
    inbox: Rc<ChangeInbox>,
    subscription: Option<ListenerId>,
    drop_restrict: bool,
    /// (dropped, dependent) pairs hit by a restrict rule during the probe.
    restricted: Vec<(ObjectId, ObjectId)>,
    probe_open: bool,
    rounds: usize,
}

impl<'a> DdlValidator<'a> {
    pub fn new(
        repo: &'a mut dyn CatalogRepository,
        storage: &'a mut dyn StorageEngine,
        registry: &'a DdlRegistry,
        locks: &'a DdlLockManager,
        config: &'a EngineConfig,
    ) -> Self {
        let inbox = Rc::new(ChangeInbox::default());
        let listener: Rc<dyn ChangeListener> = inbox.clone();
        let subscription = repo.subscribe(listener);
        Self {
            repo,
            storage,
            registry,
            locks,
            config,
            session: ValidationSession::new(),
            inbox,
            subscription: Some(subscription),
            drop_restrict: false,
            restricted: Vec::new(),
            probe_open: false,
            rounds: 0,
        }
    }

    pub fn session(&self) -> &ValidationSession {
        &self.session
    }

    /// Validation rounds run by the fixpoint loop so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn statement_context(&mut self) -> StatementContext<'_> {
        StatementContext {
            repo: &mut *self.repo,
            storage: &*self.storage,
            config: self.config,
            session: &mut self.session,
        }
    }

    /// Lets the statement mutate the catalog and schedules what it touched.
    pub fn apply(&mut self, stmt: &mut dyn DdlStatement) -> DdlResult<()> {
        debug!(statement = %stmt.describe(), "applying statement");
        stmt.apply(&mut self.statement_context())?;
        self.sync_events()
    }

    /// Validates everything the statement touched. For drops the deletion
    /// probe runs in a nested transaction that is always rolled back.
    pub fn validate(&mut self, stmt: &mut dyn DdlStatement) -> DdlResult<()> {
        self.drop_restrict = stmt.is_drop_restricted();
        let target = stmt.drop_target();
        if target.is_some() {
            self.repo.begin_txn(true)?;
            self.probe_open = true;
        }
        let outcome = self.validate_statement(stmt, target);
        let closed = self.close_probe();
        outcome.and(closed)
    }

    fn validate_statement(
        &mut self,
        stmt: &mut dyn DdlStatement,
        target: Option<ObjectId>,
    ) -> DdlResult<()> {
        stmt.pre_validate(&mut self.statement_context())?;
        self.sync_events()?;
        self.check_deferred()?;

        if let Some(target) = target {
            self.check_in_use(target);
            self.resolve_cascades(true)?;
            self.check_restricted();
            // Objects come back; their ids stay scheduled for deletion.
            self.close_probe()?;
        }
        self.check_deferred()?;

        let replacement = stmt.replacing();
        if let Some(created) = replacement {
            if let Some(old) = self.find_duplicate(created) {
                self.delete_replacement_target(old, created)?;
            }
        }

        self.run_fixpoint()?;
        if let Some(created) = replacement {
            self.check_replacement_cycle(created)?;
        }
        self.check_deferred()
    }

    fn resolve_cascades(&mut self, check_in_use: bool) -> DdlResult<()> {
        while let Some((id, kind)) = self.session.pop_delete() {
            if self.repo.lookup(id).is_none() {
                continue;
            }
            if self.session.action_of(id) == Some(ActionKind::Deletion) {
                continue;
            }
            if check_in_use {
                self.check_in_use(id);
            }
            debug!(object = %id, kind = kind.label(), "probing cascaded deletion");
            self.repo.delete(id)?;
            self.sync_events()?;
        }
        Ok(())
    }

    /// Sibling of `created` with the same name and kind.
    fn find_duplicate(&self, created: ObjectId) -> Option<ObjectId> {
        let target = self.repo.lookup(created)?;
        let container = self.repo.lookup(target.container?)?;
        container.owned.iter().copied().find(|id| {
            *id != created
                && self.repo.lookup(*id).is_some_and(|o| {
                    o.kind == target.kind && o.name.eq_ignore_ascii_case(&target.name)
                })
        })
    }

    /// Elements that depend on `id` or on anything it owns.
    fn dependents_of(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut elements = vec![id];
        if let Some(obj) = self.repo.lookup(id) {
            elements.extend(obj.owned.iter().copied());
        }
        let mut dependents = Vec::new();
        for element in elements {
            for dependent in self.repo.links_to(element, RelationshipType::ViewDependsOn) {
                if !dependents.contains(&dependent) {
                    dependents.push(dependent);
                }
            }
        }
        dependents
    }

    /// Deletes the element a CREATE OR REPLACE supersedes. Its dependents
    /// are queued for revalidation and relinked to `created` before the
    /// delete, so no restrict rule sees them.
    fn delete_replacement_target(&mut self, old: ObjectId, created: ObjectId) -> DdlResult<()> {
        if self.locks.is_object_in_use(old) {
            return Err(DdlError::ReplacedObjectInUse(describe(&*self.repo, old)));
        }
        let dependents = self.dependents_of(old);
        debug!(
            replaced = %describe(&*self.repo, old),
            dependents = dependents.len(),
            "replacing element"
        );
        for dependent in dependents.iter().filter(|d| **d != created) {
            self.session.schedule_revalidation(*dependent);
        }

        self.sync_events()?;
        for dependent in self.repo.links_to(old, RelationshipType::ViewDependsOn) {
            self.repo.unlink(RelationshipType::ViewDependsOn, dependent, old)?;
            self.repo.link(RelationshipType::ViewDependsOn, dependent, created)?;
        }
        self.inbox.drain();

        self.repo.delete(old)?;
        self.sync_events()?;
        self.resolve_cascades(false)
    }

    /// A replacement must not end up among its own transitive dependents.
    fn check_replacement_cycle(&self, root: ObjectId) -> DdlResult<()> {
        let mut reached_from: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            for dependent in self.repo.links_to(id, RelationshipType::ViewDependsOn) {
                if dependent == root {
                    let mut path = vec![id];
                    let mut cursor = id;
                    while let Some(&previous) = reached_from.get(&cursor) {
                        path.push(previous);
                        cursor = previous;
                    }
                    path.reverse();
                    let members = path.iter().map(|m| describe(&*self.repo, *m)).collect();
                    return Err(DdlError::DependencyCycle { members });
                }
                if dependent != id && !reached_from.contains_key(&dependent) {
                    reached_from.insert(dependent, id);
                    queue.push_back(dependent);
                }
            }
        }
        Ok(())
    }

    /// Dependents removed by the probe itself (owned by the dropped element
    /// or cascaded away) do not block the drop.
    fn check_restricted(&mut self) {
        for (dropped, dependent) in std::mem::take(&mut self.restricted) {
            if self.repo.lookup(dependent).is_some() {
                self.session.defer(DeferredError::DropRestrict { dropped, dependent });
            }
        }
    }

    fn close_probe(&mut self) -> DdlResult<()> {
        if !self.probe_open {
            return Ok(());
        }
        self.probe_open = false;
        self.repo.rollback_txn()?;
        self.inbox.drain();
        debug!(
            scheduled = self.session.scheduling().len(),
            "deletion probe rolled back"
        );
        Ok(())
    }

    /// Raises a deferred error once the probe is rolled back and the objects
    /// it names can be described again.
    fn check_deferred(&mut self) -> DdlResult<()> {
        let Some(deferred) = self.session.take_deferred() else {
            return Ok(());
        };
        self.close_probe()?;
        Err(deferred.materialize(&*self.repo))
    }

    fn check_in_use(&mut self, id: ObjectId) {
        if self.locks.is_object_in_use(id) {
            self.session.defer(DeferredError::ObjectInUse { id });
        }
    }

    fn run_fixpoint(&mut self) -> DdlResult<()> {
        while !self.session.scheduling().is_empty() {
            self.check_deferred()?;
            self.rounds += 1;
            self.session.begin_round();
            let mut progress = false;
            let mut stalled = Vec::new();

            while let Some((id, action)) = self.session.next_in_transit() {
                if self.repo.lookup(id).is_none() {
                    trace!(object = %id, "scheduled object no longer exists");
                    progress = true;
                    continue;
                }
                self.session.mark_validated(id, action);
                match self.dispatch_validation(id, action) {
                    Ok(()) => {
                        progress = true;
                        self.mark_private(id, action)?;
                    }
                    Err(err) if err.is_unvalidated_dependency() => {
                        trace!(object = %id, %action, "postponed to next round");
                        self.session.reschedule(id, action);
                        stalled.push(id);
                    }
                    Err(err) => {
                        self.session.end_round();
                        return Err(err);
                    }
                }
                self.sync_events()?;
            }
            self.session.end_round();

            if !progress {
                let members = stalled
                    .iter()
                    .map(|id| describe(&*self.repo, *id))
                    .collect();
                return Err(DdlError::DependencyCycle { members });
            }
        }
        debug!(rounds = self.rounds, validated = self.session.validated().len(), "fixpoint reached");
        Ok(())
    }

    fn mark_private(&mut self, id: ObjectId, action: ActionKind) -> DdlResult<()> {
        if action == ActionKind::Deletion {
            return Ok(());
        }
        let unset = self
            .repo
            .lookup(id)
            .is_some_and(|o| o.visibility == Visibility::Unset);
        if unset {
            self.repo.set_visibility(id, Visibility::Private)?;
        }
        Ok(())
    }

    fn dispatch_validation(&mut self, id: ObjectId, action: ActionKind) -> DdlResult<()> {
        let kind = self.repo.kind_of(id).ok_or(DdlError::MissingObject(id))?;
        let method = HandlerMethod::for_validation(action);
        let handlers = self.registry.handlers();
        let mut cx = HandlerContext {
            repo: &mut *self.repo,
            storage: &mut *self.storage,
            session: &self.session,
            config: self.config,
            drop_restrict: self.drop_restrict,
        };
        let handled = handlers.dispatch(method, kind, &mut cx, id)?;
        if !handled && method == HandlerMethod::ValidateModification {
            handlers.dispatch(HandlerMethod::ValidateDefinition, kind, &mut cx, id)?;
        }
        Ok(())
    }

    fn dispatch_execution(&mut self, id: ObjectId, action: ActionKind) -> DdlResult<()> {
        let kind = self.repo.kind_of(id).ok_or(DdlError::MissingObject(id))?;
        let mut cx = HandlerContext {
            repo: &mut *self.repo,
            storage: &mut *self.storage,
            session: &self.session,
            config: self.config,
            drop_restrict: self.drop_restrict,
        };
        self.registry
            .handlers()
            .dispatch(HandlerMethod::for_execution(action), kind, &mut cx, id)?;
        Ok(())
    }

    fn sync_events(&mut self) -> DdlResult<()> {
        for event in self.inbox.drain() {
            self.planned_change(event);
        }
        Ok(())
    }

    fn planned_change(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::InstanceDelete { id, .. } => {
                self.session.schedule_deletion(id);
            }
            ChangeEvent::AttributeChange { id, .. } => {
                self.schedule_modification(id);
            }
            ChangeEvent::LinkAdd { fixed, new, .. } => {
                self.schedule_modification(fixed);
                self.schedule_modification(new);
            }
            ChangeEvent::LinkRemove {
                relationship,
                end,
                fixed,
                fixed_kind,
                old,
                old_kind,
            } => {
                self.schedule_modification(fixed);
                self.schedule_modification(old);
                self.fire_drop_rules(relationship, end, fixed, fixed_kind, old, old_kind);
            }
        }
    }

    fn schedule_modification(&mut self, id: ObjectId) {
        let Some(obj) = self.repo.lookup(id) else {
            return;
        };
        let is_new = obj.is_new();
        self.session.schedule_modification(id, is_new);
    }

    fn fire_drop_rules(
        &mut self,
        relationship: RelationshipType,
        end: LinkEnd,
        fixed: ObjectId,
        fixed_kind: ObjectKind,
        old: ObjectId,
        old_kind: ObjectKind,
    ) {
        let rules = self.registry.drop_rules().rules_for(relationship);
        for rule in rules {
            if !rule.applies_to(end, fixed_kind) {
                continue;
            }
            match rule.action {
                DropAction::Cascade => {
                    trace!(?relationship, from = %fixed, to = %old, "cascade");
                    self.session.enqueue_delete(old, old_kind);
                }
                DropAction::Restrict => {
                    if self.repo.lookup(old).is_none() {
                        continue;
                    }
                    if self.drop_restrict {
                        self.restricted.push((fixed, old));
                    } else {
                        self.session.enqueue_delete(old, old_kind);
                    }
                }
            }
        }
    }

    /// Storage-commit pass: runs execute handlers, promotes new elements,
    /// then removes deleted elements, contained ones first.
    pub fn execute_storage(&mut self) -> DdlResult<StorageReport> {
        self.stop_listening();
        let validated: Vec<(ObjectId, ActionKind)> = self
            .session
            .validated()
            .iter()
            .map(|(id, action)| (*id, *action))
            .collect();
        let mut report = StorageReport {
            revalidated: self.session.revalidating().iter().copied().collect(),
            ..StorageReport::default()
        };
        let mut deletion_list = Vec::new();

        for &(id, action) in &validated {
            let Some(obj) = self.repo.lookup(id) else {
                continue;
            };
            if action == ActionKind::Deletion {
                let container_deleted = obj
                    .container
                    .is_some_and(|c| self.session.action_of(c) == Some(ActionKind::Deletion));
                if container_deleted {
                    report.subsumed.push(id);
                } else {
                    deletion_list.push(id);
                }
            }
            self.dispatch_execution(id, action)?;
        }

        let timestamp = now();
        for &(id, action) in &validated {
            if action == ActionKind::Deletion {
                continue;
            }
            let Some(obj) = self.repo.lookup(id) else {
                continue;
            };
            let is_new = obj.is_new();
            let kind = obj.kind;
            if is_new && !matches!(kind, ObjectKind::Grant | ObjectKind::RecoveryMarker) {
                let grant = new_creation_grant(
                    &mut *self.repo,
                    SYSTEM_USER_NAME,
                    &self.config.current_user,
                    id,
                )?;
                report.grants.push(grant);
            }
            if is_new {
                self.repo.set_visibility(id, Visibility::Public)?;
                report.promoted.push(id);
            }
            update_annotated_element(&mut *self.repo, id, timestamp, is_new)?;
        }

        deletion_list.reverse();
        for id in deletion_list {
            if self.repo.lookup(id).is_none() {
                continue;
            }
            debug!(object = %id, "deleting");
            self.repo.delete(id)?;
            report.deleted.push(id);
        }

        let mut problems = Vec::new();
        for &(id, action) in &validated {
            if action != ActionKind::Deletion {
                problems.extend(self.repo.verify_integrity(id));
            }
        }
        if !problems.is_empty() {
            return Err(DdlError::Internal(format!(
                "catalog integrity check failed: {}",
                problems.join("; ")
            )));
        }
        Ok(report)
    }

    fn stop_listening(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.repo.unsubscribe(id);
        }
        self.inbox.drain();
    }
}

impl Drop for DdlValidator<'_> {
    fn drop(&mut self) {
        self.stop_listening();
    }
}
