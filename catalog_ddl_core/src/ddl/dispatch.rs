use indexmap::IndexMap;
use std::fmt;

use crate::catalog::util::describe;
use crate::catalog::{CatalogObject, CatalogRepository, ObjectId, ObjectKind, TypeTag};
use crate::config::EngineConfig;
use crate::error::{DdlError, DdlResult};
use crate::storage::StorageEngine;

use super::action::ActionKind;
use super::drop_rule::{DropRuleTable, DropRuleTableBuilder};
use super::session::ValidationSession;

/// Method families a handler can implement per type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerMethod {
    ValidateDefinition,
    ValidateModification,
    ValidateDrop,
    ValidateTruncation,
    ExecuteCreation,
    ExecuteModification,
    ExecuteDrop,
    ExecuteTruncation,
}

impl HandlerMethod {
    pub fn for_validation(action: ActionKind) -> Self {
        match action {
            ActionKind::Creation => HandlerMethod::ValidateDefinition,
            ActionKind::Modification => HandlerMethod::ValidateModification,
            ActionKind::Deletion => HandlerMethod::ValidateDrop,
            ActionKind::Truncation => HandlerMethod::ValidateTruncation,
        }
    }

    pub fn for_execution(action: ActionKind) -> Self {
        match action {
            ActionKind::Creation => HandlerMethod::ExecuteCreation,
            ActionKind::Modification => HandlerMethod::ExecuteModification,
            ActionKind::Deletion => HandlerMethod::ExecuteDrop,
            ActionKind::Truncation => HandlerMethod::ExecuteTruncation,
        }
    }
}

/// What a rule body sees while it runs.
pub struct HandlerContext<'c> {
    pub repo: &'c mut dyn CatalogRepository,
    pub storage: &'c mut dyn StorageEngine,
    pub session: &'c ValidationSession,
    pub config: &'c EngineConfig,
    /// The statement asked for RESTRICT semantics.
    pub drop_restrict: bool,
}

impl<'c> HandlerContext<'c> {
    pub fn object(&self, id: ObjectId) -> DdlResult<&CatalogObject> {
        self.repo.lookup(id).ok_or(DdlError::MissingObject(id))
    }

    pub fn describe(&self, id: ObjectId) -> String {
        describe(&*self.repo, id)
    }

    pub fn is_deleted_object(&self, id: ObjectId) -> bool {
        self.session.action_of(id) == Some(ActionKind::Deletion)
    }

    pub fn is_created_object(&self, id: ObjectId) -> bool {
        self.session.action_of(id) == Some(ActionKind::Creation)
    }

    pub fn is_pending(&self, id: ObjectId) -> bool {
        self.session.is_pending(id)
    }

    /// Signals a forward dependency when `id` has not been validated yet.
    pub fn require_validated(&self, id: ObjectId) -> DdlResult<()> {
        if self.is_pending(id) {
            return Err(DdlError::UnvalidatedDependency(id));
        }
        Ok(())
    }

    /// Rejects duplicate names among `elements` of `container`. Elements
    /// being dropped are ignored; with `include_type` only elements of the
    /// same name class clash.
    pub fn validate_unique_names(
        &self,
        container: ObjectId,
        elements: &[ObjectId],
        include_type: bool,
    ) -> DdlResult<()> {
        let mut seen: IndexMap<String, ObjectId> = IndexMap::new();
        for &id in elements {
            let Some(obj) = self.repo.lookup(id) else {
                continue;
            };
            if self.is_deleted_object(id) {
                continue;
            }
            let key = if include_type {
                format!("{}:{}", obj.kind.namespace_class(), obj.name.to_lowercase())
            } else {
                obj.name.to_lowercase()
            };
            let Some(&other) = seen.get(&key) else {
                seen.insert(key, id);
                continue;
            };
            let other_new = self.repo.lookup(other).is_some_and(|o| o.is_new());
            if other_new && obj.is_new() {
                return Err(DdlError::DuplicateName {
                    element: self.describe(id),
                    container: self.describe(container),
                });
            }
            if other_new || obj.is_new() {
                let newcomer = if other_new { other } else { id };
                return Err(DdlError::NameInUse {
                    element: self.describe(newcomer),
                    container: self.describe(container),
                });
            }
        }
        Ok(())
    }
}

/// A family of per-type rule bodies. `methods` is the dispatch table: the
/// (method, tag) pairs this handler implements.
pub trait DdlHandler {
    fn name(&self) -> &'static str;

    fn methods(&self) -> &'static [(HandlerMethod, TypeTag)];

    fn invoke(
        &self,
        method: HandlerMethod,
        tag: TypeTag,
        cx: &mut HandlerContext<'_>,
        id: ObjectId,
    ) -> DdlResult<()>;

    fn define_drop_rules(&self, _rules: &mut DropRuleTableBuilder) {}

    fn supports(&self, method: HandlerMethod, tag: TypeTag) -> bool {
        self.methods().contains(&(method, tag))
    }
}

/// Handlers in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn DdlHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn DdlHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// First handler (in registration order) with a method for `kind`, using
    /// the most specific tag of the kind's lineage that handler supports.
    pub fn resolve(&self, method: HandlerMethod, kind: ObjectKind) -> Option<(&dyn DdlHandler, TypeTag)> {
        for handler in &self.handlers {
            for tag in kind.lineage() {
                if handler.supports(method, *tag) {
                    return Some((handler.as_ref(), *tag));
                }
            }
        }
        None
    }

    /// Runs the matching method. `Ok(false)` means no handler had one, which
    /// is a silent no-op.
    pub fn dispatch(
        &self,
        method: HandlerMethod,
        kind: ObjectKind,
        cx: &mut HandlerContext<'_>,
        id: ObjectId,
    ) -> DdlResult<bool> {
        match self.resolve(method, kind) {
            Some((handler, tag)) => {
                handler.invoke(method, tag, cx, id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn drop_rules(&self) -> DropRuleTable {
        let mut builder = DropRuleTable::builder();
        for handler in &self.handlers {
            handler.define_drop_rules(&mut builder);
        }
        builder.build()
    }
}

/// Handlers plus the drop rules they define, built once per engine.
#[derive(Debug)]
pub struct DdlRegistry {
    handlers: HandlerRegistry,
    drop_rules: DropRuleTable,
}

impl DdlRegistry {
    pub fn new(handlers: HandlerRegistry) -> Self {
        let drop_rules = handlers.drop_rules();
        Self {
            handlers,
            drop_rules,
        }
    }

    /// The relational handler set used by [`crate::Database`].
    pub fn standard() -> Self {
        let mut handlers = HandlerRegistry::new();
        handlers.register(Box::new(super::handlers::RelationalHandler));
        Self::new(handlers)
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn drop_rules(&self) -> &DropRuleTable {
        &self.drop_rules
    }
}
