use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{DdlError, DdlResult};

use super::event::{ChangeEvent, ChangeListener, ListenerId};
use super::object::{CatalogObject, ObjectAttrs, ObjectId, ObjectKind, Visibility};
use super::persistence::CatalogFile;
use super::relationship::{Link, LinkEnd, RelationshipType};
use super::repository::CatalogRepository;

#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogState {
    pub(crate) objects: BTreeMap<ObjectId, CatalogObject>,
    pub(crate) links: Vec<Link>,
}

#[derive(Debug)]
struct TxnFrame {
    write: bool,
    snapshot: CatalogState,
}

/// In-memory catalog repository with nested snapshot transactions.
/// When opened on a path, every outermost commit rewrites the catalog file.
pub struct MemCatalog {
    state: CatalogState,
    txns: Vec<TxnFrame>,
    next_id: u64,
    next_listener: u64,
    listeners: Vec<(ListenerId, Rc<dyn ChangeListener>)>,
    path: Option<PathBuf>,
}

impl fmt::Debug for MemCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemCatalog")
            .field("objects", &self.state.objects.len())
            .field("links", &self.state.links.len())
            .field("txn_depth", &self.txns.len())
            .field("listeners", &self.listeners.len())
            .field("path", &self.path)
            .finish()
    }
}

impl Default for MemCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemCatalog {
    pub fn new() -> Self {
        Self {
            state: CatalogState::default(),
            txns: Vec::new(),
            next_id: 1,
            next_listener: 1,
            listeners: Vec::new(),
            path: None,
        }
    }

    /// Opens (or creates) a catalog persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> DdlResult<Self> {
        let path = path.into();
        let mut catalog = Self::new();
        if let Some(file) = CatalogFile::load_from_path(&path)? {
            catalog.next_id = file.next_id.max(1);
            for obj in file.objects {
                catalog.state.objects.insert(obj.id, obj);
            }
            catalog.state.links = file.links;
        }
        catalog.path = Some(path);
        Ok(catalog)
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn object_count(&self) -> usize {
        self.state.objects.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.state.links
    }

    fn persist(&self) -> DdlResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = CatalogFile {
            next_id: self.next_id,
            objects: self.state.objects.values().cloned().collect(),
            links: self.state.links.clone(),
        };
        file.save_to_path(path)
    }

    fn require_write(&self) -> DdlResult<()> {
        match self.txns.last() {
            None => Err(DdlError::NoTransaction),
            Some(frame) if !frame.write => Err(DdlError::ReadOnlyTransaction),
            Some(_) => Ok(()),
        }
    }

    fn require_exists(&self, id: ObjectId) -> DdlResult<&CatalogObject> {
        self.state
            .objects
            .get(&id)
            .ok_or(DdlError::MissingObject(id))
    }

    fn notify(&self, event: &ChangeEvent) {
        trace!(?event, "planned catalog change");
        for (_, listener) in &self.listeners {
            listener.planned_change(event);
        }
    }
}

impl CatalogRepository for MemCatalog {
    fn begin_txn(&mut self, write: bool) -> DdlResult<()> {
        // A nested transaction cannot widen a read-only parent.
        if let Some(parent) = self.txns.last() {
            if write && !parent.write {
                return Err(DdlError::ReadOnlyTransaction);
            }
        }
        self.txns.push(TxnFrame {
            write,
            snapshot: self.state.clone(),
        });
        Ok(())
    }

    fn commit_txn(&mut self) -> DdlResult<()> {
        let frame = self.txns.pop().ok_or(DdlError::NoTransaction)?;
        if self.txns.is_empty() && frame.write {
            self.persist()?;
        }
        Ok(())
    }

    fn rollback_txn(&mut self) -> DdlResult<()> {
        let frame = self.txns.pop().ok_or(DdlError::NoTransaction)?;
        self.state = frame.snapshot;
        debug!(depth = self.txns.len(), "catalog transaction rolled back");
        Ok(())
    }

    fn txn_depth(&self) -> usize {
        self.txns.len()
    }

    fn lookup(&self, id: ObjectId) -> Option<&CatalogObject> {
        self.state.objects.get(&id)
    }

    fn create_object(
        &mut self,
        name: &str,
        container: Option<ObjectId>,
        attrs: ObjectAttrs,
    ) -> DdlResult<ObjectId> {
        self.require_write()?;
        if let Some(c) = container {
            self.require_exists(c)?;
        }
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        self.notify(&ChangeEvent::AttributeChange {
            id,
            attribute: "name",
        });
        if let Some(c) = container {
            self.notify(&ChangeEvent::LinkAdd {
                relationship: RelationshipType::Ownership,
                end: LinkEnd::Source,
                fixed: c,
                new: id,
            });
            if let Some(parent) = self.state.objects.get_mut(&c) {
                parent.owned.push(id);
            }
        }
        self.state.objects.insert(
            id,
            CatalogObject {
                id,
                name: name.to_string(),
                kind: attrs.kind(),
                container,
                owned: Vec::new(),
                visibility: Visibility::Unset,
                creation_timestamp: None,
                modification_timestamp: None,
                lineage_id: None,
                attrs,
            },
        );
        Ok(id)
    }

    fn modify(
        &mut self,
        id: ObjectId,
        attribute: &'static str,
        edit: &mut dyn FnMut(&mut CatalogObject),
    ) -> DdlResult<()> {
        self.require_write()?;
        self.require_exists(id)?;
        self.notify(&ChangeEvent::AttributeChange { id, attribute });
        if let Some(obj) = self.state.objects.get_mut(&id) {
            edit(obj);
        }
        Ok(())
    }

    fn delete(&mut self, id: ObjectId) -> DdlResult<()> {
        self.require_write()?;
        let obj = self.require_exists(id)?.clone();
        self.notify(&ChangeEvent::InstanceDelete { id, kind: obj.kind });

        let touching: Vec<Link> = self
            .state
            .links
            .iter()
            .filter(|l| l.touches(id))
            .copied()
            .collect();
        for link in touching {
            if let Some((end, other)) = link.end_of(id) {
                if let Some(old_kind) = self.kind_of(other) {
                    self.notify(&ChangeEvent::LinkRemove {
                        relationship: link.relationship,
                        end,
                        fixed: id,
                        fixed_kind: obj.kind,
                        old: other,
                        old_kind,
                    });
                }
            }
            self.state.links.retain(|l| *l != link);
        }

        for child in &obj.owned {
            if self.state.objects.contains_key(child) {
                self.delete(*child)?;
            }
        }

        if let Some(container) = obj.container {
            if let Some(old_kind) = self.kind_of(container) {
                self.notify(&ChangeEvent::LinkRemove {
                    relationship: RelationshipType::Ownership,
                    end: LinkEnd::Target,
                    fixed: id,
                    fixed_kind: obj.kind,
                    old: container,
                    old_kind,
                });
            }
            if let Some(parent) = self.state.objects.get_mut(&container) {
                parent.owned.retain(|o| *o != id);
            }
        }
        self.state.objects.remove(&id);
        Ok(())
    }

    fn link(
        &mut self,
        relationship: RelationshipType,
        source: ObjectId,
        target: ObjectId,
    ) -> DdlResult<()> {
        self.require_write()?;
        self.require_exists(source)?;
        self.require_exists(target)?;
        let link = Link {
            relationship,
            source,
            target,
        };
        if self.state.links.contains(&link) {
            return Ok(());
        }
        self.notify(&ChangeEvent::LinkAdd {
            relationship,
            end: LinkEnd::Source,
            fixed: source,
            new: target,
        });
        self.state.links.push(link);
        Ok(())
    }

    fn unlink(
        &mut self,
        relationship: RelationshipType,
        source: ObjectId,
        target: ObjectId,
    ) -> DdlResult<()> {
        self.require_write()?;
        let link = Link {
            relationship,
            source,
            target,
        };
        if !self.state.links.contains(&link) {
            return Ok(());
        }
        if let (Some(fixed_kind), Some(old_kind)) = (self.kind_of(source), self.kind_of(target)) {
            self.notify(&ChangeEvent::LinkRemove {
                relationship,
                end: LinkEnd::Source,
                fixed: source,
                fixed_kind,
                old: target,
                old_kind,
            });
        }
        self.state.links.retain(|l| *l != link);
        Ok(())
    }

    fn links_from(&self, id: ObjectId, relationship: RelationshipType) -> Vec<ObjectId> {
        self.state
            .links
            .iter()
            .filter(|l| l.relationship == relationship && l.source == id)
            .map(|l| l.target)
            .collect()
    }

    fn links_to(&self, id: ObjectId, relationship: RelationshipType) -> Vec<ObjectId> {
        self.state
            .links
            .iter()
            .filter(|l| l.relationship == relationship && l.target == id)
            .map(|l| l.source)
            .collect()
    }

    fn objects_of_kind(&self, kind: ObjectKind) -> Vec<ObjectId> {
        self.state
            .objects
            .values()
            .filter(|o| o.kind == kind)
            .map(|o| o.id)
            .collect()
    }

    fn find_by_name(&self, container: Option<ObjectId>, name: &str) -> Option<ObjectId> {
        match container {
            Some(c) => self.state.objects.get(&c).and_then(|parent| {
                parent.owned.iter().copied().find(|child| {
                    self.state
                        .objects
                        .get(child)
                        .is_some_and(|o| o.name.eq_ignore_ascii_case(name))
                })
            }),
            None => self
                .state
                .objects
                .values()
                .find(|o| o.container.is_none() && o.name.eq_ignore_ascii_case(name))
                .map(|o| o.id),
        }
    }

    fn subscribe(&mut self, listener: Rc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    fn verify_integrity(&self, id: ObjectId) -> Vec<String> {
        let mut errs = Vec::new();
        let Some(obj) = self.state.objects.get(&id) else {
            return errs;
        };
        if let Some(c) = obj.container {
            match self.state.objects.get(&c) {
                None => errs.push(format!("{id} is owned by missing container {c}")),
                Some(parent) if !parent.owned.contains(&id) => {
                    errs.push(format!("{id} is not listed among the elements of {c}"))
                }
                Some(_) => {}
            }
        }
        for child in &obj.owned {
            if !self.state.objects.contains_key(child) {
                errs.push(format!("{id} owns missing element {child}"));
            }
        }
        for link in self.state.links.iter().filter(|l| l.touches(id)) {
            if let Some((_, other)) = link.end_of(id) {
                if !self.state.objects.contains_key(&other) {
                    errs.push(format!(
                        "{:?} link from {} to {} is dangling",
                        link.relationship, link.source, link.target
                    ));
                }
            }
        }
        errs
    }
}
