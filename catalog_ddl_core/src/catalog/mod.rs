pub mod event;
pub mod mem;
pub mod object;
mod persistence;
pub mod relationship;
pub mod repository;
pub mod util;

pub use event::{ChangeEvent, ChangeListener, ListenerId};
pub use mem::MemCatalog;
pub use object::{
    CatalogObject, ObjectAttrs, ObjectId, ObjectKind, RecoveryType, TypeTag, Visibility,
};
pub use relationship::{Link, LinkEnd, RelationshipType};
pub use repository::CatalogRepository;
