pub mod relational;

pub use relational::RelationalHandler;
