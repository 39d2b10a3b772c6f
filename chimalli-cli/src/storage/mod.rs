//! Native storage: filesystem blob store, SQLite metadata and local registry.

pub mod local_fs;
pub mod sqlite_meta;
pub mod sqlite_registry;

pub use local_fs::LocalFs;
pub use sqlite_meta::SqliteMeta;
pub use sqlite_registry::SqliteRegistry;
