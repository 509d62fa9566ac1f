//! Device-local storage backend.
//!
//! `LocalStorage` implements the key-value contract on top of a synchronous
//! [`DeviceStore`]. Two stores ship with the crate: [`FileStore`] (one file per
//! key, durable across restarts) and [`MemoryStore`] (in-process, optional quota).

pub mod file_store;
pub mod memory_store;
pub mod storage;
pub mod store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use storage::LocalStorage;
pub use store::DeviceStore;
