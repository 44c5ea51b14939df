pub mod memory;
pub mod sqlite;
pub mod store;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use store::{DEFAULT_STORE_TIMEOUT, SessionStore, SessionStoreHandle, StoreError};
