pub mod store;
pub mod types;

pub use store::{MemorySessionStore, PersistentSessionStore, SessionBackend, SessionRepository};
pub use types::Session;
