pub mod memory;
pub mod session;

pub use memory::InMemorySessionStore;
pub use session::SqliteSessionStore;
