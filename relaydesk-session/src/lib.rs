//! RelayDesk Session - Client-side session lifecycle
//!
//! [`SessionManager`] holds the authenticated (token, user) pair, persists it through a
//! [`relaydesk_core::DurableStore`] and revalidates it on a fixed interval through a
//! [`relaydesk_core::AuthBackend`].

pub mod manager;
pub mod storage;
pub mod types;

pub use manager::SessionManager;
pub use storage::{FileStore, MemoryStore, SESSION_FILE_NAME};
pub use types::*;
