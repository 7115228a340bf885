//! RelayDesk Core - Shared data structures and capability traits
//!
//! Everything the session manager, the HTTP client and the CLI agree on lives here:
//! the error type, configuration, logging setup, user/auth types and the
//! `AuthBackend` / `DurableStore` seams.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
