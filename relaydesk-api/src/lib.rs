//! RelayDesk API - Typed client for the gateway REST API
//!
//! - [`ApiClient`]: envelope handling, bearer token injection, error mapping
//! - [`HttpAuthBackend`]: the session manager's [`relaydesk_core::AuthBackend`]
//! - [`RequestContentLogsApi`]: admin request content log queries
//! - [`normalize_messages`]: flatten captured chat messages for display

pub mod auth;
pub mod client;
pub mod messages;
pub mod request_content_logs;

pub use auth::HttpAuthBackend;
pub use client::{clean_query, ApiClient, ApiClientConfig};
pub use messages::{normalize_messages, ChatMessage, ChatRole};
pub use request_content_logs::{
    PaginatedResponse, RequestContentLogDetail, RequestContentLogFilters, RequestContentLogItem,
    RequestContentLogsApi, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
};
