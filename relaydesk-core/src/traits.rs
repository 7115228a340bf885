//! Core trait definitions
//!
//! The session manager only ever talks to the outside world through these two seams.

use crate::error::RelayDeskResult;
use crate::types::*;
use async_trait::async_trait;

/// Remote credential issuance and identity lookup
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for an access token
    async fn login(&self, credentials: &LoginRequest) -> RelayDeskResult<AuthResponse>;

    /// Create an account and log it in
    async fn register(&self, request: &RegisterRequest) -> RelayDeskResult<AuthResponse>;

    /// Fetch the account bound to the current token.
    ///
    /// A rejected token must surface as an error whose `status_code()` is 401.
    async fn get_current_user(&self) -> RelayDeskResult<User>;

    /// Tell the gateway the session is over
    async fn logout(&self) -> RelayDeskResult<()>;
}

/// Key-value persistence that survives restarts
///
/// Operations are synchronous and never suspend. `remove` of an absent key succeeds.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> RelayDeskResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> RelayDeskResult<()>;

    fn remove(&self, key: &str) -> RelayDeskResult<()>;
}
