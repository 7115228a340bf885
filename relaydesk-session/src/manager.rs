//! Session Manager - Authentication state holder
//!
//! Owns the in-memory (token, user) pair, mirrors it into a [`DurableStore`] and keeps
//! the server-confirmed identity fresh with a periodic background refresh.

use crate::types::{RestoreOutcome, SessionState};
use relaydesk_core::{
    auth_error, log_operation_error, log_operation_start, log_operation_success, with_timeout,
    AuthBackend, AuthResponse, DurableStore, LoginRequest, PeriodicTask, RegisterRequest,
    RelayDeskError, RelayDeskResult, SessionConfig, SessionSnapshot, User, AUTH_TOKEN_KEY,
    AUTH_USER_KEY,
};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

const COMPONENT: &str = "session_manager";
const REFRESH_TASK_NAME: &str = "session_refresh";

/// Client-side session lifecycle manager
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn DurableStore>,
    state: RwLock<SessionSnapshot>,
    /// At most one periodic refresh at a time
    refresh_task: Mutex<Option<PeriodicTask>>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create an unauthenticated manager
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn DurableStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                state: RwLock::new(SessionSnapshot::default()),
                refresh_task: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Store the session is persisted to
    pub fn store(&self) -> Arc<dyn DurableStore> {
        Arc::clone(&self.inner.store)
    }

    pub async fn user(&self) -> Option<User> {
        self.inner.state.read().await.user.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.state.read().await.token.clone()
    }

    /// Consistent copy of both session fields
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.is_authenticated()
    }

    pub async fn is_admin(&self) -> bool {
        self.inner.state.read().await.is_admin()
    }

    pub async fn state(&self) -> SessionState {
        if self.is_authenticated().await {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    /// True while the periodic refresh task is scheduled
    pub async fn is_auto_refresh_active(&self) -> bool {
        self.inner
            .refresh_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_stopped())
    }

    /// Adopt the persisted session, if any.
    ///
    /// A complete cached session is trusted immediately; an identity refresh is kicked off
    /// in the background and the periodic refresh is started. Anything else leaves the
    /// manager cleared.
    pub async fn restore(&self) -> RestoreOutcome {
        let outcome = self.adopt_persisted().await;
        if outcome.is_restored() {
            let manager = self.clone();
            tokio::spawn(async move {
                if let Err(e) = manager.refresh_user().await {
                    warn!(error = %e, "Background identity refresh after restore failed");
                }
            });
        }
        outcome
    }

    /// Like [`SessionManager::restore`], but the identity refresh is awaited instead of
    /// spawned. The refresh result is `None` when no session was restored.
    pub async fn restore_and_refresh(&self) -> (RestoreOutcome, Option<RelayDeskResult<User>>) {
        let outcome = self.adopt_persisted().await;
        let refreshed = if outcome.is_restored() {
            Some(self.refresh_user().await)
        } else {
            None
        };
        (outcome, refreshed)
    }

    /// Caller-facing name for [`SessionManager::restore`]
    pub async fn check_auth(&self) -> RestoreOutcome {
        self.restore().await
    }

    /// Log in with credentials and persist the resulting session
    pub async fn login(&self, credentials: &LoginRequest) -> RelayDeskResult<User> {
        log_operation_start!("login", email = %credentials.email);
        let response = self.inner.backend.login(credentials).await;
        self.establish("login", response).await
    }

    /// Register an account and adopt the session it returns
    pub async fn register(&self, request: &RegisterRequest) -> RelayDeskResult<User> {
        log_operation_start!("register", email = %request.email);
        let response = self.inner.backend.register(request).await;
        self.establish("register", response).await
    }

    /// End the session.
    ///
    /// The gateway is notified only while a token is held, bounded by
    /// `logout_timeout_ms`. The session stays authenticated (token, user and refresh
    /// task) until that notification settles or times out, so it is still sent with the
    /// token. A failed notification is returned for logging; the local session is
    /// cleared regardless.
    pub async fn logout(&self) -> Option<RelayDeskError> {
        let notification_error = if self.token().await.is_some() {
            let notification = with_timeout(
                self.inner.backend.logout(),
                self.inner.config.logout_timeout_ms,
                "logout_notification",
            )
            .await;
            match notification {
                Ok(Ok(())) => None,
                Ok(Err(e)) | Err(e) => Some(e),
            }
        } else {
            None
        };

        if let Some(e) = &notification_error {
            warn!(error = %e, "Logout notification failed");
        }

        self.clear_auth().await;
        info!("Logged out");
        notification_error
    }

    /// Re-fetch the current user and replace the cached one.
    ///
    /// A 401 ends the session before the error is returned. Other failures leave the
    /// session untouched.
    pub async fn refresh_user(&self) -> RelayDeskResult<User> {
        if self.token().await.is_none() {
            return Err(auth_error!("Not authenticated", COMPONENT));
        }

        match self.inner.backend.get_current_user().await {
            Ok(user) => {
                let mut state = self.inner.state.write().await;
                // A logout that landed while the request was in flight wins over this result
                if state.token.is_none() {
                    debug!("Session ended during identity refresh, discarding result");
                    return Err(auth_error!("Not authenticated", COMPONENT));
                }

                let encoded = serde_json::to_string(&user)?;
                self.inner.store.set(AUTH_USER_KEY, &encoded)?;
                state.user = Some(user.clone());
                debug!(user_id = user.id, role = %user.role, "Identity refreshed");
                Ok(user)
            }
            Err(e) if e.is_credential_rejected() => {
                info!("Credential rejected by gateway, ending session");
                self.clear_auth().await;
                Err(e)
            }
            Err(e) => {
                debug!(error = %e, "Identity refresh failed, keeping session");
                Err(e)
            }
        }
    }

    /// Stop the refresh task and drop the session from memory and storage
    pub async fn clear_auth(&self) {
        let mut state = self.inner.state.write().await;
        state.token = None;
        state.user = None;

        for key in [AUTH_TOKEN_KEY, AUTH_USER_KEY] {
            if let Err(e) = self.inner.store.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted session entry");
            }
        }

        self.stop_auto_refresh().await;
    }

    async fn establish(
        &self,
        operation: &str,
        response: RelayDeskResult<AuthResponse>,
    ) -> RelayDeskResult<User> {
        let result = match response {
            Ok(response) => self.apply_session(response).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                log_operation_success!(operation, user_id = user.id, role = %user.role);
                Ok(user)
            }
            Err(e) => {
                log_operation_error!(operation, e);
                self.clear_auth().await;
                Err(e)
            }
        }
    }

    async fn apply_session(&self, response: AuthResponse) -> RelayDeskResult<User> {
        let AuthResponse { access_token, user } = response;
        let encoded = serde_json::to_string(&user)?;

        let mut state = self.inner.state.write().await;
        self.inner.store.set(AUTH_TOKEN_KEY, &access_token)?;
        self.inner.store.set(AUTH_USER_KEY, &encoded)?;
        state.token = Some(access_token);
        state.user = Some(user.clone());
        self.start_auto_refresh().await;
        Ok(user)
    }

    async fn adopt_persisted(&self) -> RestoreOutcome {
        log_operation_start!("restore_session");

        let cached = match self.read_persisted() {
            Ok(cached) => cached,
            Err(error) => {
                warn!(error = %error, "Discarding unreadable persisted session");
                self.clear_auth().await;
                return RestoreOutcome::Discarded { error };
            }
        };

        let Some((token, user)) = cached else {
            debug!("No persisted session found");
            self.clear_auth().await;
            return RestoreOutcome::NoSession;
        };

        {
            let mut state = self.inner.state.write().await;
            state.token = Some(token);
            state.user = Some(user.clone());
            self.start_auto_refresh().await;
        }

        log_operation_success!("restore_session", user_id = user.id);
        RestoreOutcome::Restored { user }
    }

    fn read_persisted(&self) -> RelayDeskResult<Option<(String, User)>> {
        let token = self.inner.store.get(AUTH_TOKEN_KEY)?;
        let encoded_user = self.inner.store.get(AUTH_USER_KEY)?;

        match (token, encoded_user) {
            (Some(token), Some(encoded_user)) => {
                let user: User = serde_json::from_str(&encoded_user)?;
                Ok(Some((token, user)))
            }
            _ => Ok(None),
        }
    }

    /// Callers hold the state write guard, so the task and the session change together.
    /// Lock order is state, then refresh task.
    async fn start_auto_refresh(&self) {
        let mut slot = self.inner.refresh_task.lock().await;
        if let Some(mut previous) = slot.take() {
            previous.stop();
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = PeriodicTask::spawn(
            REFRESH_TASK_NAME,
            self.inner.config.refresh_interval(),
            move || {
                let weak = weak.clone();
                async move {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let manager = SessionManager { inner };
                    if manager.token().await.is_none() {
                        return;
                    }
                    if let Err(e) = manager.refresh_user().await {
                        warn!(error = %e, "Scheduled identity refresh failed");
                    }
                }
            },
        );

        *slot = Some(task);
    }

    async fn stop_auto_refresh(&self) {
        if let Some(mut task) = self.inner.refresh_task.lock().await.take() {
            task.stop();
            debug!(task = task.name(), "Auto refresh stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use relaydesk_core::async_trait;

    struct OfflineBackend;

    #[async_trait]
    impl AuthBackend for OfflineBackend {
        async fn login(&self, _credentials: &LoginRequest) -> RelayDeskResult<AuthResponse> {
            Err(RelayDeskError::http(400, "invalid credentials", "test"))
        }

        async fn register(&self, _request: &RegisterRequest) -> RelayDeskResult<AuthResponse> {
            Err(RelayDeskError::http(409, "email taken", "test"))
        }

        async fn get_current_user(&self) -> RelayDeskResult<User> {
            Err(RelayDeskError::http(503, "unavailable", "test"))
        }

        async fn logout(&self) -> RelayDeskResult<()> {
            Ok(())
        }
    }

    fn offline_manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(
            Arc::new(OfflineBackend),
            store.clone(),
            SessionConfig::default(),
        );
        (manager, store)
    }

    #[tokio::test]
    async fn test_new_manager_is_unauthenticated() {
        let (manager, _) = offline_manager();
        assert_eq!(manager.state().await, SessionState::Unauthenticated);
        assert!(manager.snapshot().await == SessionSnapshot::default());
        assert!(!manager.is_auto_refresh_active().await);
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_rejected() {
        let (manager, _) = offline_manager();
        match manager.refresh_user().await {
            Err(RelayDeskError::Authentication { message, .. }) => {
                assert_eq!(message, "Not authenticated")
            }
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_auth_on_empty_session() {
        let (manager, store) = offline_manager();
        manager.clear_auth().await;
        manager.clear_auth().await;
        assert!(store.is_empty());
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_half_persisted_session_is_dropped() {
        let (manager, store) = offline_manager();
        store.set(AUTH_TOKEN_KEY, "orphan").unwrap();

        let outcome = manager.restore().await;
        assert!(matches!(outcome, RestoreOutcome::NoSession));
        assert!(store.is_empty());
        assert!(!manager.is_auto_refresh_active().await);
    }
}
