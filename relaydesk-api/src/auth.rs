//! Authentication endpoints

use crate::client::ApiClient;
use async_trait::async_trait;
use relaydesk_core::{
    AuthBackend, AuthResponse, LoginRequest, RegisterRequest, RelayDeskResult, User,
};
use tracing::debug;

/// [`AuthBackend`] backed by the gateway's `/auth` endpoints
#[derive(Clone)]
pub struct HttpAuthBackend {
    client: ApiClient,
}

impl HttpAuthBackend {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &LoginRequest) -> RelayDeskResult<AuthResponse> {
        debug!(email = %credentials.email, "Requesting access token");
        self.client.post("/auth/login", credentials).await
    }

    async fn register(&self, request: &RegisterRequest) -> RelayDeskResult<AuthResponse> {
        debug!(email = %request.email, "Registering account");
        self.client.post("/auth/register", request).await
    }

    async fn get_current_user(&self) -> RelayDeskResult<User> {
        self.client.get("/auth/me", &[]).await
    }

    async fn logout(&self) -> RelayDeskResult<()> {
        let _: serde_json::Value = self.client.post_empty("/auth/logout").await?;
        Ok(())
    }
}
