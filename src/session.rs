//! Authenticated user context.
//!
//! The session is resolved once at startup from `/auth/me` and changes only on
//! login or logout. Pages read it for role-gated actions; the router reads it
//! to redirect unauthenticated users to the login page.

use parking_lot::RwLock;
use serde_json::json;

use crate::api::endpoints::{AUTH_DEV_LOGIN, AUTH_LOGOUT, AUTH_ME};
use crate::api::{decode, QueryParams};
use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::types::{Role, User};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    /// Not resolved yet.
    #[default]
    Unknown,
    Unauthenticated,
    Authenticated(User),
}

#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Replace the resolved state directly (used when restoring a known
    /// user without a round trip).
    pub fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Sign out a session the server no longer accepts. Returns whether a
    /// signed-in session was dropped.
    pub fn expire(&self) -> bool {
        let mut state = self.state.write();
        if let SessionState::Authenticated(user) = &*state {
            log::warn!("Session: credentials for {} rejected, signing out", user.email);
            *state = SessionState::Unauthenticated;
            true
        } else {
            false
        }
    }

    pub fn user(&self) -> Option<User> {
        match &*self.state.read() {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.state.read(), SessionState::Authenticated(_))
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Resolve the current user. A 401 is a normal unauthenticated session,
    /// not an error.
    pub async fn init(&self, cache: &QueryCache) -> Result<Option<User>, ClientError> {
        match cache.backend().get(AUTH_ME, &QueryParams::new()).await {
            Ok(value) => {
                let user: User = decode(&value)?;
                log::info!("Session: signed in as {} ({})", user.email, user.role);
                *self.state.write() = SessionState::Authenticated(user.clone());
                Ok(Some(user))
            }
            Err(ClientError::Unauthenticated) => {
                log::info!("Session: not signed in");
                *self.state.write() = SessionState::Unauthenticated;
                Ok(None)
            }
            Err(e) => {
                log::warn!("Session: failed to resolve user: {}", e);
                Err(e)
            }
        }
    }

    /// Development-only direct login.
    pub async fn dev_login(
        &self,
        cache: &QueryCache,
        email: &str,
        role: Role,
    ) -> Result<User, ClientError> {
        let value = cache
            .backend()
            .post(AUTH_DEV_LOGIN, &json!({ "email": email, "role": role }))
            .await?;
        let user: User = decode(&value)?;
        log::info!("Session: dev login as {} ({})", user.email, user.role);
        // Cached reads were made under the previous identity.
        cache.clear();
        *self.state.write() = SessionState::Authenticated(user.clone());
        Ok(user)
    }

    /// End the session. Local state is torn down even if the server call
    /// fails; the server answers with a redirect that carries no JSON.
    pub async fn logout(&self, cache: &QueryCache) {
        if let Err(e) = cache.backend().post(AUTH_LOGOUT, &json!({})).await {
            log::debug!("Session: logout call returned {}", e);
        }
        cache.clear();
        *self.state.write() = SessionState::Unauthenticated;
        log::info!("Session: signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn cache(backend: &Arc<FakeBackend>) -> QueryCache {
        QueryCache::new(backend.clone(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_init_authenticated() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond(
            "GET /auth/me",
            json!({"id": 1, "email": "ana@example.com", "name": "Ana", "role": "analyst"}),
        );
        let session = Session::new();
        let user = session.init(&cache(&backend)).await.unwrap().unwrap();
        assert_eq!(user.display_name(), "Ana");
        assert_eq!(session.role(), Some(Role::Analyst));
        assert!(!session.is_admin());
    }

    #[tokio::test]
    async fn test_init_401_is_unauthenticated() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail("GET /auth/me", ClientError::Unauthenticated);
        let session = Session::new();
        assert!(session.init(&cache(&backend)).await.unwrap().is_none());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.role(), None);
    }

    #[tokio::test]
    async fn test_sales_session_is_not_admin() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /auth/me", json!({"id": 2, "email": "s@example.com", "role": "sales"}));
        let session = Session::new();
        session.init(&cache(&backend)).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.role(), Some(Role::Sales));
        assert!(!session.is_admin());
    }

    #[tokio::test]
    async fn test_dev_login_then_logout_clears_cache() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond(
            "POST /auth/dev-login",
            json!({"id": 3, "email": "dev@example.com", "role": "admin"}),
        );
        backend.respond("GET /api/entities/stats", json!({"total": 1}));
        let cache = cache(&backend);
        let session = Session::new();

        let user = session.dev_login(&cache, "dev@example.com", Role::Admin).await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(
            backend.last_body("POST /auth/dev-login").unwrap(),
            json!({"email": "dev@example.com", "role": "admin"})
        );

        let key = crate::api::endpoints::entity_stats();
        cache.fetch(&key).await.unwrap();
        session.logout(&cache).await;
        assert!(cache.snapshot(&key).data.is_none());
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }
}
