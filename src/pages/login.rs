//! Sign-in screen shown to unauthenticated sessions.

use std::sync::Arc;

use super::Page;
use crate::api::endpoints;
use crate::error::ClientError;
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::types::{DevLoginConfig, User};

pub struct LoginPage {
    state: Arc<AppState>,
}

impl LoginPage {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Where the browser goes to start Google sign-in.
    pub fn sign_in_url(&self) -> String {
        format!(
            "{}{}",
            self.state.config.base_url.trim_end_matches('/'),
            endpoints::AUTH_LOGIN
        )
    }

    /// Direct login with the configured development identity, or `identity`
    /// when given.
    pub async fn dev_login(&self, identity: Option<DevLoginConfig>) -> Result<User, ClientError> {
        let identity = identity
            .or_else(|| self.state.config.dev_login.clone())
            .ok_or_else(|| ClientError::Config("no devLogin identity configured".to_string()))?;
        match self
            .state
            .session
            .dev_login(&self.state.cache, &identity.email, identity.role)
            .await
        {
            Ok(user) => {
                self.state
                    .notices
                    .success(format!("Signed in as {}", user.display_name()));
                Ok(user)
            }
            Err(e) => {
                self.state.notices.error("Sign-in failed");
                Err(e)
            }
        }
    }
}

impl Page for LoginPage {
    fn route(&self) -> Route {
        Route::Login
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("Competitive War Room");
        screen.line("Sign in with your Google account:");
        screen.indented(1, self.sign_in_url());
        if let Some(dev) = &self.state.config.dev_login {
            screen.blank();
            screen.line(format!(
                "Development login available as {} ({}): warroom dev-login",
                dev.email, dev.role
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use crate::session::SessionState;
    use crate::types::{Config, Role};
    use serde_json::json;

    fn signed_out(backend: &Arc<FakeBackend>, dev_login: Option<DevLoginConfig>) -> Arc<AppState> {
        let config = Config {
            color: false,
            base_url: "https://intel.example.com/".to_string(),
            dev_login,
            ..Config::default()
        };
        let state = AppState::new(config, backend.clone());
        state.session.set_state(SessionState::Unauthenticated);
        state
    }

    #[tokio::test]
    async fn test_sign_in_url() {
        let backend = Arc::new(FakeBackend::new());
        let page = LoginPage::new(signed_out(&backend, None));
        assert_eq!(page.sign_in_url(), "https://intel.example.com/auth/google");
        let screen = screen_of(&page);
        assert!(screen.contains("https://intel.example.com/auth/google"));
        assert!(!screen.contains("Development login"));
    }

    #[tokio::test]
    async fn test_dev_login_uses_configured_identity() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond(
            "POST /auth/dev-login",
            json!({"id": 9, "email": "dev@example.com", "name": "Dev Admin", "role": "admin"}),
        );
        let state = signed_out(
            &backend,
            Some(DevLoginConfig {
                email: "dev@example.com".to_string(),
                role: Role::Admin,
            }),
        );
        let page = LoginPage::new(state.clone());
        assert!(screen_of(&page).contains("Development login available as dev@example.com (admin)"));

        let user = page.dev_login(None).await.unwrap();
        assert_eq!(user.id, 9);
        assert!(state.session.is_admin());
        assert_eq!(state.notices.last().unwrap().message, "Signed in as Dev Admin");
    }

    #[tokio::test]
    async fn test_dev_login_without_identity_is_config_error() {
        let backend = Arc::new(FakeBackend::new());
        let page = LoginPage::new(signed_out(&backend, None));
        assert!(matches!(page.dev_login(None).await, Err(ClientError::Config(_))));
        assert_eq!(backend.call_count("POST /auth/dev-login"), 0);
    }
}
