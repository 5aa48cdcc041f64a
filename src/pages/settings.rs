//! Settings: integrations overview, signal thresholds and (for admins) user
//! management.

use std::sync::Arc;

use serde_json::json;

use super::{observe, perform, Page};
use crate::api::endpoints::{self, scope};
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::helpers::format_date;
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, paint, role_tone, Tone};
use crate::types::{AdminStats, Role, User, UserList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTab {
    Integrations,
    Thresholds,
    Users,
}

impl SettingsTab {
    fn label(&self) -> &'static str {
        match self {
            SettingsTab::Integrations => "Integrations",
            SettingsTab::Thresholds => "Signal Thresholds",
            SettingsTab::Users => "Users",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationStatus {
    Connected,
    NotConfigured,
    Optional,
}

impl IntegrationStatus {
    fn label(&self) -> &'static str {
        match self {
            IntegrationStatus::Connected => "Connected",
            IntegrationStatus::NotConfigured => "Not configured",
            IntegrationStatus::Optional => "Optional",
        }
    }

    fn tone(&self) -> Tone {
        match self {
            IntegrationStatus::Connected => Tone::Green,
            IntegrationStatus::NotConfigured => Tone::Orange,
            IntegrationStatus::Optional => Tone::Gray,
        }
    }
}

pub struct Integration {
    pub name: &'static str,
    pub description: &'static str,
    pub status: IntegrationStatus,
    /// Server path that starts the connect flow, if any.
    pub configure: Option<&'static str>,
}

pub const INTEGRATIONS: &[Integration] = &[
    Integration {
        name: "Google OAuth (Login)",
        description: "Sign in with @distyl.ai Google accounts. Required for all users.",
        status: IntegrationStatus::NotConfigured,
        configure: Some(endpoints::AUTH_LOGIN),
    },
    Integration {
        name: "Gmail Monitoring",
        description: "Monitor your inbox for entity mentions and create signals automatically.",
        status: IntegrationStatus::NotConfigured,
        configure: Some("/auth/google/gmail"),
    },
    Integration {
        name: "Google Drive Sync",
        description: "Scan watched folders for meeting notes and extract entity mentions.",
        status: IntegrationStatus::NotConfigured,
        configure: Some("/auth/google/drive"),
    },
    Integration {
        name: "Slack",
        description: "Post signal alerts, digest, and support /intel slash commands.",
        status: IntegrationStatus::NotConfigured,
        configure: None,
    },
    Integration {
        name: "NewsAPI",
        description: "Structured news from 80,000+ sources. Set NEWSAPI_KEY in environment.",
        status: IntegrationStatus::NotConfigured,
        configure: None,
    },
    Integration {
        name: "Perplexity",
        description: "AI-synthesized latest news with citations. Set PERPLEXITY_API_KEY in environment.",
        status: IntegrationStatus::Optional,
        configure: None,
    },
    Integration {
        name: "Claude (Anthropic)",
        description: "Used for dossier generation, signal scoring, chat, and autonomy engine.",
        status: IntegrationStatus::Connected,
        configure: None,
    },
];

/// Notification thresholds applied server-side; read-only here.
const THRESHOLDS: &[(&str, &str, Tone)] = &[
    ("Immediate Slack alert", "≥ 80", Tone::Red),
    ("Batch notification (6h)", "≥ 60", Tone::Orange),
    ("DB only (no notification)", "< 60", Tone::Gray),
];

const SCHEDULE: &[(&str, &str)] = &[
    ("Run frequency", "Every 30 minutes"),
    ("News refresh", "Every 2 hours"),
    ("Signal sweep", "Every 6 hours"),
    ("People sweep", "Daily 7am"),
    ("Digest", "Bi-weekly Monday 8am"),
];

/// Users and system stats, only queried for admins.
struct AdminQueries {
    users: QueryObserver<UserList>,
    stats: QueryObserver<AdminStats>,
}

pub struct SettingsPage {
    state: Arc<AppState>,
    tab: SettingsTab,
    admin: Option<AdminQueries>,
}

impl SettingsPage {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tab: SettingsTab::Integrations,
            admin: None,
        }
    }

    pub fn tab(&self) -> SettingsTab {
        self.tab
    }

    pub fn tabs(&self) -> Vec<SettingsTab> {
        let mut tabs = vec![SettingsTab::Integrations, SettingsTab::Thresholds];
        if self.state.session.is_admin() {
            tabs.push(SettingsTab::Users);
        }
        tabs
    }

    pub fn set_tab(&mut self, tab: SettingsTab) -> Result<(), ClientError> {
        if tab == SettingsTab::Users {
            require_admin(&self.state)?;
            if self.admin.is_none() {
                self.admin = Some(AdminQueries {
                    users: observe(&self.state, endpoints::admin_users()),
                    stats: observe(&self.state, endpoints::admin_stats()),
                });
            }
        }
        self.tab = tab;
        Ok(())
    }

    pub fn users(&self) -> Loadable<Vec<User>> {
        match &self.admin {
            Some(admin) => admin.users.current().map(|list| list.users),
            None => Loadable::Idle,
        }
    }

    pub async fn update_role(&self, user: &User, role: Role) -> Result<(), ClientError> {
        require_admin(&self.state)?;
        if role == Role::Unknown {
            return Err(ClientError::InvalidInput("unknown role".to_string()));
        }
        perform(
            &self.state,
            Mutation::put(
                endpoints::user_role_path(user.id),
                json!({ "role": role }),
            )
            .invalidates(scope::ADMIN_USERS),
            format!("{} → {}", user.display_name(), role),
            "Failed to update role",
        )
        .await
        .map(|_| ())
    }

    fn render_integrations(&self, screen: &mut Screen) {
        let color = self.state.color();
        for integration in INTEGRATIONS {
            let mut line = format!(
                "  {}  {}",
                integration.name,
                badge(integration.status.label(), integration.status.tone(), color)
            );
            if let Some(path) = integration.configure {
                line.push_str(&format!(
                    "  configure: {}{}",
                    self.state.config.base_url.trim_end_matches('/'),
                    path
                ));
            }
            screen.line(line);
            screen.indented(2, integration.description);
        }
    }

    fn render_thresholds(&self, screen: &mut Screen) {
        let color = self.state.color();
        screen.heading("Signal Scoring Thresholds");
        for (label, value, tone) in THRESHOLDS {
            screen.line(format!("  {:<28}{}", label, badge(value, *tone, color)));
        }
        screen.placeholder(
            "Thresholds are currently fixed. Configurable per-user thresholds coming in a future update.",
        );
        screen.heading("Autonomy Engine");
        for (label, value) in SCHEDULE {
            screen.kv(label, value);
        }
    }

    fn render_users(&self, screen: &mut Screen) {
        let color = self.state.color();
        let Some(admin) = &self.admin else {
            return;
        };
        if let Some(stats) = admin.stats.current().ready() {
            screen.heading("System");
            screen.kv("Users", stats.users);
            screen.kv("Active entities", stats.entities);
            screen.kv("New signals", stats.signals);
            screen.kv("Dossiers", stats.dossiers);
            screen.kv("Deals", stats.deals);
        }

        let users = self.users();
        match users.ready() {
            Some(list) => screen.heading(&format!("User Management ({} users)", list.len())),
            None => screen.heading("User Management"),
        };
        screen.list(&users, "No users found", |s, user| {
            s.line(format!(
                "  {}  {}  last login {}",
                user.display_name(),
                badge(user.role.as_str(), role_tone(user.role), color),
                format_date(user.last_login.as_deref())
            ));
            s.indented(2, paint(&user.email, Tone::Gray, color));
        });
    }
}

fn require_admin(state: &AppState) -> Result<(), ClientError> {
    if state.session.is_admin() {
        Ok(())
    } else {
        Err(ClientError::Forbidden("admin access required".to_string()))
    }
}

impl Page for SettingsPage {
    fn route(&self) -> Route {
        Route::Settings
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("Settings");
        let tabs: Vec<String> = self
            .tabs()
            .into_iter()
            .map(|t| {
                if t == self.tab {
                    format!("[{}]", t.label())
                } else {
                    t.label().to_string()
                }
            })
            .collect();
        screen.line(tabs.join("  "));
        screen.blank();
        match self.tab {
            SettingsTab::Integrations => self.render_integrations(screen),
            SettingsTab::Thresholds => self.render_thresholds(screen),
            SettingsTab::Users => self.render_users(screen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::api::test_utils::FakeBackend;

    fn script(backend: &FakeBackend) {
        backend.respond(
            "GET /api/admin/stats",
            json!({"users": 4, "entities": 12, "signals": 7, "dossiers": 9, "deals": 3}),
        );
    }

    #[tokio::test]
    async fn test_analyst_sees_integrations_only() {
        let backend = Arc::new(FakeBackend::new());
        let mut page = SettingsPage::new(signed_in(&backend));
        assert_eq!(page.tabs(), vec![SettingsTab::Integrations, SettingsTab::Thresholds]);
        let screen = screen_of(&page);
        assert!(screen.contains("[Integrations]  Signal Thresholds"));
        assert!(screen.contains("Google OAuth (Login)  [Not configured]  configure: http://localhost:5000/auth/google"));
        assert!(screen.contains("Claude (Anthropic)  [Connected]"));

        assert!(matches!(page.set_tab(SettingsTab::Users), Err(ClientError::Forbidden(_))));
        assert_eq!(page.tab(), SettingsTab::Integrations);
        assert_eq!(backend.call_count("GET /api/admin/users"), 0);

        page.set_tab(SettingsTab::Thresholds).unwrap();
        let screen = screen_of(&page);
        assert!(screen.contains("[≥ 80]"));
        assert!(screen.contains("Bi-weekly Monday 8am"));
    }

    #[tokio::test]
    async fn test_admin_user_list_and_stats() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        backend.respond(
            "GET /api/admin/users",
            json!({"users": [
                {"id": 2, "email": "sam@example.com", "name": "Sam", "role": "sales",
                 "last_login": "2026-03-02T10:00:00"}
            ]}),
        );
        let mut page = SettingsPage::new(with_role(&backend, Role::Admin));
        page.set_tab(SettingsTab::Users).unwrap();
        let screen = wait_for_text(&page, "User Management (1 users)").await;
        assert!(screen.contains("Sam  [sales]  last login Mar 2, 2026"));
        assert!(screen.contains("sam@example.com"));
        wait_for_text(&page, "Active entities").await;
    }

    #[tokio::test]
    async fn test_role_update_refreshes_users() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        let sam = json!({"id": 2, "email": "sam@example.com", "name": "Sam", "role": "sales"});
        let promoted = json!({"id": 2, "email": "sam@example.com", "name": "Sam", "role": "analyst"});
        backend.respond_seq(
            "GET /api/admin/users",
            vec![json!({"users": [sam]}), json!({"users": [promoted]})],
        );
        backend.respond("PUT /api/admin/users/2/role", json!({"success": true}));
        let state = with_role(&backend, Role::Admin);
        let mut page = SettingsPage::new(state.clone());
        page.set_tab(SettingsTab::Users).unwrap();
        wait_for_text(&page, "[sales]").await;

        let user = page.users().into_ready().unwrap().remove(0);
        page.update_role(&user, Role::Analyst).await.unwrap();
        assert_eq!(
            backend.last_body("PUT /api/admin/users/2/role").unwrap(),
            json!({"role": "analyst"})
        );
        assert_eq!(state.notices.last().unwrap().message, "Sam → analyst");
        wait_for_text(&page, "[analyst]").await;
    }

    #[tokio::test]
    async fn test_empty_users() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        backend.respond("GET /api/admin/users", json!({"users": []}));
        let mut page = SettingsPage::new(with_role(&backend, Role::Admin));
        page.set_tab(SettingsTab::Users).unwrap();
        wait_for_text(&page, "No users found").await;
    }
}
