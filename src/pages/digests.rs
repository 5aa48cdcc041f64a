//! Digests: periodic rollups, generated on demand and posted to Slack.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::{current, observe, perform, Page};
use crate::api::endpoints::{self, scope};
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::helpers::{format_date, humanize, DASH};
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, paint, score_tone, Tone};
use crate::types::{Digest, DigestList};

fn digest_type_tone(digest_type: Option<&str>) -> Tone {
    match digest_type {
        Some("competitor_focus") => Tone::Red,
        _ => Tone::Blue,
    }
}

pub struct DigestsPage {
    state: Arc<AppState>,
    digests: QueryObserver<DigestList>,
    selected: Option<QueryObserver<Digest>>,
}

impl DigestsPage {
    pub fn new(state: Arc<AppState>) -> Self {
        let digests = observe(&state, endpoints::digests());
        Self {
            state,
            digests,
            selected: None,
        }
    }

    pub fn digests(&self) -> Loadable<Vec<Digest>> {
        self.digests.current().map(|list| list.digests)
    }

    pub fn select(&mut self, id: Option<i64>) {
        self.selected = id.map(|id| observe(&self.state, endpoints::digest(id)));
    }

    pub fn selected(&self) -> Loadable<Digest> {
        current(&self.selected)
    }

    /// Generation runs server-side; the list is refreshed again after a delay
    /// so the new digest shows up without a manual reload.
    pub async fn generate(&self) -> Result<(), ClientError> {
        let delay = Duration::from_secs(self.state.config.digest_refresh_delay_secs);
        perform(
            &self.state,
            Mutation::post(endpoints::DIGEST_GENERATE, json!({}))
                .invalidates_after(delay, scope::DIGESTS),
            "Digest generation started",
            "Generation failed",
        )
        .await
        .map(|_| ())
    }

    pub async fn post_to_slack(&self, id: i64) -> Result<(), ClientError> {
        perform(
            &self.state,
            Mutation::post(endpoints::digest_post_slack_path(id), json!({}))
                .invalidates(scope::DIGESTS)
                .invalidates_key(endpoints::digest(id)),
            "Posted to Slack",
            "Failed to post to Slack",
        )
        .await
        .map(|_| ())
    }

    fn render_list(&self, screen: &mut Screen) {
        let color = self.state.color();
        let selected_key = self.selected.as_ref().map(|o| o.key().clone());
        screen.list(
            &self.digests(),
            "No digests yet. Generate your first bi-weekly digest.",
            |s, digest| {
                let marker = if selected_key.as_ref() == Some(&endpoints::digest(digest.id)) {
                    ">"
                } else {
                    " "
                };
                let mut tags = vec![badge(
                    &humanize(digest.digest_type.as_deref().unwrap_or("digest")),
                    digest_type_tone(digest.digest_type.as_deref()),
                    color,
                )];
                if digest.slack_posted {
                    tags.push(paint("✓ Slack", Tone::Green, color));
                }
                s.line(format!("{} {}", marker, digest.title()));
                s.indented(
                    2,
                    format!("{}  {}", tags.join(" "), format_date(digest.generated_at.as_deref())),
                );
            },
        );
    }

    fn render_detail(&self, screen: &mut Screen) {
        let color = self.state.color();
        if self.selected.is_none() {
            screen.blank();
            screen.placeholder("Select a digest to preview");
            return;
        }
        let digest = match self.selected() {
            Loadable::Ready(digest) => digest,
            Loadable::Failed(e) => {
                screen.error(&e);
                return;
            }
            _ => {
                screen.loading();
                return;
            }
        };

        screen.heading(&digest.title());
        let mut meta = format!(
            "{}  Week {}, {}",
            badge(
                &humanize(digest.digest_type.as_deref().unwrap_or("digest")),
                digest_type_tone(digest.digest_type.as_deref()),
                color
            ),
            digest.week_number.map(|w| w.to_string()).unwrap_or_else(|| DASH.to_string()),
            digest.year.map(|y| y.to_string()).unwrap_or_else(|| DASH.to_string()),
        );
        if digest.slack_posted {
            meta.push_str(&format!("  {}", paint("Posted to Slack", Tone::Green, color)));
        } else if digest.status.as_deref() == Some("completed") {
            meta.push_str("  (post to Slack)");
        }
        screen.line(meta);

        let content = digest.content.unwrap_or_default();
        if let Some(summary) = content.summary.as_deref().filter(|s| !s.is_empty()) {
            screen.blank();
            screen.indented(1, summary);
        }
        if let Some(signals) = &content.top_signals {
            screen.heading("Top Signals");
            for signal in signals {
                let score = signal.score.unwrap_or(0);
                screen.line(format!(
                    "  {} {}",
                    badge(&score.to_string(), score_tone(score), color),
                    signal.title
                ));
                if let Some(entity) = signal.entity_name.as_deref() {
                    screen.indented(3, entity);
                }
            }
        }
        if !content.exec_moves.is_empty() {
            screen.heading("Executive Movements");
            for movement in &content.exec_moves {
                let mut line = movement.name.clone();
                if let Some(from) = movement.from_company.as_deref() {
                    line.push_str(&format!(" left {}", from));
                }
                if let Some(to) = movement.to_company.as_deref() {
                    line.push_str(&format!(" → joined {}", to));
                }
                screen.item(line);
            }
        }
        if !content.deal_updates.is_empty() {
            screen.heading("Deal Updates");
            for update in &content.deal_updates {
                screen.item(update.text());
            }
        }
        if let Some(actions) = &content.key_actions {
            screen.heading("Recommended Actions");
            for action in actions.items() {
                screen.line(format!("  → {}", action));
            }
        }
        if digest.generated_at.is_some() {
            screen.blank();
            screen.placeholder(&format!("Generated {}", format_date(digest.generated_at.as_deref())));
        }
    }
}

impl Page for DigestsPage {
    fn route(&self) -> Route {
        Route::Digests
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("Digests");
        self.render_list(screen);
        self.render_detail(screen);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use serde_json::Value;

    fn digest(posted: bool) -> Value {
        json!({
            "id": 12, "digest_type": "competitor_focus", "week_number": 9, "year": 2026,
            "status": "completed", "slack_posted": posted,
            "generated_at": "2026-03-01T08:00:00Z",
            "content": {
                "summary": "Acme doubled down on payers.",
                "top_signals": [{"title": "Acme raises", "score": 88, "entity_name": "Acme"}],
                "exec_moves": [{"name": "Dana Reyes", "from_company": "Beta", "to_company": "Acme"}],
                "deal_updates": ["Humana moved to eval", {"summary": "Aetna paused"}],
                "key_actions": "Brief the Humana team"
            }
        })
    }

    #[tokio::test]
    async fn test_detail_sections() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/digests", json!({"digests": [digest(false)]}));
        backend.respond("GET /api/digests/12", digest(false));
        let mut page = DigestsPage::new(signed_in(&backend));
        let screen = wait_for_text(&page, "Digest — Week 9, 2026").await;
        assert!(screen.contains("[competitor focus]  Mar 1, 2026"));
        assert!(screen.contains("Select a digest to preview"));

        page.select(Some(12));
        let screen = wait_for_text(&page, "Acme doubled down on payers.").await;
        assert!(screen.contains("> Digest — Week 9, 2026"));
        assert!(screen.contains("Week 9, 2026  (post to Slack)"));
        assert!(screen.contains("[88] Acme raises"));
        assert!(screen.contains("• Dana Reyes left Beta → joined Acme"));
        assert!(screen.contains("• Aetna paused"));
        assert!(screen.contains("→ Brief the Humana team"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_refreshes_list_after_delay() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/digests", json!({"digests": []}));
        backend.respond("POST /api/digests/generate", json!({"success": true}));
        let state = signed_in(&backend);
        let page = DigestsPage::new(state.clone());
        wait_for_text(&page, "No digests yet").await;
        assert_eq!(backend.call_count("GET /api/digests"), 1);

        page.generate().await.unwrap();
        assert_eq!(state.notices.last().unwrap().message, "Digest generation started");
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(backend.call_count("GET /api/digests"), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.call_count("GET /api/digests"), 2);
    }

    #[tokio::test]
    async fn test_post_to_slack_refreshes_detail() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond_seq(
            "GET /api/digests",
            vec![json!({"digests": [digest(false)]}), json!({"digests": [digest(true)]})],
        );
        backend.respond_seq("GET /api/digests/12", vec![digest(false), digest(true)]);
        backend.respond("POST /api/digests/12/post-slack", json!({"success": true}));
        let state = signed_in(&backend);
        let mut page = DigestsPage::new(state.clone());
        page.select(Some(12));
        wait_for_text(&page, "(post to Slack)").await;

        page.post_to_slack(12).await.unwrap();
        assert_eq!(state.notices.last().unwrap().message, "Posted to Slack");
        let screen = wait_for_text(&page, "Posted to Slack").await;
        assert!(!screen.contains("(post to Slack)"));
        wait_for_text(&page, "✓ Slack").await;
    }
}
