//! Pipeline: deals by stage and the deal × competitor matrix.

use std::sync::Arc;

use super::{filter_line, observe, perform, report, Page};
use crate::api::endpoints::{self, scope};
use crate::api::QueryParams;
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::forms::{DealChange, DealForm, FormPayload, Modal};
use crate::helpers::{format_date, format_value, humanize, DASH};
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, paint, stage_tone, Tone};
use crate::types::{CompetitiveMap, Deal, DealList, DealStage};

const MATRIX_ACCOUNT_WIDTH: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineView {
    #[default]
    Deals,
    CompetitiveMap,
}

pub struct PipelinePage {
    state: Arc<AppState>,
    view: PipelineView,
    /// `None` shows every stage.
    stage: Option<DealStage>,
    deals: QueryObserver<DealList>,
    competitive_map: QueryObserver<CompetitiveMap>,
    modal: Modal<DealForm>,
}

fn stage_params(stage: Option<DealStage>) -> QueryParams {
    QueryParams::new().with_opt("stage", stage)
}

impl PipelinePage {
    pub fn new(state: Arc<AppState>) -> Self {
        let deals = observe(&state, endpoints::deals(stage_params(None)));
        let competitive_map = observe(&state, endpoints::competitive_map());
        Self {
            state,
            view: PipelineView::default(),
            stage: None,
            deals,
            competitive_map,
            modal: Modal::new(),
        }
    }

    pub fn view(&self) -> PipelineView {
        self.view
    }

    pub fn set_view(&mut self, view: PipelineView) {
        self.view = view;
    }

    pub fn set_stage(&mut self, stage: Option<DealStage>) {
        if stage == self.stage {
            return;
        }
        self.deals = observe(&self.state, endpoints::deals(stage_params(stage)));
        self.stage = stage;
    }

    pub fn deals(&self) -> Loadable<Vec<Deal>> {
        self.deals.current().map(|list| list.deals)
    }

    pub fn modal(&self) -> &Modal<DealForm> {
        &self.modal
    }

    pub fn open_add(&mut self) {
        self.modal.open(DealForm::default());
    }

    pub fn form_mut(&mut self) -> Option<&mut DealForm> {
        self.modal.form_mut()
    }

    pub fn cancel(&mut self) {
        self.modal.close();
    }

    pub async fn submit(&mut self) -> Result<(), ClientError> {
        let cache = self.state.cache.clone();
        let result = self
            .modal
            .submit(|body| async move {
                Mutation::post(endpoints::DEALS_PATH, body)
                    .invalidates(scope::DEALS)
                    .invalidates(scope::COMPETITIVE_MAP)
                    .run(&cache)
                    .await
            })
            .await;
        report(&self.state, result, "Deal created", "Failed to create deal").map(|_| ())
    }

    pub async fn update(&self, id: i64, change: DealChange) -> Result<(), ClientError> {
        let body = change.payload()?;
        perform(
            &self.state,
            Mutation::put(endpoints::deal_path(id), body)
                .invalidates(scope::DEALS)
                .invalidates(scope::COMPETITIVE_MAP),
            "Deal updated",
            "Failed to update deal",
        )
        .await
        .map(|_| ())
    }

    pub async fn move_to_stage(&self, id: i64, stage: DealStage) -> Result<(), ClientError> {
        self.update(
            id,
            DealChange {
                stage: Some(stage.as_str().to_string()),
                ..DealChange::default()
            },
        )
        .await
    }

    fn render_deals(&self, screen: &mut Screen) {
        let color = self.state.color();
        let mut stages = vec!["all"];
        stages.extend(DealStage::ALL.iter().map(|s| s.as_str()));
        let selected = self.stage.map(|s| s.as_str()).unwrap_or("all");
        screen.line(filter_line("Stage", &stages, selected));
        screen.blank();

        screen.list(&self.deals(), "No deals yet", |s, deal| {
            let mut header = format!("  {}", deal.account_name);
            if let Some(name) = deal.deal_name.as_deref().filter(|n| !n.is_empty()) {
                header.push_str(&format!(" ({})", name));
            }
            s.line(header);
            s.indented(
                2,
                format!(
                    "{}  {}  {}  owner {}  close {}",
                    badge(&humanize(deal.stage.as_str()), stage_tone(deal.stage), color),
                    deal.distyl_product.as_deref().unwrap_or(DASH),
                    format_value(deal.value_usd),
                    deal.owner.as_deref().filter(|o| !o.is_empty()).unwrap_or(DASH),
                    format_date(deal.close_date.as_deref()),
                ),
            );
            let competitors: Vec<String> = deal
                .competitors
                .iter()
                .filter_map(|c| c.entity_name.as_deref())
                .map(|name| badge(name, Tone::Red, color))
                .collect();
            if competitors.is_empty() {
                s.indented(2, paint("None identified", Tone::Gray, color));
            } else {
                s.indented(2, format!("vs {}", competitors.join(" ")));
            }
        });
    }

    fn render_matrix(&self, screen: &mut Screen) {
        let color = self.state.color();
        screen.heading("Deal × Competitor Matrix");
        let map = match self.competitive_map.current() {
            Loadable::Ready(map) => map,
            Loadable::Failed(e) => {
                screen.error(&e);
                return;
            }
            _ => {
                screen.loading();
                return;
            }
        };
        if map.matrix.is_empty() {
            screen.placeholder("No competitive data available");
            return;
        }
        let mut header = format!("  {:<width$}", "Account", width = MATRIX_ACCOUNT_WIDTH);
        for competitor in &map.competitors {
            header.push_str(&format!(" {}", competitor.name));
        }
        screen.line(header);
        for row in &map.matrix {
            let mut line = format!("  {:<width$}", row.account_name, width = MATRIX_ACCOUNT_WIDTH);
            for competitor in &map.competitors {
                let involved = row
                    .competitors
                    .get(&competitor.name)
                    .map(|v| v.is_some())
                    .unwrap_or(false);
                let mark = if involved {
                    paint("✓", Tone::Red, color)
                } else {
                    paint("·", Tone::Gray, color)
                };
                // Center the mark under the competitor's column.
                let width = competitor.name.chars().count();
                let pad = width.saturating_sub(1) / 2;
                line.push_str(&format!(" {}{}{}", " ".repeat(pad), mark, " ".repeat(width.saturating_sub(pad + 1))));
            }
            screen.line(line.trim_end().to_string());
        }
    }

    fn render_modal(&self, screen: &mut Screen) {
        let Some(form) = self.modal.form() else {
            return;
        };
        screen.heading("Add Deal");
        screen.kv("Account Name *", &form.account_name);
        screen.kv("Deal Name", &form.deal_name);
        screen.kv("Stage", humanize(&form.stage));
        screen.kv("Product", &form.distyl_product);
        screen.kv("Value (USD)", &form.value_usd);
        screen.kv("Owner", &form.owner);
        screen.kv("Close Date", &form.close_date);
        if self.modal.is_submitting() {
            screen.placeholder("Saving…");
        }
    }
}

impl Page for PipelinePage {
    fn route(&self) -> Route {
        Route::Pipeline
    }

    fn render(&self, screen: &mut Screen) {
        match self.deals.current().ready() {
            Some(list) => screen.title(&format!("Pipeline ({} deals)", list.deals.len())),
            None => screen.title("Pipeline"),
        };
        let tabs = match self.view {
            PipelineView::Deals => "[Deals]  Competitive Map",
            PipelineView::CompetitiveMap => "Deals  [Competitive Map]",
        };
        screen.line(tabs);
        match self.view {
            PipelineView::Deals => self.render_deals(screen),
            PipelineView::CompetitiveMap => self.render_matrix(screen),
        }
        self.render_modal(screen);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use serde_json::json;
    use std::time::Duration;

    fn script(backend: &FakeBackend) {
        backend.respond(
            "GET /api/deals",
            json!({"deals": [{
                "id": 4, "account_name": "Humana", "deal_name": "Claims pilot",
                "stage": "eval", "value_usd": 1200000, "distyl_product": "Tower",
                "competitors": [{"id": 1, "entity_id": 3, "entity_name": "Acme"}]
            }, {
                "id": 5, "account_name": "Aetna", "stage": "prospecting"
            }]}),
        );
        backend.respond(
            "GET /api/deals/competitive-map",
            json!({
                "matrix": [
                    {"deal_id": 4, "account_name": "Humana", "competitors": {"Acme": "primary", "Beta": null}},
                    {"deal_id": 5, "account_name": "Aetna", "competitors": {"Acme": null, "Beta": "secondary"}}
                ],
                "competitors": [{"id": 3, "name": "Acme"}, {"id": 6, "name": "Beta"}]
            }),
        );
    }

    #[tokio::test]
    async fn test_deal_rows() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        let page = PipelinePage::new(signed_in(&backend));
        let screen = wait_for_text(&page, "Humana (Claims pilot)").await;
        assert!(screen.contains("Pipeline (2 deals)"));
        assert!(screen.contains("[eval]  Tower  $1.2M  owner —  close —"));
        assert!(screen.contains("vs [Acme]"));
        assert!(screen.contains("None identified"));
    }

    #[tokio::test]
    async fn test_competitive_matrix_marks_involvement() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        let mut page = PipelinePage::new(signed_in(&backend));
        page.set_view(PipelineView::CompetitiveMap);
        let screen = wait_for_text(&page, "Deal × Competitor Matrix").await;
        let screen = if screen.contains("Humana") {
            screen
        } else {
            wait_for_text(&page, "Humana").await
        };
        let humana = screen.lines().iter().find(|l| l.contains("Humana")).unwrap();
        let aetna = screen.lines().iter().find(|l| l.contains("Aetna")).unwrap();
        assert!(humana.ends_with("·"));
        assert!(humana.contains("✓"));
        assert!(aetna.trim_end().ends_with("✓"));
    }

    #[tokio::test]
    async fn test_empty_matrix() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/deals", json!({"deals": []}));
        backend.respond("GET /api/deals/competitive-map", json!({"matrix": [], "competitors": []}));
        let mut page = PipelinePage::new(signed_in(&backend));
        wait_for_text(&page, "No deals yet").await;
        page.set_view(PipelineView::CompetitiveMap);
        wait_for_text(&page, "No competitive data available").await;
    }

    #[tokio::test]
    async fn test_stage_filter_param() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        let mut page = PipelinePage::new(signed_in(&backend));
        page.set_stage(Some(DealStage::Negotiation));
        let screen = wait_for_text(&page, "[negotiation]").await;
        assert!(screen.contains("Stage: all prospecting"));
        for _ in 0..200 {
            if backend
                .calls("GET /api/deals")
                .iter()
                .any(|c| c.params.get("stage") == Some("negotiation"))
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stage filter was never sent");
    }

    #[tokio::test]
    async fn test_create_deal_sends_numeric_value() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        backend.respond("POST /api/deals", json!({"id": 9}));
        let state = signed_in(&backend);
        let mut page = PipelinePage::new(state.clone());
        page.open_add();
        {
            let form = page.form_mut().unwrap();
            form.account_name = "Cigna".into();
            form.value_usd = "500000".into();
        }
        page.submit().await.unwrap();
        let body = backend.last_body("POST /api/deals").unwrap();
        assert_eq!(body["value_usd"], json!(500000));
        assert_eq!(state.notices.last().unwrap().message, "Deal created");
    }

    #[tokio::test]
    async fn test_move_to_stage_puts_partial_update() {
        let backend = Arc::new(FakeBackend::new());
        script(&backend);
        backend.respond("PUT /api/deals/4", json!({"id": 4, "stage": "closed_won"}));
        let state = signed_in(&backend);
        let page = PipelinePage::new(state.clone());
        page.move_to_stage(4, DealStage::ClosedWon).await.unwrap();
        assert_eq!(
            backend.last_body("PUT /api/deals/4").unwrap(),
            json!({"stage": "closed_won"})
        );
        assert_eq!(state.notices.last().unwrap().message, "Deal updated");
    }
}
