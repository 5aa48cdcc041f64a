//! Battle cards: list by status, preview one, generate and approve.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{current, filter_line, observe, perform, report, Page};
use crate::api::endpoints::{self, scope};
use crate::api::QueryParams;
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::forms::{BattleCardForm, Modal, DISTYL_PRODUCTS, USE_CASES};
use crate::helpers::{format_date, humanize, DASH};
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, battle_card_tone};
use crate::types::{BattleCard, BattleCardList, BattleCardStatus, EntityList, EntityType};

pub const STATUS_FILTERS: &[&str] = &["all", "draft", "approved"];

pub struct BattleCardsPage {
    state: Arc<AppState>,
    status: String,
    cards: QueryObserver<BattleCardList>,
    entities: QueryObserver<EntityList>,
    selected: Option<QueryObserver<BattleCard>>,
    modal: Modal<BattleCardForm>,
}

fn status_params(status: &str) -> QueryParams {
    QueryParams::new().with_filter("status", status)
}

impl BattleCardsPage {
    pub fn new(state: Arc<AppState>) -> Self {
        let status = "all".to_string();
        let cards = observe(&state, endpoints::battle_cards(status_params(&status)));
        let entities = observe(&state, endpoints::entities(QueryParams::new()));
        Self {
            state,
            status,
            cards,
            entities,
            selected: None,
            modal: Modal::new(),
        }
    }

    pub fn set_status(&mut self, status: &str) {
        if status == self.status {
            return;
        }
        self.cards = observe(&self.state, endpoints::battle_cards(status_params(status)));
        self.status = status.to_string();
    }

    pub fn cards(&self) -> Loadable<Vec<BattleCard>> {
        self.cards.current().map(|list| list.battle_cards)
    }

    pub fn select(&mut self, id: Option<i64>) {
        self.selected = id.map(|id| observe(&self.state, endpoints::battle_card(id)));
    }

    pub fn selected(&self) -> Loadable<BattleCard> {
        current(&self.selected)
    }

    pub async fn approve(&self, id: i64) -> Result<(), ClientError> {
        perform(
            &self.state,
            Mutation::post(endpoints::battle_card_approve_path(id), json!({}))
                .invalidates(scope::BATTLE_CARDS)
                .invalidates_key(endpoints::battle_card(id)),
            "Battle card approved",
            "Failed to approve battle card",
        )
        .await
        .map(|_| ())
    }

    pub fn modal(&self) -> &Modal<BattleCardForm> {
        &self.modal
    }

    pub fn open_generate(&mut self) {
        self.modal.open(BattleCardForm::default());
    }

    pub fn form_mut(&mut self) -> Option<&mut BattleCardForm> {
        self.modal.form_mut()
    }

    pub fn cancel(&mut self) {
        self.modal.close();
    }

    /// Start generation. The card appears in the list once the server
    /// finishes, so nothing is invalidated here.
    pub async fn generate(&mut self) -> Result<(), ClientError> {
        let cache = self.state.cache.clone();
        let result = self
            .modal
            .submit(|body| async move {
                Mutation::post(endpoints::BATTLE_CARD_GENERATE, body)
                    .run(&cache)
                    .await
            })
            .await;
        report(
            &self.state,
            result,
            "Battle card generation started",
            "Generation failed",
        )
        .map(|_| ())
    }

    fn render_list(&self, screen: &mut Screen) {
        let color = self.state.color();
        screen.line(filter_line("Status", STATUS_FILTERS, &self.status));
        screen.blank();
        let selected_key = self.selected.as_ref().map(|o| o.key().clone());
        screen.list(
            &self.cards(),
            "No battle cards yet. Generate one for a competitor.",
            |s, card| {
                let marker = if selected_key.as_ref() == Some(&endpoints::battle_card(card.id)) {
                    ">"
                } else {
                    " "
                };
                s.line(format!(
                    "{} {} {}",
                    marker,
                    card.entity_name.as_deref().unwrap_or(DASH),
                    badge(card.status.as_str(), battle_card_tone(card.status), color)
                ));
                s.indented(2, subtitle(card));
            },
        );
    }

    fn render_detail(&self, screen: &mut Screen) {
        let color = self.state.color();
        if self.selected.is_none() {
            screen.blank();
            screen.placeholder("Select a battle card to preview");
            return;
        }
        let card = match self.selected() {
            Loadable::Ready(card) => card,
            Loadable::Failed(e) => {
                screen.error(&e);
                return;
            }
            _ => {
                screen.loading();
                return;
            }
        };
        screen.heading(card.entity_name.as_deref().unwrap_or(DASH));
        let mut status = badge(card.status.as_str(), battle_card_tone(card.status), color);
        if card.status == BattleCardStatus::Draft {
            status.push_str("  (approve)");
        }
        screen.line(format!("{}  {}", subtitle(&card), status));
        for (key, value) in &card.content {
            screen.blank();
            screen.line(humanize(key).to_uppercase());
            render_value(screen, value);
        }
        if card.generated_at.is_some() {
            screen.blank();
            screen.placeholder(&format!("Generated {}", format_date(card.generated_at.as_deref())));
        }
    }

    fn render_modal(&self, screen: &mut Screen) {
        let Some(form) = self.modal.form() else {
            return;
        };
        screen.heading("Generate Battle Card");
        let competitors: Vec<String> = self
            .entities
            .current()
            .into_ready()
            .map(|l| {
                l.entities
                    .into_iter()
                    .filter(|e| e.entity_type == EntityType::Competitor)
                    .map(|e| format!("{} (#{})", e.name, e.id))
                    .collect()
            })
            .unwrap_or_default();
        screen.kv("Competitor *", &form.entity_id);
        if !competitors.is_empty() {
            screen.indented(2, competitors.join(", "));
        }
        screen.line(filter_line("Use Case", USE_CASES, &form.use_case));
        screen.line(filter_line("Product", DISTYL_PRODUCTS, &form.distyl_product));
        if self.modal.is_submitting() {
            screen.placeholder("Generating…");
        }
    }
}

fn subtitle(card: &BattleCard) -> String {
    format!(
        "{} · {}",
        card.use_case.as_deref().unwrap_or(DASH),
        card.distyl_product.as_deref().unwrap_or(DASH)
    )
}

/// Text as a paragraph, arrays as bullets, anything else pretty-printed.
fn render_value(screen: &mut Screen, value: &Value) {
    match value {
        Value::String(text) => {
            screen.indented(1, text);
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(text) => screen.item(text),
                    other => screen.item(other.to_string()),
                };
            }
        }
        other => {
            let pretty = serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string());
            screen.indented(1, pretty);
        }
    }
}

impl Page for BattleCardsPage {
    fn route(&self) -> Route {
        Route::BattleCards
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("Battle Cards");
        self.render_list(screen);
        self.render_detail(screen);
        self.render_modal(screen);
    }
}
