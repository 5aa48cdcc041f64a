//! Signals inbox: filter by entity, status, type and minimum score, and mark
//! new signals as reviewed.

use std::sync::Arc;

use serde_json::json;

use super::{filter_line, observe, perform, poll, Page};
use crate::api::endpoints::{self, scope};
use crate::api::QueryParams;
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::helpers::relative;
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, score_tone, signal_type_tone, Tone};
use crate::types::{EntityList, Signal, SignalList, SignalStatus};

pub const SIGNAL_TYPES: &[&str] = &[
    "all",
    "news",
    "product_launch",
    "exec_change",
    "hiring",
    "partnership",
    "funding",
    "email_mention",
    "deal_alert",
];
pub const STATUSES: &[&str] = &["new", "reviewed", "archived"];

/// Score slider bounds.
pub const SCORE_STEP: u8 = 10;
pub const SCORE_MAX: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalFilters {
    pub entity_id: Option<i64>,
    pub status: SignalStatus,
    pub signal_type: String,
    pub min_score: u8,
}

impl Default for SignalFilters {
    fn default() -> Self {
        Self {
            entity_id: None,
            status: SignalStatus::New,
            signal_type: "all".to_string(),
            min_score: 0,
        }
    }
}

impl SignalFilters {
    /// Status is always sent; the rest only when narrowing.
    pub fn params(&self) -> QueryParams {
        QueryParams::new()
            .with("status", self.status)
            .with_opt("entity_id", self.entity_id)
            .with_filter("signal_type", &self.signal_type)
            .with_opt("min_score", (self.min_score > 0).then_some(self.min_score))
    }

    /// Snap to the slider's step and clamp to 0..=100.
    pub fn set_min_score(&mut self, score: u8) {
        let score = score.min(SCORE_MAX);
        self.min_score = score - score % SCORE_STEP;
    }
}

pub struct SignalsPage {
    state: Arc<AppState>,
    filters: SignalFilters,
    entities: QueryObserver<EntityList>,
    signals: QueryObserver<SignalList>,
}

impl SignalsPage {
    pub fn new(state: Arc<AppState>) -> Self {
        let filters = SignalFilters::default();
        let entities = observe(&state, endpoints::entities(QueryParams::new()));
        let signals = Self::signals_query(&state, &filters);
        Self {
            state,
            filters,
            entities,
            signals,
        }
    }

    fn signals_query(state: &AppState, filters: &SignalFilters) -> QueryObserver<SignalList> {
        poll(
            state,
            endpoints::signals(filters.params()),
            state.config.polling.signals_secs,
        )
    }

    pub fn filters(&self) -> &SignalFilters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: SignalFilters) {
        if filters == self.filters {
            return;
        }
        self.signals = Self::signals_query(&self.state, &filters);
        self.filters = filters;
    }

    pub fn signals(&self) -> Loadable<Vec<Signal>> {
        self.signals.current().map(|list| list.signals)
    }

    pub async fn review(&self, id: i64) -> Result<(), ClientError> {
        perform(
            &self.state,
            Mutation::post(endpoints::signal_review_path(id), json!({}))
                .invalidates(scope::SIGNALS)
                .invalidates(scope::SIGNAL_STATS),
            "Signal marked as reviewed",
            "Failed to update signal",
        )
        .await
        .map(|_| ())
    }

    fn entity_label(&self) -> String {
        let Some(id) = self.filters.entity_id else {
            return "All entities".to_string();
        };
        self.entities
            .current()
            .ready()
            .and_then(|list| list.entities.iter().find(|e| e.id == id).map(|e| e.name.clone()))
            .unwrap_or_else(|| format!("#{}", id))
    }
}

impl Page for SignalsPage {
    fn route(&self) -> Route {
        Route::Signals
    }

    fn render(&self, screen: &mut Screen) {
        let color = self.state.color();
        let signals = self.signals();
        match signals.ready() {
            Some(list) => screen.title(&format!("Signals ({})", list.len())),
            None => screen.title("Signals"),
        };
        screen.line(format!("Entity: {}", self.entity_label()));
        screen.line(filter_line("Status", STATUSES, self.filters.status.as_str()));
        screen.line(filter_line("Type", SIGNAL_TYPES, &self.filters.signal_type));
        screen.line(format!("Min score: {}", self.filters.min_score));
        screen.blank();

        screen.list(&signals, "No signals in this view", |s, signal| {
            let mut header = format!(
                "{} {}",
                badge(&signal.score.to_string(), score_tone(signal.score), color),
                badge(&signal.signal_type.replacen('_', " ", 1), signal_type_tone(&signal.signal_type), color)
            );
            if let Some(entity) = signal.entity_name.as_deref().filter(|e| !e.is_empty()) {
                header.push(' ');
                header.push_str(&badge(entity, Tone::Blue, color));
            }
            if signal.status == SignalStatus::New {
                header.push_str("  (review)");
            }
            s.line(format!("  {}", header));
            s.indented(2, &signal.title);
            if let Some(summary) = signal.summary.as_deref().filter(|t| !t.is_empty()) {
                s.indented(2, summary);
            }
            if let Some(rationale) = signal.score_rationale.as_deref().filter(|t| !t.is_empty()) {
                s.indented(2, format!("\"{}\"", rationale));
            }
            let mut meta = vec![relative(signal.source_date.as_deref())];
            if let Some(source) = signal.source_name.as_deref() {
                meta.push(source.to_string());
            }
            if let Some(url) = signal.source_url.as_deref() {
                meta.push(format!("Source → {}", url));
            }
            s.indented(2, meta.join("  "));
        });
    }
}
