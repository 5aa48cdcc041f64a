//! News feed: filtered server list with live items prepended.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::{filter_line, observe, poll, Page};
use crate::api::endpoints::{self, scope};
use crate::api::QueryParams;
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::helpers::{humanize, relative, DASH};
use crate::live::LiveFeed;
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, score_tone, Tone};
use crate::types::{EntityList, NewsItem, NewsList};

pub const SOURCE_TYPES: &[&str] = &["all", "newsapi", "perplexity", "rss", "claude_search"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsFilters {
    pub entity_id: Option<i64>,
    pub source_type: String,
}

impl NewsFilters {
    pub fn params(&self) -> QueryParams {
        QueryParams::new()
            .with_opt("entity_id", self.entity_id)
            .with_filter("source_type", &self.source_type)
    }
}

pub struct NewsPage {
    state: Arc<AppState>,
    filters: NewsFilters,
    entities: QueryObserver<EntityList>,
    news: QueryObserver<NewsList>,
    live: LiveFeed<NewsItem>,
}

impl NewsPage {
    pub fn new(state: Arc<AppState>) -> Self {
        let filters = NewsFilters {
            entity_id: None,
            source_type: "all".to_string(),
        };
        let entities = observe(&state, endpoints::entities(QueryParams::new()));
        let news = Self::news_query(&state, &filters);
        let live = LiveFeed::subscribe(
            Arc::clone(&state.backend),
            endpoints::NEWS_LIVE,
            state.config.live.feed_capacity,
            Duration::from_secs(state.config.live.reconnect_secs),
        );
        Self {
            state,
            filters,
            entities,
            news,
            live,
        }
    }

    fn news_query(state: &AppState, filters: &NewsFilters) -> QueryObserver<NewsList> {
        poll(
            state,
            endpoints::news(filters.params()),
            state.config.polling.news_secs,
        )
    }

    pub fn filters(&self) -> &NewsFilters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: NewsFilters) {
        if filters == self.filters {
            return;
        }
        self.news = Self::news_query(&self.state, &filters);
        self.filters = filters;
    }

    /// Pause or resume the live subscription.
    pub fn set_live(&self, enabled: bool) {
        self.live.set_enabled(enabled);
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live items first (newest first), then the server list.
    pub fn items(&self) -> Loadable<Vec<NewsItem>> {
        let live = self.live.items();
        self.news.current().map(|list| {
            let mut all = live;
            all.extend(list.news);
            all
        })
    }

    /// With an entity selected, ask the server to fetch fresh news for it;
    /// otherwise just reload the list.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let Some(entity_id) = self.filters.entity_id else {
            self.news.refetch();
            self.state.notices.success("Feed refreshed");
            return Ok(());
        };
        let result = Mutation::post(endpoints::NEWS_REFRESH, json!({ "entity_id": entity_id }))
            .invalidates(scope::NEWS)
            .run(&self.state.cache)
            .await;
        match result {
            Ok(_) => {
                self.state.notices.success("News refresh triggered");
                Ok(())
            }
            Err(e) => {
                self.state.notices.error("Refresh failed");
                Err(e)
            }
        }
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

impl Page for NewsPage {
    fn route(&self) -> Route {
        Route::News
    }

    fn render(&self, screen: &mut Screen) {
        let color = self.state.color();
        let live_count = self.live_count();
        if live_count > 0 {
            screen.title(&format!("News Feed  ({} live)", live_count));
        } else {
            screen.title("News Feed");
        }
        screen.line(format!("Entity: {}", self.entity_label()));
        screen.line(filter_line("Source", SOURCE_TYPES, &self.filters.source_type));
        screen.blank();

        let items = self.items();
        let mut index = 0usize;
        screen.list(
            &items,
            "No news items yet. Trigger a refresh to fetch news.",
            |s, item| {
                let is_live = index < live_count;
                index += 1;

                let mut meta = Vec::new();
                if let Some(entity) = item.entity_name.as_deref().filter(|e| !e.is_empty()) {
                    meta.push(entity.to_string());
                }
                if let Some(source_type) = item.source_type.as_deref().filter(|t| !t.is_empty()) {
                    meta.push(humanize(source_type));
                }
                meta.push(item.source_name.clone().unwrap_or_else(|| DASH.to_string()));
                let mut header = meta.join(" · ");
                if is_live {
                    header = format!("{} {}", header, badge("NEW", Tone::Green, color));
                }

                s.line(format!("  {}", header));
                let mut headline = item.headline.clone();
                if item.relevance_score > 0 {
                    let score = item.relevance_score.clamp(0, 100) as u8;
                    headline = format!(
                        "{} {}",
                        badge(&item.relevance_score.to_string(), score_tone(score), color),
                        headline
                    );
                }
                s.indented(2, headline);
                if let Some(summary) = item.summary.as_deref().filter(|t| !t.is_empty()) {
                    s.indented(2, summary);
                }
                s.indented(2, relative(item.published_at.as_deref()));
            },
        );
    }
}
