//! War room: headline stats, the rotating live ticker, top new signals, threat
//! distribution and news volume by source.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::{observe, poll, Page, ScopedTask};
use crate::api::{decode, endpoints, QueryParams};
use crate::cache::{Loadable, QueryObserver};
use crate::helpers::{proportion_bar, relative, DASH};
use crate::live::{FeedSeeder, LiveFeed, TickerDriver};
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, paint, score_tone, threat_tone, Tone};
use crate::types::{EntityStats, NewsItem, NewsList, NewsStats, SignalList, SignalStats, ThreatLevel};

const TOP_SIGNALS: usize = 5;
const THREAT_BAR_WIDTH: usize = 20;

pub struct WarRoomPage {
    state: Arc<AppState>,
    signal_stats: QueryObserver<SignalStats>,
    entity_stats: QueryObserver<EntityStats>,
    news_stats: QueryObserver<NewsStats>,
    signals: QueryObserver<SignalList>,
    // Kept alive for its seeding task.
    _news: QueryObserver<NewsList>,
    ticker_feed: LiveFeed<NewsItem>,
    ticker: TickerDriver,
    _seeding: ScopedTask,
}

impl WarRoomPage {
    pub fn new(state: Arc<AppState>) -> Self {
        let polling = &state.config.polling;
        let live = &state.config.live;

        let signal_stats = poll(&state, endpoints::signal_stats(), polling.signal_stats_secs);
        let entity_stats = observe(&state, endpoints::entity_stats());
        let news_stats = observe(&state, endpoints::news_stats());
        let signals = poll(
            &state,
            endpoints::signals(QueryParams::new().with("status", "new")),
            polling.signals_secs,
        );
        let news: QueryObserver<NewsList> = poll(
            &state,
            endpoints::news(QueryParams::new().with("limit", live.ticker_seed)),
            polling.news_secs,
        );

        let ticker_feed = LiveFeed::subscribe(
            Arc::clone(&state.backend),
            endpoints::NEWS_LIVE,
            live.ticker_capacity,
            Duration::from_secs(live.reconnect_secs),
        );
        let ticker = TickerDriver::spawn(
            ticker_feed.buffer(),
            ticker_feed.watch_revisions(),
            Duration::from_secs(live.ticker_interval_secs),
        );
        let seeding = ScopedTask::spawn(seed_from_news(
            news.watch(),
            ticker_feed.seeder(),
            live.ticker_seed,
        ));

        Self {
            state,
            signal_stats,
            entity_stats,
            news_stats,
            signals,
            _news: news,
            ticker_feed,
            ticker,
            _seeding: seeding,
        }
    }

    /// Headline currently shown by the ticker.
    pub fn current_headline(&self) -> Option<NewsItem> {
        let ticker = self.ticker.ticker();
        let buffer = self.ticker_feed.buffer();
        let buffer = buffer.lock();
        let item = ticker.current(&buffer).cloned();
        item
    }

    pub fn ticker_len(&self) -> usize {
        self.ticker_feed.len()
    }

    fn render_ticker(&self, screen: &mut Screen) {
        let Some(item) = self.current_headline() else {
            return;
        };
        let color = self.state.color();
        screen.line(format!("{} {}", badge("LIVE", Tone::Purple, color), item.headline));
        let mut meta = format!(
            "{} · {}",
            item.source_name.as_deref().unwrap_or(DASH),
            relative(item.published_at.as_deref())
        );
        if let Some(entity) = item.entity_name.as_deref().filter(|e| !e.is_empty()) {
            meta.push_str(" · ");
            meta.push_str(entity);
        }
        screen.indented(3, meta);
    }

    fn render_stats(&self, screen: &mut Screen) {
        let signal_stats = self.signal_stats.current().into_ready().unwrap_or_default();
        let entity_total = self
            .entity_stats
            .current()
            .ready()
            .map(|s| s.total)
            .unwrap_or(0);
        let news_total = self
            .news_stats
            .current()
            .ready()
            .map(|s| s.total)
            .unwrap_or(0);

        screen.blank();
        stat_card(screen, "New Signals", signal_stats.total_new, "requiring review");
        stat_card(screen, "High Priority", signal_stats.high_score, "score ≥ 80");
        stat_card(screen, "Active Entities", entity_total, "being tracked");
        stat_card(screen, "News Today", news_total, "from all sources");
    }

    fn render_top_signals(&self, screen: &mut Screen) {
        let color = self.state.color();
        screen.heading("Top Signals");
        let signals = self
            .signals
            .current()
            .map(|list| list.signals.into_iter().take(TOP_SIGNALS).collect::<Vec<_>>());
        screen.list(&signals, "No new signals", |s, signal| {
            s.line(format!(
                "  {} {}",
                badge(&signal.score.to_string(), score_tone(signal.score), color),
                signal.title
            ));
            s.indented(
                3,
                format!(
                    "{} · {}",
                    signal.entity_name.as_deref().unwrap_or(DASH),
                    relative(signal.source_date.as_deref())
                ),
            );
        });
    }

    fn render_threats(&self, screen: &mut Screen) {
        let color = self.state.color();
        screen.heading("Threat Levels");
        match self.entity_stats.current() {
            Loadable::Ready(stats) if stats.by_threat.is_empty() => {
                screen.placeholder("No entity data yet");
            }
            Loadable::Ready(stats) => {
                let total = stats.total.max(1);
                for (level, count) in &stats.by_threat {
                    let tone = threat_tone(ThreatLevel::parse(level));
                    screen.line(format!(
                        "  {:<12} {} {}",
                        badge(level, tone, color),
                        proportion_bar(*count, total, THREAT_BAR_WIDTH),
                        count
                    ));
                }
            }
            Loadable::Failed(e) => {
                screen.error(&e);
            }
            Loadable::Loading | Loadable::Idle => {
                screen.loading();
            }
        }
    }

    fn render_sources(&self, screen: &mut Screen) {
        let Some(stats) = self.news_stats.current().into_ready() else {
            return;
        };
        screen.heading("News by Source (Last 24h)");
        if stats.by_source.is_empty() {
            screen.placeholder("No news from any source yet");
            return;
        }
        for (source, count) in &stats.by_source {
            screen.kv(&source.replacen('_', " ", 1), count);
        }
    }
}

fn stat_card(screen: &mut Screen, label: &str, value: u64, sub: &str) {
    let color = screen.color();
    screen.line(format!(
        "  {:<16} {:>5}  {}",
        label,
        value,
        paint(sub, Tone::Gray, color)
    ));
}

/// Reseed the ticker with the head of the news list whenever the list loads
/// with different contents.
async fn seed_from_news(
    mut news: tokio::sync::watch::Receiver<crate::cache::QueryState>,
    seeder: FeedSeeder<NewsItem>,
    limit: usize,
) {
    let mut last: Option<Arc<Value>> = None;
    loop {
        let data = news.borrow_and_update().data.clone();
        if let Some(data) = data {
            if last.as_deref() != Some(data.as_ref()) {
                match decode::<NewsList>(&data) {
                    Ok(list) if !list.news.is_empty() => {
                        log::debug!("WarRoom: seeding ticker with {} items", list.news.len().min(limit));
                        seeder.seed(list.news.into_iter().take(limit));
                    }
                    Ok(_) => {}
                    Err(e) => log::debug!("WarRoom: news list not usable for ticker: {}", e),
                }
                last = Some(data);
            }
        }
        if news.changed().await.is_err() {
            return;
        }
    }
}

impl Page for WarRoomPage {
    fn route(&self) -> Route {
        Route::WarRoom
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("War Room");
        screen.line("Live competitive intelligence — what the AI is watching right now");
        screen.blank();
        self.render_ticker(screen);
        self.render_stats(screen);
        self.render_top_signals(screen);
        self.render_threats(screen);
        self.render_sources(screen);
    }
}
