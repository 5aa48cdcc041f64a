//! Page view-models.
//!
//! Mounting a page builds its struct, which starts the page's queries and live
//! subscriptions. Everything a page owns (observers, feeds, timers) is torn
//! down when the page is dropped, so navigating away cancels its work.

pub mod battle_cards;
pub mod chat;
pub mod digests;
pub mod dossiers;
pub mod ecosystem;
pub mod entities;
pub mod login;
pub mod news;
pub mod people;
pub mod pipeline;
pub mod settings;
pub mod signals;
pub mod war_room;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::endpoints;
use crate::cache::{
    CacheEvent, Loadable, Mutation, QueryCache, QueryKey, QueryObserver, QueryState,
    RefetchPolicy,
};
use crate::error::ClientError;
use crate::render::Screen;
use crate::routes::Route;
use crate::state::{AppState, NoticeKind};
use crate::style::{badge, paint, role_tone, Tone};
use crate::types::SignalStats;

/// A mounted page.
pub trait Page: Send {
    fn route(&self) -> Route;

    /// Append the page body to `screen`.
    fn render(&self, screen: &mut Screen);
}

/// Build the view-model for `route`.
pub fn mount(route: Route, state: Arc<AppState>) -> Box<dyn Page> {
    log::debug!("Pages: mounting {}", route);
    match route {
        Route::Login => Box::new(login::LoginPage::new(state)),
        Route::WarRoom => Box::new(war_room::WarRoomPage::new(state)),
        Route::News => Box::new(news::NewsPage::new(state)),
        Route::Entities => Box::new(entities::EntitiesPage::new(state)),
        Route::Dossiers(entity_id) => Box::new(dossiers::DossiersPage::new(state, entity_id)),
        Route::Signals => Box::new(signals::SignalsPage::new(state)),
        Route::People => Box::new(people::PeoplePage::new(state)),
        Route::Pipeline => Box::new(pipeline::PipelinePage::new(state)),
        Route::Ecosystem => Box::new(ecosystem::EcosystemPage::new(state)),
        Route::BattleCards => Box::new(battle_cards::BattleCardsPage::new(state)),
        Route::Digests => Box::new(digests::DigestsPage::new(state)),
        Route::Chat => Box::new(chat::ChatPage::new(state)),
        Route::Settings => Box::new(settings::SettingsPage::new(state)),
    }
}

// =============================================================================
// Shared plumbing
// =============================================================================

/// Background task tied to a page's lifetime.
pub struct ScopedTask(JoinHandle<()>);

impl ScopedTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A query whose key is derived from another query's data, e.g. the detail of
/// the first row of a list. The observer is replaced whenever the derived key
/// changes and dropped when there is no key.
pub struct Dependent<T> {
    slot: Arc<Mutex<Option<QueryObserver<T>>>>,
    _task: ScopedTask,
}

impl<T: DeserializeOwned + Send + 'static> Dependent<T> {
    pub fn spawn<F>(
        cache: &QueryCache,
        mut source: watch::Receiver<QueryState>,
        derive: F,
        policy: RefetchPolicy,
    ) -> Self
    where
        F: Fn(&Value) -> Option<QueryKey> + Send + 'static,
    {
        let slot: Arc<Mutex<Option<QueryObserver<T>>>> = Arc::new(Mutex::new(None));
        let task_slot = Arc::clone(&slot);
        let cache = cache.clone();
        let task = ScopedTask::spawn(async move {
            let mut current: Option<QueryKey> = None;
            loop {
                let data = source.borrow_and_update().data.clone();
                // Keep the last key while the source refetches or fails.
                if let Some(data) = data {
                    let next = derive(&data);
                    if next != current {
                        log::debug!("Dependent: key changed to {:?}", next.as_ref().map(|k| &k.path));
                        *task_slot.lock() = next
                            .clone()
                            .map(|key| QueryObserver::new(&cache, key, policy.clone()));
                        current = next;
                    }
                }
                if source.changed().await.is_err() {
                    return;
                }
            }
        });
        Self { slot, _task: task }
    }

    pub fn current(&self) -> Loadable<T> {
        match &*self.slot.lock() {
            Some(observer) => observer.current(),
            None => Loadable::Idle,
        }
    }

    pub fn key(&self) -> Option<QueryKey> {
        self.slot.lock().as_ref().map(|o| o.key().clone())
    }

    pub fn refetch(&self) {
        if let Some(observer) = &*self.slot.lock() {
            observer.refetch();
        }
    }
}

pub(crate) fn observe<T: DeserializeOwned>(state: &AppState, key: QueryKey) -> QueryObserver<T> {
    QueryObserver::new(&state.cache, key, RefetchPolicy::Never)
}

pub(crate) fn poll<T: DeserializeOwned>(
    state: &AppState,
    key: QueryKey,
    every_secs: u64,
) -> QueryObserver<T> {
    QueryObserver::new(
        &state.cache,
        key,
        RefetchPolicy::Every(Duration::from_secs(every_secs)),
    )
}

/// Current value of an optional (selection-dependent) query.
pub(crate) fn current<T: DeserializeOwned>(observer: &Option<QueryObserver<T>>) -> Loadable<T> {
    match observer {
        Some(o) => o.current(),
        None => Loadable::Idle,
    }
}

/// True when `event` committed a 401 while signed in. The session is dropped
/// so the route guard sends the view back to the login page.
pub fn expire_on_unauthenticated(state: &AppState, event: &CacheEvent) -> bool {
    let CacheEvent::Committed(key) = event else {
        return false;
    };
    if !matches!(state.cache.snapshot(key).error, Some(ClientError::Unauthenticated)) {
        return false;
    }
    state.session.expire()
}

/// Run a write and report the outcome as a notice. Permission is the
/// server's call; a 403 comes back as a failure like any other.
pub(crate) async fn perform(
    state: &AppState,
    mutation: Mutation,
    success: impl Into<String>,
    failure: &str,
) -> Result<Value, ClientError> {
    match mutation.run(&state.cache).await {
        Ok(value) => {
            state.notices.success(success);
            Ok(value)
        }
        Err(e) => {
            state.notices.error(failure);
            Err(e)
        }
    }
}

/// Report a modal submission the same way.
pub(crate) fn report(
    state: &AppState,
    result: Result<Value, ClientError>,
    success: impl Into<String>,
    failure: &str,
) -> Result<Value, ClientError> {
    match &result {
        Ok(_) => state.notices.success(success),
        Err(_) => state.notices.error(failure),
    }
    result
}

/// Filter chips line: `Type: [all] competitor target partner`.
pub(crate) fn filter_line(label: &str, options: &[&str], selected: &str) -> String {
    let chips: Vec<String> = options
        .iter()
        .map(|o| {
            if *o == selected {
                format!("[{}]", o)
            } else {
                o.to_string()
            }
        })
        .collect();
    format!("{}: {}", label, chips.join(" "))
}

// =============================================================================
// Layout
// =============================================================================

/// Navigation chrome around every signed-in page. Owns the signal stats query
/// that drives the unread badge on the Signals entry.
pub struct Layout {
    state: Arc<AppState>,
    signal_stats: QueryObserver<SignalStats>,
}

impl Layout {
    pub fn new(state: Arc<AppState>) -> Self {
        let signal_stats = poll(
            &state,
            endpoints::signal_stats(),
            state.config.polling.signal_stats_secs,
        );
        Self {
            state,
            signal_stats,
        }
    }

    /// Render the page framed by navigation and the notice area.
    pub fn frame(&self, page: &dyn Page) -> Screen {
        let color = self.state.color();
        let mut screen = Screen::new(color);
        screen.line(self.nav_line(page.route()));
        if let Some(user) = self.state.session.user() {
            screen.line(format!(
                "{} {}",
                user.display_name(),
                badge(user.role.as_str(), role_tone(user.role), color)
            ));
        }
        screen.blank();
        page.render(&mut screen);
        render_notices(&self.state, &mut screen);
        screen
    }

    fn nav_line(&self, active: Route) -> String {
        let new_signals = self
            .signal_stats
            .current()
            .ready()
            .map(|s| s.total_new)
            .unwrap_or(0);
        Route::NAV
            .iter()
            .map(|route| {
                let mut label = route.label().to_string();
                if *route == Route::Signals && new_signals > 0 {
                    let count = if new_signals > 99 {
                        "99+".to_string()
                    } else {
                        new_signals.to_string()
                    };
                    label = format!("{} ({})", label, count);
                }
                if same_page(*route, active) {
                    format!("> {}", label)
                } else {
                    label
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

fn same_page(a: Route, b: Route) -> bool {
    matches!((a, b), (Route::Dossiers(_), Route::Dossiers(_))) || a == b
}

/// Drain pending notices into the screen footer.
pub fn render_notices(state: &AppState, screen: &mut Screen) {
    let notices = state.notices.drain();
    if notices.is_empty() {
        return;
    }
    let color = screen.color();
    screen.blank();
    for notice in notices {
        let (mark, tone) = match notice.kind {
            NoticeKind::Success => ("✓", Tone::Green),
            NoticeKind::Error => ("✗", Tone::Red),
        };
        screen.line(paint(&format!("{} {}", mark, notice.message), tone, color));
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use serde_json::json;

    struct Blank;

    impl Page for Blank {
        fn route(&self) -> Route {
            Route::Signals
        }

        fn render(&self, screen: &mut Screen) {
            screen.line("body");
        }
    }

    #[tokio::test]
    async fn test_layout_badge_and_notices() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/signals/stats", json!({"total_new": 150, "high_score": 3}));
        let state = signed_in(&backend);
        let layout = Layout::new(state.clone());

        let mut frame = layout.frame(&Blank);
        for _ in 0..200 {
            if frame.contains("99+") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            frame = layout.frame(&Blank);
        }
        assert!(frame.contains("> Signals (99+)"));
        assert!(frame.contains("Ana [analyst]"));

        state.notices.success("Deal created");
        let frame = layout.frame(&Blank);
        assert!(frame.contains("✓ Deal created"));
        assert!(!layout.frame(&Blank).contains("Deal created"));
    }

    #[tokio::test]
    async fn test_writes_are_sent_for_any_role() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("POST /api/deals", json!({"id": 1}));
        let state = with_role(&backend, crate::types::Role::Sales);
        perform(
            &state,
            Mutation::post("/api/deals", json!({})),
            "Deal created",
            "Failed to create deal",
        )
        .await
        .unwrap();
        assert_eq!(backend.call_count("POST /api/deals"), 1);
        assert_eq!(state.notices.last().unwrap().message, "Deal created");
    }

    #[tokio::test]
    async fn test_server_refusal_becomes_failure_notice() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail(
            "POST /api/deals",
            ClientError::from_status(403, "forbidden".to_string()),
        );
        let state = with_role(&backend, crate::types::Role::Viewer);
        let result = perform(
            &state,
            Mutation::post("/api/deals", json!({})),
            "Deal created",
            "Failed to create deal",
        )
        .await;
        assert!(matches!(result, Err(ClientError::Forbidden(_))));
        assert_eq!(backend.call_count("POST /api/deals"), 1);
        assert_eq!(state.notices.last().unwrap().message, "Failed to create deal");
    }

    async fn next_expiry(state: &AppState, events: &mut tokio::sync::broadcast::Receiver<CacheEvent>) -> bool {
        let wait = async {
            loop {
                match events.recv().await {
                    Ok(event) if expire_on_unauthenticated(state, &event) => return true,
                    Ok(CacheEvent::Committed(_)) => return false,
                    Ok(_) => continue,
                    Err(_) => return false,
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_rejected_credentials_send_view_to_login() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail("GET /api/signals/stats", ClientError::Unauthenticated);
        let state = signed_in(&backend);
        let mut events = state.cache.subscribe();

        let _stats: QueryObserver<SignalStats> = observe(&state, endpoints::signal_stats());
        assert!(next_expiry(&state, &mut events).await);
        assert!(!state.session.is_authenticated());
        assert_eq!(
            crate::routes::guard(Route::Signals, &state.session.state()),
            crate::routes::Guard::Redirect(Route::Login)
        );
    }

    #[tokio::test]
    async fn test_other_failures_keep_the_session() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail(
            "GET /api/signals/stats",
            ClientError::Http { status: 500, message: "boom".into() },
        );
        let state = signed_in(&backend);
        let mut events = state.cache.subscribe();

        let _stats: QueryObserver<SignalStats> = observe(&state, endpoints::signal_stats());
        assert!(!next_expiry(&state, &mut events).await);
        assert!(state.session.is_authenticated());
    }

    #[test]
    fn test_filter_line_marks_selection() {
        assert_eq!(
            filter_line("Type", &["all", "competitor", "target"], "competitor"),
            "Type: all [competitor] target"
        );
    }
}
