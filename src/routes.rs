//! Page routes and the authentication guard.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    WarRoom,
    News,
    Entities,
    /// Dossiers, optionally with an entity pre-selected (`/dossiers/:id`).
    Dossiers(Option<i64>),
    Signals,
    People,
    Pipeline,
    Ecosystem,
    BattleCards,
    Digests,
    Chat,
    Settings,
}

impl Route {
    /// Navigation order of the sidebar.
    pub const NAV: [Route; 12] = [
        Route::WarRoom,
        Route::News,
        Route::Entities,
        Route::Dossiers(None),
        Route::Signals,
        Route::People,
        Route::Pipeline,
        Route::Ecosystem,
        Route::BattleCards,
        Route::Digests,
        Route::Chat,
        Route::Settings,
    ];

    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_matches('/');
        let mut parts = trimmed.split('/');
        let head = parts.next().unwrap_or("");
        let tail = parts.next();
        if parts.next().is_some() {
            return None;
        }
        let route = match (head, tail) {
            ("", None) | ("war-room", None) => Route::WarRoom,
            ("login", None) => Route::Login,
            ("news", None) => Route::News,
            ("entities", None) => Route::Entities,
            ("dossiers", None) => Route::Dossiers(None),
            ("dossiers", Some(id)) => Route::Dossiers(Some(id.parse().ok()?)),
            ("signals", None) => Route::Signals,
            ("people", None) => Route::People,
            ("pipeline", None) => Route::Pipeline,
            ("ecosystem", None) => Route::Ecosystem,
            ("battle-cards", None) => Route::BattleCards,
            ("digests", None) => Route::Digests,
            ("chat", None) => Route::Chat,
            ("settings", None) => Route::Settings,
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::WarRoom => "/war-room".to_string(),
            Route::News => "/news".to_string(),
            Route::Entities => "/entities".to_string(),
            Route::Dossiers(None) => "/dossiers".to_string(),
            Route::Dossiers(Some(id)) => format!("/dossiers/{}", id),
            Route::Signals => "/signals".to_string(),
            Route::People => "/people".to_string(),
            Route::Pipeline => "/pipeline".to_string(),
            Route::Ecosystem => "/ecosystem".to_string(),
            Route::BattleCards => "/battle-cards".to_string(),
            Route::Digests => "/digests".to_string(),
            Route::Chat => "/chat".to_string(),
            Route::Settings => "/settings".to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::Login => "Sign in",
            Route::WarRoom => "War Room",
            Route::News => "News Feed",
            Route::Entities => "Entities",
            Route::Dossiers(_) => "Dossiers",
            Route::Signals => "Signals",
            Route::People => "People",
            Route::Pipeline => "Pipeline",
            Route::Ecosystem => "Ecosystem",
            Route::BattleCards => "Battle Cards",
            Route::Digests => "Digests",
            Route::Chat => "Chat",
            Route::Settings => "Settings",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::parse(s).ok_or_else(|| ClientError::NotFound(format!("no page at '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Session not resolved yet; show a loading screen.
    Pending,
    Allow(Route),
    Redirect(Route),
}

/// Every page except login requires a signed-in user. Signed-in users asking
/// for the login page land on the war room.
pub fn guard(route: Route, session: &SessionState) -> Guard {
    match (session, route) {
        (SessionState::Unknown, _) => Guard::Pending,
        (SessionState::Unauthenticated, Route::Login) => Guard::Allow(Route::Login),
        (SessionState::Unauthenticated, _) => Guard::Redirect(Route::Login),
        (SessionState::Authenticated(_), Route::Login) => Guard::Redirect(Route::WarRoom),
        (SessionState::Authenticated(_), route) => Guard::Allow(route),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    #[test]
    fn test_parse_paths() {
        assert_eq!(Route::parse("/"), Some(Route::WarRoom));
        assert_eq!(Route::parse("/battle-cards"), Some(Route::BattleCards));
        assert_eq!(Route::parse("/dossiers/42"), Some(Route::Dossiers(Some(42))));
        assert_eq!(Route::parse("dossiers/"), Some(Route::Dossiers(None)));
        assert_eq!(Route::parse("/dossiers/abc"), None);
        assert_eq!(Route::parse("/nowhere"), None);
        assert_eq!(Route::parse("/signals/1/2"), None);
    }

    #[test]
    fn test_path_round_trip() {
        for route in Route::NAV.iter().chain([Route::Login, Route::Dossiers(Some(7))].iter()) {
            assert_eq!(Route::parse(&route.path()), Some(*route));
        }
    }

    #[test]
    fn test_guard_redirects() {
        let signed_in = SessionState::Authenticated(User::default());
        assert_eq!(guard(Route::Signals, &SessionState::Unknown), Guard::Pending);
        assert_eq!(
            guard(Route::Signals, &SessionState::Unauthenticated),
            Guard::Redirect(Route::Login)
        );
        assert_eq!(
            guard(Route::Login, &SessionState::Unauthenticated),
            Guard::Allow(Route::Login)
        );
        assert_eq!(guard(Route::Login, &signed_in), Guard::Redirect(Route::WarRoom));
        assert_eq!(guard(Route::Chat, &signed_in), Guard::Allow(Route::Chat));
    }
}
