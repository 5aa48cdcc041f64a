//! Endpoint catalogue: cache keys for reads, paths for writes, and the
//! invalidation scopes that tie them together.

use crate::api::QueryParams;
use crate::cache::QueryKey;

pub mod scope {
    pub const SESSION: &str = "session";
    pub const ENTITIES: &str = "entities";
    pub const ENTITY: &str = "entity";
    pub const ENTITY_STATS: &str = "entity-stats";
    pub const NEWS: &str = "news";
    pub const NEWS_STATS: &str = "news-stats";
    pub const SIGNALS: &str = "signals";
    pub const SIGNAL_STATS: &str = "signal-stats";
    pub const DOSSIERS: &str = "dossiers";
    pub const DOSSIER: &str = "dossier";
    pub const CEO_BRIEF: &str = "ceo-brief";
    pub const PEOPLE: &str = "people";
    pub const DEALS: &str = "deals";
    pub const COMPETITIVE_MAP: &str = "competitive-map";
    pub const PARTNERSHIPS: &str = "partnerships";
    pub const PARTNERSHIP_GRAPH: &str = "partnership-graph";
    pub const BATTLE_CARDS: &str = "battle-cards";
    pub const BATTLE_CARD: &str = "battle-card";
    pub const DIGESTS: &str = "digests";
    pub const DIGEST: &str = "digest";
    pub const ADMIN_USERS: &str = "admin-users";
    pub const ADMIN_STATS: &str = "admin-stats";
}

pub const NEWS_LIVE: &str = "/api/news/live";

// -----------------------------------------------------------------------------
// Auth
// -----------------------------------------------------------------------------

pub const AUTH_ME: &str = "/auth/me";
pub const AUTH_DEV_LOGIN: &str = "/auth/dev-login";
pub const AUTH_LOGOUT: &str = "/auth/logout";
/// Browser entry point of the OAuth sign-in flow.
pub const AUTH_LOGIN: &str = "/auth/google";

// -----------------------------------------------------------------------------
// Entities
// -----------------------------------------------------------------------------

pub fn entities(params: QueryParams) -> QueryKey {
    QueryKey::new(scope::ENTITIES, "/api/entities").with_params(params)
}

pub fn entity_stats() -> QueryKey {
    QueryKey::new(scope::ENTITY_STATS, "/api/entities/stats")
}

pub fn entity(id: i64) -> QueryKey {
    QueryKey::new(scope::ENTITY, entity_path(id))
}

pub fn entity_path(id: i64) -> String {
    format!("/api/entities/{}", id)
}

pub const ENTITIES_PATH: &str = "/api/entities";

// -----------------------------------------------------------------------------
// News
// -----------------------------------------------------------------------------

pub fn news(params: QueryParams) -> QueryKey {
    QueryKey::new(scope::NEWS, "/api/news").with_params(params)
}

pub fn news_stats() -> QueryKey {
    QueryKey::new(scope::NEWS_STATS, "/api/news/stats")
}

pub const NEWS_REFRESH: &str = "/api/news/refresh";

// -----------------------------------------------------------------------------
// Signals
// -----------------------------------------------------------------------------

pub fn signals(params: QueryParams) -> QueryKey {
    QueryKey::new(scope::SIGNALS, "/api/signals").with_params(params)
}

pub fn signal_stats() -> QueryKey {
    QueryKey::new(scope::SIGNAL_STATS, "/api/signals/stats")
}

pub fn signal_review_path(id: i64) -> String {
    format!("/api/signals/{}/review", id)
}

// -----------------------------------------------------------------------------
// Dossiers
// -----------------------------------------------------------------------------

pub fn dossiers(entity_id: i64) -> QueryKey {
    QueryKey::new(scope::DOSSIERS, "/api/dossiers")
        .with_params(QueryParams::new().with("entity_id", entity_id))
}

pub fn dossier(id: i64) -> QueryKey {
    QueryKey::new(scope::DOSSIER, format!("/api/dossiers/{}", id))
}

pub fn ceo_brief(dossier_id: i64) -> QueryKey {
    QueryKey::new(scope::CEO_BRIEF, ceo_brief_path(dossier_id))
}

pub fn ceo_brief_path(dossier_id: i64) -> String {
    format!("/api/dossiers/{}/ceo-brief", dossier_id)
}

pub fn flag_hallucination_path(dossier_id: i64) -> String {
    format!("/api/dossiers/{}/flag-hallucination", dossier_id)
}

pub const DOSSIER_GENERATE: &str = "/api/dossiers/generate";

// -----------------------------------------------------------------------------
// People, deals, partnerships
// -----------------------------------------------------------------------------

pub fn people(params: QueryParams) -> QueryKey {
    QueryKey::new(scope::PEOPLE, "/api/people").with_params(params)
}

pub const PEOPLE_PATH: &str = "/api/people";

pub fn deals(params: QueryParams) -> QueryKey {
    QueryKey::new(scope::DEALS, "/api/deals").with_params(params)
}

pub fn competitive_map() -> QueryKey {
    QueryKey::new(scope::COMPETITIVE_MAP, "/api/deals/competitive-map")
}

pub const DEALS_PATH: &str = "/api/deals";

pub fn deal_path(id: i64) -> String {
    format!("/api/deals/{}", id)
}

pub fn partnerships() -> QueryKey {
    QueryKey::new(scope::PARTNERSHIPS, "/api/partnerships")
}

pub fn partnership_graph() -> QueryKey {
    QueryKey::new(scope::PARTNERSHIP_GRAPH, "/api/partnerships/graph")
}

pub const PARTNERSHIPS_PATH: &str = "/api/partnerships";

// -----------------------------------------------------------------------------
// Generated documents
// -----------------------------------------------------------------------------

pub fn battle_cards(params: QueryParams) -> QueryKey {
    QueryKey::new(scope::BATTLE_CARDS, "/api/battle-cards").with_params(params)
}

pub fn battle_card(id: i64) -> QueryKey {
    QueryKey::new(scope::BATTLE_CARD, format!("/api/battle-cards/{}", id))
}

pub fn battle_card_approve_path(id: i64) -> String {
    format!("/api/battle-cards/{}/approve", id)
}

pub const BATTLE_CARD_GENERATE: &str = "/api/battle-cards/generate";

pub fn digests() -> QueryKey {
    QueryKey::new(scope::DIGESTS, "/api/digests")
}

pub fn digest(id: i64) -> QueryKey {
    QueryKey::new(scope::DIGEST, format!("/api/digests/{}", id))
}

pub fn digest_post_slack_path(id: i64) -> String {
    format!("/api/digests/{}/post-slack", id)
}

pub const DIGEST_GENERATE: &str = "/api/digests/generate";

pub const CHAT: &str = "/api/chat";

// -----------------------------------------------------------------------------
// Admin
// -----------------------------------------------------------------------------

pub fn admin_users() -> QueryKey {
    QueryKey::new(scope::ADMIN_USERS, "/api/admin/users")
}

pub fn admin_stats() -> QueryKey {
    QueryKey::new(scope::ADMIN_STATS, "/api/admin/stats")
}

pub fn user_role_path(id: i64) -> String {
    format!("/api/admin/users/{}/role", id)
}
