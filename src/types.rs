use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration stored in ~/.warroom/config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_login: Option<DevLoginConfig>,
    #[serde(default)]
    pub polling: PollingConfig,
    /// How long a committed result counts as fresh. Zero means every read
    /// refetches unless a request for the same key is already in flight.
    #[serde(default)]
    pub stale_after_secs: u64,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default = "default_digest_refresh_delay")]
    pub digest_refresh_delay_secs: u64,
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dev_login: None,
            polling: PollingConfig::default(),
            stale_after_secs: 0,
            live: LiveConfig::default(),
            digest_refresh_delay_secs: default_digest_refresh_delay(),
            color: true,
        }
    }
}

/// Development-only direct login (the backend refuses it in production).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevLoginConfig {
    #[serde(default = "default_dev_email")]
    pub email: String,
    #[serde(default = "default_dev_role")]
    pub role: Role,
}

/// Fixed refetch intervals per resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "default_signals_secs")]
    pub signals_secs: u64,
    #[serde(default = "default_signal_stats_secs")]
    pub signal_stats_secs: u64,
    #[serde(default = "default_news_secs")]
    pub news_secs: u64,
    /// Interval while a dossier is pending or in progress.
    #[serde(default = "default_generation_secs")]
    pub generation_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            signals_secs: default_signals_secs(),
            signal_stats_secs: default_signal_stats_secs(),
            news_secs: default_news_secs(),
            generation_secs: default_generation_secs(),
        }
    }
}

/// Live event stream buffers and ticker timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveConfig {
    #[serde(default = "default_ticker_capacity")]
    pub ticker_capacity: usize,
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    /// How many items of the news list seed the ticker.
    #[serde(default = "default_ticker_seed")]
    pub ticker_seed: usize,
    #[serde(default = "default_ticker_interval")]
    pub ticker_interval_secs: u64,
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ticker_capacity: default_ticker_capacity(),
            feed_capacity: default_feed_capacity(),
            ticker_seed: default_ticker_seed(),
            ticker_interval_secs: default_ticker_interval(),
            reconnect_secs: default_reconnect_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_dev_email() -> String {
    "dev@localhost".to_string()
}

fn default_dev_role() -> Role {
    Role::Analyst
}

fn default_signals_secs() -> u64 {
    30
}

fn default_signal_stats_secs() -> u64 {
    60
}

fn default_news_secs() -> u64 {
    60
}

fn default_generation_secs() -> u64 {
    5
}

fn default_ticker_capacity() -> usize {
    50
}

fn default_feed_capacity() -> usize {
    10
}

fn default_ticker_seed() -> usize {
    20
}

fn default_ticker_interval() -> u64 {
    5
}

fn default_reconnect_secs() -> u64 {
    3
}

fn default_digest_refresh_delay() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Closed enums
// =============================================================================

/// Declares a closed wire enum with a catch-all `Unknown` variant, its wire
/// names, and `Display`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
            #[default]
            #[serde(other)]
            Unknown,
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown => "unknown",
                }
            }

            /// Parse a wire name; anything unrecognised is `Unknown`.
            pub fn parse(value: &str) -> Self {
                match value {
                    $($wire => $name::$variant,)+
                    _ => $name::Unknown,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Kind of tracked company.
    EntityType { Competitor => "competitor", Target => "target", Partner => "partner" }
}

wire_enum! {
    ThreatLevel {
        Critical => "critical",
        High => "high",
        Medium => "medium",
        Low => "low",
        Monitor => "monitor",
    }
}

wire_enum! {
    /// How exposed our own accounts are to this entity.
    Exposure { Unexposed => "none", Low => "low", Medium => "medium", High => "high" }
}

wire_enum! {
    SignalStatus { New => "new", Reviewed => "reviewed", Archived => "archived" }
}

wire_enum! {
    GenerationStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
    }
}

wire_enum! {
    Confidence { High => "High", Medium => "Medium", Low => "Low" }
}

wire_enum! {
    DealStage {
        Prospecting => "prospecting",
        Discovery => "discovery",
        Eval => "eval",
        Negotiation => "negotiation",
        ClosedWon => "closed_won",
        ClosedLost => "closed_lost",
    }
}

wire_enum! {
    PartnershipStrength {
        Deep => "deep",
        Moderate => "moderate",
        Surface => "surface",
        Rumored => "rumored",
    }
}

wire_enum! {
    BattleCardStatus { Draft => "draft", Approved => "approved" }
}

wire_enum! {
    Role { Admin => "admin", Analyst => "analyst", Sales => "sales", Viewer => "viewer" }
}

impl GenerationStatus {
    /// Pending and in-progress jobs are still running server-side.
    pub fn is_running(&self) -> bool {
        matches!(self, GenerationStatus::Pending | GenerationStatus::InProgress)
    }
}

// =============================================================================
// Records
// =============================================================================

/// Authenticated user (session payload).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub picture_url: Option<String>,
    pub last_login: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.email)
    }
}

/// Summary of an entity's latest completed dossier, embedded in list rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DossierSummary {
    pub id: i64,
    pub version: i64,
    pub generated_at: Option<String>,
    pub overall_confidence: Option<Confidence>,
}

/// A tracked company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub entity_type: EntityType,
    pub website: Option<String>,
    pub description: Option<String>,
    pub headquarters: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub employee_count: Option<String>,
    pub distyl_exposure: Option<Exposure>,
    pub threat_level: ThreatLevel,
    pub status: Option<String>,
    pub signal_count: u32,
    pub latest_dossier: Option<DossierSummary>,
    pub last_enriched_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub id: Option<i64>,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub headline: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source_name: Option<String>,
    pub source_type: Option<String>,
    pub published_at: Option<String>,
    pub relevance_score: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Signal {
    pub id: i64,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub signal_type: String,
    pub title: String,
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub source_name: Option<String>,
    pub source_date: Option<String>,
    pub score: u8,
    pub score_rationale: Option<String>,
    pub status: SignalStatus,
}

/// The twelve fixed dossier sections, keyed by letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DossierSection {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
}

impl DossierSection {
    pub const ALL: [DossierSection; 12] = [
        DossierSection::A,
        DossierSection::B,
        DossierSection::C,
        DossierSection::D,
        DossierSection::E,
        DossierSection::F,
        DossierSection::G,
        DossierSection::H,
        DossierSection::I,
        DossierSection::J,
        DossierSection::K,
        DossierSection::L,
    ];

    pub fn key(&self) -> char {
        (b'a' + self.index() as u8) as char
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_key(key: char) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        if !('a'..='l').contains(&key) {
            return None;
        }
        Some(Self::ALL[(key as u8 - b'a') as usize])
    }

    pub fn label(&self) -> &'static str {
        match self {
            DossierSection::A => "A. Synopsis",
            DossierSection::B => "B. Products",
            DossierSection::C => "C. Clients",
            DossierSection::D => "D. GTM",
            DossierSection::E => "E. Competitive",
            DossierSection::F => "F. Funding",
            DossierSection::G => "G. Talent",
            DossierSection::H => "H. Tech",
            DossierSection::I => "I. Regulatory",
            DossierSection::J => "J. SWOT",
            DossierSection::K => "K. Battle Brief",
            DossierSection::L => "L. Sources",
        }
    }
}

/// Section text by section; `None` means not generated yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DossierSections([Option<String>; 12]);

impl DossierSections {
    pub fn get(&self, section: DossierSection) -> Option<&str> {
        self.0[section.index()].as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn set(&mut self, section: DossierSection, text: Option<String>) {
        self.0[section.index()] = text;
    }

    pub fn generated_count(&self) -> usize {
        DossierSection::ALL.iter().filter(|s| self.get(**s).is_some()).count()
    }
}

/// An AI-generated research report on an entity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "DossierRecord")]
pub struct Dossier {
    pub id: i64,
    pub entity_id: i64,
    pub version: i64,
    pub sections: DossierSections,
    pub overall_confidence: Option<Confidence>,
    pub generation_status: GenerationStatus,
    pub generated_at: Option<String>,
    pub source_count: i64,
}

/// Wire shape: sections arrive as `section_<letter>_<name>` fields.
#[derive(Deserialize)]
struct DossierRecord {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    entity_id: i64,
    #[serde(default)]
    version: i64,
    #[serde(default)]
    overall_confidence: Option<Confidence>,
    #[serde(default)]
    generation_status: GenerationStatus,
    #[serde(default)]
    generated_at: Option<String>,
    #[serde(default)]
    source_count: Option<i64>,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

impl From<DossierRecord> for Dossier {
    fn from(record: DossierRecord) -> Self {
        let mut sections = DossierSections::default();
        for (field, value) in record.rest {
            let Some(section) = section_for_field(&field) else {
                continue;
            };
            let text = match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => serde_json::to_string_pretty(&other).ok(),
            };
            sections.set(section, text);
        }
        Dossier {
            id: record.id,
            entity_id: record.entity_id,
            version: record.version,
            sections,
            overall_confidence: record.overall_confidence,
            generation_status: record.generation_status,
            generated_at: record.generated_at,
            source_count: record.source_count.unwrap_or(0),
        }
    }
}

/// `section_c_products` → `C`. Exactly one letter between the underscores.
fn section_for_field(field: &str) -> Option<DossierSection> {
    let rest = field.strip_prefix("section_")?;
    let mut chars = rest.chars();
    let letter = chars.next()?;
    match chars.next() {
        Some('_') | None => DossierSection::from_key(letter),
        Some(_) => None,
    }
}

/// Response of `GET /api/dossiers/:id/ceo-brief`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CeoBriefResponse {
    pub ceo_brief: Option<CeoBrief>,
    pub dossier_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CeoBrief {
    pub sections: BTreeMap<String, BriefSection>,
    pub overall_confidence: Option<Confidence>,
}

impl CeoBrief {
    /// Sections in numeric order ("2" before "10").
    pub fn ordered_sections(&self) -> Vec<(&str, &BriefSection)> {
        let mut sections: Vec<_> = self
            .sections
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        sections.sort_by_key(|(k, _)| (k.parse::<u32>().unwrap_or(u32::MAX), k.to_string()));
        sections
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefSection {
    pub title: String,
    pub content: BriefContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BriefContent {
    Text(String),
    Items(Vec<BriefItem>),
    Other(Value),
}

impl Default for BriefContent {
    fn default() -> Self {
        BriefContent::Other(Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BriefItem {
    Text(String),
    Detail(BriefDetail),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefDetail {
    pub motion: Option<String>,
    pub center: Option<String>,
    pub step: Option<String>,
    pub confidence: Option<String>,
    pub why_now: Option<String>,
}

impl BriefDetail {
    pub fn heading(&self) -> &str {
        self.motion
            .as_deref()
            .or(self.center.as_deref())
            .or(self.step.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementRecord {
    pub from_company: Option<String>,
    pub from_title: Option<String>,
    pub to_company: Option<String>,
    pub to_title: Option<String>,
    pub detected_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    pub id: i64,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub current_company: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub person_type: Option<String>,
    pub distyl_relationship: Option<String>,
    pub last_known_move: Option<String>,
    pub notes: Option<String>,
    /// Most recent first, at most three.
    pub movements: Vec<MovementRecord>,
}

impl Person {
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            "(unnamed)".to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DealCompetitor {
    pub id: i64,
    pub entity_id: i64,
    pub entity_name: Option<String>,
    pub involvement: Option<String>,
    pub threat_level: Option<ThreatLevel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Deal {
    pub id: i64,
    pub account_name: String,
    pub deal_name: Option<String>,
    pub stage: DealStage,
    pub value_usd: Option<i64>,
    pub close_date: Option<String>,
    pub owner: Option<String>,
    pub distyl_product: Option<String>,
    pub win_loss_status: Option<String>,
    pub loss_reason: Option<String>,
    pub loss_competitor_id: Option<i64>,
    pub competitors: Vec<DealCompetitor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorRef {
    pub id: i64,
    pub name: String,
    pub threat_level: ThreatLevel,
}

/// One deal row of the deal × competitor matrix. `competitors` maps competitor
/// name to involvement (`None` when not involved).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixRow {
    pub deal_id: i64,
    pub account_name: String,
    pub stage: DealStage,
    pub distyl_product: Option<String>,
    pub competitors: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitiveMap {
    pub matrix: Vec<MatrixRow>,
    pub competitors: Vec<CompetitorRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Partnership {
    pub id: i64,
    pub entity_a_id: i64,
    pub entity_b_id: i64,
    pub entity_a_name: Option<String>,
    pub entity_b_name: Option<String>,
    pub entity_a_type: Option<EntityType>,
    pub entity_b_type: Option<EntityType>,
    pub partnership_type: Option<String>,
    pub description: Option<String>,
    pub strength: PartnershipStrength,
    pub announced_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeData {
    pub label: Option<String>,
    pub entity_type: EntityType,
    pub threat_level: Option<ThreatLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphNode {
    pub id: String,
    pub data: NodeData,
}

impl GraphNode {
    pub fn label(&self) -> &str {
        self.data.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeData {
    pub strength: PartnershipStrength,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
    pub data: EdgeData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnershipGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleCard {
    pub id: i64,
    pub entity_id: i64,
    pub entity_name: Option<String>,
    pub dossier_id: Option<i64>,
    pub use_case: Option<String>,
    pub distyl_product: Option<String>,
    /// Keyed sections; values are text, lists, or nested objects.
    pub content: serde_json::Map<String, Value>,
    pub version: i64,
    pub status: BattleCardStatus,
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestSignal {
    pub title: String,
    pub score: Option<u8>,
    pub entity_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecMove {
    pub name: String,
    pub from_company: Option<String>,
    pub to_company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DealUpdate {
    Text(String),
    Summary { summary: String },
}

impl DealUpdate {
    pub fn text(&self) -> &str {
        match self {
            DealUpdate::Text(s) => s,
            DealUpdate::Summary { summary } => summary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyActions {
    One(String),
    Many(Vec<String>),
}

impl KeyActions {
    pub fn items(&self) -> Vec<&str> {
        match self {
            KeyActions::One(s) => vec![s.as_str()],
            KeyActions::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestContent {
    pub summary: Option<String>,
    pub top_signals: Option<Vec<DigestSignal>>,
    pub exec_moves: Vec<ExecMove>,
    pub deal_updates: Vec<DealUpdate>,
    pub key_actions: Option<KeyActions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Digest {
    pub id: i64,
    pub digest_type: Option<String>,
    pub week_number: Option<u32>,
    pub year: Option<i32>,
    pub subject: Option<String>,
    pub content: Option<DigestContent>,
    pub slack_posted: bool,
    pub status: Option<String>,
    pub generated_at: Option<String>,
}

impl Digest {
    pub fn title(&self) -> String {
        match self.subject.as_deref().filter(|s| !s.is_empty()) {
            Some(subject) => subject.to_string(),
            None => format!(
                "Digest — Week {}, {}",
                self.week_number.map(|w| w.to_string()).unwrap_or_default(),
                self.year.map(|y| y.to_string()).unwrap_or_default()
            ),
        }
    }
}

// =============================================================================
// Stats and envelopes
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityStats {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_threat: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalStats {
    pub total_new: u64,
    pub high_score: u64,
    pub by_type: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsStats {
    pub total: u64,
    pub by_source: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminStats {
    pub users: u64,
    pub entities: u64,
    pub signals: u64,
    pub dossiers: u64,
    pub deals: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntityList {
    pub entities: Vec<Entity>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsList {
    pub news: Vec<NewsItem>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignalList {
    pub signals: Vec<Signal>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DossierList {
    pub dossiers: Vec<Dossier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PeopleList {
    pub people: Vec<Person>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DealList {
    pub deals: Vec<Deal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartnershipList {
    pub partnerships: Vec<Partnership>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BattleCardList {
    pub battle_cards: Vec<BattleCard>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigestList {
    pub digests: Vec<Digest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserList {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    pub response: String,
}

/// One prior chat turn sent as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_enum_values_fall_back() {
        let entity: Entity = serde_json::from_value(json!({
            "id": 3,
            "name": "Acme",
            "entity_type": "supplier",
            "threat_level": "critical"
        }))
        .unwrap();
        assert_eq!(entity.entity_type, EntityType::Unknown);
        assert_eq!(entity.threat_level, ThreatLevel::Critical);
        assert_eq!(ThreatLevel::parse("monitor"), ThreatLevel::Monitor);
        assert_eq!(DealStage::parse("closed_won").as_str(), "closed_won");
    }

    #[test]
    fn test_dossier_sections_decode_by_letter() {
        let dossier: Dossier = serde_json::from_value(json!({
            "id": 9,
            "entity_id": 2,
            "version": 3,
            "section_a_synopsis": "Acme builds claims automation.",
            "section_c_products": "",
            "section_k_threats": null,
            "section_l_appendix": {"sources": ["https://example.com"]},
            "sections_meta": "ignored",
            "generation_status": "completed",
            "overall_confidence": "High"
        }))
        .unwrap();

        assert_eq!(
            dossier.sections.get(DossierSection::A),
            Some("Acme builds claims automation.")
        );
        assert_eq!(dossier.sections.get(DossierSection::C), None);
        assert_eq!(dossier.sections.get(DossierSection::K), None);
        assert!(dossier.sections.get(DossierSection::L).unwrap().contains("example.com"));
        assert_eq!(dossier.sections.generated_count(), 2);
        assert_eq!(dossier.generation_status, GenerationStatus::Completed);
        assert_eq!(dossier.overall_confidence, Some(Confidence::High));
    }

    #[test]
    fn test_section_keys_round_trip() {
        for section in DossierSection::ALL {
            assert_eq!(DossierSection::from_key(section.key()), Some(section));
        }
        assert_eq!(DossierSection::from_key('m'), None);
        assert_eq!(section_for_field("section_ab_x"), None);
    }

    #[test]
    fn test_ceo_brief_sections_numeric_order() {
        let brief: CeoBrief = serde_json::from_value(json!({
            "sections": {
                "10": {"title": "Ten", "content": "x"},
                "2": {"title": "Two", "content": ["a", {"motion": "Expand", "why_now": "budget"}]},
                "1": {"title": "One", "content": "y"}
            },
            "overall_confidence": "Medium"
        }))
        .unwrap();
        let titles: Vec<&str> = brief
            .ordered_sections()
            .iter()
            .map(|(_, s)| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["One", "Two", "Ten"]);
        match &brief.sections["2"].content {
            BriefContent::Items(items) => {
                assert!(matches!(&items[0], BriefItem::Text(t) if t == "a"));
                assert!(matches!(&items[1], BriefItem::Detail(d) if d.heading() == "Expand"));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.polling.generation_secs, 5);
        assert_eq!(config.live.ticker_capacity, 50);
        assert_eq!(config.live.feed_capacity, 10);
        assert!(config.color);
    }

    #[test]
    fn test_digest_title_fallback() {
        let digest = Digest {
            week_number: Some(14),
            year: Some(2026),
            ..Default::default()
        };
        assert_eq!(digest.title(), "Digest — Week 14, 2026");
    }
}
