//! Dossiers: pick an entity, read its latest dossier section by section, follow
//! generation progress, and work with the CEO brief.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::{observe, perform, Dependent, Page};
use crate::api::endpoints::{self, scope};
use crate::api::QueryParams;
use crate::cache::{Loadable, Mutation, QueryObserver, RefetchPolicy};
use crate::error::ClientError;
use crate::helpers::format_date;
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, confidence_tone, Tone};
use crate::types::{
    BriefContent, BriefItem, CeoBriefResponse, Confidence, Dossier, DossierList, DossierSection,
    EntityList, GenerationStatus,
};

pub const GENERATING: &str = "Generating dossier — this takes 1-2 minutes...";
pub const AUTO_UPDATE: &str = "Page will auto-update when complete";
pub const SECTION_MISSING: &str = "Section not yet generated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DossierTab {
    Section(DossierSection),
    CeoBrief,
}

impl Default for DossierTab {
    fn default() -> Self {
        DossierTab::Section(DossierSection::A)
    }
}

/// Everything keyed off one selected entity. Dropped as a unit when the
/// selection changes.
struct Selection {
    entity_id: i64,
    dossiers: QueryObserver<DossierList>,
    detail: Dependent<Dossier>,
}

pub struct DossiersPage {
    state: Arc<AppState>,
    entities: QueryObserver<EntityList>,
    selection: Option<Selection>,
    tab: DossierTab,
    ceo_brief: Option<QueryObserver<CeoBriefResponse>>,
}

impl DossiersPage {
    pub fn new(state: Arc<AppState>, entity_id: Option<i64>) -> Self {
        let entities = observe(&state, endpoints::entities(QueryParams::new()));
        let mut page = Self {
            state,
            entities,
            selection: None,
            tab: DossierTab::default(),
            ceo_brief: None,
        };
        page.select_entity(entity_id);
        page
    }

    pub fn selected_entity(&self) -> Option<i64> {
        self.selection.as_ref().map(|s| s.entity_id)
    }

    /// Route for the current selection (`/dossiers/:id`).
    pub fn route_path(&self) -> String {
        Route::Dossiers(self.selected_entity()).path()
    }

    pub fn select_entity(&mut self, entity_id: Option<i64>) {
        if entity_id == self.selected_entity() && self.selection.is_some() {
            return;
        }
        self.ceo_brief = None;
        self.tab = DossierTab::default();
        self.selection = entity_id.map(|entity_id| {
            let dossiers: QueryObserver<DossierList> =
                observe(&self.state, endpoints::dossiers(entity_id));
            let interval = Duration::from_secs(self.state.config.polling.generation_secs);
            let detail = Dependent::spawn(
                &self.state.cache,
                dossiers.watch(),
                latest_dossier_key,
                RefetchPolicy::while_generating(interval),
            );
            Selection {
                entity_id,
                dossiers,
                detail,
            }
        });
    }

    /// The detail record when loaded, otherwise the list's summary of it.
    pub fn dossier(&self) -> Loadable<Option<Dossier>> {
        let Some(selection) = &self.selection else {
            return Loadable::Idle;
        };
        if let Loadable::Ready(dossier) = selection.detail.current() {
            return Loadable::Ready(Some(dossier));
        }
        selection
            .dossiers
            .current()
            .map(|list| list.dossiers.into_iter().next())
    }

    fn dossier_id(&self) -> Option<i64> {
        self.dossier().into_ready().flatten().map(|d| d.id)
    }

    pub fn tab(&self) -> DossierTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: DossierTab) {
        self.tab = tab;
        self.ceo_brief = match (tab, self.dossier_id()) {
            (DossierTab::CeoBrief, Some(id)) => Some(observe(&self.state, endpoints::ceo_brief(id))),
            _ => None,
        };
    }

    /// Ask the server to (re)generate the dossier for the selected entity.
    /// Refused locally while a generation is already running.
    pub async fn generate(&self) -> Result<(), ClientError> {
        let Some(entity_id) = self.selected_entity() else {
            return Err(ClientError::InvalidInput("select an entity first".to_string()));
        };
        if let Some(dossier) = self.dossier().into_ready().flatten() {
            if dossier.generation_status.is_running() {
                return Err(ClientError::Conflict {
                    message: "generation already in progress".to_string(),
                });
            }
        }
        perform(
            &self.state,
            Mutation::post(endpoints::DOSSIER_GENERATE, json!({ "entity_id": entity_id }))
                .invalidates(scope::DOSSIERS),
            "Dossier generation started — this takes 1-2 minutes",
            "Failed to start generation",
        )
        .await
        .map(|_| ())
    }

    pub async fn flag_claim(&self, section: DossierSection, claim: &str) -> Result<(), ClientError> {
        let claim = claim.trim();
        if claim.is_empty() {
            return Err(ClientError::InvalidInput("claim is required".to_string()));
        }
        let Some(dossier_id) = self.dossier_id() else {
            return Err(ClientError::InvalidInput("no dossier loaded".to_string()));
        };
        perform(
            &self.state,
            Mutation::post(
                endpoints::flag_hallucination_path(dossier_id),
                json!({ "section": section.key().to_string(), "claim": claim }),
            ),
            "Claim flagged for review",
            "Failed to flag claim",
        )
        .await
        .map(|_| ())
    }

    pub async fn regenerate_ceo_brief(&self) -> Result<(), ClientError> {
        let Some(dossier_id) = self.dossier_id() else {
            return Err(ClientError::InvalidInput("no dossier loaded".to_string()));
        };
        perform(
            &self.state,
            Mutation::post(endpoints::ceo_brief_path(dossier_id), json!({}))
                .invalidates_key(endpoints::ceo_brief(dossier_id)),
            "CEO brief regenerating...",
            "Failed to regenerate CEO brief",
        )
        .await
        .map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    fn render_sidebar(&self, screen: &mut Screen) {
        let selected = self.selected_entity();
        let entities = self.entities.current().map(|l| l.entities);
        screen.list(&entities, "No entities tracked yet", |s, entity| {
            let marker = if Some(entity.id) == selected { ">" } else { " " };
            s.line(format!("{} {}", marker, entity.name));
        });
    }

    fn entity_name(&self, entity_id: i64) -> String {
        self.entities
            .current()
            .ready()
            .and_then(|l| l.entities.iter().find(|e| e.id == entity_id).map(|e| e.name.clone()))
            .unwrap_or_else(|| format!("Entity #{}", entity_id))
    }

    fn render_dossier(&self, screen: &mut Screen, entity_id: i64) {
        let color = self.state.color();
        screen.heading(&self.entity_name(entity_id));

        let dossier = match self.dossier() {
            Loadable::Ready(d) => d,
            Loadable::Failed(e) => {
                screen.error(&e);
                return;
            }
            Loadable::Loading | Loadable::Idle => {
                screen.loading();
                return;
            }
        };

        let Some(dossier) = dossier else {
            screen.placeholder("No dossier generated yet");
            screen.placeholder("Generate Now (1-2 min)");
            return;
        };

        let mut meta = format!("Generated {}", format_date(dossier.generated_at.as_deref()));
        if let Some(confidence) = dossier.overall_confidence {
            meta.push_str(" · ");
            meta.push_str(&confidence_badge(confidence, color));
        }
        screen.line(meta);
        if dossier.generation_status == GenerationStatus::InProgress {
            screen.line(badge("Generating...", Tone::Orange, color));
        }

        match dossier.generation_status {
            GenerationStatus::Completed => self.render_completed(screen, &dossier),
            GenerationStatus::Pending | GenerationStatus::InProgress => {
                screen.blank();
                screen.placeholder(GENERATING);
                screen.placeholder(AUTO_UPDATE);
            }
            GenerationStatus::Failed => {
                screen.placeholder("Generation failed. Regenerate to try again.");
            }
            GenerationStatus::Unknown => {}
        }
    }

    fn render_completed(&self, screen: &mut Screen, dossier: &Dossier) {
        let color = self.state.color();
        let tabs: Vec<String> = DossierSection::ALL
            .iter()
            .map(|s| (DossierTab::Section(*s), s.label().to_string()))
            .chain(std::iter::once((DossierTab::CeoBrief, "★ CEO Brief".to_string())))
            .map(|(tab, label)| {
                if tab == self.tab {
                    format!("[{}]", label)
                } else {
                    label
                }
            })
            .collect();
        screen.blank();
        screen.line(tabs.join("  "));
        screen.blank();

        match self.tab {
            DossierTab::Section(section) => match dossier.sections.get(section) {
                Some(text) => {
                    if let Some(confidence) = dossier.overall_confidence {
                        screen.line(confidence_badge(confidence, color));
                    }
                    screen.indented(1, text);
                    screen.blank();
                    screen.placeholder("Flag hallucination");
                }
                None => {
                    screen.placeholder(SECTION_MISSING);
                }
            },
            DossierTab::CeoBrief => self.render_ceo_brief(screen),
        }
    }

    fn render_ceo_brief(&self, screen: &mut Screen) {
        let color = self.state.color();
        screen.line("CEO 1-Page Brief");
        let Some(observer) = &self.ceo_brief else {
            screen.placeholder("Loading CEO brief...");
            return;
        };
        let response = match observer.current() {
            Loadable::Ready(r) => r,
            Loadable::Failed(e) => {
                screen.error(&e);
                return;
            }
            _ => {
                screen.placeholder("Loading CEO brief...");
                return;
            }
        };
        let Some(brief) = response.ceo_brief else {
            screen.placeholder("CEO brief not yet generated. It will be auto-generated on first view.");
            return;
        };
        for (_, section) in brief.ordered_sections() {
            screen.heading(&section.title);
            match &section.content {
                BriefContent::Text(text) => {
                    screen.indented(1, text);
                }
                BriefContent::Items(items) => {
                    for item in items {
                        match item {
                            BriefItem::Text(text) => {
                                screen.item(text);
                            }
                            BriefItem::Detail(detail) => {
                                let mut line = detail.heading().to_string();
                                if let Some(confidence) = detail.confidence.as_deref() {
                                    line.push_str(&format!(" ({} confidence)", confidence));
                                }
                                screen.item(line);
                                if let Some(why) = detail.why_now.as_deref() {
                                    screen.indented(2, why);
                                }
                            }
                        }
                    }
                }
                BriefContent::Other(_) => {}
            }
        }
        if let Some(confidence) = brief.overall_confidence {
            screen.blank();
            screen.line(confidence_badge(confidence, color));
        }
    }
}

fn confidence_badge(confidence: Confidence, color: bool) -> String {
    badge(
        &format!("{} confidence", confidence),
        confidence_tone(confidence),
        color,
    )
}

/// Detail key for the newest dossier in a list response.
fn latest_dossier_key(list: &Value) -> Option<crate::cache::QueryKey> {
    list.get("dossiers")?
        .as_array()?
        .first()?
        .get("id")?
        .as_i64()
        .map(endpoints::dossier)
}

impl Page for DossiersPage {
    fn route(&self) -> Route {
        Route::Dossiers(self.selected_entity())
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("Dossiers");
        self.render_sidebar(screen);
        match self.selected_entity() {
            None => {
                screen.blank();
                screen.placeholder("Select an entity to view its dossier");
            }
            Some(entity_id) => self.render_dossier(screen, entity_id),
        }
    }
}
