//! Entities: filterable grid of tracked companies, add and archive.

use std::sync::Arc;

use super::{filter_line, observe, perform, report, Page};
use crate::api::endpoints::{self, scope};
use crate::api::QueryParams;
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::forms::{EntityForm, Modal};
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, entity_type_tone, threat_tone, Tone};
use crate::types::{Entity, EntityList, Exposure};

pub const ENTITY_TYPES: &[&str] = &["all", "competitor", "target", "partner"];
pub const THREAT_FILTERS: &[&str] = &["all", "critical", "high", "medium"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFilters {
    pub entity_type: String,
    pub threat_level: String,
    /// Client-side name search, case-insensitive.
    pub search: String,
}

impl Default for EntityFilters {
    fn default() -> Self {
        Self {
            entity_type: "all".to_string(),
            threat_level: "all".to_string(),
            search: String::new(),
        }
    }
}

impl EntityFilters {
    /// Server-side filters only; search never leaves the client.
    pub fn params(&self) -> QueryParams {
        QueryParams::new()
            .with_filter("entity_type", &self.entity_type)
            .with_filter("threat_level", &self.threat_level)
    }

    fn matches(&self, entity: &Entity) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || entity.name.to_lowercase().contains(&needle)
    }
}

pub struct EntitiesPage {
    state: Arc<AppState>,
    filters: EntityFilters,
    entities: QueryObserver<EntityList>,
    detail: Option<QueryObserver<Entity>>,
    modal: Modal<EntityForm>,
}

impl EntitiesPage {
    pub fn new(state: Arc<AppState>) -> Self {
        let filters = EntityFilters::default();
        let entities = observe(&state, endpoints::entities(filters.params()));
        Self {
            state,
            filters,
            entities,
            detail: None,
            modal: Modal::new(),
        }
    }

    pub fn set_filters(&mut self, filters: EntityFilters) {
        if filters.params() != self.filters.params() {
            self.entities = observe(&self.state, endpoints::entities(filters.params()));
        }
        self.filters = filters;
    }

    pub fn entities(&self) -> Loadable<Vec<Entity>> {
        self.entities.current().map(|list| {
            list.entities
                .into_iter()
                .filter(|e| self.filters.matches(e))
                .collect()
        })
    }

    /// Load one entity's full record.
    pub fn select(&mut self, id: Option<i64>) {
        self.detail = id.map(|id| observe(&self.state, endpoints::entity(id)));
    }

    pub fn modal(&self) -> &Modal<EntityForm> {
        &self.modal
    }

    pub fn open_add(&mut self) {
        self.modal.open(EntityForm::default());
    }

    pub fn form_mut(&mut self) -> Option<&mut EntityForm> {
        self.modal.form_mut()
    }

    pub fn cancel(&mut self) {
        self.modal.close();
    }

    pub async fn submit(&mut self) -> Result<(), ClientError> {
        let name = self
            .modal
            .form()
            .map(|f| f.name.trim().to_string())
            .unwrap_or_default();
        let cache = self.state.cache.clone();
        let result = self
            .modal
            .submit(|body| async move {
                Mutation::post(endpoints::ENTITIES_PATH, body)
                    .invalidates(scope::ENTITIES)
                    .invalidates(scope::ENTITY_STATS)
                    .run(&cache)
                    .await
            })
            .await;
        report(
            &self.state,
            result,
            format!("{} added successfully", name),
            "Failed to create entity",
        )
        .map(|_| ())
    }

    pub async fn archive(&mut self, id: i64) -> Result<(), ClientError> {
        perform(
            &self.state,
            Mutation::delete(endpoints::entity_path(id))
                .invalidates(scope::ENTITIES)
                .invalidates(scope::ENTITY_STATS)
                .invalidates_key(endpoints::entity(id)),
            "Entity archived",
            "Failed to archive entity",
        )
        .await?;
        if self.detail.as_ref().map(|d| d.key().path == endpoints::entity_path(id)) == Some(true) {
            self.detail = None;
        }
        Ok(())
    }

    fn render_card(&self, screen: &mut Screen, entity: &Entity) {
        let color = self.state.color();
        let mut header = format!(
            "  {} {}",
            entity.name,
            badge(entity.entity_type.as_str(), entity_type_tone(entity.entity_type), color)
        );
        if let Some(hq) = entity.headquarters.as_deref().filter(|h| !h.is_empty()) {
            header.push_str(&format!("  ({})", hq));
        }
        screen.line(header);
        if let Some(description) = entity.description.as_deref().filter(|d| !d.is_empty()) {
            screen.indented(2, description);
        }
        let mut tags = vec![badge(
            entity.threat_level.as_str(),
            threat_tone(entity.threat_level),
            color,
        )];
        if let Some(exposure) = entity.distyl_exposure.filter(|e| *e != Exposure::Unexposed) {
            tags.push(format!("{} exposure", exposure));
        }
        if entity.signal_count > 0 {
            tags.push(badge(&format!("{} signals", entity.signal_count), Tone::Purple, color));
        }
        screen.indented(2, tags.join(" "));
    }

    fn render_detail(&self, screen: &mut Screen) {
        let Some(detail) = &self.detail else {
            return;
        };
        screen.heading("Entity");
        match detail.current() {
            Loadable::Ready(entity) => {
                screen.kv("Name", &entity.name);
                screen.kv("Type", entity.entity_type);
                screen.kv("Threat", entity.threat_level);
                for (label, value) in [
                    ("Website", &entity.website),
                    ("Industry", &entity.industry),
                    ("Funding", &entity.funding_stage),
                    ("Employees", &entity.employee_count),
                    ("Headquarters", &entity.headquarters),
                ] {
                    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                        screen.kv(label, v);
                    }
                }
                match &entity.latest_dossier {
                    Some(d) => screen.kv("Dossier", format!("v{} (/dossiers/{})", d.version, entity.id)),
                    None => screen.kv("Dossier", "not generated"),
                };
            }
            Loadable::Failed(e) => {
                screen.error(&e);
            }
            _ => {
                screen.loading();
            }
        }
    }

    fn render_modal(&self, screen: &mut Screen) {
        let Some(form) = self.modal.form() else {
            return;
        };
        screen.heading("Add Entity");
        screen.kv("Company Name *", &form.name);
        screen.kv("Type", &form.entity_type);
        screen.kv("Threat Level", &form.threat_level);
        screen.kv("Website", &form.website);
        screen.kv("Description", &form.description);
        if self.modal.is_submitting() {
            screen.placeholder("Saving…");
        }
    }
}

impl Page for EntitiesPage {
    fn route(&self) -> Route {
        Route::Entities
    }

    fn render(&self, screen: &mut Screen) {
        let entities = self.entities();
        let count = entities.ready().map(Vec::len).unwrap_or(0);
        screen.title(&format!("Entities ({})", count));
        if !self.filters.search.is_empty() {
            screen.line(format!("Search: {}", self.filters.search));
        }
        screen.line(filter_line("Type", ENTITY_TYPES, &self.filters.entity_type));
        screen.line(filter_line("Threat", THREAT_FILTERS, &self.filters.threat_level));
        screen.blank();
        screen.list(&entities, "No entities found", |s, entity| {
            self.render_card(s, entity);
        });
        self.render_detail(screen);
        self.render_modal(screen);
    }
}
