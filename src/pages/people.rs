//! People: executives and contacts at tracked entities, with their latest moves.

use std::sync::Arc;

use super::{filter_line, observe, report, Page};
use crate::api::endpoints::{self, scope};
use crate::api::QueryParams;
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::forms::{Modal, PersonForm};
use crate::helpers::{format_date, humanize, DASH};
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, relationship_tone, Tone};
use crate::types::{EntityList, MovementRecord, PeopleList, Person};

pub const PERSON_TYPES: &[&str] = &["all", "executive", "champion", "detractor", "target_contact"];
pub const RELATIONSHIPS: &[&str] = &["all", "ally", "neutral", "hostile", "unknown"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleFilters {
    pub entity_id: Option<i64>,
    pub person_type: String,
    pub relationship: String,
}

impl Default for PeopleFilters {
    fn default() -> Self {
        Self {
            entity_id: None,
            person_type: "all".to_string(),
            relationship: "all".to_string(),
        }
    }
}

impl PeopleFilters {
    pub fn params(&self) -> QueryParams {
        QueryParams::new()
            .with_opt("entity_id", self.entity_id)
            .with_filter("person_type", &self.person_type)
            .with_filter("distyl_relationship", &self.relationship)
    }
}

pub struct PeoplePage {
    state: Arc<AppState>,
    filters: PeopleFilters,
    entities: QueryObserver<EntityList>,
    people: QueryObserver<PeopleList>,
    modal: Modal<PersonForm>,
}

impl PeoplePage {
    pub fn new(state: Arc<AppState>) -> Self {
        let filters = PeopleFilters::default();
        let entities = observe(&state, endpoints::entities(QueryParams::new()));
        let people = observe(&state, endpoints::people(filters.params()));
        Self {
            state,
            filters,
            entities,
            people,
            modal: Modal::new(),
        }
    }

    pub fn set_filters(&mut self, filters: PeopleFilters) {
        if filters == self.filters {
            return;
        }
        self.people = observe(&self.state, endpoints::people(filters.params()));
        self.filters = filters;
    }

    pub fn people(&self) -> Loadable<Vec<Person>> {
        self.people.current().map(|list| list.people)
    }

    pub fn modal(&self) -> &Modal<PersonForm> {
        &self.modal
    }

    pub fn open_add(&mut self) {
        let form = PersonForm {
            entity_id: self.filters.entity_id.map(|id| id.to_string()).unwrap_or_default(),
            ..PersonForm::default()
        };
        self.modal.open(form);
    }

    pub fn form_mut(&mut self) -> Option<&mut PersonForm> {
        self.modal.form_mut()
    }

    pub fn cancel(&mut self) {
        self.modal.close();
    }

    pub async fn submit(&mut self) -> Result<(), ClientError> {
        let cache = self.state.cache.clone();
        let result = self
            .modal
            .submit(|body| async move {
                Mutation::post(endpoints::PEOPLE_PATH, body)
                    .invalidates(scope::PEOPLE)
                    .run(&cache)
                    .await
            })
            .await;
        report(&self.state, result, "Person added", "Failed to add person").map(|_| ())
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

    fn render_modal(&self, screen: &mut Screen) {
        let Some(form) = self.modal.form() else {
            return;
        };
        screen.heading("Add Person");
        screen.kv("Entity *", &form.entity_id);
        screen.kv("First Name *", &form.first_name);
        screen.kv("Last Name *", &form.last_name);
        screen.kv("Title", &form.title);
        screen.kv("LinkedIn URL", &form.linkedin_url);
        screen.kv("Type", humanize(&form.person_type));
        screen.kv("Relationship", &form.distyl_relationship);
        if self.modal.is_submitting() {
            screen.placeholder("Saving…");
        }
    }
}

fn movement_line(movement: &MovementRecord) -> String {
    let side = |title: &Option<String>, company: &Option<String>| match (title.as_deref(), company.as_deref()) {
        (Some(t), Some(c)) => format!("{} @ {}", t, c),
        (None, Some(c)) => c.to_string(),
        (Some(t), None) => t.to_string(),
        (None, None) => "?".to_string(),
    };
    format!(
        "{} → {} ({})",
        side(&movement.from_title, &movement.from_company),
        side(&movement.to_title, &movement.to_company),
        format_date(movement.detected_at.as_deref())
    )
}

impl Page for PeoplePage {
    fn route(&self) -> Route {
        Route::People
    }

    fn render(&self, screen: &mut Screen) {
        let color = self.state.color();
        let people = self.people();
        match people.ready() {
            Some(list) => screen.title(&format!("People ({})", list.len())),
            None => screen.title("People"),
        };
        screen.line(format!("Entity: {}", self.entity_label()));
        screen.line(filter_line("Type", PERSON_TYPES, &self.filters.person_type));
        screen.line(filter_line("Relationship", RELATIONSHIPS, &self.filters.relationship));
        screen.blank();

        screen.list(&people, "No people tracked yet", |s, person| {
            let mut header = format!("  {}", person.full_name());
            if let Some(title) = person.title.as_deref().filter(|t| !t.is_empty()) {
                header.push_str(&format!(", {}", title));
            }
            s.line(header);

            let relationship = person.distyl_relationship.as_deref().unwrap_or("unknown");
            let mut tags = vec![
                badge(person.entity_name.as_deref().unwrap_or(DASH), Tone::Blue, color),
                humanize(person.person_type.as_deref().unwrap_or("")),
                badge(relationship, relationship_tone(relationship), color),
                format!("last move {}", format_date(person.last_known_move.as_deref())),
            ];
            tags.retain(|t| !t.is_empty());
            if let Some(url) = person.linkedin_url.as_deref().filter(|u| !u.is_empty()) {
                tags.push(url.to_string());
            }
            s.indented(2, tags.join("  "));
            for movement in &person.movements {
                s.indented(3, movement_line(movement));
            }
        });

        self.render_modal(screen);
    }
}
