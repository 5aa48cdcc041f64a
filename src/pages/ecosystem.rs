//! Ecosystem: partnership graph (circular layout) and the partnership list.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{observe, report, Page};
use crate::api::endpoints::{self, scope};
use crate::cache::{Loadable, Mutation, QueryObserver};
use crate::error::ClientError;
use crate::forms::{Modal, PartnershipForm};
use crate::graph::{describe_edges, render_svg, LayoutCache, Point};
use crate::helpers::{format_date, DASH};
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::style::{badge, entity_type_tone, paint, Tone};
use crate::types::{EntityType, PartnershipGraph, PartnershipList};

pub const EMPTY_GRAPH: &str = "No partnership data. Add partnerships to see the ecosystem graph.";

fn partnership_type_tone(kind: &str) -> Tone {
    match kind {
        "technology" => Tone::Blue,
        "channel" => Tone::Purple,
        "strategic" => Tone::Orange,
        "investor" => Tone::Green,
        _ => Tone::Gray,
    }
}

pub struct EcosystemPage {
    state: Arc<AppState>,
    graph: QueryObserver<PartnershipGraph>,
    partnerships: QueryObserver<PartnershipList>,
    layout: Mutex<LayoutCache>,
    modal: Modal<PartnershipForm>,
}

impl EcosystemPage {
    pub fn new(state: Arc<AppState>) -> Self {
        let graph = observe(&state, endpoints::partnership_graph());
        let partnerships = observe(&state, endpoints::partnerships());
        Self {
            state,
            graph,
            partnerships,
            layout: Mutex::new(LayoutCache::new()),
            modal: Modal::new(),
        }
    }

    /// Node positions for the loaded graph, stable across refreshes that keep
    /// the same nodes.
    pub fn positions(&self) -> Option<HashMap<String, Point>> {
        let graph = self.graph.current().into_ready()?;
        Some(self.layout.lock().positions(&graph.nodes).clone())
    }

    /// SVG document of the loaded graph.
    pub fn svg(&self) -> Option<String> {
        let graph = self.graph.current().into_ready()?;
        let mut layout = self.layout.lock();
        let positions = layout.positions(&graph.nodes);
        Some(render_svg(&graph, positions))
    }

    pub fn modal(&self) -> &Modal<PartnershipForm> {
        &self.modal
    }

    pub fn open_add(&mut self) {
        self.modal.open(PartnershipForm::default());
    }

    pub fn form_mut(&mut self) -> Option<&mut PartnershipForm> {
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
                Mutation::post(endpoints::PARTNERSHIPS_PATH, body)
                    .invalidates(scope::PARTNERSHIPS)
                    .invalidates(scope::PARTNERSHIP_GRAPH)
                    .run(&cache)
                    .await
            })
            .await;
        report(
            &self.state,
            result,
            "Partnership added",
            "Failed to create partnership",
        )
        .map(|_| ())
    }

    fn render_graph(&self, screen: &mut Screen) {
        let color = self.state.color();
        screen.line(format!(
            "{} Competitor  {} Target  {} Partner",
            paint("●", entity_type_tone(EntityType::Competitor), color),
            paint("●", entity_type_tone(EntityType::Target), color),
            paint("●", entity_type_tone(EntityType::Partner), color),
        ));
        let graph = match self.graph.current() {
            Loadable::Ready(graph) => graph,
            Loadable::Failed(e) => {
                screen.error(&e);
                return;
            }
            _ => {
                screen.placeholder("Loading graph...");
                return;
            }
        };
        if graph.nodes.is_empty() {
            screen.placeholder(EMPTY_GRAPH);
            return;
        }
        let mut layout = self.layout.lock();
        let positions = layout.positions(&graph.nodes);
        for node in &graph.nodes {
            let Some(p) = positions.get(&node.id) else {
                continue;
            };
            let kind = node.data.entity_type;
            screen.line(format!(
                "  {} {} ({:.0}, {:.0})",
                paint("●", entity_type_tone(kind), color),
                node.label(),
                p.x,
                p.y
            ));
        }
        for edge in describe_edges(&graph) {
            screen.indented(1, edge);
        }
    }

    fn render_list(&self, screen: &mut Screen) {
        let color = self.state.color();
        let partnerships = self.partnerships.current().map(|l| l.partnerships);
        match partnerships.ready() {
            Some(list) => screen.heading(&format!("All Partnerships ({})", list.len())),
            None => screen.heading("All Partnerships"),
        };
        screen.list(&partnerships, "No partnerships tracked yet", |s, p| {
            let kind = p.partnership_type.as_deref().unwrap_or("");
            let mut line = format!(
                "  {} ↔ {}  {} {}",
                p.entity_a_name.as_deref().unwrap_or(DASH),
                p.entity_b_name.as_deref().unwrap_or(DASH),
                badge(kind, partnership_type_tone(kind), color),
                p.strength
            );
            if p.announced_date.is_some() {
                line.push_str(&format!("  {}", format_date(p.announced_date.as_deref())));
            }
            s.line(line);
            if let Some(description) = p.description.as_deref().filter(|d| !d.is_empty()) {
                s.indented(2, description);
            }
        });
    }

    fn render_modal(&self, screen: &mut Screen) {
        let Some(form) = self.modal.form() else {
            return;
        };
        screen.heading("Add Partnership");
        screen.kv("Entity A *", &form.entity_a_id);
        screen.kv("Entity B *", &form.entity_b_id);
        screen.kv("Type", &form.partnership_type);
        screen.kv("Strength", &form.strength);
        screen.kv("Description", &form.description);
        screen.kv("Source URL", &form.source_url);
        if self.modal.is_submitting() {
            screen.placeholder("Saving…");
        }
    }
}

impl Page for EcosystemPage {
    fn route(&self) -> Route {
        Route::Ecosystem
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("Ecosystem");
        self.render_graph(screen);
        self.render_list(screen);
        self.render_modal(screen);
    }
}
