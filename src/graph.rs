//! Partnership graph layout and rendering.
//!
//! Nodes sit on a circle at uniform angles. Graphs are small (tens of nodes),
//! so there is no force relaxation and no overlap avoidance. Positions are
//! kept until the node count changes so refreshes do not shuffle the picture.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt::Write;

use crate::style::entity_type_tone;
use crate::types::{EntityType, GraphEdge, GraphNode, PartnershipGraph, PartnershipStrength};

pub const CENTER_X: f64 = 400.0;
pub const CENTER_Y: f64 = 250.0;
pub const RADIUS: f64 = 180.0;
pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 500;
const NODE_RADIUS: f64 = 24.0;
const LABEL_MAX: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Position of node `i` of `n` on the layout circle (angle `2π·i/n`).
pub fn circle_position(i: usize, n: usize) -> Point {
    let angle = if n == 0 {
        0.0
    } else {
        2.0 * PI * i as f64 / n as f64
    };
    Point {
        x: CENTER_X + RADIUS * angle.cos(),
        y: CENTER_Y + RADIUS * angle.sin(),
    }
}

pub fn circular_layout(nodes: &[GraphNode]) -> HashMap<String, Point> {
    let n = nodes.len();
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.clone(), circle_position(i, n)))
        .collect()
}

/// Keeps the last layout until the node count changes or a node without a
/// position shows up.
#[derive(Debug, Default)]
pub struct LayoutCache {
    positions: HashMap<String, Point>,
    node_count: Option<usize>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&mut self, nodes: &[GraphNode]) -> &HashMap<String, Point> {
        let stale = self.node_count != Some(nodes.len())
            || nodes.iter().any(|n| !self.positions.contains_key(&n.id));
        if stale {
            log::debug!("LayoutCache: laying out {} node(s)", nodes.len());
            self.positions = circular_layout(nodes);
            self.node_count = Some(nodes.len());
        }
        &self.positions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeStyle {
    pub width: u8,
    pub dash: Option<&'static str>,
}

/// Visual weight of a partnership edge. Unknown strengths draw thin solid.
pub fn edge_style(strength: PartnershipStrength) -> EdgeStyle {
    match strength {
        PartnershipStrength::Deep => EdgeStyle { width: 3, dash: None },
        PartnershipStrength::Moderate => EdgeStyle { width: 2, dash: None },
        PartnershipStrength::Surface => EdgeStyle { width: 1, dash: None },
        PartnershipStrength::Rumored => EdgeStyle {
            width: 1,
            dash: Some("4,4"),
        },
        PartnershipStrength::Unknown => EdgeStyle { width: 1, dash: None },
    }
}

/// Labels longer than 12 characters are cut to 11 plus an ellipsis.
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > LABEL_MAX {
        let head: String = label.chars().take(LABEL_MAX - 1).collect();
        format!("{}…", head)
    } else {
        label.to_string()
    }
}

fn node_fill(node: &GraphNode) -> &'static str {
    match node.data.entity_type {
        EntityType::Unknown => "#94a3b8",
        kind => entity_type_tone(kind).hex(),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the graph as SVG. Edges are emitted before nodes so they sit
/// underneath. Edges whose endpoints are missing are skipped.
pub fn render_svg(graph: &PartnershipGraph, positions: &HashMap<String, Point>) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = HEIGHT
    );

    let _ = writeln!(svg, r#"  <g class="edges">"#);
    for edge in &graph.edges {
        if let Some(line) = edge_svg(edge, positions) {
            svg.push_str(&line);
        }
    }
    let _ = writeln!(svg, "  </g>");

    let _ = writeln!(svg, r#"  <g class="nodes">"#);
    for node in &graph.nodes {
        let Some(p) = positions.get(&node.id) else {
            continue;
        };
        let _ = writeln!(
            svg,
            r#"    <circle cx="{:.1}" cy="{:.1}" r="{}" fill="{}" />"#,
            p.x,
            p.y,
            NODE_RADIUS,
            node_fill(node)
        );
        let _ = writeln!(
            svg,
            r#"    <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
            p.x,
            p.y + NODE_RADIUS + 14.0,
            escape(&truncate_label(node.label()))
        );
    }
    let _ = writeln!(svg, "  </g>");
    svg.push_str("</svg>\n");
    svg
}

fn edge_svg(edge: &GraphEdge, positions: &HashMap<String, Point>) -> Option<String> {
    let a = positions.get(&edge.source)?;
    let b = positions.get(&edge.target)?;
    let style = edge_style(edge.data.strength);
    let dash = style
        .dash
        .map(|d| format!(r#" stroke-dasharray="{}""#, d))
        .unwrap_or_default();
    Some(format!(
        "    <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#94a3b8\" stroke-width=\"{}\"{} />\n",
        a.x, a.y, b.x, b.y, style.width, dash
    ))
}

/// Text listing of the graph for terminals: one line per edge, strongest first.
pub fn describe_edges(graph: &PartnershipGraph) -> Vec<String> {
    let labels: HashMap<&str, &str> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.label()))
        .collect();
    let mut edges: Vec<&GraphEdge> = graph.edges.iter().collect();
    edges.sort_by_key(|e| std::cmp::Reverse(edge_style(e.data.strength).width));
    edges
        .into_iter()
        .map(|e| {
            let connector = match (edge_style(e.data.strength).width, edge_style(e.data.strength).dash) {
                (_, Some(_)) => "- - -",
                (3, None) => "=====",
                (2, None) => "-----",
                _ => "·····",
            };
            format!(
                "{} {} {} ({})",
                labels.get(e.source.as_str()).copied().unwrap_or(&e.source),
                connector,
                labels.get(e.target.as_str()).copied().unwrap_or(&e.target),
                e.data.strength
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeData, NodeData};

    fn node(id: &str, label: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            data: NodeData {
                label: Some(label.to_string()),
                ..Default::default()
            },
        }
    }

    fn distance(a: Point, b: Point) -> f64 {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    #[test]
    fn test_uniform_angular_spacing() {
        for n in 1..=12 {
            let nodes: Vec<GraphNode> = (0..n).map(|i| node(&i.to_string(), "x")).collect();
            let positions = circular_layout(&nodes);
            for i in 0..n {
                let p = positions[&i.to_string()];
                let center = Point { x: CENTER_X, y: CENTER_Y };
                assert!((distance(p, center) - RADIUS).abs() < 1e-9);
                let angle = (p.y - CENTER_Y).atan2(p.x - CENTER_X).rem_euclid(2.0 * PI);
                let expected = (2.0 * PI * i as f64 / n as f64).rem_euclid(2.0 * PI);
                let diff = (angle - expected).abs();
                assert!(diff < 1e-9 || (2.0 * PI - diff) < 1e-9, "n={} i={}", n, i);
            }
        }
    }

    #[test]
    fn test_first_node_on_positive_x_axis() {
        let p = circle_position(0, 4);
        assert!((p.x - 580.0).abs() < 1e-9);
        assert!((p.y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_layout_stable_across_refresh_with_same_count() {
        let mut cache = LayoutCache::new();
        let first = vec![node("1", "Acme"), node("2", "Globex"), node("3", "Initech")];
        let before = cache.positions(&first).clone();

        // Same ids, different order and labels: positions are kept.
        let refreshed = vec![node("3", "Initech Corp"), node("1", "Acme"), node("2", "Globex")];
        assert_eq!(cache.positions(&refreshed), &before);

        let grown = vec![node("1", "Acme"), node("2", "Globex"), node("3", "Initech"), node("4", "Umbrella")];
        let after = cache.positions(&grown);
        assert_eq!(after.len(), 4);
        assert_ne!(after["2"], before["2"]);
    }

    #[test]
    fn test_layout_recomputed_when_unknown_node_appears() {
        let mut cache = LayoutCache::new();
        cache.positions(&[node("1", "a"), node("2", "b")]);
        let swapped = cache.positions(&[node("1", "a"), node("9", "z")]);
        assert!(swapped.contains_key("9"));
        assert!(!swapped.contains_key("2"));
    }

    #[test]
    fn test_edge_styles() {
        assert_eq!(edge_style(PartnershipStrength::Deep), EdgeStyle { width: 3, dash: None });
        assert_eq!(edge_style(PartnershipStrength::Moderate).width, 2);
        assert_eq!(edge_style(PartnershipStrength::Surface), EdgeStyle { width: 1, dash: None });
        assert_eq!(edge_style(PartnershipStrength::Rumored).dash, Some("4,4"));
        assert_eq!(edge_style(PartnershipStrength::Unknown), EdgeStyle { width: 1, dash: None });
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Palantir"), "Palantir");
        assert_eq!(truncate_label("Twelve chars"), "Twelve chars");
        assert_eq!(truncate_label("Google Cloud Healthcare"), "Google Clou…");
    }

    #[test]
    fn test_svg_draws_edges_before_nodes_and_skips_dangling() {
        let graph = PartnershipGraph {
            nodes: vec![node("1", "Acme"), node("2", "Globex")],
            edges: vec![
                GraphEdge {
                    id: "e1".into(),
                    source: "1".into(),
                    target: "2".into(),
                    label: None,
                    data: EdgeData { strength: PartnershipStrength::Rumored },
                },
                GraphEdge {
                    id: "e2".into(),
                    source: "1".into(),
                    target: "99".into(),
                    label: None,
                    data: EdgeData::default(),
                },
            ],
        };
        let positions = circular_layout(&graph.nodes);
        let svg = render_svg(&graph, &positions);
        let first_line = svg.find("<line").unwrap();
        let first_circle = svg.find("<circle").unwrap();
        assert!(first_line < first_circle);
        assert_eq!(svg.matches("<line").count(), 1);
        assert!(svg.contains(r#"stroke-dasharray="4,4""#));
    }
}
