//! Graph Description Builder
//!
//! Translates a validated [`Harness`] into a layout-engine neutral graph:
//! one node per connector and cable, wire edges between connector pin
//! ports and cable wire ports, self-loop edges for connector loops and
//! dashed edges for mates. The description is held in a petgraph
//! [`UnGraph`] keyed by node name and serialized to Graphviz DOT with
//! [`GraphDescription::to_dot`].
//!
//! Building is pure. Rendering parameters that depend on the whole harness
//! (wire thickness padding) are computed up front as [`RenderParams`] and
//! passed in explicitly.

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};

use crate::config::{Options, Tweak};
use crate::error::HarnessError;
use crate::harness::Harness;
use crate::model::{AdditionalComponent, Cable, Connector, Mate, PartNumbers, Side, WireColor};

/// Outline color used for wire borders, loops and mates.
const BLACK: &str = "#000000";

/// Maps color names to values the layout engine understands.
pub trait ColorTranslator {
    fn to_hex(&self, color: &str) -> String;
}

/// IEC 60757 two-letter color codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iec60757Colors;

impl ColorTranslator for Iec60757Colors {
    /// Unknown names and explicit `#RRGGBB` values pass through unchanged.
    fn to_hex(&self, color: &str) -> String {
        let hex = match color.to_ascii_uppercase().as_str() {
            "BK" => "#000000",
            "WH" => "#FFFFFF",
            "GY" => "#999999",
            "PK" => "#FF66CC",
            "RD" => "#FF0000",
            "OG" => "#FF8000",
            "YE" => "#FFFF00",
            "OL" => "#708000",
            "GN" => "#00FF00",
            "TQ" => "#00FFFF",
            "LB" => "#A0DFFF",
            "BU" => "#0066FF",
            "VT" => "#8000FF",
            "BN" => "#895956",
            "BG" => "#CEB673",
            "IV" => "#F5F0D0",
            "SL" => "#708090",
            "GD" => "#FFCF80",
            "CU" => "#D6775E",
            "SN" => "#AAAAAA",
            _ => return color.to_string(),
        };
        hex.to_string()
    }
}

/// Harness-wide rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderParams {
    /// How many times a single-color wire repeats its color so it is drawn
    /// as thick as a multicolor wire.
    pub color_padding: usize,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self { color_padding: 1 }
    }
}

impl RenderParams {
    pub fn for_harness(harness: &Harness) -> Self {
        let multicolor = harness.cables().iter().any(Cable::has_multicolor_wire);
        Self {
            color_padding: if multicolor { 3 } else { 1 },
        }
    }
}

/// A node with an HTML-like label.
#[derive(Debug, Clone, PartialEq)]
pub struct GvNode {
    pub name: String,
    /// HTML label body, emitted as `label=<...>`.
    pub label: String,
    pub attrs: BTreeMap<String, String>,
}

/// One end of an edge: node name plus optional record port and compass point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GvEndpoint {
    pub node: String,
    pub port: Option<String>,
    pub compass: Option<&'static str>,
}

impl GvEndpoint {
    pub fn node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: None,
            compass: None,
        }
    }

    pub fn port(node: impl Into<String>, port: impl Into<String>, compass: &'static str) -> Self {
        Self {
            node: node.into(),
            port: Some(port.into()),
            compass: Some(compass),
        }
    }

    pub fn compass(node: impl Into<String>, compass: &'static str) -> Self {
        Self {
            node: node.into(),
            port: None,
            compass: Some(compass),
        }
    }
}

impl fmt::Display for GvEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_quoted(&self.node))?;
        if let Some(port) = &self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(compass) = self.compass {
            write!(f, ":{}", compass)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GvEdge {
    pub tail: GvEndpoint,
    pub head: GvEndpoint,
    pub attrs: BTreeMap<String, String>,
}

/// Finished graph description handed to a layout engine.
#[derive(Debug, Clone, Default)]
pub struct GraphDescription {
    graph: UnGraph<GvNode, GvEdge>,
    /// Index mapping: node name -> NodeIndex
    node_indices: HashMap<String, NodeIndex>,
    pub graph_attrs: BTreeMap<String, String>,
    pub node_defaults: BTreeMap<String, String>,
    pub edge_defaults: BTreeMap<String, String>,
    /// Raw DOT lines emitted after all nodes and edges.
    pub append: Vec<String>,
}

impl GraphDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing the label and attributes of an existing node
    /// with the same name.
    pub fn add_node(&mut self, node: GvNode) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&node.name) {
            self.graph[idx] = node;
            return idx;
        }
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.node_indices.insert(name, idx);
        idx
    }

    /// Add an edge. Both endpoint nodes must already exist.
    pub fn add_edge(&mut self, edge: GvEdge) -> Result<(), HarnessError> {
        let tail = self.index_of(&edge.tail.node)?;
        let head = self.index_of(&edge.head.node)?;
        self.graph.add_edge(tail, head, edge);
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, HarnessError> {
        self.node_indices
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::UnknownComponent(name.to_string()))
    }

    pub fn node(&self, name: &str) -> Option<&GvNode> {
        self.node_indices.get(name).map(|&idx| &self.graph[idx])
    }

    /// Names of the nodes sharing an edge with `name`.
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GvNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &GvEdge> {
        self.graph.edge_indices().map(move |idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Apply attribute overrides and appended lines.
    ///
    /// The keys `graph`, `node` and `edge` address the defaults; any other
    /// key addresses the node of that name. A `None` value removes the
    /// attribute; overriding `label` replaces a node's HTML label, which
    /// cannot be removed.
    pub fn apply_tweak(&mut self, tweak: &Tweak) {
        for (target, attrs) in &tweak.overrides {
            match target.as_str() {
                "graph" => apply_overrides(&mut self.graph_attrs, attrs),
                "node" => apply_overrides(&mut self.node_defaults, attrs),
                "edge" => apply_overrides(&mut self.edge_defaults, attrs),
                name => match self.node_indices.get(name) {
                    Some(&idx) => {
                        let node = &mut self.graph[idx];
                        for (key, value) in attrs {
                            match (key.as_str(), value) {
                                ("label", Some(label)) => node.label = label.clone(),
                                ("label", None) => {
                                    tracing::warn!("Tweak cannot remove the label of node {}", name)
                                }
                                (_, Some(value)) => {
                                    node.attrs.insert(key.clone(), value.clone());
                                }
                                (_, None) => {
                                    node.attrs.remove(key);
                                }
                            }
                        }
                    }
                    None => tracing::warn!("Tweak override for unknown node {}", name),
                },
            }
        }
        self.append.extend(tweak.append.iter().cloned());
    }

    /// Serialize as an undirected Graphviz graph.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "graph {{");
        write_attr_statement(&mut out, "graph", &self.graph_attrs);
        write_attr_statement(&mut out, "node", &self.node_defaults);
        write_attr_statement(&mut out, "edge", &self.edge_defaults);

        for node in self.nodes() {
            let _ = write!(out, "\t\"{}\" [label=<\n{}\n>", escape_quoted(&node.name), node.label);
            for (key, value) in &node.attrs {
                let _ = write!(out, " {}=\"{}\"", key, escape_quoted(value));
            }
            let _ = writeln!(out, "]");
        }
        for edge in self.edges() {
            let _ = write!(out, "\t{} -- {}", edge.tail, edge.head);
            if !edge.attrs.is_empty() {
                let _ = write!(out, " [{}]", format_attrs(&edge.attrs));
            }
            let _ = writeln!(out);
        }
        for line in &self.append {
            let _ = writeln!(out, "\t{}", line);
        }
        let _ = writeln!(out, "}}");
        out
    }
}

fn apply_overrides(target: &mut BTreeMap<String, String>, attrs: &BTreeMap<String, Option<String>>) {
    for (key, value) in attrs {
        match value {
            Some(value) => {
                target.insert(key.clone(), value.clone());
            }
            None => {
                target.remove(key);
            }
        }
    }
}

fn write_attr_statement(out: &mut String, kind: &str, attrs: &BTreeMap<String, String>) {
    if attrs.is_empty() {
        return;
    }
    let _ = writeln!(out, "\t{} [{}]", kind, format_attrs(attrs));
}

fn format_attrs(attrs: &BTreeMap<String, String>) -> String {
    attrs
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, escape_quoted(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn attrs<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Edge color for a wire: black border, the wire's colors, black border.
/// A single color is repeated `color_padding` times.
pub fn wire_edge_color(color: &WireColor, params: &RenderParams, colors: &dyn ColorTranslator) -> String {
    if color.is_empty() {
        return BLACK.to_string();
    }
    let hex: Vec<String> = color.0.iter().map(|c| colors.to_hex(c)).collect();
    let mut parts = vec![BLACK.to_string()];
    match hex.as_slice() {
        [single] => parts.extend(std::iter::repeat(single.clone()).take(params.color_padding.max(1))),
        _ => parts.extend(hex),
    }
    parts.push(BLACK.to_string());
    parts.join(":")
}

fn set_dot_basics(graph: &mut GraphDescription, options: &Options, colors: &dyn ColorTranslator) {
    graph.graph_attrs = attrs([
        ("rankdir", "LR".to_string()),
        ("ranksep", "2".to_string()),
        ("bgcolor", colors.to_hex(&options.bgcolor)),
        ("nodesep", "0.33".to_string()),
        ("fontname", options.fontname.clone()),
    ]);
    graph.node_defaults = attrs([
        ("shape", "none".to_string()),
        ("width", "0".to_string()),
        ("height", "0".to_string()),
        ("margin", "0".to_string()),
        ("style", "filled".to_string()),
        ("fillcolor", colors.to_hex(&options.bgcolor_node)),
        ("fontname", options.fontname.clone()),
    ]);
    graph.edge_defaults = attrs([
        ("style", "bold".to_string()),
        ("fontname", options.fontname.clone()),
    ]);
}

/// Build the graph description for a harness.
pub fn build_graph_description(
    harness: &Harness,
    params: &RenderParams,
    colors: &dyn ColorTranslator,
) -> Result<GraphDescription, HarnessError> {
    let options = &harness.options;
    let mut graph = GraphDescription::new();
    set_dot_basics(&mut graph, options, colors);

    for connector in harness.connectors() {
        let bgcolor = connector
            .bgcolor
            .as_ref()
            .or(options.bgcolor_connector.as_ref())
            .unwrap_or(&options.bgcolor_node);
        graph.add_node(GvNode {
            name: connector.designator.clone(),
            label: connector_label(connector, colors),
            attrs: attrs([
                ("shape", "box".to_string()),
                ("style", "filled".to_string()),
                ("fillcolor", colors.to_hex(bgcolor)),
            ]),
        });

        let side = loop_side(connector);
        for &(a, b) in &connector.loops {
            graph.add_edge(GvEdge {
                tail: pin_port(&connector.designator, a, side),
                head: pin_port(&connector.designator, b, side),
                attrs: attrs([("color", BLACK.to_string())]),
            })?;
        }
    }

    for cable in harness.cables() {
        let bgcolor = cable
            .bgcolor
            .as_ref()
            .or(if cable.is_bundle() {
                options.bgcolor_bundle.as_ref()
            } else {
                options.bgcolor_cable.as_ref()
            })
            .unwrap_or(&options.bgcolor_node);
        let style = if cable.is_bundle() { "filled,dashed" } else { "filled" };
        graph.add_node(GvNode {
            name: cable.designator.clone(),
            label: cable_label(cable, harness, params, colors),
            attrs: attrs([
                ("shape", "box".to_string()),
                ("style", style.to_string()),
                ("fillcolor", colors.to_hex(bgcolor)),
            ]),
        });

        for connection in &cable.connections {
            let color = cable
                .wire(connection.via)
                .map(|w| wire_edge_color(&w.color, params, colors))
                .unwrap_or_else(|| BLACK.to_string());
            let wire_port = format!("w{}", connection.via);
            if let Some(from) = &connection.from {
                graph.add_edge(GvEdge {
                    tail: pin_port(&from.connector, from.pin, Side::Right),
                    head: GvEndpoint::port(&cable.designator, wire_port.clone(), Side::Left.compass()),
                    attrs: attrs([("color", color.clone())]),
                })?;
            }
            if let Some(to) = &connection.to {
                graph.add_edge(GvEdge {
                    tail: GvEndpoint::port(&cable.designator, wire_port, Side::Right.compass()),
                    head: pin_port(&to.connector, to.pin, Side::Left),
                    attrs: attrs([("color", color)]),
                })?;
            }
        }
    }

    for mate in harness.mates() {
        let arrow = mate.arrow();
        let color = match arrow.weight {
            crate::model::ArrowWeight::Single => BLACK.to_string(),
            crate::model::ArrowWeight::Double => format!("{}:{}", BLACK, BLACK),
        };
        let (tail, head) = match mate {
            Mate::Pin { from, to, .. } => (
                pin_port(&from.connector, from.pin, Side::Right),
                pin_port(&to.connector, to.pin, Side::Left),
            ),
            Mate::Component { from, to, .. } => (
                GvEndpoint::compass(from, Side::Right.compass()),
                GvEndpoint::compass(to, Side::Left.compass()),
            ),
        };
        graph.add_edge(GvEdge {
            tail,
            head,
            attrs: attrs([
                ("color", color),
                ("style", "dashed".to_string()),
                ("dir", arrow.direction.dot_dir().to_string()),
            ]),
        })?;
    }

    graph.apply_tweak(&harness.tweak);
    tracing::debug!(
        "Built graph description with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn pin_port(designator: &str, pin: u32, side: Side) -> GvEndpoint {
    GvEndpoint::port(designator, format!("p{}{}", pin, side.port_suffix()), side.compass())
}

/// Loops are drawn on the left when anything is already attached there.
fn loop_side(connector: &Connector) -> Side {
    if connector.has_active_side(Side::Left) {
        Side::Left
    } else {
        Side::Right
    }
}

/// Which port columns the connector's pin table carries.
fn port_columns(connector: &Connector) -> (bool, bool) {
    let left = connector.has_active_side(Side::Left);
    let right = connector.has_active_side(Side::Right) || (!left && !connector.loops.is_empty());
    (left, right)
}

fn html_row(out: &mut String, cells: &[String]) {
    let cells: Vec<&String> = cells.iter().filter(|c| !c.is_empty()).collect();
    if cells.is_empty() {
        return;
    }
    let _ = write!(out, "<tr><td><table border=\"0\" cellspacing=\"0\" cellpadding=\"3\" cellborder=\"1\"><tr>");
    for cell in cells {
        let _ = write!(out, "<td balign=\"left\">{}</td>", escape_html(cell));
    }
    let _ = writeln!(out, "</tr></table></td></tr>");
}

fn part_number_cells(part: &PartNumbers) -> Vec<String> {
    let manufacturer = match (&part.manufacturer, &part.mpn) {
        (Some(m), Some(mpn)) => format!("{}: {}", m, mpn),
        (Some(m), None) => m.clone(),
        (None, Some(mpn)) => format!("MPN: {}", mpn),
        (None, None) => String::new(),
    };
    let supplier = match (&part.supplier, &part.spn) {
        (Some(s), Some(spn)) => format!("{}: {}", s, spn),
        (Some(s), None) => s.clone(),
        (None, Some(spn)) => format!("SPN: {}", spn),
        (None, None) => String::new(),
    };
    vec![
        part.pn.as_ref().map(|pn| format!("P/N: {}", pn)).unwrap_or_default(),
        manufacturer,
        supplier,
    ]
}

fn additional_rows(out: &mut String, components: &[AdditionalComponent], multiplier: impl Fn(&AdditionalComponent) -> f64) {
    for component in components {
        let qty = component.bom_qty(multiplier(component));
        let unit = component.unit.as_deref().map(|u| format!(" {}", u)).unwrap_or_default();
        html_row(out, &[format!("{}{} x {}", qty, unit, component.description())]);
    }
}

fn connector_label(connector: &Connector, colors: &dyn ColorTranslator) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<table border=\"0\" cellspacing=\"0\" cellpadding=\"0\">");
    if connector.show_name {
        html_row(&mut out, &[connector.designator.clone()]);
    }
    html_row(
        &mut out,
        &[
            connector.connector_type.clone().unwrap_or_default(),
            connector.subtype.clone().unwrap_or_default(),
            if connector.show_pincount {
                format!("{}-pin", connector.pincount())
            } else {
                String::new()
            },
            connector.color.clone().unwrap_or_default(),
        ],
    );
    html_row(&mut out, &part_number_cells(&connector.part));

    let (left, right) = port_columns(connector);
    let has_labels = connector.pins.iter().any(|p| p.label.is_some());
    let has_colors = connector.pins.iter().any(|p| p.color.is_some());
    let _ = writeln!(
        out,
        "<tr><td><table border=\"0\" cellspacing=\"0\" cellpadding=\"3\" cellborder=\"1\">"
    );
    for pin in &connector.pins {
        if connector.hide_disconnected_pins && !pin.state.is_active() && !connector.is_looped(pin.id) {
            continue;
        }
        let _ = write!(out, "<tr>");
        if left {
            let _ = write!(out, "<td port=\"p{}l\">{}</td>", pin.id, pin.id);
        }
        if has_labels {
            let label = pin.label.as_deref().map(escape_html).unwrap_or_default();
            let _ = write!(out, "<td>{}</td>", label);
        }
        if has_colors {
            match &pin.color {
                Some(color) => {
                    let _ = write!(
                        out,
                        "<td bgcolor=\"{}\">{}</td>",
                        escape_html(&colors.to_hex(color)),
                        escape_html(color)
                    );
                }
                None => {
                    let _ = write!(out, "<td></td>");
                }
            }
        }
        if right {
            let _ = write!(out, "<td port=\"p{}r\">{}</td>", pin.id, pin.id);
        }
        if !left && !right {
            let _ = write!(out, "<td>{}</td>", pin.id);
        }
        let _ = writeln!(out, "</tr>");
    }
    let _ = writeln!(out, "</table></td></tr>");

    if let Some(notes) = &connector.notes {
        html_row(&mut out, &[notes.clone()]);
    }
    additional_rows(&mut out, &connector.additional_components, |c| {
        c.qty_multiplier.map(|m| connector.multiplier_value(m)).unwrap_or(1.0)
    });
    out.push_str("</table>");
    out
}

fn cable_label(cable: &Cable, harness: &Harness, params: &RenderParams, colors: &dyn ColorTranslator) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<table border=\"0\" cellspacing=\"0\" cellpadding=\"0\">");
    if cable.show_name {
        html_row(&mut out, &[cable.designator.clone()]);
    }
    let size = match &cable.gauge {
        Some(gauge) => format!("{}x {}", cable.wirecount(), gauge),
        None => format!("{}x", cable.wirecount()),
    };
    html_row(
        &mut out,
        &[
            cable.cable_type.clone().unwrap_or_default(),
            size,
            if cable.shield { "+ S".to_string() } else { String::new() },
            cable
                .length
                .map(|l| format!("{} {}", l, cable.length_unit))
                .unwrap_or_default(),
            cable.color.clone().unwrap_or_default(),
        ],
    );
    if !cable.is_bundle() {
        html_row(&mut out, &part_number_cells(&cable.part));
    }

    let endpoint_text = |endpoint: &crate::model::PinEndpoint| {
        let label = harness
            .connector(&endpoint.connector)
            .and_then(|c| c.pin(endpoint.pin))
            .and_then(|p| p.label.as_deref());
        match label {
            Some(label) => format!("{}:{}:{}", endpoint.connector, endpoint.pin, label),
            None => endpoint.to_string(),
        }
    };

    let _ = writeln!(
        out,
        "<tr><td><table border=\"0\" cellspacing=\"0\" cellborder=\"0\">"
    );
    for wire in &cable.wires {
        let connections: Vec<_> = cable.connections.iter().filter(|c| c.via == wire.id).collect();
        let from: Vec<String> = connections
            .iter()
            .filter_map(|c| c.from.as_ref().map(endpoint_text))
            .map(|t| escape_html(&t))
            .collect();
        let to: Vec<String> = connections
            .iter()
            .filter_map(|c| c.to.as_ref().map(endpoint_text))
            .map(|t| escape_html(&t))
            .collect();
        let mut name = wire.id.to_string();
        if let Some(code) = &wire.color_code {
            let _ = write!(name, ":{}", code);
        }
        if let Some(label) = &wire.label {
            let _ = write!(name, ":{}", label);
        }
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            from.join("<br/>"),
            escape_html(&name),
            to.join("<br/>")
        );

        let _ = write!(
            out,
            "<tr><td colspan=\"3\" border=\"0\" cellspacing=\"0\" cellpadding=\"0\" port=\"w{}\" height=\"{}\">",
            wire.id,
            2 * params.color_padding.max(wire.color.0.len()) + 2
        );
        let _ = write!(out, "<table cellspacing=\"0\" cellborder=\"0\" border=\"2\">");
        let bands: Vec<String> = if wire.color.is_empty() {
            vec![BLACK.to_string()]
        } else {
            wire.color.0.iter().map(|c| colors.to_hex(c)).collect()
        };
        for band in bands {
            let _ = write!(
                out,
                "<tr><td colspan=\"3\" cellpadding=\"0\" height=\"2\" bgcolor=\"{}\" border=\"0\"></td></tr>",
                escape_html(&band)
            );
        }
        let _ = writeln!(out, "</table></td></tr>");
    }
    if cable.shield {
        let _ = writeln!(out, "<tr><td colspan=\"3\">Shield</td></tr>");
    }
    let _ = writeln!(out, "</table></td></tr>");

    if cable.is_bundle() {
        for wire in &cable.wires {
            let mut cells = vec![format!("{}:", wire.id)];
            cells.extend(part_number_cells(&cable.part));
            if cells.len() > 1 && cells[1..].iter().any(|c| !c.is_empty()) {
                html_row(&mut out, &cells);
            }
        }
    }
    if let Some(notes) = &cable.notes {
        html_row(&mut out, &[notes.clone()]);
    }
    additional_rows(&mut out, &cable.additional_components, |c| {
        c.qty_multiplier.map(|m| cable.multiplier_value(m)).unwrap_or(1.0)
    });
    out.push_str("</table>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CableSpec, ConnectorSpec};

    fn demo() -> Harness {
        let mut h = Harness::default();
        h.add_connector("X1", ConnectorSpec::with_pincount(2).with_pinlabels(["GND", "VCC"]))
            .unwrap();
        h.add_connector("X2", ConnectorSpec::with_pincount(2)).unwrap();
        h.add_cable("W1", CableSpec::default().with_colors(["RD", "BK"]))
            .unwrap();
        h.connect(Some(("X1", "GND".into())), ("W1", "RD".into()), Some(("X2", 1u32.into())))
            .unwrap();
        h
    }

    #[test]
    fn test_padding_depends_on_multicolor_wires() {
        let mut h = demo();
        assert_eq!(RenderParams::for_harness(&h).color_padding, 1);
        h.add_cable("W2", CableSpec::default().with_colors(["GNYE"]))
            .unwrap();
        assert_eq!(RenderParams::for_harness(&h).color_padding, 3);
    }

    #[test]
    fn test_wire_edge_color() {
        let red = WireColor::parse("RD");
        let padded = RenderParams { color_padding: 3 };
        assert_eq!(
            wire_edge_color(&red, &RenderParams::default(), &Iec60757Colors),
            "#000000:#FF0000:#000000"
        );
        assert_eq!(
            wire_edge_color(&red, &padded, &Iec60757Colors),
            "#000000:#FF0000:#FF0000:#FF0000:#000000"
        );
        assert_eq!(
            wire_edge_color(&WireColor::parse("GN:YE"), &padded, &Iec60757Colors),
            "#000000:#00FF00:#FFFF00:#000000"
        );
        assert_eq!(
            wire_edge_color(&WireColor::default(), &padded, &Iec60757Colors),
            "#000000"
        );
    }

    #[test]
    fn test_nodes_and_wire_edges() {
        let g = demo().graph(&Iec60757Colors).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.neighbors("W1"), vec!["X1", "X2"]);

        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges[0].tail.to_string(), "\"X1\":p1r:e");
        assert_eq!(edges[0].head.to_string(), "\"W1\":w1:w");
        assert_eq!(edges[1].tail.to_string(), "\"W1\":w1:e");
        assert_eq!(edges[1].head.to_string(), "\"X2\":p1l:w");
        assert_eq!(edges[0].attrs["color"], "#000000:#FF0000:#000000");
    }

    #[test]
    fn test_bundle_is_dashed() {
        let mut h = demo();
        h.add_cable("B1", CableSpec::bundle().with_colors(["WH"])).unwrap();
        let g = h.graph(&Iec60757Colors).unwrap();
        assert_eq!(g.node("B1").unwrap().attrs["style"], "filled,dashed");
        assert_eq!(g.node("W1").unwrap().attrs["style"], "filled");
    }

    #[test]
    fn test_mate_edges() {
        let mut h = demo();
        h.add_mate_pin("X1", "VCC", "X2", 2u32, "==>").unwrap();
        h.add_mate_component("X1", "W1", "<->").unwrap();
        let g = h.graph(&Iec60757Colors).unwrap();
        let mates: Vec<_> = g
            .edges()
            .filter(|e| e.attrs.get("style").map(String::as_str) == Some("dashed"))
            .collect();
        assert_eq!(mates.len(), 2);
        assert_eq!(mates[0].tail.to_string(), "\"X1\":p2r:e");
        assert_eq!(mates[0].attrs["dir"], "forward");
        assert_eq!(mates[0].attrs["color"], "#000000:#000000");
        assert_eq!(mates[1].tail.to_string(), "\"X1\":e");
        assert_eq!(mates[1].head.to_string(), "\"W1\":w");
        assert_eq!(mates[1].attrs["dir"], "both");
    }

    #[test]
    fn test_loops_drawn_on_left_when_left_side_used() {
        let mut h = Harness::default();
        let mut spec = ConnectorSpec::with_pincount(3);
        spec.loops = vec![[2u32.into(), 3u32.into()]];
        h.add_connector("X1", spec).unwrap();
        h.add_cable("W1", CableSpec::with_wirecount(1)).unwrap();
        h.connect(None, ("W1", 1u32.into()), Some(("X1", 1u32.into())))
            .unwrap();

        let g = h.graph(&Iec60757Colors).unwrap();
        let looped = g.edges().find(|e| e.tail.node == "X1" && e.head.node == "X1").unwrap();
        assert_eq!(looped.tail.to_string(), "\"X1\":p2l:w");
        assert_eq!(looped.head.to_string(), "\"X1\":p3l:w");
    }

    #[test]
    fn test_hide_disconnected_pins() {
        let mut h = Harness::default();
        let mut spec = ConnectorSpec::with_pincount(3);
        spec.hide_disconnected_pins = true;
        h.add_connector("X1", spec).unwrap();
        h.add_cable("W1", CableSpec::with_wirecount(1)).unwrap();
        h.connect(Some(("X1", 2u32.into())), ("W1", 1u32.into()), None)
            .unwrap();
        let label = h.graph(&Iec60757Colors).unwrap().node("X1").unwrap().label.clone();
        assert!(label.contains("port=\"p2r\""));
        assert!(!label.contains("p1r"));
        assert!(!label.contains("p3r"));
    }

    #[test]
    fn test_tweak_overrides_and_append() {
        let mut h = demo();
        h.tweak
            .overrides
            .entry("X1".into())
            .or_default()
            .insert("fillcolor".into(), None);
        h.tweak
            .overrides
            .entry("graph".into())
            .or_default()
            .insert("rankdir".into(), Some("TB".into()));
        h.tweak.append.push("// tweaked".into());

        let g = h.graph(&Iec60757Colors).unwrap();
        assert!(!g.node("X1").unwrap().attrs.contains_key("fillcolor"));
        assert_eq!(g.graph_attrs["rankdir"], "TB");
        assert!(g.to_dot().contains("\t// tweaked\n}"));
    }

    #[test]
    fn test_tweak_null_label_keeps_node_label() {
        let mut h = demo();
        let original = h.graph(&Iec60757Colors).unwrap().node("X1").unwrap().label.clone();
        h.tweak
            .overrides
            .entry("X1".into())
            .or_default()
            .insert("label".into(), None);

        let g = h.graph(&Iec60757Colors).unwrap();
        let node = g.node("X1").unwrap();
        assert_eq!(node.label, original);
        assert!(!node.attrs.contains_key("label"));
    }

    #[test]
    fn test_to_dot_escapes_labels() {
        let mut h = Harness::default();
        h.add_connector("X1", ConnectorSpec::with_pincount(1).with_pinlabels(["A<B"]))
            .unwrap();
        let dot = h.graph(&Iec60757Colors).unwrap().to_dot();
        assert!(dot.starts_with("graph {\n"));
        assert!(dot.contains("A&lt;B"));
        assert!(dot.contains("\"X1\" [label=<"));
        assert!(dot.contains("rankdir=\"LR\""));
    }

    #[test]
    fn test_add_edge_requires_nodes() {
        let mut g = GraphDescription::new();
        g.add_node(GvNode {
            name: "X1".into(),
            label: String::new(),
            attrs: BTreeMap::new(),
        });
        let err = g
            .add_edge(GvEdge {
                tail: GvEndpoint::node("X1"),
                head: GvEndpoint::node("X9"),
                attrs: BTreeMap::new(),
            })
            .unwrap_err();
        assert!(matches!(err, HarnessError::UnknownComponent(ref d) if d == "X9"));
    }
}
