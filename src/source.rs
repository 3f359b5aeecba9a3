use crate::config::GraphAttrFile;
use crate::error::{DiagramError, Result};
use crate::ir::{BuiltinIcon, Diagram, Direction, Icon};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;

static NODE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DiagramFile {
    title: String,
    direction: Option<String>,
    graph_attr: Option<GraphAttrFile>,
    #[serde(default)]
    nodes: Vec<NodeEntry>,
    #[serde(default)]
    clusters: Vec<ClusterEntry>,
    #[serde(default)]
    edges: Vec<(String, String)>,
    #[serde(default)]
    chains: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeEntry {
    id: String,
    label: Option<String>,
    icon: IconEntry,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IconEntry {
    Builtin(String),
    Custom { custom: PathBuf },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClusterEntry {
    label: String,
    nodes: Vec<NodeEntry>,
}

/// Builds a diagram from a JSON5 description:
///
/// ```json5
/// {
///   title: "Nightly export",
///   nodes: [{ id: "job", label: "Export", icon: "bash" }],
///   clusters: [{ label: "Host", nodes: [{ id: "cron", icon: { custom: "cron.png" } }] }],
///   chains: [["cron", "job"]],
/// }
/// ```
///
/// Nodes are declared top-level first, then cluster by cluster.
pub fn parse_diagram(input: &str) -> Result<Diagram> {
    let file: DiagramFile = json5::from_str(input).map_err(|err| DiagramError::Description(err.to_string()))?;

    let mut diagram = Diagram::new(file.title);
    if let Some(token) = file.direction {
        diagram.direction = Direction::from_token(&token).ok_or(DiagramError::UnknownDirection(token))?;
    }
    if let Some(attr) = file.graph_attr {
        diagram.graph_attr = attr
            .into_graph_attr()
            .map_err(|err| DiagramError::Description(err.to_string()))?;
    }

    for entry in &file.nodes {
        let (id, label, icon) = node_parts(entry)?;
        diagram.add_node(id, label, icon)?;
    }
    for cluster in &file.clusters {
        let idx = diagram.add_cluster(&cluster.label);
        for entry in &cluster.nodes {
            let (id, label, icon) = node_parts(entry)?;
            diagram.add_node_in(idx, id, label, icon)?;
        }
    }

    for (from, to) in &file.edges {
        diagram.connect(from, to)?;
    }
    for chain in &file.chains {
        let ids: Vec<&str> = chain.iter().map(String::as_str).collect();
        diagram.chain(&ids)?;
    }

    diagram.validate()?;
    Ok(diagram)
}

fn node_parts(entry: &NodeEntry) -> Result<(&str, &str, Icon)> {
    if !NODE_ID_RE.is_match(&entry.id) {
        return Err(DiagramError::InvalidId(entry.id.clone()));
    }
    let icon = match &entry.icon {
        IconEntry::Builtin(name) => Icon::Builtin(
            BuiltinIcon::from_name(name)
                .ok_or_else(|| DiagramError::Description(format!("unknown icon \"{name}\"")))?,
        ),
        IconEntry::Custom { custom } => Icon::Custom(custom.clone()),
    };
    let label = entry.label.as_deref().unwrap_or(&entry.id);
    Ok((&entry.id, label, icon))
}
