use crate::ir::{Diagram, Icon};
use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub title: String,
    pub direction: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub clusters: Vec<ClusterDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub icon: String,
    pub rank: usize,
    pub cluster: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label_lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct ClusterDump {
    pub index: usize,
    pub label: String,
    pub nodes: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, diagram: &Diagram) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                icon: match &node.icon {
                    Icon::Builtin(builtin) => builtin.name().to_string(),
                    Icon::Custom(path) => path.to_string_lossy().into_owned(),
                },
                rank: node.rank,
                cluster: node.cluster,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                label_lines: node.label.lines.clone(),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        let clusters = layout
            .clusters
            .iter()
            .enumerate()
            .map(|(index, cluster)| ClusterDump {
                index,
                label: cluster.label.lines.join("\n"),
                nodes: cluster.nodes.clone(),
                x: cluster.x,
                y: cluster.y,
                width: cluster.width,
                height: cluster.height,
            })
            .collect();

        LayoutDump {
            title: diagram.title.clone(),
            direction: diagram.direction.token().to_string(),
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            clusters,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout, diagram: &Diagram) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, diagram);
    serde_json::to_writer_pretty(writer, &dump)?;
    tracing::info!(path = %path.display(), "wrote layout dump");
    Ok(())
}
