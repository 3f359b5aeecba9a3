use crate::ir::{Diagram, GraphAttr};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Graphviz works in inches; everything here is in SVG pixels (72 per inch).
pub const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between nodes sharing a rank (`nodesep`).
    pub node_sep: f32,
    /// Gap between consecutive ranks (`ranksep`).
    pub rank_sep: f32,
    /// Canvas padding around the drawing (`pad`).
    pub pad: f32,
    /// Side of the square icon area of a node.
    pub icon_size: f32,
    /// Node height when the label fits on one line.
    pub node_height: f32,
    /// Height added per extra label line.
    pub label_line_step: f32,
    pub cluster_padding: f32,
    /// Reserved above cluster members for the cluster label.
    pub cluster_label_height: f32,
    pub title_gap: f32,
    pub label_line_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_sep: 0.60 * POINTS_PER_INCH,
            rank_sep: 0.75 * POINTS_PER_INCH,
            pad: 0.5 * POINTS_PER_INCH,
            icon_size: 1.4 * POINTS_PER_INCH,
            node_height: 1.9 * POINTS_PER_INCH,
            label_line_step: 0.4 * POINTS_PER_INCH,
            cluster_padding: 16.0,
            cluster_label_height: 22.0,
            title_gap: 24.0,
            label_line_height: 1.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory custom icon paths are resolved against.
    pub assets_dir: PathBuf,
    /// Fallback canvas size handed to the rasterizer.
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("."),
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    /// Graph attributes from the config file; these beat the diagram's own.
    pub graph_attr: GraphAttr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::diagrams_default(),
            layout: LayoutConfig::default(),
            render: RenderConfig::default(),
            graph_attr: GraphAttr::default(),
        }
    }
}

impl Config {
    /// Theme for one diagram: base theme, then the diagram's attributes,
    /// then the config file's attributes.
    pub fn theme_for(&self, diagram: &Diagram) -> Theme {
        let mut theme = self.theme.clone();
        for attr in [&diagram.graph_attr, &self.graph_attr] {
            if let Some(size) = attr.font_size {
                theme.title_font_size = size;
            }
            if let Some(bg) = &attr.bgcolor {
                theme.background = bg.clone();
            }
            if let Some(color) = &attr.font_color {
                theme.text_color = color.clone();
            }
        }
        theme
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    graph_attr: Option<GraphAttrFile>,
    layout: Option<LayoutFile>,
    render: Option<RenderFile>,
}

/// Graphviz attribute values are strings in most tooling; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(f32),
    Text(String),
}

impl NumberOrString {
    pub(crate) fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GraphAttrFile {
    pub fontsize: Option<NumberOrString>,
    pub bgcolor: Option<String>,
    pub fontcolor: Option<String>,
}

impl GraphAttrFile {
    pub(crate) fn into_graph_attr(self) -> anyhow::Result<GraphAttr> {
        let font_size = match self.fontsize {
            Some(value) => Some(
                value
                    .as_f32()
                    .filter(|size| *size > 0.0)
                    .ok_or_else(|| anyhow::anyhow!("graphAttr.fontsize must be a positive number"))?,
            ),
            None => None,
        };
        Ok(GraphAttr {
            font_size,
            bgcolor: self.bgcolor,
            font_color: self.fontcolor,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutFile {
    node_sep: Option<f32>,
    rank_sep: Option<f32>,
    pad: Option<f32>,
    icon_size: Option<f32>,
    cluster_padding: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderFile {
    assets_dir: Option<PathBuf>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "loaded config file");

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "plain" => config.theme = Theme::plain(),
            "diagrams" | "default" => config.theme = Theme::diagrams_default(),
            other => tracing::warn!(theme = other, "unknown theme, keeping the default"),
        }
    }

    if let Some(attr) = parsed.graph_attr {
        config.graph_attr = attr.into_graph_attr()?;
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_sep {
            config.layout.node_sep = v;
        }
        if let Some(v) = layout.rank_sep {
            config.layout.rank_sep = v;
        }
        if let Some(v) = layout.pad {
            config.layout.pad = v;
        }
        if let Some(v) = layout.icon_size {
            config.layout.icon_size = v;
        }
        if let Some(v) = layout.cluster_padding {
            config.layout.cluster_padding = v;
        }
    }

    if let Some(render) = parsed.render
        && let Some(dir) = render.assets_dir
    {
        config.render.assets_dir = if dir.is_relative() {
            path.parent().unwrap_or_else(|| Path::new(".")).join(dir)
        } else {
            dir
        };
    }

    Ok(config)
}
