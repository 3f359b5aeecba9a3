//! Graphviz DOT export, using the node/edge/cluster attributes the Python
//! `diagrams` package hands to `dot`.

use crate::config::Config;
use crate::icons::{ResolvedIcon, resolve_icon};
use crate::ir::{Diagram, Node};

pub fn render_dot(diagram: &Diagram, config: &Config) -> crate::error::Result<String> {
    diagram.validate()?;
    let theme = config.theme_for(diagram);
    let mut out = String::new();

    out.push_str(&format!("digraph {} {{\n", quote(&diagram.title)));
    let graph_attrs = [
        ("label", diagram.title.clone()),
        ("rankdir", diagram.direction.token().to_string()),
        ("splines", "ortho".to_string()),
        ("pad", "2.0".to_string()),
        ("nodesep", "0.60".to_string()),
        ("ranksep", "0.75".to_string()),
        ("fontname", "Sans-Serif".to_string()),
        ("fontsize", format_number(theme.title_font_size)),
        ("fontcolor", theme.text_color.clone()),
        ("bgcolor", theme.background.clone()),
    ];
    out.push_str(&format!("  graph [{}]\n", attr_list(&graph_attrs)));
    out.push_str(&format!(
        "  node [shape=box style=rounded fixedsize=true width=1.4 height=1.4 labelloc=b imagescale=true fontname=\"Sans-Serif\" fontsize=13 fontcolor={}]\n",
        quote(&theme.text_color)
    ));
    out.push_str(&format!("  edge [color={}]\n", quote(&theme.line_color)));

    for node in diagram.nodes.iter().filter(|node| node.cluster.is_none()) {
        out.push_str(&format!("  {}\n", node_statement(node, config)?));
    }

    for (idx, cluster) in diagram.clusters.iter().enumerate() {
        out.push_str(&format!("  subgraph cluster_{idx} {{\n"));
        let cluster_attrs = [
            ("label", cluster.label.clone()),
            ("labeljust", "l".to_string()),
            ("style", "rounded".to_string()),
            ("bgcolor", theme.cluster_background.clone()),
            ("pencolor", theme.cluster_border.clone()),
            ("fontname", "Sans-Serif".to_string()),
            ("fontsize", format_number(theme.cluster_font_size)),
        ];
        out.push_str(&format!("    graph [{}]\n", attr_list(&cluster_attrs)));
        for id in &cluster.nodes {
            if let Some(node) = diagram.node(id) {
                out.push_str(&format!("    {}\n", node_statement(node, config)?));
            }
        }
        out.push_str("  }\n");
    }

    for edge in &diagram.edges {
        out.push_str(&format!("  {} -> {}\n", quote(&edge.from), quote(&edge.to)));
    }
    out.push_str("}\n");
    Ok(out)
}

/// Built-in glyphs have no file on disk, so only custom images carry `image`.
fn node_statement(node: &Node, config: &Config) -> crate::error::Result<String> {
    let extra_lines = node.label.lines().count().saturating_sub(1) as f32;
    let mut attrs = vec![("label", node.label.clone())];
    if let ResolvedIcon::Image(path) = resolve_icon(&node.icon, &config.render.assets_dir)? {
        attrs.push(("image", path.to_string_lossy().into_owned()));
    }
    attrs.push(("height", format_number(1.9 + extra_lines * 0.4)));
    Ok(format!("{} [{}]", quote(&node.id), attr_list(&attrs)))
}

fn attr_list(attrs: &[(&str, String)]) -> String {
    attrs
        .iter()
        .map(|(key, value)| format!("{key}={}", quote(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{escaped}\"")
}

fn format_number(value: f32) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BuiltinIcon, Icon};

    fn pipeline() -> Diagram {
        let mut diagram = Diagram::new("Nightly \"Export\"");
        diagram.add_node("extract", "Extract", Icon::Builtin(BuiltinIcon::Bash)).unwrap();
        let host = diagram.add_cluster("Host");
        diagram.add_node_in(host, "load", "Load\nStep", Icon::Builtin(BuiltinIcon::Bash)).unwrap();
        diagram.add_node("bucket", "Bucket", Icon::Builtin(BuiltinIcon::S3)).unwrap();
        diagram.chain(&["extract", "load", "bucket"]).unwrap();
        diagram
    }

    #[test]
    fn emits_clusters_nodes_and_edges() {
        let dot = render_dot(&pipeline(), &Config::default()).unwrap();
        assert!(dot.starts_with("digraph \"Nightly \\\"Export\\\"\" {"));
        assert!(dot.contains("rankdir=\"LR\""));
        assert!(dot.contains("subgraph cluster_0 {"));
        assert!(dot.contains("label=\"Host\""));
        assert!(dot.contains("\"extract\" -> \"load\""));
        assert!(dot.contains("\"load\" -> \"bucket\""));
        assert!(!dot.contains("image="));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn multi_line_labels_raise_node_height() {
        let dot = render_dot(&pipeline(), &Config::default()).unwrap();
        assert!(dot.contains("label=\"Load\\nStep\" height=\"2.3\""));
        assert!(dot.contains("label=\"Extract\" height=\"1.9\""));
    }

    #[test]
    fn only_custom_icons_reference_an_image_file() {
        let dir = std::env::temp_dir().join(format!("archdiagram-dot-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("logo.png"), b"not really a png").unwrap();
        let mut diagram = pipeline();
        diagram.add_node("source", "Source", Icon::Custom("logo.png".into())).unwrap();
        diagram.connect("source", "extract").unwrap();
        let mut config = Config::default();
        config.render.assets_dir = dir.clone();

        let dot = render_dot(&diagram, &config).unwrap();
        assert_eq!(dot.matches("image=").count(), 1);
        assert!(dot.contains(&format!("image=\"{}\"", dir.join("logo.png").display())));
        assert!(!dot.contains("builtin:"));
    }

    #[test]
    fn graph_attributes_follow_the_diagram() {
        let mut diagram = pipeline();
        diagram.graph_attr.font_size = Some(20.0);
        diagram.graph_attr.bgcolor = Some("transparent".to_string());
        let dot = render_dot(&diagram, &Config::default()).unwrap();
        assert!(dot.contains("fontsize=\"20\""));
        assert!(dot.contains("bgcolor=\"transparent\""));
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(2.3), "2.3");
        assert_eq!(format_number(0.75), "0.75");
    }
}
