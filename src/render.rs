use crate::config::{Config, LayoutConfig, RenderConfig};
use crate::dot::render_dot;
use crate::error::Result;
use crate::icons::{GLYPH_VIEWBOX, ResolvedIcon, glyph_body, resolve_icon};
use crate::ir::Diagram;
use crate::layout::{Layout, NodeLayout, TextBlock, compute_layout};
use crate::theme::Theme;
use std::path::Path;

const EDGE_STROKE_WIDTH: f32 = 1.6;
const LABEL_GAP: f32 = 6.0;

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig, render: &RenderConfig) -> Result<String> {
    let mut svg = String::new();
    let width = layout.width.ceil();
    let height = layout.height.ceil();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));

    if !theme.is_transparent() {
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&theme.background)
        ));
    }

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    for cluster in &layout.clusters {
        svg.push_str(&format!(
            "<g class=\"cluster\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
            cluster.x, cluster.y, cluster.width, cluster.height, theme.cluster_background, theme.cluster_border
        ));
        svg.push_str(&text_block_svg(
            cluster.x + 10.0,
            cluster.y + 8.0,
            &cluster.label,
            theme,
            config,
            "start",
        ));
        svg.push_str("</g>");
    }

    for edge in &layout.edges {
        svg.push_str(&format!(
            "<path class=\"edge\" data-from=\"{}\" data-to=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{EDGE_STROKE_WIDTH}\" marker-end=\"url(#arrow)\"/>",
            escape_xml(&edge.from),
            escape_xml(&edge.to),
            points_to_path(&edge.points),
            theme.line_color
        ));
    }

    for node in &layout.nodes {
        svg.push_str(&node_svg(node, theme, config, &render.assets_dir)?);
    }

    if let Some(title) = &layout.title {
        svg.push_str("<g class=\"title\">");
        svg.push_str(&text_block_svg(title.x, title.y, &title.text, theme, config, "middle"));
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    Ok(svg)
}

fn node_svg(node: &NodeLayout, theme: &Theme, config: &LayoutConfig, assets_dir: &Path) -> Result<String> {
    let mut out = format!("<g class=\"node\" id=\"{}\">", escape_xml(&node.id));
    let (x, y, size) = (node.icon_x(), node.icon_y(), node.icon_size);
    match resolve_icon(&node.icon, assets_dir)? {
        ResolvedIcon::Glyph(icon) => {
            let scale = size / GLYPH_VIEWBOX;
            out.push_str(&format!(
                "<g transform=\"translate({x:.2} {y:.2}) scale({scale:.4})\">{}</g>",
                glyph_body(icon)
            ));
        }
        ResolvedIcon::Image(path) => {
            let href = escape_xml(&path.to_string_lossy());
            out.push_str(&format!(
                "<image x=\"{x:.2}\" y=\"{y:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" preserveAspectRatio=\"xMidYMid meet\" href=\"{href}\" xlink:href=\"{href}\"/>"
            ));
        }
    }
    out.push_str(&text_block_svg(
        node.center_x(),
        y + size + LABEL_GAP,
        &node.label,
        theme,
        config,
        "middle",
    ));
    out.push_str("</g>");
    Ok(out)
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let mut d = String::new();
    for (idx, (x, y)) in points.iter().enumerate() {
        let cmd = if idx == 0 { "M" } else { " L" };
        d.push_str(&format!("{cmd} {x:.2} {y:.2}"));
    }
    d
}

/// Text whose top edge sits at `top`.
fn text_block_svg(x: f32, top: f32, block: &TextBlock, theme: &Theme, config: &LayoutConfig, anchor: &str) -> String {
    let line_height = block.font_size * config.label_line_height;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        top + block.font_size,
        escape_xml(&theme.font_family),
        block.font_size,
        theme.text_color
    );
    for (idx, line) in block.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!("<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>", escape_xml(line)));
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
            tracing::info!(path = %path.display(), "wrote svg");
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> anyhow::Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());
    pixmap.save_png(output)?;
    tracing::info!(path = %output.display(), width = size.width(), height = size.height(), "wrote png");
    Ok(())
}

/// Artifact kinds a diagram can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Svg,
    Png,
    Dot,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Dot => "dot",
        }
    }
}

/// Lays out and renders `diagram`, writing the result to `output`
/// (`None` prints SVG or DOT to stdout).
pub fn render_to_file(
    diagram: &Diagram,
    config: &Config,
    format: Format,
    output: Option<&Path>,
) -> anyhow::Result<Layout> {
    let theme = config.theme_for(diagram);
    let layout = compute_layout(diagram, &theme, &config.layout)?;
    match format {
        Format::Dot => {
            let dot = render_dot(diagram, config)?;
            match output {
                Some(path) => {
                    std::fs::write(path, dot)?;
                    tracing::info!(path = %path.display(), "wrote dot");
                }
                None => print!("{dot}"),
            }
        }
        Format::Svg => {
            let svg = render_svg(&layout, &theme, &config.layout, &config.render)?;
            write_output_svg(&svg, output)?;
        }
        Format::Png => {
            let svg = render_svg(&layout, &theme, &config.layout, &config.render)?;
            let output = output.ok_or_else(|| anyhow::anyhow!("Output path required for png output"))?;
            write_png(&svg, output, &config.render)?;
        }
    }
    Ok(layout)
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> anyhow::Result<()> {
    write_output_png(svg, output, render_cfg)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> anyhow::Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagramError;
    use crate::etl::sfmc_to_s3_etl;
    use crate::ir::{BuiltinIcon, Icon};

    fn render(diagram: &Diagram, theme: &Theme, assets_dir: &Path) -> Result<String> {
        let config = LayoutConfig::default();
        let layout = compute_layout(diagram, theme, &config)?;
        let render = RenderConfig {
            assets_dir: assets_dir.to_path_buf(),
            ..RenderConfig::default()
        };
        render_svg(&layout, theme, &config, &render)
    }

    #[test]
    fn render_svg_basic() {
        let mut diagram = Diagram::new("Alpha & Beta");
        diagram.add_node("a", "Alpha", Icon::Builtin(BuiltinIcon::Bash)).unwrap();
        diagram.add_node("b", "Beta", Icon::Builtin(BuiltinIcon::S3)).unwrap();
        diagram.connect("a", "b").unwrap();
        let svg = render(&diagram, &Theme::diagrams_default(), Path::new(".")).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains("Alpha &amp; Beta"));
        assert_eq!(svg.matches("class=\"edge\"").count(), 1);
        assert!(svg.contains("<rect width=\"100%\""));
    }

    #[test]
    fn transparent_background_is_not_painted() {
        let mut diagram = Diagram::new("t");
        diagram.add_node("a", "A", Icon::Builtin(BuiltinIcon::S3)).unwrap();
        let mut theme = Theme::diagrams_default();
        theme.background = "transparent".to_string();
        let svg = render(&diagram, &theme, Path::new(".")).unwrap();
        assert!(!svg.contains("<rect width=\"100%\""));
    }

    #[test]
    fn missing_custom_icon_fails_the_render() {
        let diagram = sfmc_to_s3_etl().unwrap();
        let err = render(&diagram, &Theme::diagrams_default(), Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, DiagramError::MissingIcon(_)));
    }

    #[test]
    fn path_data_joins_points() {
        assert_eq!(points_to_path(&[(0.0, 1.0), (2.5, 1.0)]), "M 0.00 1.00 L 2.50 1.00");
        assert_eq!(points_to_path(&[]), "");
    }
}
