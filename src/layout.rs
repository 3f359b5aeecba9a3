use crate::config::LayoutConfig;
use crate::error::Result;
use crate::ir::{Diagram, Direction, Icon};
use crate::text_metrics::measure_text_width;
use crate::theme::Theme;
use std::collections::HashMap;

/// Horizontal breathing room kept around a label wider than its icon.
const LABEL_MARGIN: f32 = 8.0;
/// Endpoints closer than this on the cross axis are joined by a straight line.
const ALIGN_EPSILON: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: String,
    pub label: TextBlock,
    pub icon: Icon,
    pub rank: usize,
    pub cluster: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub icon_size: f32,
}

impl NodeLayout {
    pub fn icon_x(&self) -> f32 {
        self.x + (self.width - self.icon_size) / 2.0
    }

    pub fn icon_y(&self) -> f32 {
        self.y
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn icon_center_y(&self) -> f32 {
        self.y + self.icon_size / 2.0
    }
}

#[derive(Debug, Clone)]
pub struct ClusterLayout {
    pub label: TextBlock,
    pub nodes: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone)]
pub struct TitleLayout {
    pub text: TextBlock,
    /// Centre of the title block.
    pub x: f32,
    /// Top of the title block.
    pub y: f32,
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub direction: Direction,
    pub nodes: Vec<NodeLayout>,
    pub clusters: Vec<ClusterLayout>,
    pub edges: Vec<EdgeLayout>,
    pub title: Option<TitleLayout>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

pub fn measure_label(text: &str, font_size: f32, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let lines: Vec<String> = text.lines().map(|line| line.trim().to_string()).collect();
    let lines = if lines.is_empty() { vec![String::new()] } else { lines };
    let width = lines
        .iter()
        .map(|line| measure_text_width(line, font_size, &theme.font_family))
        .fold(0.0f32, f32::max);
    let height = lines.len() as f32 * font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
        font_size,
    }
}

/// Longest-path ranks: every node sits one rank after its furthest predecessor.
fn assign_ranks(diagram: &Diagram, order: &[String]) -> HashMap<String, usize> {
    let mut ranks: HashMap<String, usize> = order.iter().map(|id| (id.clone(), 0)).collect();
    for id in order {
        let rank = ranks.get(id).copied().unwrap_or(0);
        for edge in diagram.edges.iter().filter(|edge| &edge.from == id) {
            let entry = ranks.entry(edge.to.clone()).or_insert(0);
            *entry = (*entry).max(rank + 1);
        }
    }
    ranks
}

/// Nodes that share a cross-axis band: one cluster, or one free node.
struct CrossGroup {
    members: Vec<usize>,
    first_rank: usize,
    last_rank: usize,
    clustered: bool,
}

struct ClaimedBand {
    first_rank: usize,
    last_rank: usize,
    start: f32,
    end: f32,
}

/// Groups in order of first appearance; members keep declaration order.
fn cross_groups(nodes: &[NodeLayout]) -> Vec<CrossGroup> {
    let mut groups: Vec<CrossGroup> = Vec::new();
    let mut by_cluster: HashMap<usize, usize> = HashMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        let slot = match node.cluster.and_then(|cluster| by_cluster.get(&cluster).copied()) {
            Some(slot) => slot,
            None => {
                groups.push(CrossGroup {
                    members: Vec::new(),
                    first_rank: node.rank,
                    last_rank: node.rank,
                    clustered: node.cluster.is_some(),
                });
                if let Some(cluster) = node.cluster {
                    by_cluster.insert(cluster, groups.len() - 1);
                }
                groups.len() - 1
            }
        };
        let group = &mut groups[slot];
        group.members.push(idx);
        group.first_rank = group.first_rank.min(node.rank);
        group.last_rank = group.last_rank.max(node.rank);
    }
    groups
}

pub fn compute_layout(diagram: &Diagram, theme: &Theme, config: &LayoutConfig) -> Result<Layout> {
    diagram.validate()?;
    let order = diagram.topological_order()?;
    let ranks = assign_ranks(diagram, &order);
    let direction = diagram.direction;
    let horizontal = direction.is_horizontal();
    let cluster_gap = if diagram.clusters.is_empty() {
        0.0
    } else {
        config.cluster_padding
    };

    let mut nodes: Vec<NodeLayout> = diagram
        .nodes
        .iter()
        .map(|node| {
            let label = measure_label(&node.label, theme.font_size, theme, config);
            let width = config.icon_size.max(label.width + LABEL_MARGIN);
            let extra_lines = label.lines.len().saturating_sub(1) as f32;
            NodeLayout {
                id: node.id.clone(),
                rank: ranks.get(&node.id).copied().unwrap_or(0),
                cluster: node.cluster,
                icon: node.icon.clone(),
                label,
                x: 0.0,
                y: 0.0,
                width,
                height: config.node_height + extra_lines * config.label_line_step,
                icon_size: config.icon_size,
            }
        })
        .collect();

    let primary = |node: &NodeLayout| if horizontal { node.width } else { node.height };
    let cross = |node: &NodeLayout| if horizontal { node.height } else { node.width };

    let rank_count = nodes.iter().map(|node| node.rank).max().unwrap_or(0) + 1;
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    for (idx, node) in nodes.iter().enumerate() {
        buckets[node.rank].push(idx);
    }

    let rank_step = config.rank_sep + cluster_gap;
    let mut rank_starts = Vec::with_capacity(rank_count);
    let mut rank_sizes = Vec::with_capacity(rank_count);
    let mut cursor = 0.0f32;
    for bucket in &buckets {
        let size = bucket.iter().map(|idx| primary(&nodes[*idx])).fold(0.0f32, f32::max);
        rank_starts.push(cursor);
        rank_sizes.push(size);
        cursor += size + rank_step;
    }
    let total_primary = (cursor - rank_step).max(0.0);

    // Each cluster, and each node outside any cluster, claims a band on the
    // cross axis. Bands whose rank spans intersect never overlap, so a cluster
    // box only ever encloses its own members.
    let pad = config.cluster_padding;
    let cluster_lead = if horizontal {
        pad + config.cluster_label_height
    } else {
        pad
    };
    let mut claimed: Vec<ClaimedBand> = Vec::new();
    let mut placements: Vec<(f32, f32)> = vec![(0.0, 0.0); nodes.len()];
    for group in cross_groups(&nodes) {
        let mut rank_extents: HashMap<usize, f32> = HashMap::new();
        for idx in &group.members {
            let extent = rank_extents.entry(nodes[*idx].rank).or_insert(-config.node_sep);
            *extent += cross(&nodes[*idx]) + config.node_sep;
        }
        let extent = rank_extents.values().copied().fold(0.0f32, f32::max);
        let (lead, trail) = if group.clustered { (cluster_lead, pad) } else { (0.0, 0.0) };

        let mut offset = 0.0f32;
        loop {
            let (start, end) = (offset - lead, offset + extent + trail);
            let bump = claimed
                .iter()
                .filter(|band| band.first_rank <= group.last_rank && group.first_rank <= band.last_rank)
                .filter(|band| start < band.end + config.node_sep && band.start < end + config.node_sep)
                .map(|band| band.end + config.node_sep + lead)
                .reduce(f32::max);
            match bump {
                Some(next) => offset = next,
                None => break,
            }
        }
        claimed.push(ClaimedBand {
            first_rank: group.first_rank,
            last_rank: group.last_rank,
            start: offset - lead,
            end: offset + extent + trail,
        });

        let mut cursors: HashMap<usize, f32> = rank_extents
            .iter()
            .map(|(rank, rank_extent)| (*rank, offset + (extent - rank_extent) / 2.0))
            .collect();
        for idx in &group.members {
            let node = &nodes[*idx];
            let mut p = rank_starts[node.rank] + (rank_sizes[node.rank] - primary(node)) / 2.0;
            if direction.is_reversed() {
                p = total_primary - p - primary(node);
            }
            let Some(c) = cursors.get_mut(&node.rank) else {
                continue;
            };
            placements[*idx] = (p, *c);
            *c += cross(node) + config.node_sep;
        }
    }
    for (node, (p, c)) in nodes.iter_mut().zip(placements) {
        if horizontal {
            node.x = p;
            node.y = c;
        } else {
            node.x = c;
            node.y = p;
        }
    }

    let mut clusters = Vec::new();
    for cluster in &diagram.clusters {
        let members: Vec<&NodeLayout> = nodes
            .iter()
            .filter(|node| cluster.nodes.contains(&node.id))
            .collect();
        if members.is_empty() {
            continue;
        }
        let min_x = members.iter().map(|n| n.x).fold(f32::MAX, f32::min);
        let min_y = members.iter().map(|n| n.y).fold(f32::MAX, f32::min);
        let max_x = members.iter().map(|n| n.x + n.width).fold(f32::MIN, f32::max);
        let max_y = members.iter().map(|n| n.y + n.height).fold(f32::MIN, f32::max);
        let pad = config.cluster_padding;
        clusters.push(ClusterLayout {
            label: measure_label(&cluster.label, theme.cluster_font_size, theme, config),
            nodes: cluster.nodes.clone(),
            x: min_x - pad,
            y: min_y - pad - config.cluster_label_height,
            width: max_x - min_x + pad * 2.0,
            height: max_y - min_y + pad * 2.0 + config.cluster_label_height,
        });
    }

    let rects = nodes
        .iter()
        .map(|n| (n.x, n.y, n.width, n.height))
        .chain(clusters.iter().map(|c| (c.x, c.y, c.width, c.height)));
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for (x, y, w, h) in rects {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x + w);
        max_y = max_y.max(y + h);
    }
    let content_width = max_x - min_x;
    let content_height = max_y - min_y;

    let title_text = diagram.title.trim();
    let title_block = (!title_text.is_empty())
        .then(|| measure_label(title_text, theme.title_font_size, theme, config));
    let title_width = title_block.as_ref().map(|t| t.width).unwrap_or(0.0);
    let inner_width = content_width.max(title_width);

    let offset_x = config.pad + (inner_width - content_width) / 2.0 - min_x;
    let offset_y = config.pad - min_y;
    for node in &mut nodes {
        node.x += offset_x;
        node.y += offset_y;
    }
    for cluster in &mut clusters {
        cluster.x += offset_x;
        cluster.y += offset_y;
    }

    let width = inner_width + config.pad * 2.0;
    let mut height = content_height + config.pad * 2.0;
    let title = title_block.map(|text| {
        let y = config.pad + content_height + config.title_gap;
        height = y + text.height + config.pad;
        TitleLayout {
            x: width / 2.0,
            y,
            text,
        }
    });

    let index: HashMap<&str, &NodeLayout> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut edges = Vec::with_capacity(diagram.edges.len());
    for edge in &diagram.edges {
        let (Some(from), Some(to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) else {
            continue;
        };
        edges.push(EdgeLayout {
            from: edge.from.clone(),
            to: edge.to.clone(),
            points: route_edge(from, to, direction),
        });
    }

    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        clusters = clusters.len(),
        ranks = rank_count,
        width,
        height,
        "computed layout"
    );

    Ok(Layout {
        direction,
        nodes,
        clusters,
        edges,
        title,
        width,
        height,
    })
}

/// Leaves the face of `from` that points at the next rank and enters the
/// opposite face of `to`, bending at the midpoint when the two are offset.
fn route_edge(from: &NodeLayout, to: &NodeLayout, direction: Direction) -> Vec<(f32, f32)> {
    let (start, end) = match direction {
        Direction::LeftRight => (
            (from.icon_x() + from.icon_size, from.icon_center_y()),
            (to.icon_x(), to.icon_center_y()),
        ),
        Direction::RightLeft => (
            (from.icon_x(), from.icon_center_y()),
            (to.icon_x() + to.icon_size, to.icon_center_y()),
        ),
        Direction::TopBottom => (
            (from.center_x(), from.y + from.height),
            (to.center_x(), to.icon_y()),
        ),
        Direction::BottomTop => (
            (from.center_x(), from.icon_y()),
            (to.center_x(), to.y + to.height),
        ),
    };

    if direction.is_horizontal() {
        if (start.1 - end.1).abs() < ALIGN_EPSILON {
            return vec![start, end];
        }
        let mid = (start.0 + end.0) / 2.0;
        vec![start, (mid, start.1), (mid, end.1), end]
    } else {
        if (start.0 - end.0).abs() < ALIGN_EPSILON {
            return vec![start, end];
        }
        let mid = (start.1 + end.1) / 2.0;
        vec![start, (start.0, mid), (end.0, mid), end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::{self, sfmc_to_s3_etl};
    use crate::ir::BuiltinIcon;

    fn layout_of(diagram: &Diagram) -> Layout {
        compute_layout(diagram, &Theme::diagrams_default(), &LayoutConfig::default()).unwrap()
    }

    fn overlaps(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> bool {
        a.0 < b.0 + b.2 && a.0 + a.2 > b.0 && a.1 < b.1 + b.3 && a.1 + a.3 > b.1
    }

    #[test]
    fn chain_ranks_advance_left_to_right() {
        let layout = layout_of(&sfmc_to_s3_etl().unwrap());
        let xs: Vec<f32> = etl::CHAIN.iter().map(|id| layout.node(id).unwrap().x).collect();
        assert!(xs.windows(2).all(|pair| pair[0] < pair[1]), "{xs:?}");
        let ranks: Vec<usize> = etl::CHAIN.iter().map(|id| layout.node(id).unwrap().rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn straight_chain_edges_are_single_segments() {
        let layout = layout_of(&sfmc_to_s3_etl().unwrap());
        assert_eq!(layout.edges.len(), 3);
        for edge in &layout.edges {
            assert_eq!(edge.points.len(), 2, "{} -> {}", edge.from, edge.to);
            let (start, end) = (edge.points[0], edge.points[1]);
            assert!(start.0 < end.0);
            assert!((start.1 - end.1).abs() < ALIGN_EPSILON);
        }
    }

    #[test]
    fn cluster_encloses_members_only() {
        let layout = layout_of(&sfmc_to_s3_etl().unwrap());
        assert_eq!(layout.clusters.len(), 1);
        let cluster = &layout.clusters[0];
        let rect = (cluster.x, cluster.y, cluster.width, cluster.height);
        for node in &layout.nodes {
            let node_rect = (node.x, node.y, node.width, node.height);
            if node.cluster == Some(0) {
                assert!(node.x >= cluster.x && node.x + node.width <= cluster.x + cluster.width);
                assert!(node.y >= cluster.y && node.y + node.height <= cluster.y + cluster.height);
            } else {
                assert!(!overlaps(rect, node_rect), "cluster overlaps {}", node.id);
            }
        }
    }

    #[test]
    fn content_and_title_fit_the_canvas() {
        let layout = layout_of(&sfmc_to_s3_etl().unwrap());
        for node in &layout.nodes {
            assert!(node.x >= 0.0 && node.y >= 0.0);
            assert!(node.x + node.width <= layout.width);
            assert!(node.y + node.height <= layout.height);
        }
        let title = layout.title.as_ref().unwrap();
        assert_eq!(title.text.font_size, 15.0);
        assert!(title.y + title.text.height <= layout.height);
        assert!(layout.nodes.iter().all(|node| node.y + node.height <= title.y));
    }

    #[test]
    fn top_bottom_stacks_ranks_vertically() {
        let mut diagram = sfmc_to_s3_etl().unwrap();
        diagram.direction = Direction::TopBottom;
        let layout = layout_of(&diagram);
        let ys: Vec<f32> = etl::CHAIN.iter().map(|id| layout.node(id).unwrap().y).collect();
        assert!(ys.windows(2).all(|pair| pair[0] < pair[1]), "{ys:?}");
    }

    #[test]
    fn right_left_mirrors_ranks() {
        let mut diagram = sfmc_to_s3_etl().unwrap();
        diagram.direction = Direction::RightLeft;
        let layout = layout_of(&diagram);
        let first = layout.node(etl::SFMC_SERVER).unwrap();
        let last = layout.node(etl::S3_INGESTION_BUCKET).unwrap();
        assert!(first.x > last.x);
    }

    #[test]
    fn fan_out_gets_bent_edges_and_no_overlap() {
        let mut diagram = Diagram::new("fan");
        for id in ["src", "a", "b"] {
            diagram.add_node(id, id, Icon::Builtin(BuiltinIcon::Bash)).unwrap();
        }
        diagram.connect("src", "a").unwrap();
        diagram.connect("src", "b").unwrap();
        let layout = layout_of(&diagram);
        let a = layout.node("a").unwrap();
        let b = layout.node("b").unwrap();
        assert_eq!(a.rank, b.rank);
        assert!(!overlaps((a.x, a.y, a.width, a.height), (b.x, b.y, b.width, b.height)));
        let bends: Vec<usize> = layout.edges.iter().map(|edge| edge.points.len()).collect();
        assert_eq!(bends, vec![2, 4]);
    }

    #[test]
    fn non_member_sharing_a_rank_stays_outside_the_cluster() {
        let mut diagram = Diagram::new("split host");
        let bash = || Icon::Builtin(BuiltinIcon::Bash);
        diagram.add_node("src", "Source", bash()).unwrap();
        let host = diagram.add_cluster("Host");
        diagram.add_node_in(host, "a", "A", bash()).unwrap();
        diagram.add_node("b", "B", bash()).unwrap();
        diagram.add_node_in(host, "cc", "CC", bash()).unwrap();
        for id in ["a", "b", "cc"] {
            diagram.connect("src", id).unwrap();
        }

        for direction in [Direction::LeftRight, Direction::TopBottom] {
            diagram.direction = direction;
            let layout = layout_of(&diagram);
            let cluster = &layout.clusters[0];
            let cluster_rect = (cluster.x, cluster.y, cluster.width, cluster.height);
            let b = layout.node("b").unwrap();
            assert!(
                !overlaps(cluster_rect, (b.x, b.y, b.width, b.height)),
                "{direction:?}: non-member b drawn inside cluster"
            );
            for id in ["a", "cc"] {
                let node = layout.node(id).unwrap();
                assert!(overlaps(cluster_rect, (node.x, node.y, node.width, node.height)));
            }
        }
    }

    #[test]
    fn clusters_in_the_same_ranks_do_not_overlap() {
        let mut diagram = Diagram::new("two hosts");
        let bash = || Icon::Builtin(BuiltinIcon::Bash);
        let left = diagram.add_cluster("Left");
        let right = diagram.add_cluster("Right");
        diagram.add_node_in(left, "l1", "L1", bash()).unwrap();
        diagram.add_node_in(right, "r1", "R1", bash()).unwrap();
        diagram.add_node_in(left, "l2", "L2", bash()).unwrap();
        diagram.add_node_in(right, "r2", "R2", bash()).unwrap();
        diagram.connect("l1", "l2").unwrap();
        diagram.connect("r1", "r2").unwrap();

        let layout = layout_of(&diagram);
        let rects: Vec<_> = layout.clusters.iter().map(|c| (c.x, c.y, c.width, c.height)).collect();
        assert_eq!(rects.len(), 2);
        assert!(!overlaps(rects[0], rects[1]));
    }

    #[test]
    fn multi_line_labels_grow_the_node() {
        let mut diagram = Diagram::new("");
        diagram.add_node("one", "One", Icon::Builtin(BuiltinIcon::S3)).unwrap();
        diagram.add_node("two", "Two\nLines", Icon::Builtin(BuiltinIcon::S3)).unwrap();
        let layout = layout_of(&diagram);
        assert!(layout.title.is_none());
        let config = LayoutConfig::default();
        assert_eq!(layout.node("one").unwrap().height, config.node_height);
        assert_eq!(
            layout.node("two").unwrap().height,
            config.node_height + config.label_line_step
        );
    }
}
