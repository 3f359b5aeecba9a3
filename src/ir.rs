use crate::error::{DiagramError, Result};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LeftRight,
    RightLeft,
    TopBottom,
    BottomTop,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            "TB" | "TD" => Some(Self::TopBottom),
            "BT" => Some(Self::BottomTop),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
            Self::TopBottom => "TB",
            Self::BottomTop => "BT",
        }
    }

    /// True when ranks advance along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Self::RightLeft | Self::BottomTop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinIcon {
    /// programming/language: Bash
    Bash,
    /// aws/storage: S3
    S3,
}

impl BuiltinIcon {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bash" => Some(Self::Bash),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::S3 => "s3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Builtin(BuiltinIcon),
    /// Image file, resolved against the assets directory at render time.
    Custom(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub icon: Icon,
    pub cluster: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub label: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// Graph-level attributes a diagram can pin, overriding the theme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphAttr {
    pub font_size: Option<f32>,
    pub bgcolor: Option<String>,
    pub font_color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Diagram {
    pub title: String,
    pub direction: Direction,
    pub graph_attr: GraphAttr,
    pub nodes: Vec<Node>,
    pub clusters: Vec<Cluster>,
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            direction: Direction::default(),
            graph_attr: GraphAttr::default(),
            nodes: Vec::new(),
            clusters: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn add_node(&mut self, id: &str, label: &str, icon: Icon) -> Result<()> {
        self.insert_node(id, label, icon, None)
    }

    pub fn add_cluster(&mut self, label: &str) -> usize {
        self.clusters.push(Cluster {
            label: label.to_string(),
            nodes: Vec::new(),
        });
        self.clusters.len() - 1
    }

    pub fn add_node_in(&mut self, cluster: usize, id: &str, label: &str, icon: Icon) -> Result<()> {
        if cluster >= self.clusters.len() {
            return Err(DiagramError::UnknownCluster(cluster));
        }
        self.insert_node(id, label, icon, Some(cluster))?;
        self.clusters[cluster].nodes.push(id.to_string());
        Ok(())
    }

    fn insert_node(&mut self, id: &str, label: &str, icon: Icon, cluster: Option<usize>) -> Result<()> {
        if self.node(id).is_some() {
            return Err(DiagramError::DuplicateNode(id.to_string()));
        }
        self.nodes.push(Node {
            id: id.to_string(),
            label: label.to_string(),
            icon,
            cluster,
        });
        Ok(())
    }

    pub fn connect(&mut self, from: &str, to: &str) -> Result<()> {
        for id in [from, to] {
            if self.node(id).is_none() {
                return Err(DiagramError::UnknownNode(id.to_string()));
            }
        }
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    /// Connects each id to the next one: `a >> b >> c`.
    pub fn chain(&mut self, ids: &[&str]) -> Result<()> {
        for pair in ids.windows(2) {
            self.connect(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Output file name derived from the title, e.g. `my_diagram.png`.
    pub fn filename(&self, ext: &str) -> String {
        let stem = self
            .title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        let stem = if stem.is_empty() { "diagram".to_string() } else { stem };
        format!("{stem}.{ext}")
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(DiagramError::Empty(self.title.clone()));
        }
        for edge in &self.edges {
            for id in [&edge.from, &edge.to] {
                if self.node(id).is_none() {
                    return Err(DiagramError::UnknownNode(id.clone()));
                }
            }
        }
        self.topological_order().map(|_| ())
    }

    /// Node ids in dependency order; ties keep declaration order.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.as_str(), idx))
            .collect();
        let mut indegree = vec![0usize; self.nodes.len()];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
            else {
                continue;
            };
            outgoing[from].push(to);
            indegree[to] += 1;
        }

        let mut queue: VecDeque<usize> = (0..self.nodes.len()).filter(|idx| indegree[*idx] == 0).collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(idx) = queue.pop_front() {
            order.push(self.nodes[idx].id.clone());
            for &next in &outgoing[idx] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = indegree
                .iter()
                .position(|degree| *degree > 0)
                .map(|idx| self.nodes[idx].id.clone())
                .unwrap_or_default();
            return Err(DiagramError::Cycle(stuck));
        }
        Ok(order)
    }
}
