use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("diagram \"{0}\" has no nodes")]
    Empty(String),

    #[error("node \"{0}\" is declared twice")]
    DuplicateNode(String),

    #[error("edge references unknown node \"{0}\"")]
    UnknownNode(String),

    #[error("cluster index {0} does not exist")]
    UnknownCluster(usize),

    #[error("invalid node id \"{0}\": expected letters, digits or '_' and no leading digit")]
    InvalidId(String),

    #[error("diagram contains a cycle through \"{0}\"")]
    Cycle(String),

    #[error("unknown direction \"{0}\" (expected LR, RL, TB or BT)")]
    UnknownDirection(String),

    #[error("icon asset not found: {}", .0.display())]
    MissingIcon(PathBuf),

    #[error("invalid diagram description: {0}")]
    Description(String),
}

pub type Result<T> = std::result::Result<T, DiagramError>;
