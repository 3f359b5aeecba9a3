#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dot;
pub mod error;
pub mod etl;
pub mod icons;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod source;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use dot::render_dot;
pub use error::DiagramError;
pub use etl::sfmc_to_s3_etl;
pub use ir::{BuiltinIcon, Diagram, Direction, Icon};
pub use layout::{Layout, compute_layout};
pub use render::{Format, render_svg, render_to_file};
pub use source::parse_diagram;
pub use theme::Theme;
