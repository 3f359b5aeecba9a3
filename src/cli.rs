use crate::config::load_config;
use crate::etl::sfmc_to_s3_etl;
use crate::ir::{Diagram, Direction};
use crate::layout_dump::write_layout_dump;
use crate::render::{Format, render_to_file};
use crate::source::parse_diagram;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "archdiag", version, about = "Architecture diagrams as code (SVG, PNG, Graphviz DOT)")]
pub struct Args {
    /// Diagram description (.json5) or '-' for stdin. Renders the built-in
    /// SFMC to S3 ETL diagram when omitted.
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file, or '-' for stdout (svg/dot only). Defaults to a name
    /// derived from the diagram title.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "png")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, graphAttr, layout, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Directory custom icon images are resolved against
    #[arg(short = 'a', long = "assetsDir")]
    pub assets_dir: Option<PathBuf>,

    /// Rank direction: LR, RL, TB or BT
    #[arg(short = 'd', long = "direction")]
    pub direction: Option<String>,

    /// Also write the computed layout as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    Dot,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Svg => Format::Svg,
            OutputFormat::Png => Format::Png,
            OutputFormat::Dot => Format::Dot,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run_with(args)
}

pub fn run_with(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = args.assets_dir {
        config.render.assets_dir = dir;
    }

    let mut diagram = load_diagram(args.input.as_deref())?;
    if let Some(token) = args.direction.as_deref() {
        diagram.direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("Unknown direction {token:?} (expected LR, RL, TB or BT)"))?;
    }

    let format = Format::from(args.output_format);
    let output = resolve_output(args.output, &diagram, format);
    tracing::debug!(title = %diagram.title, ?format, output = ?output, "rendering diagram");

    let layout = render_to_file(&diagram, &config, format, output.as_deref())?;
    if let Some(path) = args.dump_layout {
        write_layout_dump(&path, &layout, &diagram)?;
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_diagram(path: Option<&Path>) -> Result<Diagram> {
    let Some(path) = path else {
        return Ok(sfmc_to_s3_etl()?);
    };
    let source = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(parse_diagram(&source)?)
}

/// `None` means stdout.
fn resolve_output(output: Option<PathBuf>, diagram: &Diagram, format: Format) -> Option<PathBuf> {
    match output {
        Some(path) if path == Path::new("-") => None,
        Some(path) => Some(path),
        None => Some(PathBuf::from(diagram.filename(format.extension()))),
    }
}
