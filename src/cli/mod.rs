pub mod common;
pub mod parser;
pub mod reader;

pub use common::*;
pub use parser::{
    IssuesConfig, LabelsConfig, MilestonesConfig, ParsedConfig, ProjectsConfig, ReleasesConfig,
};

use anyhow::{Context, Result};
use clap::Parser;
use parser::parse_config;
use reader::read_config;

#[derive(Parser)]
#[clap(version, about = "Migrate issues, labels, milestones, projects and releases between GitHub organizations")]
pub struct Args {
    #[clap(short, long, parse(from_os_str))]
    config: std::path::PathBuf,
}

pub fn run() -> Result<ParsedConfig> {
    let args = Args::parse();

    let result = std::fs::read_to_string(&args.config)
        .with_context(|| format!("could not read file `{:?}`", &args.config))?;

    let content = read_config(&result).context("could not parse config")?;
    let parsed_config = parse_config(content)?;

    Ok(parsed_config)
}
