//! bibsweep CLI entry point.
//!
//! Cleans a BibTeX file according to a rule configuration.

use anyhow::{Context, Result};
use bibsweep::{bbl, bibtex, SweepConfig, Sweeper};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bibsweep")]
#[command(author, version, about = "Rule-driven BibTeX cleanup")]
struct Args {
    /// BibTeX file to clean
    #[arg(long)]
    bib: PathBuf,

    /// Target BibTeX file
    #[arg(long, default_value = "out.bib")]
    out: PathBuf,

    /// Configuration file path (YAML or JSON)
    #[arg(short, long, env = "BIBSWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// .bbl file; only the entries cited there are processed
    #[arg(long)]
    bbl: Option<PathBuf>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit.
    #[arg(long)]
    example_config: bool,

    /// Validate configuration and exit.
    #[arg(long)]
    validate: bool,
}

const EXAMPLE_CONFIG: &str = r#"# bibsweep configuration example
version: "1"

settings:
  # Rewrite alias entry types to their canonical type
  type_aliases:
    inproceedings: [conference]
  # Fold optX fields into X
  expand_opt_fields: true
  # Fields kept per entry type ("all" applies to every type)
  allow_fields:
    all: [author, title, year, pages, doi, url]
    article: [journal, volume, number]
    inproceedings: [booktitle, publisher]
  # Fields always dropped
  deny_fields: [abstract, keywords]
  # Mandatory fields; a list means "any of"
  required:
    all:
      - [author, organization, institution]
      - title
    inproceedings: [booktitle, year]
  missing_required: warn   # or exclude
  duplicate_keys: warn     # or exclude
  checks:
    et_al_in_author: true
    year_in_booktitle: true
  # Truncate author lists longer than the threshold (0 = off)
  et_al:
    threshold: 3
    ieee_mode: false

rules:
  - name: "strip-whitespace"
    description: "Collapse whitespace in every field"
    action: strip_whitespace

  - name: "protect-acronyms"
    match:
      field:
        pattern: "*title"
        type: glob
    action:
      protect_acronyms:
        acronyms: ["NASA", "DRAM", "GPU"]
        detect_all_caps: false

  - name: "normalize-page-ranges"
    match:
      field:
        pattern: "pages"
    action:
      substitute:
        pattern: "\\s*-+\\s*"
        replacement: "--"

  - name: "proceedings-abbrev"
    match:
      entry_types: [inproceedings]
      field:
        pattern: "booktitle"
    action:
      replace:
        from: "Proceedings of the"
        to: "Proc."

  - name: "need-journal"
    match:
      entry_types: [article]
      field:
        pattern: "journal"
    action: require
    on_failure: exclude
"#;

/// A config path equal to the bib path names the bib's companion JSON file.
fn resolve_config_path(config: &Path, bib: &Path) -> PathBuf {
    if config == bib {
        let mut path = bib.as_os_str().to_owned();
        path.push("_config.json");
        PathBuf::from(path)
    } else {
        config.to_path_buf()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Print example config if requested
    if args.example_config {
        println!("{}", EXAMPLE_CONFIG);
        return Ok(());
    }

    // Load configuration
    let sweeper = match &args.config {
        Some(config) => {
            let path = resolve_config_path(config, &args.bib);
            Sweeper::from_path(&path)
                .with_context(|| format!("Invalid configuration: {}", path.display()))?
        }
        None => Sweeper::new(SweepConfig::default())?,
    };

    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let entries = bibtex::read_file(&args.bib)
        .with_context(|| format!("Failed to read bibliography: {}", args.bib.display()))?;

    let report = match &args.bbl {
        Some(bbl_path) => {
            let cited = bbl::read_bbl(bbl_path)
                .with_context(|| format!("Failed to read bbl file: {}", bbl_path.display()))?;
            sweeper.sweep_cited(entries, &cited)
        }
        None => sweeper.sweep(entries),
    };

    bibtex::write_file(&args.out, &report.entries)
        .with_context(|| format!("Failed to write output: {}", args.out.display()))?;

    info!(
        out = %args.out.display(),
        entries = report.entries.len(),
        excluded = report.excluded.len(),
        warnings = report.warnings.len(),
        "Wrote cleaned bibliography"
    );

    Ok(())
}
