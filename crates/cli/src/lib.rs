use annotator_cache::{LoaderConfig, WindowPlanner};
use annotator_core::{check_page, resolve_link_points, InvariantViolation, LinkSegment};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::{AnnotationId, Page};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "annotator-cli")]
#[command(about = "Offline inspection of annotation page JSON")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check table ownership and id invariants on every page.
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print link endpoints of one annotation as JSON.
    Links {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long)]
        id: String,
    },
    /// Print the page-index window that would be loaded next.
    Window {
        #[arg(long)]
        page_count: usize,
        #[arg(long, default_value_t = 0)]
        visible: usize,
        /// Loader config file; environment variables are used when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

/// Page JSON as exported by the backend: one page or a list of pages.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PagesFile {
    Many(Vec<Page>),
    One(Page),
}

#[derive(Debug, Serialize)]
struct PageReport {
    page_num: u32,
    violations: Vec<InvariantViolation>,
}

#[derive(Debug, Serialize)]
struct WindowOutput {
    begin: i64,
    end: i64,
    page_window: usize,
    prefetch_pages: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Check { file } => run_check(&file),
        Commands::Links { file, page, id } => run_links(&file, page, &id),
        Commands::Window { page_count, visible, config } => {
            run_window(page_count, visible, config.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_check(file: &Path) -> Result<()> {
    let pages = read_pages(file)?;

    let reports: Vec<PageReport> = pages
        .iter()
        .map(|page| PageReport { page_num: page.page_num, violations: check_page(&page.objs) })
        .collect();
    let total: usize = reports.iter().map(|report| report.violations.len()).sum();

    println!("{}", serde_json::to_string_pretty(&reports)?);

    for report in &reports {
        for violation in &report.violations {
            tracing::warn!(page_num = report.page_num, "{violation}");
        }
    }

    if total > 0 {
        anyhow::bail!("{total} invariant violation(s) found");
    }

    Ok(())
}

fn run_links(file: &Path, page_num: u32, id: &str) -> Result<()> {
    let pages = read_pages(file)?;
    let id: AnnotationId = id.parse().unwrap_or_else(|never| match never {});

    let source = pages
        .iter()
        .filter(|page| page.page_num == page_num)
        .find_map(|page| page.find(&id))
        .with_context(|| format!("annotation {id} not found on page {page_num}"))?;

    let segments: Vec<LinkSegment> = resolve_link_points(source, pages.as_slice());
    println!("{}", serde_json::to_string_pretty(&segments)?);

    Ok(())
}

fn run_window(page_count: usize, visible: usize, config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("failed to load loader config from {}", path.display()))?,
        None => LoaderConfig::from_env().context("invalid loader configuration in environment")?,
    };

    let window = WindowPlanner::new(&config).next_window(visible, page_count);
    let payload = WindowOutput {
        begin: window.begin(),
        end: window.end(),
        page_window: config.page_window,
        prefetch_pages: config.prefetch_pages,
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn read_pages(path: &Path) -> Result<Vec<Page>> {
    if !path.is_file() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: PagesFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse page JSON in {}", path.display()))?;

    Ok(match parsed {
        PagesFile::Many(pages) => pages,
        PagesFile::One(page) => vec![page],
    })
}
