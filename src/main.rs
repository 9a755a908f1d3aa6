use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use wikitree::graph::{explore, finalize, render, Crawler, Graph, Notation, SuffixRule};
use wikitree::output::{load_graph, result_path, save_graph};
use wikitree::source::WikiSource;
use wikitree::{Config, CrawlError};

#[derive(Parser, Debug)]
#[command(name = "wikitree")]
#[command(version)]
#[command(about = "Explore an encyclopedia's link graph from a seed term and print it as a tree")]
struct Args {
    /// Seed term to start exploring from
    #[arg(short = 't', long = "target-kw")]
    target_kw: Option<String>,

    /// Maximum number of terms to explore (overrides crawl.budget_limit)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Pause after each fetch in milliseconds (overrides crawl.delay_ms)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Directory for the persisted graph (overrides output.dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the tree without writing the graph file
    #[arg(long)]
    no_save: bool,

    /// Render a previously saved graph file instead of exploring
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,
}

impl Args {
    /// True when there is nothing to do: no seed and no saved graph
    fn missing_target(&self) -> bool {
        self.target_kw.is_none() && self.from_file.is_none()
    }
}

/// Diagnostics go to stderr; the tree itself goes to stdout
fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", default_level))
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Reported before any config is read
    if args.missing_target() {
        init_logging("info");
        log::error!("No target keyword given. Pass one with -t/--target-kw.");
        return Ok(ExitCode::from(2));
    }

    let mut config = Config::load()?;
    init_logging(&config.logging.level);
    match Config::location() {
        Some(path) => log::info!("Configuration loaded from {}", path.display()),
        None => log::debug!("No config.toml found, using built-in defaults"),
    }

    if let Some(limit) = args.limit {
        config.crawl.budget_limit = limit;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.crawl.delay_ms = delay_ms;
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if args.no_save {
        config.output.save = false;
    }

    if let Some(path) = args.from_file {
        render_saved(&path, &config.notation())?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(seed) = args.target_kw else {
        return Ok(ExitCode::from(2));
    };

    run_exploration(&config, &seed).await
}

/// Explore from `seed`, print the tree and persist the graph
async fn run_exploration(config: &Config, seed: &str) -> Result<ExitCode> {
    log::info!("Starting wikitree v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Seed term: {}", seed);
    log::info!(
        "Budget: {} term(s), delay: {} ms",
        config.crawl.budget_limit,
        config.crawl.delay_ms
    );

    let source = WikiSource::new(&config.source).context("Failed to build link source")?;
    let rule = SuffixRule::new(config.crawl.terminal_suffixes.clone());
    let crawler = Crawler::new(
        source,
        Box::new(rule),
        config.crawl.budget_limit,
        config.delay(),
    );
    let notation = config.notation();

    let start = Instant::now();
    let graph = match explore(&crawler, seed).await {
        Ok(graph) => graph,
        Err(CrawlError::NoResults(seed)) => {
            print_tree(&Graph::new(), &seed, &notation);
            log::warn!("No results for '{}': nothing was discovered", seed);
            return Ok(ExitCode::from(1));
        }
        Err(e) => {
            log::error!("Exploration of '{}' failed: {}", seed, e);
            return Err(e.into());
        }
    };
    log::info!(
        "Discovered {} label(s) across {} explored term(s) in {:?}",
        graph.label_count(),
        graph.len(),
        start.elapsed()
    );

    print_tree(&graph, seed, &notation);

    if config.output.save {
        let path = result_path(config.output_dir(), seed);
        save_graph(&graph, &notation, &path)
            .with_context(|| format!("Failed to save graph to {}", path.display()))?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Render a saved graph rooted at its first key
fn render_saved(path: &Path, notation: &Notation) -> Result<()> {
    let graph = load_graph(path, notation)
        .with_context(|| format!("Failed to load graph from {}", path.display()))?;
    let graph = finalize(graph);
    let root = graph
        .root()
        .with_context(|| format!("Graph file {} is empty", path.display()))?;

    print_tree(&graph, root, notation);
    Ok(())
}

fn print_tree(graph: &Graph, root: &str, notation: &Notation) {
    for line in render(graph, root, notation) {
        println!("{}", line);
    }
}
