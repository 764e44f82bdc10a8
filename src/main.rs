use std::{fs::File, io::BufWriter};

use anyhow::{bail, Context};
use clap::Parser;
use melodic_search::{
    cli::Cli,
    corpus,
    search_result::{self, SearchResult},
    Engine, SimilaritySearch,
};
use tabled::{settings::Style, Table};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads.into())
            .build_global()
            .context("unable to initialize the thread pool")?;
    }

    if cli.queries.is_empty() && cli.query_ids.is_empty() {
        bail!("no query specified, use --query or --query-id");
    }

    let corpus = corpus::read_file(&cli.corpus)
        .with_context(|| format!("unable to read corpus file {}", cli.corpus.display()))?;
    info!(
        entries = corpus.len(),
        min_len = corpus.min_len(),
        max_len = corpus.max_len(),
        "corpus loaded"
    );

    let engine = Engine::new(cli.engine, &corpus, &cli)
        .with_context(|| format!("unable to create {} engine", cli.engine))?;
    if let Some(duration) = engine.index_duration() {
        info!(engine = %engine.kind(), elapsed = ?duration, "index ready");
    }

    let queries = cli
        .queries
        .iter()
        .map(|query| (query, engine.search(query)))
        .chain(
            cli.query_ids
                .iter()
                .map(|id| (id, engine.search_by_id(id))),
        );

    let mut table_rows = Vec::new();
    for (label, results) in queries {
        let results = results.with_context(|| format!("query {label:?} failed"))?;
        info!(query = %label, results = results.len(), "query completed");

        print_results(label, &results, cli.top);
        if cli.output_table.is_some() {
            table_rows.extend(results.into_iter().map(|result| (label.clone(), result)));
        }
    }

    if let Some(path) = &cli.output_table {
        let file = File::create(path)
            .with_context(|| format!("unable to create output table {}", path.display()))?;
        search_result::write_csv(BufWriter::new(file), table_rows)
            .context("unable to write output table")?;
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_results(label: &str, results: &[SearchResult], top: usize) {
    println!("Query: {label}");
    if results.is_empty() {
        println!("No results\n");
        return;
    }

    let mut table = Table::new(results.iter().take(top));
    table.with(Style::rounded());
    println!("{table}\n");
}
