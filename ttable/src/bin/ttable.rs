//! Command-line interface for building and querying phrase tables.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing_subscriber::EnvFilter;
use ttable::{Config, CorpusReader, Phrase, PhraseTable, PhraseTableRead, Vocabulary, WordIndex};

#[derive(Parser, Debug)]
#[command(about = "Phrase count table builder and benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count a corpus into the table, then benchmark lookups on a sample.
    Ingest(IngestArgs),
    /// Print the counts of one target phrase.
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Corpus file with `source ||| target [||| ...] ||| weight` lines.
    #[arg(long)]
    corpus: PathBuf,

    /// Path to config file (TOML). Defaults to in-memory storage.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many records.
    #[arg(long)]
    limit: Option<usize>,

    /// Keep every Nth target phrase for the benchmark.
    #[arg(long, default_value_t = 2500)]
    sample_every: usize,

    /// Records written per batch.
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Seed for shuffling the benchmark sample.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log and skip malformed corpus lines instead of failing.
    #[arg(long)]
    skip_invalid: bool,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Path to config file (TOML).
    #[arg(short, long)]
    config: PathBuf,

    /// Word indices of the target phrase.
    #[arg(long, num_args = 1.., required = true)]
    target: Vec<WordIndex>,

    /// Also list every source phrase with its joint count.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Ingest(args) => ingest(args).await,
        Command::Query(args) => query(args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path).context("loading config"),
        None => Ok(Config::default()),
    }
}

async fn ingest(args: IngestArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.sample_every > 0, "--sample-every must be positive");
    anyhow::ensure!(args.batch_size > 0, "--batch-size must be positive");

    let config = load_config(args.config.as_deref())?;
    let table = PhraseTable::open(config).await.context("opening table")?;
    let mut vocab = Vocabulary::new(table.codec());
    let corpus = CorpusReader::open(&args.corpus).context("opening corpus")?;

    let started = Instant::now();
    let mut batch = Vec::with_capacity(args.batch_size);
    let mut sample: Vec<Phrase> = Vec::new();
    let mut records = 0usize;
    let mut skipped = 0usize;

    for line in corpus {
        if args.limit.is_some_and(|limit| records >= limit) {
            break;
        }
        let record = match line.and_then(|line| vocab.intern_line(&line)) {
            Ok(record) => record,
            Err(err) if args.skip_invalid => {
                tracing::warn!(%err, "skipping corpus line");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err).context("reading corpus"),
        };

        records += 1;
        if records % args.sample_every == 0 {
            sample.push(record.target.clone());
        }
        batch.push(record);

        if batch.len() >= args.batch_size {
            table.add_records(&batch).await.context("writing batch")?;
            batch.clear();
            tracing::info!(records, vocabulary = vocab.len(), "ingest progress");
        }
    }
    if !batch.is_empty() {
        table.add_records(&batch).await.context("writing batch")?;
    }
    table.flush().await.context("flushing table")?;

    println!("Records: {}", records);
    println!("Skipped lines: {}", skipped);
    println!("Vocab size: {}", vocab.len());
    println!("Ingest time: {:.3}s", started.elapsed().as_secs_f64());

    let mut rng = StdRng::seed_from_u64(args.seed);
    sample.shuffle(&mut rng);
    benchmark(&table, &sample).await?;

    table.close().await.context("closing table")?;
    Ok(())
}

async fn benchmark(table: &PhraseTable, sample: &[Phrase]) -> anyhow::Result<()> {
    if sample.is_empty() {
        println!("Test set: 0 (benchmark skipped)");
        return Ok(());
    }

    let started = Instant::now();
    let mut target_total = 0u64;
    for target in sample {
        target_total += table.target_count(target).await?;
    }
    report("Lookup", started.elapsed(), sample.len());
    println!("Count of trg: {}", target_total);

    let started = Instant::now();
    let mut source_total = 0u64;
    for target in sample {
        source_total += table.count_sources_for_target(target).await?;
    }
    report("Range query", started.elapsed(), sample.len());
    println!("Sources of trg: {}", source_total);

    println!("Test set: {}", sample.len());
    Ok(())
}

fn report(name: &str, elapsed: Duration, operations: usize) {
    let secs = elapsed.as_secs_f64();
    println!("{} performance: {:.6}s", name, secs);
    println!(
        "{} performance per phrase: {:.9}s",
        name,
        secs / operations as f64
    );
}

async fn query(args: QueryArgs) -> anyhow::Result<()> {
    let config = load_config(Some(args.config.as_path()))?;
    let table = PhraseTable::open(config).await.context("opening table")?;
    let target = Phrase::new(args.target).context("parsing target")?;

    println!("Target {} count: {}", target, table.target_count(&target).await?);
    println!(
        "Target {} sources: {}",
        target,
        table.count_sources_for_target(&target).await?
    );
    if args.list {
        for (source, count) in table.sources_for_target(&target).await? {
            println!("  {} {}", source, count);
        }
    }

    table.close().await.context("closing table")?;
    Ok(())
}
