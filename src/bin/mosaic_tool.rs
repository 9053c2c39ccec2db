//! Mosaic Tool - offline training and ingestion
//!
//! - `train` - Pool descriptors from a JSONL file, sub-sample, cluster and
//!   save the vocabulary
//! - `index` - Add every document of a JSONL file (or stdin) to the index
//! - `query` - Print the documents most similar to an indexed document
//! - `info` - Show the vocabulary and index state
//!
//! ```bash
//! mosaic-tool train -i corpus.jsonl --clusters 500 --seed 7
//! cat catalog.jsonl | mosaic-tool index --stdin
//! mosaic-tool query img-001 -k 20
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use mosaic::config::Config;
use mosaic::features::FeatureSet;
use mosaic::index::{InvertedIndex, QueryOptions};
use mosaic::ingest::read_records;
use mosaic::storage::MosaicStore;
use mosaic::types::{Metric, RefinementStrategy, SeedingStrategy};
use mosaic::vocabulary::VisualVocabulary;

#[derive(Parser)]
#[command(name = "mosaic-tool")]
#[command(version, about = "Offline training and ingestion for Mosaic")]
struct Cli {
    /// Config file (defaults to $MOSAIC_CONFIG or ./mosaic.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a vocabulary from pooled descriptors
    Train {
        /// JSONL descriptor file
        #[arg(short, long)]
        input: PathBuf,

        /// Vocabulary name (default: index.vocabulary)
        #[arg(short, long)]
        name: Option<String>,

        /// Number of visual words
        #[arg(short = 'k', long)]
        clusters: Option<usize>,

        /// euclidean or hamming
        #[arg(short, long)]
        metric: Option<Metric>,

        /// random or kmeans++
        #[arg(long)]
        seeding: Option<SeedingStrategy>,

        /// batched or per_cluster
        #[arg(long)]
        refinement: Option<RefinementStrategy>,

        /// Descriptors to sample from the pooled corpus
        #[arg(short, long)]
        sample_size: Option<usize>,

        /// RNG seed for sampling and seeding
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Add documents from a JSONL file or stdin
    Index {
        /// JSONL descriptor file (omit if using --stdin)
        #[arg(short, long, required_unless_present = "stdin")]
        input: Option<PathBuf>,

        /// Read records from stdin instead of a file
        #[arg(long, default_value = "false")]
        stdin: bool,

        /// Log progress every N documents (0 to disable)
        #[arg(short, long, default_value = "1000")]
        progress: usize,
    },

    /// Find documents similar to an indexed document
    Query {
        /// Document name
        name: String,

        /// Number of results
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Leave the queried document out of the results
        #[arg(long, default_value = "false")]
        exclude_self: bool,
    },

    /// Show vocabulary and index info
    Info,
}

async fn train(config: &Config, args: TrainArgs) -> Result<()> {
    let mut training = config.training.clone();
    if let Some(k) = args.clusters {
        training.clusters = k;
    }
    if let Some(metric) = args.metric {
        training.metric = metric;
    }
    if let Some(seeding) = args.seeding {
        training.seeding = seeding;
    }
    if let Some(refinement) = args.refinement {
        training.refinement = refinement;
    }
    if let Some(size) = args.sample_size {
        training.sample_size = size;
    }
    if args.seed.is_some() {
        training.seed = args.seed;
    }
    let name = args
        .name
        .unwrap_or_else(|| config.index.vocabulary.clone());

    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open input file: {:?}", args.input))?;
    let mut pooled = FeatureSet::new(0);
    let mut documents = 0usize;
    for record in read_records(BufReader::new(file)) {
        let record = record?;
        let features = record
            .to_feature_set()
            .with_context(|| format!("Bad descriptors for document '{}'", record.document))?;
        pooled
            .extend(&features)
            .with_context(|| format!("Descriptor width mismatch in '{}'", record.document))?;
        documents += 1;
    }
    info!(documents, descriptors = pooled.len(), "pooled training corpus");

    if training.drop_zero_descriptors {
        let before = pooled.len();
        pooled = pooled.without_zero_rows();
        info!(dropped = before - pooled.len(), "removed all-zero descriptors");
    }

    if pooled.len() > training.sample_size {
        let mut rng = match training.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        pooled = pooled.sample(training.sample_size, &mut rng);
        info!(sampled = pooled.len(), "sub-sampled training corpus");
    }

    let vocabulary =
        VisualVocabulary::train(&name, &pooled, training.metric, &training.kmedoids())?;
    if !vocabulary.converged() {
        warn!(
            iterations = vocabulary.iterations(),
            "clustering stopped at max_iter before converging"
        );
    }

    let store = MosaicStore::from_config(&config.storage)?;
    if store.exists(&VisualVocabulary::storage_key(&name)).await? {
        warn!(name = %name, "replacing previously trained vocabulary");
    }
    vocabulary.save(&store).await?;

    info!(
        name = vocabulary.name(),
        id = %vocabulary.id(),
        words = vocabulary.len(),
        dim = vocabulary.dim(),
        "Trained vocabulary"
    );
    Ok(())
}

struct TrainArgs {
    input: PathBuf,
    name: Option<String>,
    clusters: Option<usize>,
    metric: Option<Metric>,
    seeding: Option<SeedingStrategy>,
    refinement: Option<RefinementStrategy>,
    sample_size: Option<usize>,
    seed: Option<u64>,
}

async fn open_index(config: &Config) -> Result<InvertedIndex> {
    let store = MosaicStore::from_config(&config.storage)?;
    let vocabulary = VisualVocabulary::load(&store, &config.index.vocabulary)
        .await?
        .with_context(|| {
            format!(
                "No vocabulary named '{}'; run `mosaic-tool train` first",
                config.index.vocabulary
            )
        })?;
    Ok(InvertedIndex::open(&config.index.path, Arc::new(vocabulary))?)
}

fn index_from_reader<R: BufRead>(
    index: &mut InvertedIndex,
    reader: R,
    progress_interval: usize,
) -> Result<(usize, usize)> {
    let mut indexed = 0usize;
    let mut skipped = 0usize;
    for record in read_records(reader) {
        let record = record?;
        let features = record
            .to_feature_set()
            .with_context(|| format!("Bad descriptors for document '{}'", record.document))?;
        let outcome = index
            .add_document(&record.document, &features)
            .with_context(|| format!("Failed to index document '{}'", record.document))?;
        if outcome.is_indexed() {
            indexed += 1;
        } else {
            skipped += 1;
        }
        let seen = indexed + skipped;
        if progress_interval > 0 && seen % progress_interval == 0 {
            info!(seen, indexed, skipped, "Progress");
        }
    }
    Ok((indexed, skipped))
}

async fn run_index(
    config: &Config,
    input: Option<PathBuf>,
    stdin: bool,
    progress: usize,
) -> Result<()> {
    let mut index = open_index(config).await?;

    let (indexed, skipped) = if stdin {
        index_from_reader(&mut index, io::stdin().lock(), progress)?
    } else {
        let path = input.context("Either --input or --stdin is required")?;
        let file = File::open(&path)
            .with_context(|| format!("Failed to open input file: {:?}", path))?;
        index_from_reader(&mut index, BufReader::new(file), progress)?
    };

    info!(
        indexed,
        skipped,
        total = index.document_count()?,
        "Indexing complete"
    );
    Ok(())
}

async fn run_query(config: &Config, name: String, top_k: usize, exclude_self: bool) -> Result<()> {
    let index = open_index(config).await?;
    let options = QueryOptions {
        limit: Some(top_k),
        max_candidates: config.index.max_candidates,
        exclude_self,
    };
    for hit in index.query(&name, &options)? {
        println!("{}", serde_json::to_string(&hit)?);
    }
    Ok(())
}

async fn run_info(config: &Config) -> Result<()> {
    let store = MosaicStore::from_config(&config.storage)?;
    let Some(vocabulary) = VisualVocabulary::load(&store, &config.index.vocabulary).await? else {
        println!("Vocabulary '{}': not trained", config.index.vocabulary);
        let trained = VisualVocabulary::list_names(&store).await?;
        if !trained.is_empty() {
            println!("Trained vocabularies: {}", trained.join(", "));
        }
        return Ok(());
    };

    println!("Vocabulary: {}", vocabulary.name());
    println!("  id:         {}", vocabulary.id());
    println!("  metric:     {}", vocabulary.metric());
    println!("  words:      {}", vocabulary.len());
    println!("  dim:        {}", vocabulary.dim());
    println!("  iterations: {}", vocabulary.iterations());
    println!("  converged:  {}", vocabulary.converged());
    println!("  trained at: {}", vocabulary.trained_at());

    if config.index.path.exists() {
        let index = InvertedIndex::open(&config.index.path, Arc::new(vocabulary))?;
        println!("Index: {:?}", config.index.path);
        println!("  documents: {}", index.document_count()?);
        println!("  postings:  {}", index.posting_count()?);
        println!("  histograms: {}", index.histogram_count()?);
    } else {
        println!("Index: {:?} (not created)", config.index.path);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mosaic_tool=info".parse()?)
                .add_directive("mosaic=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = Config::load(config_path.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Train {
            input,
            name,
            clusters,
            metric,
            seeding,
            refinement,
            sample_size,
            seed,
        } => {
            train(
                &config,
                TrainArgs {
                    input,
                    name,
                    clusters,
                    metric,
                    seeding,
                    refinement,
                    sample_size,
                    seed,
                },
            )
            .await?;
        }
        Commands::Index {
            input,
            stdin,
            progress,
        } => {
            run_index(&config, input, stdin, progress).await?;
        }
        Commands::Query {
            name,
            top_k,
            exclude_self,
        } => {
            run_query(&config, name, top_k, exclude_self).await?;
        }
        Commands::Info => {
            run_info(&config).await?;
        }
    }

    Ok(())
}
