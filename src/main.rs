//! news-keyword-harvest
//!
//! ```bash
//! # Elasticsearch -> batches/batch_NNNNN.jsonl -> all_news.jsonl
//! ELASTIC_HOST=http://localhost:9200 news-keyword-harvest harvest --stopwords stopwords.txt
//!
//! # all_news.jsonl -> category_keywords.{json,cbor}
//! news-keyword-harvest keywords --mode group --stopwords stopwords.txt
//!
//! # all_news.jsonl -> document_keywords.{json,cbor}
//! news-keyword-harvest keywords --mode document --stopwords stopwords.txt
//!
//! news-keyword-harvest show --artifact category_keywords.cbor --key "Thể thao"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use news_keyword_harvest::config::{
    ElasticConfig, ExtractConfig, HarvestConfig, NormalizerConfig, SegmenterConfig,
};
use news_keyword_harvest::{
    worker, CorpusSnapshot, ElasticScrollSource, HarvestError, Harvester, KeywordExtractor,
    KeywordReport, Normalizer, Result,
};

#[derive(Parser, Debug)]
#[command(name = "news-keyword-harvest")]
#[command(about = "Resumable corpus harvesting and TF-IDF keyword extraction")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the whole index, committing normalized records in shards
    Harvest(HarvestArgs),
    /// Compute keyword lists from a corpus snapshot
    Keywords(KeywordArgs),
    /// Print the keyword list of one key from a binary artifact
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct HarvestArgs {
    /// Elasticsearch base URL
    #[arg(long, env = "ELASTIC_HOST", default_value = "http://localhost:9200")]
    elastic_host: String,

    #[arg(long, default_value = "vietnamese_curated_data")]
    index: String,

    #[arg(long, default_value = "category")]
    category_field: String,

    #[arg(long, default_value = "content")]
    content_field: String,

    /// Checkpoint and shard directory
    #[arg(long, default_value = "batches")]
    state_dir: PathBuf,

    #[arg(long, default_value_t = 5000)]
    page_size: usize,

    #[arg(long, default_value_t = 1000)]
    flush_threshold: usize,

    /// Cursor lease on open, in seconds
    #[arg(long, default_value_t = 300)]
    initial_lease_secs: u64,

    /// Cursor lease on renewal, in seconds
    #[arg(long, default_value_t = 18_000)]
    renew_lease_secs: u64,

    /// Where the reassembled corpus is written
    #[arg(long, default_value = "all_news.jsonl")]
    snapshot: PathBuf,

    #[command(flatten)]
    text: TextArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// one keyword list per category
    Group,
    /// one keyword list per document
    Document,
}

#[derive(Args, Debug)]
struct KeywordArgs {
    #[arg(long, value_enum, default_value_t = Mode::Group)]
    mode: Mode,

    #[arg(long, default_value = "all_news.jsonl")]
    snapshot: PathBuf,

    /// Directory for the JSON and CBOR artifacts
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(long, default_value_t = 10)]
    top_n: usize,

    #[arg(long, default_value_t = 5000)]
    max_features: usize,

    /// Documents per locally fitted batch (document mode)
    #[arg(long, default_value_t = 1000)]
    doc_batch_size: usize,

    #[command(flatten)]
    text: TextArgs,
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[arg(long)]
    artifact: PathBuf,

    #[arg(long)]
    key: String,
}

/// Normalizer options shared by `harvest` and `keywords`
#[derive(Args, Debug)]
struct TextArgs {
    /// Stopword list, one entry per line
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Compound lexicon, one multi-word expression per line
    #[arg(long, conflicts_with = "segmenter_cmd")]
    lexicon: Option<PathBuf>,

    /// External segmentation program (stdin -> stdout)
    #[arg(long, env = "SEGMENTER_CMD")]
    segmenter_cmd: Option<String>,

    /// Arguments passed to the segmentation program
    #[arg(long = "segmenter-arg")]
    segmenter_args: Vec<String>,
}

impl TextArgs {
    fn normalizer_config(&self) -> Result<NormalizerConfig> {
        let mut config = NormalizerConfig::default();
        if let Some(path) = &self.stopwords {
            config.stopwords = NormalizerConfig::load_stopwords(path)?;
            info!(path = %path.display(), count = config.stopwords.len(), "stopwords loaded");
        }
        config.segmenter = match (&self.lexicon, &self.segmenter_cmd) {
            (Some(path), _) => SegmenterConfig::Lexicon(path.clone()),
            (None, Some(program)) => SegmenterConfig::Command {
                program: program.clone(),
                args: self.segmenter_args.clone(),
            },
            (None, None) => SegmenterConfig::Whitespace,
        };
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news_keyword_harvest=info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Harvest(args) => run_harvest(args),
        Command::Keywords(args) => run_keywords(args),
        Command::Show(args) => run_show(args),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run_harvest(args: HarvestArgs) -> Result<()> {
    let normalizer_config = args.text.normalizer_config()?;
    let harvest_config = HarvestConfig {
        state_dir: args.state_dir,
        page_size: args.page_size,
        flush_threshold: args.flush_threshold,
        initial_lease: Duration::from_secs(args.initial_lease_secs),
        renew_lease: Duration::from_secs(args.renew_lease_secs),
    };
    let elastic_config = ElasticConfig {
        host: args.elastic_host,
        index: args.index,
        category_field: args.category_field,
        content_field: args.content_field,
    };
    let snapshot = args.snapshot;

    let job = worker::spawn("harvest", move || {
        let start = Instant::now();
        let normalizer = Normalizer::new(&normalizer_config)?;
        let source = ElasticScrollSource::new(elastic_config, &harvest_config)?;
        let harvest = Harvester::new(source, &normalizer, harvest_config)?.harvest()?;
        harvest.corpus.write_jsonl(&snapshot)?;
        info!(
            records = harvest.corpus.len(),
            written = harvest.stats.written,
            skipped = harvest.stats.skipped,
            stop = ?harvest.stats.stop,
            elapsed = ?start.elapsed(),
            "harvest complete"
        );
        Ok(())
    })?;
    job.wait()
}

fn run_keywords(args: KeywordArgs) -> Result<()> {
    if args.top_n == 0 {
        return Err(HarvestError::Configuration("top_n must be positive".into()));
    }
    let normalizer_config = args.text.normalizer_config()?;
    let extract_config = ExtractConfig {
        max_features: args.max_features,
        top_n: args.top_n,
        doc_batch_size: args.doc_batch_size,
    };
    let (mode, snapshot, output_dir) = (args.mode, args.snapshot, args.output_dir);

    let job = worker::spawn("keywords", move || {
        let start = Instant::now();
        let corpus = CorpusSnapshot::load_jsonl(&snapshot)?;
        let normalizer = Normalizer::new(&normalizer_config)?;
        let extractor = KeywordExtractor::from_config(&normalizer, &extract_config);
        let (report, stem) = match mode {
            Mode::Group => (
                extractor.extract_by_category(&corpus.records, extract_config.top_n),
                "category_keywords",
            ),
            Mode::Document => (
                extractor.extract_per_document(&corpus.records, extract_config.top_n, extract_config.doc_batch_size),
                "document_keywords",
            ),
        };
        report.save_json(output_dir.join(format!("{stem}.json")))?;
        report.save_binary(output_dir.join(format!("{stem}.cbor")))?;
        info!(keys = report.len(), elapsed = ?start.elapsed(), "keywords complete");
        Ok(())
    })?;
    job.wait()
}

fn run_show(args: ShowArgs) -> Result<()> {
    let report = KeywordReport::load_binary(&args.artifact)?;
    let Some(list) = report.get(&args.key) else {
        return Err(HarvestError::Configuration(format!(
            "key `{}` not found in {}",
            args.key,
            args.artifact.display()
        )));
    };
    println!("{}:", args.key);
    for entry in list.iter() {
        println!("  {:<32} {:.3}", entry.term, entry.score);
    }
    Ok(())
}
