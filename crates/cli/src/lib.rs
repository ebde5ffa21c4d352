use act_indexer::{pair_directory, read_dataset, write_dataset, IndexBuilder, PairingOptions};
use act_translator::{OpenAiChatClient, TranslationContext, Translator};
use act_vector_store::{
    Embedder, EmbeddingMode, ExampleStore, IndexLayout, OpenAiEmbedder, RetrievalResult,
    StubEmbedder,
};
use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;

mod config;
mod http_api;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "act")]
#[command(about = "Retrieval-augmented Delphi to C# translation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./act.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Index directory (overrides ACT_INDEX_DIR and [index].dir)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair <name>.pas / <name>.cs files into a JSONL dataset
    Pair(PairArgs),

    /// Embed a JSONL dataset and write the index
    Index(IndexArgs),

    /// Show the examples nearest to a snippet
    Search(SearchArgs),

    /// Print the few-shot prompt for a snippet without calling the model
    Prompt(PromptArgs),

    /// Translate a snippet
    Translate(TranslateArgs),

    /// Serve POST /translate and GET /health over HTTP
    ServeHttp(ServeArgs),
}

#[derive(Copy, Clone, ValueEnum)]
enum EmbedMode {
    Openai,
    Stub,
}

impl EmbedMode {
    const fn as_domain(self) -> EmbeddingMode {
        match self {
            EmbedMode::Openai => EmbeddingMode::OpenAi,
            EmbedMode::Stub => EmbeddingMode::Stub,
        }
    }
}

#[derive(Args)]
struct PairArgs {
    /// Directory holding the paired sources
    dir: PathBuf,

    /// Output dataset path
    #[arg(long, short, default_value = "paired_data.jsonl")]
    out: PathBuf,

    #[arg(long, default_value = act_indexer::DEFAULT_SOURCE_EXT)]
    source_ext: String,

    #[arg(long, default_value = act_indexer::DEFAULT_TARGET_EXT)]
    target_ext: String,
}

#[derive(Args)]
struct IndexArgs {
    /// JSONL dataset of {"input", "output"} records
    #[arg(default_value = "paired_data.jsonl")]
    dataset: PathBuf,

    /// Embedding calls in flight (overrides [build].concurrency)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Input character budget (overrides [build].max_input_chars)
    #[arg(long)]
    max_input_chars: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

/// Snippet given inline, from a file, or on stdin.
#[derive(Args)]
struct QueryInput {
    /// Source snippet; read from stdin when omitted
    query: Option<String>,

    /// Read the snippet from a file
    #[arg(long, conflicts_with = "query")]
    file: Option<PathBuf>,
}

impl QueryInput {
    fn read(&self) -> Result<String> {
        if let Some(query) = &self.query {
            return Ok(query.clone());
        }
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()));
        }
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snippet from stdin")?;
        Ok(buf)
    }
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    input: QueryInput,

    /// Number of examples (overrides [retrieval].top_k)
    #[arg(long, short)]
    k: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PromptArgs {
    #[command(flatten)]
    input: QueryInput,
}

#[derive(Args)]
struct TranslateArgs {
    #[command(flatten)]
    input: QueryInput,

    /// Output JSON with retrieval hits and timings
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:5000
    #[arg(long, default_value = "127.0.0.1:5000")]
    bind: String,

    /// Allow binding to non-loopback addresses (requires --auth-token)
    #[arg(long)]
    public: bool,

    /// Require Authorization: Bearer <token> on all requests (env: ACT_AUTH_TOKEN)
    #[arg(long)]
    auth_token: Option<String>,

    /// Let browser pages from this origin call the API; repeatable, `*` allows any
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    cors_origins: Vec<String>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    let mut config = AppConfig::load(cli.config.as_deref(), &cwd)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(mode) = cli.embed_mode {
        config.embedding_mode = mode.as_domain();
    }
    if let Some(dir) = cli.index_dir {
        config.index_dir = dir;
    }

    match cli.command {
        Commands::Pair(args) => run_pair(args).await?,
        Commands::Index(args) => run_index(args, config).await?,
        Commands::Search(args) => run_search(args, config).await?,
        Commands::Prompt(args) => run_prompt(args, config).await?,
        Commands::Translate(args) => run_translate(args, config).await?,
        Commands::ServeHttp(args) => serve_http(args, config).await?,
    }
    Ok(())
}

fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>> {
    match config.embedding_mode {
        EmbeddingMode::Stub => {
            log::debug!(
                "Using stub embeddings (dimension {})",
                config.embedding.dimension
            );
            Ok(Arc::new(StubEmbedder::new(config.embedding.dimension)))
        }
        EmbeddingMode::OpenAi => {
            if config.embedding.api_key.is_none() {
                log::warn!(
                    "No API key configured for {}; set {}",
                    config.embedding.endpoint,
                    config::OPENAI_API_KEY_ENV
                );
            }
            let embedder = OpenAiEmbedder::new(config.embedding.clone())
                .context("Failed to create embedding client")?;
            Ok(Arc::new(embedder))
        }
    }
}

async fn load_store(config: &AppConfig) -> Result<ExampleStore> {
    let layout = IndexLayout::new(&config.index_dir);
    if !layout.exists() {
        anyhow::bail!(
            "No index at {}. Run `act index <dataset>` first.",
            layout.dir().display()
        );
    }
    ExampleStore::load(&layout)
        .await
        .with_context(|| format!("Failed to load index from {}", layout.dir().display()))
}

/// Load the index and wire every dependency of the translator.
async fn build_translator(config: &AppConfig) -> Result<Translator> {
    let store = load_store(config).await?;
    let embedder = build_embedder(config)?;
    let completion = OpenAiChatClient::new(config.completion.clone())
        .context("Failed to create completion client")?;
    let context = TranslationContext::new(
        Arc::new(store),
        embedder,
        Arc::new(completion),
        config.prompt.clone(),
        config.translator.clone(),
    )
    .context("Index and embedder are incompatible")?;
    Ok(Translator::new(Arc::new(context)))
}

async fn run_pair(args: PairArgs) -> Result<()> {
    let options = PairingOptions {
        source_ext: args.source_ext,
        target_ext: args.target_ext,
    };
    let report = pair_directory(&args.dir, &options)
        .with_context(|| format!("Failed to pair {}", args.dir.display()))?;
    for path in &report.unpaired {
        log::warn!("No counterpart for {}", path.display());
    }
    write_dataset(&args.out, &report.examples)
        .await
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    eprintln!(
        "Wrote {} examples to {} ({} unpaired, {} empty)",
        report.examples.len(),
        args.out.display(),
        report.unpaired.len(),
        report.empty
    );
    Ok(())
}

async fn run_index(args: IndexArgs, mut config: AppConfig) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        config.build.concurrency = concurrency.max(1);
    }
    if let Some(max_input_chars) = args.max_input_chars {
        config.build.max_input_chars = max_input_chars;
    }

    let dataset = read_dataset(&args.dataset)
        .await
        .with_context(|| format!("Failed to read dataset {}", args.dataset.display()))?;
    let skipped_incomplete = dataset.skipped_incomplete;

    let layout = IndexLayout::new(&config.index_dir);
    let outcome = IndexBuilder::new(build_embedder(&config)?)
        .with_options(config.build.clone())
        .build_and_save(dataset.examples, &layout)
        .await
        .context("Index build failed")?;

    if args.json {
        #[derive(Serialize)]
        struct IndexOutput<'a> {
            index_dir: String,
            skipped_incomplete: usize,
            stats: &'a act_indexer::BuildStats,
        }
        print_stdout(&serde_json::to_string_pretty(&IndexOutput {
            index_dir: layout.dir().display().to_string(),
            skipped_incomplete,
            stats: &outcome.stats,
        })?)?;
    } else {
        eprintln!(
            "Indexed {}/{} examples ({} failed, {} truncated, {} incomplete skipped) in {}ms -> {}",
            outcome.stats.indexed,
            outcome.stats.total,
            outcome.stats.failed,
            outcome.stats.truncated,
            skipped_incomplete,
            outcome.stats.time_ms,
            layout.dir().display()
        );
    }
    Ok(())
}

async fn run_search(args: SearchArgs, config: AppConfig) -> Result<()> {
    let query = args.input.read()?;
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Query is empty");
    }
    let k = args.k.unwrap_or(config.translator.top_k);

    let store = load_store(&config).await?;
    let embedder = build_embedder(&config)?;
    let limited = act_vector_store::truncate_chars(query, config.translator.max_query_chars);
    let vector = embedder.embed(limited).await.context("Failed to embed query")?;
    let result = store.search(&vector, k).context("Search failed")?;

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&result)?)?;
    } else {
        print_hits(&result)?;
    }
    Ok(())
}

fn print_hits(result: &RetrievalResult) -> Result<()> {
    if result.is_empty() {
        eprintln!("No examples found");
        return Ok(());
    }
    for (rank, hit) in result.hits.iter().enumerate() {
        print_stdout(&format!(
            "#{} position={} distance={:.4}\n{}\n---\n{}\n",
            rank + 1,
            hit.position,
            hit.distance,
            hit.example.input,
            hit.example.output
        ))?;
    }
    Ok(())
}

async fn run_prompt(args: PromptArgs, config: AppConfig) -> Result<()> {
    let query = args.input.read()?;
    let translator = build_translator(&config).await?;
    let prepared = translator.prepare(&query).await?;
    print_stdout(&prepared.prompt.text)
}

async fn run_translate(args: TranslateArgs, config: AppConfig) -> Result<()> {
    let query = args.input.read()?;
    let translator = build_translator(&config).await?;
    let translation = translator.translate_detailed(&query).await?;

    if args.json {
        #[derive(Serialize)]
        struct TranslateOutput<'a> {
            translated_code: &'a str,
            retrieval: &'a RetrievalResult,
            embed_ms: u64,
            generate_ms: u64,
            total_ms: u64,
        }
        print_stdout(&serde_json::to_string_pretty(&TranslateOutput {
            translated_code: &translation.text,
            retrieval: &translation.retrieval,
            embed_ms: translation.timings.embed_ms,
            generate_ms: translation.timings.generate_ms,
            total_ms: translation.timings.total_ms,
        })?)?;
    } else {
        print_stdout(&translation.text)?;
    }
    Ok(())
}

async fn serve_http(args: ServeArgs, config: AppConfig) -> Result<()> {
    let addrs = http_api::guarded_bind_addrs(&args.bind, args.public).await?;
    let access = http_api::AccessPolicy::resolve(
        args.auth_token.as_deref(),
        |key| std::env::var(key).ok(),
        &args.cors_origins,
        args.public,
    )?;

    let translator = build_translator(&config).await?;
    let state = Arc::new(http_api::HttpState { translator, access });
    let app = http_api::router(state.clone());

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving translations: {base_url}/translate"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    if state.access.requires_token() {
        print_stdout(&format!(
            "Auth enabled: add header 'Authorization: Bearer ${}'",
            http_api::AUTH_TOKEN_ENV
        ))?;
    }
    if state.access.allows_browsers() {
        print_stdout(&format!(
            "CORS enabled for: {}",
            args.cors_origins.join(", ")
        ))?;
    }
    if args.public {
        let addrs = addrs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        print_stdout(&format!(
            "Public bind enabled (--public). Resolved addresses: {addrs}"
        ))?;
    }
    print_stdout(&format!(
        "Try: curl -X POST {base_url}/translate -H 'Content-Type: application/json' -d '{{\"source_code\": \"begin end.\"}}'"
    ))?;

    axum::serve(listener, app).await?;
    Ok(())
}
