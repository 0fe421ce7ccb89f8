//! selfquery CLI entry point
//!
//! - `selfquery ask --file <md> <question>` - document QA
//! - `selfquery videos [QUERY]...` - self-query retrieval over video metadata
//! - `selfquery config [--validate]` - inspect configuration
//! - `selfquery init [PATH]` - write a starter configuration

use anyhow::Context;
use selfquery::cli::init::{self, InitConfig, InitResult};
use selfquery::cli::output::Output;
use selfquery::cli::{Cli, Commands};
use selfquery::db::VectorStore;
use selfquery::rag::cache::CachedEmbeddingProvider;
use selfquery::rag::chunker::TextChunker;
use selfquery::rag::embeddings::EmbeddingProvider;
use selfquery::rag::index::DocumentIndex;
use selfquery::rag::loader::load_text_file;
use selfquery::rag::qa::QaChain;
use selfquery::selfquery::{LlmQueryTranslator, RetrievalMode, SelfQueryRetriever};
use selfquery::sources::{BilibiliClient, VideoLoader};
use selfquery::{AppConfig, LLMClient};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Init { path, force } => {
            init_tracing("warn", cli.verbose);
            match init::run(InitConfig { path, force }, output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
            }
        }
        Commands::Config { validate } => run_config(&cli.config, validate, cli.verbose, output),
        Commands::Ask {
            file,
            top_k,
            question,
        } => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.logging.level, cli.verbose);
            run_ask(&config, &file, top_k, &question.join(" "), output).await
        }
        Commands::Videos {
            urls,
            limit,
            queries,
        } => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.logging.level, cli.verbose);
            run_videos(&config, urls, limit, queries, output).await
        }
    }
}

/// `RUST_LOG` wins unless `--verbose` is given; otherwise the configured level.
fn init_tracing(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load_or_default(path)
        .with_context(|| format!("invalid configuration ({})", path.display()))
}

fn build_embedder(config: &AppConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider = config.embedding_backend()?.create_provider()?;
    if config.embedding.cache_entries == 0 {
        return Ok(provider);
    }
    Ok(Arc::new(CachedEmbeddingProvider::new(
        provider,
        config.embedding.cache_entries,
    )))
}

async fn build_llm(config: &AppConfig) -> anyhow::Result<Arc<dyn LLMClient>> {
    let client = config.llm_provider()?.create_client().await?;
    Ok(Arc::from(client))
}

// ============= ask =============

async fn run_ask(
    config: &AppConfig,
    file: &Path,
    top_k: Option<usize>,
    question: &str,
    output: &Output,
) -> anyhow::Result<()> {
    output.header("Document QA");

    output.step(1, 3, &format!("Loading {}", file.display()));
    let document = load_text_file(file)?;
    let markdown = file
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false);
    let chunker = TextChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
    let chunks = chunker.split_documents(&[document], markdown)?;

    output.step(2, 3, &format!("Indexing {} chunks", chunks.len()));
    let store = Arc::new(selfquery::InMemoryVectorStore::new());
    let index = DocumentIndex::new(build_embedder(config)?, store);
    index.add_documents(chunks).await?;

    output.step(3, 3, "Generating answer");
    let chain = QaChain::new(index, build_llm(config).await?)
        .with_top_k(top_k.filter(|k| *k > 0).unwrap_or(config.rag.top_k));
    let answer = chain.answer(question).await?;

    output.subheader(&answer.question);
    output.answer(&answer.answer);
    output.kv("sources", &answer.sources.len().to_string());
    Ok(())
}

// ============= videos =============

async fn run_videos(
    config: &AppConfig,
    urls: Vec<String>,
    limit: Option<usize>,
    queries: Vec<String>,
    output: &Output,
) -> anyhow::Result<()> {
    output.header("Self-query retrieval");

    let store = Arc::new(config.vector_store_provider().create_store()?);
    let index = DocumentIndex::new(build_embedder(config)?, store.clone());

    if urls.is_empty() && !store.is_empty().await? {
        output.info(&format!(
            "Using {} videos from the snapshot",
            store.len().await?
        ));
    } else {
        let urls = if urls.is_empty() {
            config.source.videos.clone()
        } else {
            urls
        };
        output.step(1, 2, &format!("Fetching {} videos", urls.len()));
        let loader = VideoLoader::new(
            BilibiliClient::new(config.client_options())?,
            config.request_pacer(),
        );
        let documents = loader.load(&urls).await?;
        output.success(&format!("Loaded {} of {} videos", documents.len(), urls.len()));

        output.step(2, 2, "Indexing video metadata");
        store.reset().await?;
        index.add_documents(documents).await?;
    }

    let translator = LlmQueryTranslator::new(build_llm(config).await?, &config.retriever.document_contents)
        .with_limit(config.retriever.enable_limit);
    let retriever = SelfQueryRetriever::new(Arc::new(translator), index, config.field_schema()?)
        .with_default_limit(config.retriever.default_limit);

    let queries = if queries.is_empty() {
        config.retriever.queries.clone()
    } else {
        queries
    };

    let mut failures = 0;
    for query in &queries {
        output.subheader(&format!("Query: {}", query));
        let retrieval = match retriever.retrieve_detailed(query, limit).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                failures += 1;
                output.error(&format!("Query failed: {}", e));
                continue;
            }
        };

        match &retrieval.applied.filter {
            Some(filter) => output.kv("filter", &filter.to_string()),
            None => output.kv("filter", "none"),
        }
        if let Some(limit) = retrieval.applied.limit {
            output.kv("limit", &limit.to_string());
        }
        if retrieval.mode == RetrievalMode::Fallback {
            for warning in &retrieval.warnings {
                output.warning(warning);
            }
        }

        if retrieval.documents.is_empty() {
            output.info("No matching videos");
        }
        for (rank, hit) in retrieval.documents.iter().enumerate() {
            output.hit(rank + 1, hit);
        }
    }

    info!(queries = queries.len(), failures, "Finished self-query session");
    if failures == queries.len() && failures > 0 {
        anyhow::bail!("all {} queries failed", failures);
    }
    output.complete("Done");
    Ok(())
}

// ============= config =============

fn run_config(path: &Path, validate: bool, verbose: bool, output: &Output) -> anyhow::Result<()> {
    let config = if path.exists() {
        AppConfig::from_file(path)?
    } else {
        output.warning(&format!("{} not found, showing defaults", path.display()));
        AppConfig::default()
    };
    init_tracing(&config.logging.level, verbose);

    output.header("Configuration");
    output.kv("file", &path.display().to_string());

    output.subheader("LLM");
    output.kv("type", &format!("{:?}", config.llm.kind).to_lowercase());
    output.kv("model", &config.llm.model);
    output.kv("api_key_env", &config.llm.api_key_env);

    output.subheader("Embedding");
    output.kv("type", &format!("{:?}", config.embedding.kind).to_lowercase());
    output.kv("model", &config.embedding.model);
    output.kv("cache_entries", &config.embedding.cache_entries.to_string());

    output.subheader("RAG");
    output.kv(
        "chunking",
        &format!("{} / overlap {}", config.rag.chunk_size, config.rag.chunk_overlap),
    );
    output.kv("top_k", &config.rag.top_k.to_string());
    if let Some(path) = &config.rag.snapshot_path {
        output.kv("snapshot", &path.display().to_string());
    }

    output.subheader("Retriever fields");
    for field in &config.retriever.fields {
        output.list_item(&format!("{} ({}): {}", field.name, field.field_type, field.description));
    }

    output.subheader("Videos");
    for url in &config.source.videos {
        output.list_item(url);
    }

    if validate {
        output.newline();
        config.validate().context("configuration is invalid")?;
        output.success("Configuration is valid");
    }
    Ok(())
}
