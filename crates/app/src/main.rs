use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use docqa_core::{
    CharacterNgramEmbedder, Embedder, Generator, IndexBackend, OllamaClient, OllamaConfig,
    OllamaEmbedder, OllamaGenerator, Pipeline, PipelineError, PipelineOptions, Services,
    Workspace, DEFAULT_EMBED_MODEL, DEFAULT_GENERATE_MODEL, DEFAULT_OLLAMA_URL,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Ollama base URL
    #[arg(long, env = "DOCQA_OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Model used to answer and summarize
    #[arg(long, env = "DOCQA_GENERATE_MODEL", default_value = DEFAULT_GENERATE_MODEL)]
    generate_model: String,

    /// Model used for embeddings when --embedder=ollama
    #[arg(long, env = "DOCQA_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL)]
    embed_model: String,

    /// Embedding service
    #[arg(long, env = "DOCQA_EMBEDDER", value_enum, default_value_t = EmbedderKind::Ollama)]
    embedder: EmbedderKind,

    /// Vector index service
    #[arg(long, env = "DOCQA_INDEX", value_enum, default_value_t = IndexKind::Memory)]
    index: IndexKind,

    /// Qdrant base URL when --index=qdrant
    #[arg(long, env = "DOCQA_QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Prefix for per-session Qdrant collections
    #[arg(long, env = "DOCQA_QDRANT_PREFIX", default_value = "docqa")]
    qdrant_prefix: String,

    /// Timeout in seconds for every call to an external service
    #[arg(long, env = "DOCQA_TIMEOUT_SECS", default_value = "120")]
    timeout_secs: u64,

    /// Sampling temperature for generation
    #[arg(long, env = "DOCQA_TEMPERATURE", default_value = "0.7")]
    temperature: f32,

    /// Maximum characters per chunk
    #[arg(long, default_value = "500")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value = "50")]
    chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, default_value = "4")]
    top_k: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Ollama,
    Ngram,
}

#[derive(Clone, Copy, ValueEnum)]
enum IndexKind {
    Memory,
    Qdrant,
}

#[derive(Subcommand)]
enum Command {
    /// Load documents and answer a question from them.
    Ask {
        /// Document to load; repeat for several.
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        question: String,
    },
    /// Load a document and summarize it.
    Summarize {
        #[arg(long)]
        file: PathBuf,
    },
    /// Summarize two documents and compare the summaries.
    Compare {
        #[arg(long)]
        first: PathBuf,
        #[arg(long)]
        second: PathBuf,
        /// Give each document its own index instead of one shared index.
        #[arg(long, default_value_t = false)]
        isolated: bool,
    },
    /// Extract the top keywords from loaded documents.
    Keywords {
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },
    /// Describe the overall sentiment of loaded documents.
    Sentiment {
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },
    /// Translate a sample of loaded documents.
    Translate {
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        /// Target language, e.g. French, Hindi, Spanish.
        #[arg(long)]
        language: String,
    },
    /// Load every supported document under a folder.
    Ingest {
        #[arg(long)]
        folder: PathBuf,
        /// Question to ask once the folder is loaded.
        #[arg(long)]
        question: Option<String>,
    },
    /// Interactive session over one index.
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docqa boot"
    );

    let services = build_services(&cli)?;
    check_services(&services).await?;

    let options = PipelineOptions {
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
        top_k: cli.top_k,
        ..PipelineOptions::default()
    };

    match cli.command {
        Command::Ask { files, question } => {
            let mut pipeline = Pipeline::new(services, options)?;
            load_all(&mut pipeline, &files).await;
            let outcome = pipeline.ask(&question).await;
            release(pipeline).await;
            print_outcome("Answer", outcome)?;
        }
        Command::Summarize { file } => {
            let mut pipeline = Pipeline::new(services, options)?;
            let outcome = pipeline.summarize(&file).await;
            release(pipeline).await;
            print_outcome("Summary", outcome)?;
        }
        Command::Compare {
            first,
            second,
            isolated,
        } => {
            if isolated {
                let mut workspace = Workspace::new(services, options);
                let outcome = workspace.compare_isolated(&first, &second).await;
                if let Err(error) = workspace.close_all().await {
                    warn!(%error, "failed to release session indexes");
                }
                print_outcome("Comparison", outcome.map(|result| result.comparison))?;
            } else {
                let mut pipeline = Pipeline::new(services, options)?;
                let outcome = pipeline.compare(&first, &second).await;
                release(pipeline).await;
                print_outcome("Comparison", outcome)?;
            }
        }
        Command::Keywords { files } => {
            let mut pipeline = Pipeline::new(services, options)?;
            load_all(&mut pipeline, &files).await;
            let outcome = pipeline.extract_keywords().await;
            release(pipeline).await;
            print_outcome("Keywords", outcome)?;
        }
        Command::Sentiment { files } => {
            let mut pipeline = Pipeline::new(services, options)?;
            load_all(&mut pipeline, &files).await;
            let outcome = pipeline.sentiment().await;
            release(pipeline).await;
            print_outcome("Sentiment", outcome)?;
        }
        Command::Translate { files, language } => {
            let mut pipeline = Pipeline::new(services, options)?;
            load_all(&mut pipeline, &files).await;
            let outcome = pipeline.translate(&language).await;
            release(pipeline).await;
            print_outcome(&format!("Translated Text ({language})"), outcome)?;
        }
        Command::Ingest { folder, question } => {
            let mut pipeline = Pipeline::new(services, options)?;
            let result = ingest_folder(&mut pipeline, &folder, question).await;
            release(pipeline).await;
            result?;
        }
        Command::Shell => {
            let mut pipeline = Pipeline::new(services, options)?;
            let result = run_shell(&mut pipeline).await;
            release(pipeline).await;
            result?;
        }
    }

    Ok(())
}

async fn ingest_folder(
    pipeline: &mut Pipeline,
    folder: &Path,
    question: Option<String>,
) -> anyhow::Result<()> {
    let report = pipeline.ingest_folder(folder).await?;

    for summary in &report.loaded {
        println!("{summary}");
    }
    if !report.skipped_files.is_empty() {
        warn!(
            "skipped_files={} for folder={}",
            report.skipped_files.len(),
            folder.display()
        );
        for skipped in &report.skipped_files {
            println!("skipped {}: {}", skipped.path.display(), skipped.reason);
        }
    }
    println!(
        "{} chunks from {} documents indexed at {}",
        pipeline.chunk_count(),
        report.loaded.len(),
        Utc::now().to_rfc3339()
    );

    if let Some(question) = question {
        print_outcome("Answer", pipeline.ask(&question).await)?;
    }
    Ok(())
}

fn build_services(cli: &Cli) -> anyhow::Result<Services> {
    let timeout = Duration::from_secs(cli.timeout_secs);

    let mut config = OllamaConfig::new(&cli.ollama_url)
        .map_err(|error| anyhow::anyhow!("invalid --ollama-url {}: {error}", cli.ollama_url))?;
    config.generate_model = cli.generate_model.clone();
    config.embed_model = cli.embed_model.clone();
    config.temperature = cli.temperature;
    config.timeout = timeout;

    let client = Arc::new(OllamaClient::new(config)?);

    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(Arc::clone(&client))),
        EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder::default()),
    };
    let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(client));

    let backend = match cli.index {
        IndexKind::Memory => IndexBackend::InMemory,
        IndexKind::Qdrant => IndexBackend::Qdrant {
            endpoint: cli.qdrant_url.clone(),
            collection_prefix: cli.qdrant_prefix.clone(),
            timeout,
        },
    };

    Ok(Services {
        embedder,
        generator,
        backend,
    })
}

/// Fails fast, before any document work, when a model service is unreachable.
async fn check_services(services: &Services) -> anyhow::Result<()> {
    services
        .embedder
        .health_check()
        .await
        .map_err(|error| {
            anyhow::anyhow!(
                "embedding service ({}) is not available: {error}",
                services.embedder.name()
            )
        })?;
    services
        .generator
        .health_check()
        .await
        .map_err(|error| {
            anyhow::anyhow!(
                "generation service ({} / {}) is not available: {error}",
                services.generator.name(),
                services.generator.model()
            )
        })?;
    Ok(())
}

/// Loads each file in turn; a file that fails is reported and the rest still load.
async fn load_all(pipeline: &mut Pipeline, files: &[PathBuf]) {
    for file in files {
        match pipeline.ingest(file).await {
            Ok(summary) => println!("{summary}"),
            Err(error) => println!("Failed to load {}: {error}", file.display()),
        }
    }
}

/// Destroys the session's index. A failure is logged and the command's own
/// outcome stands.
async fn release(pipeline: Pipeline) {
    if let Err(error) = pipeline.close().await {
        warn!(%error, "failed to release the index");
    }
}

/// Task failures such as `NotReady` are printed as results; external service
/// failures end the process with an error.
fn print_outcome(label: &str, outcome: Result<String, PipelineError>) -> anyhow::Result<()> {
    match outcome {
        Err(PipelineError::ExternalService(error)) => Err(anyhow::anyhow!(error.to_string())),
        outcome => {
            println!("{}", render(label, outcome));
            Ok(())
        }
    }
}

fn render(label: &str, outcome: Result<String, PipelineError>) -> String {
    match outcome {
        Ok(text) => format!("{label}: {text}"),
        Err(PipelineError::ExternalService(error)) => {
            warn!(%error, "task failed");
            format!("{label} failed: {error}")
        }
        Err(error) => error.to_string(),
    }
}

const SHELL_HELP: &str = "commands:
  load <path>               load a document into this session
  ask <question>            answer from loaded documents
  summarize [path]          summarize a new document, or everything loaded
  compare <path1> <path2>   summarize and compare two documents
  keywords                  top 10 keywords
  sentiment                 overall sentiment
  translate <language>      translate a sample of the text
  docs                      list loaded documents
  help                      show this message
  quit                      leave the shell";

#[derive(Debug, PartialEq)]
enum ShellStep {
    Reply(String),
    Quit,
}

async fn run_shell(pipeline: &mut Pipeline) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("docqa session {} (type `help`)", pipeline.session());
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match shell_step(pipeline, &line).await {
            ShellStep::Quit => break,
            ShellStep::Reply(reply) if reply.is_empty() => {}
            ShellStep::Reply(reply) => println!("{reply}"),
        }
    }

    Ok(())
}

/// Runs one shell line against the session. Every failure, service errors
/// included, comes back as a reply so the session and its index survive.
async fn shell_step(pipeline: &mut Pipeline, line: &str) -> ShellStep {
    let line = line.trim();
    if line.is_empty() {
        return ShellStep::Reply(String::new());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let reply = match (command, rest) {
        ("quit" | "exit", _) => return ShellStep::Quit,
        ("help", _) => SHELL_HELP.to_string(),
        ("load", path) if !path.is_empty() => match pipeline.ingest(path).await {
            Ok(summary) => summary.to_string(),
            Err(error) => error.to_string(),
        },
        ("ask", question) if !question.is_empty() => {
            render("Answer", pipeline.ask(question).await)
        }
        ("summarize", "") => render("Summary", pipeline.summarize_loaded().await),
        ("summarize", path) => render("Summary", pipeline.summarize(path).await),
        ("compare", paths) => match paths.split_whitespace().collect::<Vec<_>>().as_slice() {
            [first, second] => render("Comparison", pipeline.compare(first, second).await),
            _ => "usage: compare <path1> <path2>".to_string(),
        },
        ("keywords", _) => render("Keywords", pipeline.extract_keywords().await),
        ("sentiment", _) => render("Sentiment", pipeline.sentiment().await),
        ("translate", language) if !language.is_empty() => render(
            &format!("Translated Text ({language})"),
            pipeline.translate(language).await,
        ),
        ("docs", _) => {
            let mut listing = pipeline
                .documents()
                .iter()
                .map(|record| {
                    format!(
                        "{} [{}] chunks {}..{} loaded {}",
                        record.source_path,
                        record.format.label(),
                        record.chunk_range.start,
                        record.chunk_range.end,
                        record.ingested_at.to_rfc3339()
                    )
                })
                .collect::<Vec<_>>();
            listing.push(format!("{} chunks indexed", pipeline.chunk_count()));
            listing.join("\n")
        }
        _ => "unrecognised input, type `help`".to_string(),
    };

    ShellStep::Reply(reply)
}
