//! annograph CLI: run NLP tool adapters over text and print the annotation graph.
//!
//! Usage:
//!   annograph parse [--streaming | --interactive] [--frames] [--catalog path] < text
//!   annograph transcript <file>
//!   annograph stream <file>

use annograph::adapter::{
    parse_stream, parse_transcript, AdapterInput, CancellationToken, InteractiveParserAdapter, SocketFrameAdapter,
    StreamingDependencyAdapter,
};
use annograph::frames::{FrameElementResolver, StaticCatalog};
use annograph::{AnnotationPipeline, Config, Document};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "annograph", version, about = "Aggregate NLP tool output into one annotation graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/annograph/config.yaml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate text read from stdin
    Parse {
        /// Use the streaming dependency parser (the default)
        #[arg(long, conflicts_with = "interactive")]
        streaming: bool,
        /// Use the interactive parser, which also reports coreference
        #[arg(long)]
        interactive: bool,
        /// Tag frames with the frame-semantic tagger
        #[arg(long)]
        frames: bool,
        /// Frame catalog for element resolution (overrides the config)
        #[arg(long, requires = "frames")]
        catalog: Option<PathBuf>,
    },
    /// Decode a saved interactive parser transcript
    Transcript {
        file: PathBuf,
    },
    /// Decode a saved dependency-line stream
    Stream {
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn print_document(doc: &Document) -> i32 {
    match doc.to_json() {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: cannot serialize document: {}", e);
            1
        }
    }
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            token.cancel();
        }
    });
}

async fn build_pipeline(
    config: &Config,
    interactive: bool,
    frames: bool,
    catalog: Option<PathBuf>,
) -> Result<AnnotationPipeline, String> {
    let mut pipeline = AnnotationPipeline::new();

    if interactive {
        let adapter = InteractiveParserAdapter::spawn(config.interactive.clone())
            .await
            .map_err(|e| format!("cannot start interactive parser: {}", e))?;
        pipeline.register_adapter(Arc::new(adapter));
    } else {
        pipeline.register_adapter(Arc::new(StreamingDependencyAdapter::new(config.streaming.clone())));
    }

    if frames {
        pipeline.register_adapter(Arc::new(SocketFrameAdapter::new(config.frames.clone())));
        if let Some(path) = catalog.or_else(|| config.catalog.clone()) {
            let catalog = StaticCatalog::load(&path).map_err(|e| e.to_string())?;
            tracing::info!(path = %path.display(), frames = catalog.frame_count(), "loaded frame catalog");
            pipeline = pipeline.with_resolver(FrameElementResolver::new(Arc::new(catalog), config.relations.clone()));
        }
    }

    Ok(pipeline)
}

async fn cmd_parse(config: &Config, interactive: bool, frames: bool, catalog: Option<PathBuf>) -> i32 {
    let mut text = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut text) {
        eprintln!("Error: cannot read stdin: {}", e);
        return 1;
    }

    let pipeline = match build_pipeline(config, interactive, frames, catalog).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());
    match pipeline.annotate(&text, cancel).await {
        Ok(doc) => print_document(&doc),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_transcript(file: &Path) -> i32 {
    let text = match std::fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", file.display(), e);
            return 1;
        }
    };

    let mut doc = Document::new();
    if let Err(e) = parse_transcript(text.lines(), &mut doc) {
        eprintln!("Error: {}: {}", file.display(), e);
        return 1;
    }
    print_document(&doc)
}

async fn cmd_stream(file: &Path) -> i32 {
    let handle = match tokio::fs::File::open(file).await {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: cannot open {}: {}", file.display(), e);
            return 1;
        }
    };

    let mut doc = Document::new();
    if let Err(e) = parse_stream(BufReader::new(handle), &mut doc, &AdapterInput::new("")).await {
        eprintln!("Error: {}: {}", file.display(), e);
        return 1;
    }
    print_document(&doc)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = rt.block_on(async {
        match cli.command {
            Commands::Parse {
                streaming: _,
                interactive,
                frames,
                catalog,
            } => cmd_parse(&config, interactive, frames, catalog).await,
            Commands::Transcript { file } => cmd_transcript(&file),
            Commands::Stream { file } => cmd_stream(&file).await,
        }
    });
    std::process::exit(code);
}
