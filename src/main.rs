use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storyrank::pipeline;
use storyrank::{load_model, PipelineConfig, TableStore};
use storyrank_storage::read_json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Comment attribution and story recommendations for discussion datasets
#[derive(Parser, Debug)]
#[command(name = "storyrank")]
#[command(about = "Resolve comment threads and score stories for users", long_about = None)]
struct Args {
    /// Directory holding the input and output tables
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Pipeline settings as JSON; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write tables gzip-compressed
    #[arg(long)]
    gzip: bool,

    /// Maximum reply depth resolved per comment
    #[arg(long)]
    max_depth: Option<usize>,

    /// Latent weights below this magnitude are dropped before projection
    #[arg(long)]
    latent_threshold: Option<f32>,

    /// Component weights below this magnitude are dropped before projection
    #[arg(long)]
    basis_threshold: Option<f32>,

    /// Stories listed per model component
    #[arg(long)]
    top_stories: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attribute every comment to its root story
    Resolve,
    /// Build the user x story interaction matrix from resolved comments
    BuildMatrix,
    /// Score stories for every user with a fitted model
    Recommend {
        /// Fitted truncated SVD (JSON)
        #[arg(short, long)]
        model: PathBuf,
    },
    /// List the heaviest stories of every model component
    ComponentTopStories {
        /// Fitted truncated SVD (JSON)
        #[arg(short, long)]
        model: PathBuf,
    },
    /// Run every stage in order
    Run {
        /// Fitted truncated SVD (JSON)
        #[arg(short, long)]
        model: PathBuf,
    },
}

impl Args {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config: PipelineConfig = match &self.config {
            Some(path) => read_json(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(max_depth) = self.max_depth {
            config.resolver.max_depth = max_depth;
        }
        if let Some(threshold) = self.latent_threshold {
            config.projector.latent_threshold = threshold;
        }
        if let Some(threshold) = self.basis_threshold {
            config.projector.basis_threshold = threshold;
        }
        if let Some(top_stories) = self.top_stories {
            config.top_stories_per_component = top_stories;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting storyrank v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", args.data_dir);

    let config = args.pipeline_config()?;
    info!("Config: {:?}", config);

    let store = TableStore::new(&args.data_dir)?.gzip(args.gzip);

    match &args.command {
        Command::Resolve => {
            let resolution = pipeline::build_comment_stories(&store, &config)?;
            info!(
                "Attributed {} comments, dropped {}",
                resolution.records.len(),
                resolution.dropped()
            );
        }
        Command::BuildMatrix => {
            let (users, stories) = pipeline::build_user_story_matrix(&store)?;
            info!("Matrix shape: {} x {}", users, stories);
        }
        Command::Recommend { model } => {
            let model = load_model(model)?;
            let records = pipeline::build_user_top_recommended_stories(&store, model, &config)?;
            info!("Wrote {} recommendations", records.len());
        }
        Command::ComponentTopStories { model } => {
            let model = load_model(model)?;
            let rows = pipeline::build_component_top_stories(&store, &model, &config)?;
            info!("Wrote {} component stories", rows);
        }
        Command::Run { model } => {
            let model = load_model(model)?;
            pipeline::run(&store, model, &config)?;
        }
    }

    Ok(())
}
