use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use trendfold::config::{Config, ExtractorBackend};
use trendfold::entities::resolver::{EntityGroup, EntityResolver};
use trendfold::topics::model::Topic;

/// Trendfold: fold duplicate trending topics together and pull out who
/// and what they are about.
#[derive(Parser)]
#[command(name = "trendfold", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge near-duplicate topics from a JSON array of topic records
    Dedupe {
        /// Path to the input JSON file
        input: PathBuf,

        /// Write the merged topics as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Extract named entities from a document
    Entities {
        /// Read the document from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Pass the document inline
        #[arg(long)]
        text: Option<String>,

        /// Return proper-name and Wikipedia-linked groups instead of one list
        #[arg(long, conflicts_with = "all")]
        grouped: bool,

        /// List every local model mention, unranked and of any type
        #[arg(long)]
        all: bool,
    },

    /// Extract headline entity groups for each topic in a JSON file
    TopicEntities {
        /// Path to the input JSON file
        input: PathBuf,
    },

    /// Download the local NER model (~430 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trendfold=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dedupe { input, output } => {
            let topics = read_topics(&input)?;
            info!(count = topics.len(), "Loaded topics from {}", input.display());

            let merged = trendfold::topics::dedupe::combine_duplicate_topics(&topics)?;
            trendfold::output::terminal::display_merged_topics(topics.len(), &merged);

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&merged)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("\nMerged topics written to {}", path.display());
            }
        }

        Commands::Entities {
            file,
            text,
            grouped,
            all,
        } => {
            let document = match (file, text) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => anyhow::bail!("Provide a document with --file or --text"),
            };

            let config = Config::load()?;
            let resolver = create_resolver(&config)?;

            if all {
                let mentions = resolver.all_local_entities(&document).await?;
                trendfold::output::terminal::display_entity_list(&mentions);
            } else if grouped {
                let groups = resolver
                    .doc_to_entity_groups(&document, &[EntityGroup::Proper, EntityGroup::Wikipedia])
                    .await?;
                trendfold::output::terminal::display_entity_groups(&groups);
            } else {
                let entities = resolver.doc_to_entity_list(&document).await?;
                trendfold::output::terminal::display_entity_list(&entities);
            }
        }

        Commands::TopicEntities { input } => {
            let topics = read_topics(&input)?;
            let config = Config::load()?;
            let resolver = create_resolver(&config)?;

            for (i, topic) in topics.iter().enumerate() {
                let label = topic.title.as_deref().unwrap_or("(untitled)");
                println!(
                    "\n{}",
                    format!("[{}] {}", i + 1, trendfold::output::truncate_chars(label, 70)).bold()
                );

                match resolver.topic_to_entity_groups(topic).await {
                    Ok(groups) => trendfold::output::terminal::display_entity_groups(&groups),
                    // A topic without a title is skipped, not fatal for the batch
                    Err(e) => println!("  {}", format!("Skipped: {e}").dimmed()),
                }
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading NER model...");
            println!("  Destination: {}", model_dir.display());

            trendfold::entities::download::download_model(&config.ner_model_url, model_dir)
                .await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `trendfold entities --text \"...\"`.");
        }
    }

    Ok(())
}

/// Read a JSON array of topic records.
fn read_topics(path: &Path) -> Result<Vec<Topic>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let topics: Vec<Topic> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of topics", path.display()))?;
    Ok(topics)
}

/// Create an entity resolver based on the configured backend.
///
/// The local tagger is always loaded since it is the fallback for every
/// primary failure.
fn create_resolver(config: &Config) -> Result<EntityResolver> {
    config.require_local_model()?;
    let local = Box::new(trendfold::entities::onnx::OnnxNerTagger::load(
        &config.model_dir,
    )?);

    match config.extractor_backend {
        ExtractorBackend::Google => {
            config.require_google()?;
            info!("Using Google Natural Language entity extractor with local fallback");
            let primary = trendfold::entities::google::GoogleNlpExtractor::new(
                config.google_nlp_api_url.clone(),
                config.google_nlp_api_key.clone(),
                config.google_nlp_qps,
            );
            Ok(EntityResolver::new(Some(Box::new(primary)), local))
        }
        ExtractorBackend::Local => {
            info!("Using local ONNX NER tagger only");
            Ok(EntityResolver::local_only(local))
        }
    }
}
