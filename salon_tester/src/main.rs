use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use salon_vision::core_modules::utils::image_helper::image_helper;
use salon_vision::pipeline::{Metadata, TaggedPhoto};
use salon_vision::{
    AnalyzerConfig, ImageSource, PhotoFilters, SalonPipeline, filter_options, get_popular_tags,
    search_photos,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Runs the salon photo analyses from the command line and prints JSON.
#[derive(Debug, Parser)]
#[command(name = "salon_tester", version, about)]
struct Cli {
    /// Analyzer configuration file (TOML, JSON or YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Face detection model, overrides the configured path.
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Skin tone, undertone and shade suggestions for a portrait.
    Skin {
        /// Image path, http(s) URL or data URI.
        image: String,
        /// Write the face crop that was sampled to this PNG.
        #[arg(long)]
        save_crop: Option<PathBuf>,
    },
    /// Makeup intensity, colors and feature flags of a photo.
    Features {
        image: String,
    },
    /// Tags a before/after pair.
    Tag {
        before: String,
        after: String,
        /// Extra metadata as a JSON object.
        #[arg(long)]
        metadata: Option<String>,
        /// Append the tagged photo to this gallery file.
        #[arg(long)]
        append: Option<PathBuf>,
    },
    /// Photos of a gallery that match the filters.
    Search {
        gallery: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Most common tags, styles and products of a gallery.
    Popular {
        gallery: PathBuf,
    },
    /// Distinct filter values present in a gallery.
    Options {
        gallery: PathBuf,
    },
}

#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long = "style")]
    styles: Vec<String>,
    #[arg(long = "product")]
    products: Vec<String>,
    #[arg(long = "skin-tone")]
    skin_tones: Vec<String>,
    #[arg(long = "undertone")]
    undertones: Vec<String>,
    #[arg(long = "occasion")]
    occasions: Vec<String>,
    /// Case-insensitive text search over tags.
    #[arg(long)]
    query: Option<String>,
}

impl From<FilterArgs> for PhotoFilters {
    fn from(args: FilterArgs) -> Self {
        PhotoFilters {
            styles: args.styles,
            products: args.products,
            skin_tones: args.skin_tones,
            undertones: args.undertones,
            occasions: args.occasions,
            search_query: args.query,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();

    // stdout carries the JSON result, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- 2. Configuration ---
    let mut config = AnalyzerConfig::load(cli.config.as_deref())
        .context("failed to load analyzer configuration")?;
    if let Some(model) = cli.model {
        config.model_path = model;
    }

    // --- 3. Dispatch ---
    match cli.command {
        Command::Skin { image, save_crop } => {
            let pipeline = SalonPipeline::new(config);
            let analysis = pipeline
                .analyze_skin_tone_detailed(ImageSource::parse(&image))
                .await
                .with_context(|| format!("skin tone analysis of {} failed", image))?;
            if let Some(path) = save_crop {
                let crop = &analysis.face_crop;
                image_helper::save(&path, crop.width(), crop.height(), crop.as_bytes())
                    .with_context(|| format!("failed to write face crop to {}", path.display()))?;
                info!(path = %path.display(), "face crop saved");
            }
            print_json(&analysis.result)
        }
        Command::Features { image } => {
            let pipeline = SalonPipeline::new(config);
            let features = pipeline
                .analyze_image_features(ImageSource::parse(&image))
                .await
                .with_context(|| format!("feature analysis of {} failed", image))?;
            print_json(&features)
        }
        Command::Tag {
            before,
            after,
            metadata,
            append,
        } => {
            let metadata = metadata.as_deref().map(parse_metadata).transpose()?;
            let pipeline = SalonPipeline::new(config);
            let photo = pipeline
                .tag_photo(ImageSource::parse(&before), ImageSource::parse(&after), metadata)
                .await
                .context("photo tagging failed")?;
            if let Some(path) = append {
                let mut gallery = if path.exists() {
                    read_gallery(&path)?
                } else {
                    Vec::new()
                };
                gallery.push(photo.clone());
                write_gallery(&path, &gallery)?;
                info!(path = %path.display(), photos = gallery.len(), "gallery updated");
            }
            print_json(&photo)
        }
        Command::Search { gallery, filters } => {
            let photos = read_gallery(&gallery)?;
            let filters = PhotoFilters::from(filters);
            print_json(&search_photos(&photos, &filters))
        }
        Command::Popular { gallery } => print_json(&get_popular_tags(&read_gallery(&gallery)?)),
        Command::Options { gallery } => print_json(&filter_options(&read_gallery(&gallery)?)),
    }
}

fn parse_metadata(raw: &str) -> anyhow::Result<Metadata> {
    match serde_json::from_str::<serde_json::Value>(raw).context("metadata is not valid JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("metadata must be a JSON object, got {}", other),
    }
}

fn read_gallery(path: &Path) -> anyhow::Result<Vec<TaggedPhoto>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read gallery {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("gallery {} is malformed", path.display()))
}

fn write_gallery(path: &Path, photos: &[TaggedPhoto]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(photos)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write gallery {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
