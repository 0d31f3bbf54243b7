use base64::{Engine, engine::general_purpose::STANDARD};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use comic::{
    ComicConfig, ComicPipeline, ComicRequest, GeminiClient, LayoutCompositor, PipelineBuilder,
    TextureOverlay,
};
use comic_cli::ComposeJob;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a comic strip from a photo using the configured model
    Generate {
        /// Path to the photo of the main character
        #[arg(short, long)]
        input: PathBuf,
        /// Optional image whose art style the panels should follow
        #[arg(short, long)]
        reference: Option<PathBuf>,
        /// What the comic should be about
        #[arg(short, long)]
        story_guide: Option<String>,
        /// Name of the main character
        #[arg(short = 'n', long)]
        character_name: Option<String>,
        /// Where to write the finished strip
        #[arg(short, long, default_value = "final_comic.png")]
        output: PathBuf,
        /// Gemini API key (or set GEMINI_API_KEY environment variable)
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// Compose a strip from existing panels and a story, without model calls
    Compose {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        job: PathBuf,
    },
    /// Write the default configuration as TOML
    InitConfig {
        #[arg(short, long, default_value = "comic.toml")]
        output: PathBuf,
    },
    /// Print the JSON schema for compose job files
    JobSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ComicConfig::from_file(path)?,
        None => ComicConfig::default(),
    };

    match cli.command {
        Commands::Generate {
            input,
            reference,
            story_guide,
            character_name,
            output,
            api_key,
        } => {
            let request = ComicRequest {
                base_image_data: read_base64(&input)?,
                story_guide: story_guide.unwrap_or_else(|| config.defaults.story_guide.clone()),
                character_name: character_name
                    .unwrap_or_else(|| config.defaults.character_name.clone()),
                reference_style_data: reference.as_deref().map(read_base64).transpose()?,
            };
            let api_key = api_key
                .or_else(|| config.model.api_key.clone())
                .ok_or_else(|| {
                    eyre!("Gemini API key not provided. Use --api-key or set GEMINI_API_KEY")
                })?;
            generate(&config, &api_key, request, &output).await?;
        }
        Commands::Compose { job } => {
            compose(&config, &job)?;
        }
        Commands::InitConfig { output } => {
            std::fs::write(&output, config.to_toml()?)?;
            info!("Configuration saved to: {:?}", output);
        }
        Commands::JobSchema => {
            let schema = schemars::schema_for!(ComposeJob);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn read_base64(path: &Path) -> Result<String> {
    Ok(STANDARD.encode(std::fs::read(path)?))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn generate(
    config: &ComicConfig,
    api_key: &str,
    request: ComicRequest,
    output: &Path,
) -> Result<()> {
    let client = GeminiClient::from_config(&config.model, api_key)?;
    let pipeline: ComicPipeline = PipelineBuilder::from_config(Arc::new(client), config).build();
    info!("{}", pipeline.info());

    let result = pipeline.run(request).await?;

    ensure_parent(output)?;
    std::fs::write(output, STANDARD.decode(&result.image_png_base64)?)?;

    println!("{}", result.story.narration());
    info!("Comic strip {}x{} saved to: {:?}", result.width, result.height, output);
    Ok(())
}

fn compose(config: &ComicConfig, job_path: &Path) -> Result<()> {
    let job = ComposeJob::from_file(job_path)?;
    let base_dir = job_path.parent().unwrap_or_else(|| Path::new("."));
    let panels = job.load_panels(base_dir)?;
    let output = job.output_path(base_dir);
    ensure_parent(&output)?;

    let compositor = LayoutCompositor::from_assets(&config.assets);
    let strip = compositor.compose(&panels, &job.story)?;

    if job.skip_texture {
        strip.save(&output)?;
    } else {
        let texture =
            TextureOverlay::new(config.assets.textures.clone(), config.texture.blend_mode);
        texture.apply_to(&DynamicImage::ImageRgb8(strip), &output)?;
    }

    info!("Composed \"{}\" to: {:?}", job.story.title, output);
    Ok(())
}
