use clap::{Parser, Subcommand};
use postsmith::config::{self, SiteConfig};
use postsmith::imaging::{ImageBackend, RustBackend};
use postsmith::pipeline::{self, Pipeline};
use postsmith::variants::VariantGenerator;
use postsmith::{output, scan, tags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "postsmith")]
#[command(about = "Content pipeline for static blogs")]
#[command(long_about = "\
Content pipeline for static blogs

Reads Markdown documents with YAML front matter, renders them to HTML with
heading anchors and a table of contents, expands {% callout %} blocks,
generates responsive image variants for {% image %} and {% asset %}
shortcodes, and writes a JSON manifest for the site's template renderer.

Project structure:

  config.toml                  # Optional, see 'postsmith gen-config'
  content/
  ├── about.md                 # ---\\ntitle: About\\n---
  └── posts/
      └── hello-tokio.md       # tags: [posts, rust]
  site/assets/
  └── harbor.jpg               # {% asset \"harbor.jpg\", \"Harbor\" %}

Outputs:

  _site/manifest.json          # Rendered documents and tag index
  _site/img/<id>-<width>.<ext> # Image variants (avif, webp, jpeg, png)

Run 'postsmith gen-config' to generate a documented config.toml.")]
#[command(version = env!("POSTSMITH_VERSION"))]
struct Cli {
    /// Path to config.toml; its directory is the project root
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Log per-document and per-image progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render all documents, generate images and write the manifest
    Build,
    /// Validate documents and front matter without rendering
    Check,
    /// Print the site-wide tag index
    Tags,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build => {
            let config = config::load_config_file(&cli.config)?;
            let threads = init_thread_pool(&config.processing);

            println!("==> Scanning {}", config.content_dir.display());
            let documents = scan::scan(&config.content_dir)?;

            println!("==> Rendering {} documents", documents.len());
            let pipeline = Pipeline::new(Arc::new(generator(&config, &cli.config, threads)));
            let report = pipeline.build(documents).await?;
            let manifest_path = pipeline::write_manifest(&report, &config.output_dir)?;
            output::print_build_output(&report, Some(&manifest_path));

            println!("==> Build complete: {}", config.output_dir.display());
        }
        Command::Check => {
            let config = config::load_config_file(&cli.config)?;
            println!("==> Checking {}", config.content_dir.display());
            let documents = scan::scan(&config.content_dir)?;
            output::print_check_output(&documents);
            println!("==> Content is valid");
        }
        Command::Tags => {
            let config = config::load_config_file(&cli.config)?;
            let documents = scan::scan(&config.content_dir)?;
            output::print_tag_index(&tags::aggregate(&documents));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays clean.
///
/// `--verbose` turns on debug events; otherwise `RUST_LOG` decides and
/// defaults to warnings.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("postsmith=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) -> usize {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
    threads
}

fn generator(config: &SiteConfig, config_path: &Path, workers: usize) -> VariantGenerator {
    let root = match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let backend: Arc<dyn ImageBackend> = Arc::new(RustBackend::new());
    VariantGenerator::new(backend, &config.images, root, workers)
}
