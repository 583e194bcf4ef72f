use clap::{Parser, Subcommand};
use shutterpost::imaging::{self, Adjustment, RasterBackend, RustBackend};
use shutterpost::pending::{DirectPost, PendingPost, SourceImage};
use shutterpost::session::SessionSnapshot;
use shutterpost::store::{JsonDocumentStore, LocalBlobStore};
use shutterpost::upload::UploadWorkflow;
use shutterpost::{config, feed, output};
use std::path::{Path, PathBuf};
use tracing::Level;

/// Edit controls shared by `preview`, `render` and `share`.
#[derive(clap::Args, Clone)]
struct EditArgs {
    /// Filter preset id (see `shutterpost filters`)
    #[arg(long, default_value = "normal", value_parser = parse_filter)]
    filter: String,

    /// Filter strength, 0-100
    #[arg(long, default_value_t = 100.0)]
    strength: f64,

    /// Adjustment as ID=VALUE, repeatable (e.g. --adjust brightness=40)
    #[arg(long = "adjust", value_name = "ID=VALUE", value_parser = parse_adjust)]
    adjustments: Vec<(Adjustment, i32)>,

    /// Centered zoom, 1.0-2.0
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,
}

/// Caption and sharing options for `share`.
#[derive(clap::Args, Clone)]
struct DetailArgs {
    #[arg(long, default_value = "")]
    caption: String,

    #[arg(long, default_value = "")]
    location: String,

    #[arg(long, default_value = "")]
    alt_text: String,

    /// Hide like and view counts
    #[arg(long)]
    hide_metrics: bool,

    #[arg(long)]
    disable_comments: bool,

    /// Do not cross-post to Threads
    #[arg(long)]
    no_threads: bool,
}

/// Who is sharing.
#[derive(clap::Args, Clone)]
struct SessionArgs {
    /// Signed-in user id; omit to share anonymously (which fails)
    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    nickname: Option<String>,

    #[arg(long)]
    photo_url: Option<String>,

    /// Treat the session as unverified
    #[arg(long)]
    unverified: bool,
}

impl SessionArgs {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user.clone(),
            verified: !self.unverified,
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

fn parse_filter(id: &str) -> Result<String, String> {
    match imaging::find_filter(id) {
        Some(filter) => Ok(filter.id.to_string()),
        None => {
            let ids: Vec<&str> = imaging::filters().iter().map(|f| f.id).collect();
            Err(format!("unknown filter '{id}' (expected one of: {})", ids.join(", ")))
        }
    }
}

fn parse_adjust(arg: &str) -> Result<(Adjustment, i32), String> {
    let (id, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{arg}'"))?;
    let adjustment: Adjustment = id.trim().parse()?;
    let value: i32 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for {adjustment}: {e}"))?;
    Ok((adjustment, value))
}

#[derive(Parser)]
#[command(name = "shutterpost")]
#[command(about = "Filter, rasterize, and publish photo posts")]
#[command(long_about = "\
Filter, rasterize, and publish photo posts

Pick a filter preset at a strength, add manual adjustments and a centered
zoom, then render the result to a JPEG or share it as a post. 'post' shares
several original images as one post without editing. Shared images and post
records are written to local stores configured in shutterpost.toml.

Adjustments (--adjust ID=VALUE):
  brightness, contrast, blur, saturate, temperature   -100..100
  vignette                                            0..100

Run 'shutterpost gen-config' to generate a documented shutterpost.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding shutterpost.toml; storage paths are relative to it
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the filter presets
    Filters {
        /// Also show each effect at this strength
        #[arg(long)]
        strength: Option<f64>,
    },
    /// Show the composed effect expression for a set of edits
    Preview(EditArgs),
    /// Rasterize an image with edits applied and write a JPEG
    Render {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        edit: EditArgs,
    },
    /// Rasterize an image and publish it as a post
    Share {
        input: PathBuf,
        #[command(flatten)]
        edit: EditArgs,
        #[command(flatten)]
        details: DetailArgs,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Publish one or more original images as a single post, without editing
    Post {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "")]
        caption: String,
        #[arg(long, default_value = "")]
        location: String,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// List shared posts, newest first
    Feed {
        /// Number of posts (defaults to feed.page_size)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a stock shutterpost.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Filters { strength } => {
            output::print_filters(imaging::filters(), strength);
        }
        Command::Preview(edit) => {
            let mut post = PendingPost::default();
            apply_edits(&mut post, &edit);
            output::print_preview(&post);
        }
        Command::Render {
            input,
            output: output_path,
            edit,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&config.processing);
            let post = load_post(&input, &edit)?;
            let backend = RustBackend::new();
            let params = post.raster_params(config.output.quality());
            let source = post.source().ok_or("no image selected")?;
            let rendered = imaging::render(&backend, &source.bytes, &params)?;
            std::fs::write(&output_path, &rendered.bytes)?;
            let dims = backend.identify(&rendered.bytes)?;
            output::print_render(&rendered, (dims.width, dims.height), &output_path);
        }
        Command::Share {
            input,
            edit,
            details,
            session,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&config.processing);
            let mut post = load_post(&input, &edit)?;
            let d = post.details_mut();
            d.caption = details.caption;
            d.location = details.location;
            d.alt_text = details.alt_text;
            d.hide_metrics = details.hide_metrics;
            d.disable_comments = details.disable_comments;
            d.share_to_threads = !details.no_threads;

            let (blobs, documents) = open_stores(&config, &cli.config_dir);
            let workflow = UploadWorkflow::new(RustBackend::new(), blobs, documents)
                .with_quality(config.output.quality());

            let outcome = workflow.share(&post, &session.snapshot());
            output::print_share(&outcome, &workflow.state());
            if !outcome.ok {
                std::process::exit(1);
            }
        }
        Command::Post {
            inputs,
            caption,
            location,
            session,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&config.processing);
            let sources = inputs
                .iter()
                .map(|path| SourceImage::from_path(path))
                .collect::<Result<Vec<_>, _>>()?;
            let mut post = DirectPost::default();
            post.select_files(sources)?;
            post.set_caption(caption);
            post.set_location(location);

            let (blobs, documents) = open_stores(&config, &cli.config_dir);
            let workflow = UploadWorkflow::new(RustBackend::new(), blobs, documents);

            let outcome = workflow.share_direct(&post, &session.snapshot());
            output::print_share(&outcome, &workflow.state());
            if !outcome.ok {
                std::process::exit(1);
            }
        }
        Command::Feed { limit } => {
            let config = config::load_config(&cli.config_dir)?;
            let documents = JsonDocumentStore::new(config.storage.document_root_in(&cli.config_dir));
            let posts = feed::recent_posts(&documents, limit.unwrap_or(config.feed.page_size))?;
            output::print_feed(&posts);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Apply edit flags to a post. Call after selecting the image: selection
/// resets every edit control.
fn apply_edits(post: &mut PendingPost, edit: &EditArgs) {
    post.select_filter(&edit.filter);
    post.set_filter_strength(edit.strength);
    for (adjustment, value) in &edit.adjustments {
        post.set_adjustment(*adjustment, *value);
    }
    post.set_zoom(edit.zoom);
}

/// Select an image from disk and apply edit flags.
fn load_post(input: &Path, edit: &EditArgs) -> Result<PendingPost, Box<dyn std::error::Error>> {
    let mut post = PendingPost::default();
    post.select_image(SourceImage::from_path(input)?)?;
    apply_edits(&mut post, edit);
    Ok(post)
}

/// Local stores rooted at the configured paths, relative to `config_dir`.
fn open_stores(config: &config::AppConfig, config_dir: &Path) -> (LocalBlobStore, JsonDocumentStore) {
    let blobs = LocalBlobStore::new(
        config.storage.blob_root_in(config_dir),
        config.storage.public_base_url.clone(),
    );
    let documents = JsonDocumentStore::new(config.storage.document_root_in(config_dir));
    (blobs, documents)
}

/// Install the stderr log subscriber. Warnings only unless `-v` is given.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
