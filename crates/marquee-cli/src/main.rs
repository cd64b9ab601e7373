use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use marquee_core::config_file;
use marquee_core::{
    Command as StoreCommand, Config, Credentials, FilterOption, JsonAnnotationStore, LayoutMode,
    LoadStatus, MovieId, Settings, SortOption, StateStore, TmdbCatalog,
};
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

/// Marquee - browse the now-playing movie catalog and keep your likes and photos
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// TMDB API key (sent as the api_key query parameter)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// TMDB read access token (sent as a bearer Authorization header)
    #[arg(long, global = true)]
    bearer_token: Option<String>,

    /// Path to the annotations file (liked ids and photo references)
    #[arg(long, global = true)]
    annotations: Option<PathBuf>,

    /// Comma-separated list of pages to fetch
    #[arg(long, global = true, value_delimiter = ',')]
    pages: Vec<u32>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the catalog and print the visible list
    List {
        /// Sort by: title, release-date or rating
        #[arg(long)]
        sort: Option<SortOption>,

        /// Filter: all or liked
        #[arg(long)]
        filter: Option<FilterOption>,

        /// Layout: list or grid
        #[arg(long)]
        layout: Option<LayoutMode>,

        /// Remember the resulting sort, filter and layout in the user config file
        #[arg(long)]
        save: bool,
    },

    /// Fetch the catalog and print details for one movie
    Show {
        /// TMDB movie id
        id: MovieId,
    },

    /// Toggle the liked flag of a movie
    Like {
        /// TMDB movie id
        id: MovieId,
    },

    /// Attach a photo reference to a movie in the current catalog
    Photo {
        /// TMDB movie id
        id: MovieId,
        /// Opaque URI of the photo
        uri: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let config = resolve_config(&cli.global);
    tracing::debug!(?config, "resolved configuration");

    let color = ColorMode(!cli.global.no_color);
    let mut out = std::io::stdout();

    let source = Arc::new(TmdbCatalog::from_config(&config)?);
    let annotations = Arc::new(JsonAnnotationStore::at_or_default(
        config.annotations_path.as_deref(),
    )?);
    tracing::debug!(path = %annotations.path().display(), "annotation store");
    let mut store = StateStore::open(&config, source, annotations).await?;

    let result = run(&mut store, cli.command, &config, &mut out, color).await;
    store.shutdown().await;
    result
}

async fn run(
    store: &mut StateStore,
    command: Command,
    config: &Config,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    match command {
        Command::List {
            sort,
            filter,
            layout,
            save,
        } => {
            if let Some(sort) = sort {
                store.update(StoreCommand::ChangeSort(sort));
            }
            if let Some(filter) = filter
                && filter != store.state().settings.filter
            {
                store.update(StoreCommand::ToggleFilter);
            }
            if let Some(layout) = layout
                && layout != store.state().settings.layout
            {
                store.update(StoreCommand::ToggleLayout);
            }
            if save {
                let path = save_display(store.state().settings)?;
                tracing::info!(path = %path.display(), "saved display settings");
            }
            load(store, config).await;
            output::print_state(out, store.state(), color)?;
        }
        Command::Show { id } => {
            load(store, config).await;
            store.update(StoreCommand::Select(id));
            match store.selected_movie() {
                Some(movie) => output::print_detail(out, movie, color)?,
                None => {
                    output::print_status(out, store.status(), color)?;
                    anyhow::bail!("Movie {} is not in the loaded catalog", id);
                }
            }
        }
        Command::Like { id } => {
            store.update(StoreCommand::ToggleLike(id));
            let liked = store.state().liked_ids.contains(&id);
            writeln!(
                out,
                "{} movie {}",
                if liked { "Liked" } else { "Unliked" },
                id
            )?;
        }
        Command::Photo { id, uri } => {
            load(store, config).await;
            if let LoadStatus::Error(_) = store.status() {
                output::print_status(out, store.status(), color)?;
                anyhow::bail!("Catalog could not be loaded; photo not attached");
            }
            if !store.state().raw_catalog.iter().any(|r| r.id == id) {
                anyhow::bail!("Movie {} is not in the loaded catalog", id);
            }
            store.update(StoreCommand::AttachPhoto {
                id,
                uri: uri.clone(),
            });
            writeln!(out, "Attached {} to movie {}", uri, id)?;
        }
    }
    Ok(())
}

/// Refresh the configured pages and wait for the result.
async fn load(store: &mut StateStore, config: &Config) {
    store.update(StoreCommand::Refresh(config.pages.clone()));
    store.settle().await;
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(args: &GlobalArgs) -> Config {
    let mut config = config_file::resolve(&config_file::load_config());

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("TMDB_API_KEY").ok())
        .or(config.credentials.api_key.take());
    let bearer_token = args
        .bearer_token
        .clone()
        .or_else(|| std::env::var("TMDB_BEARER_TOKEN").ok())
        .or(config.credentials.bearer_token.take());
    config.credentials = Credentials::new(api_key, bearer_token);

    if !args.pages.is_empty() {
        config.pages = args.pages.clone();
    }
    if let Some(path) = &args.annotations {
        config.annotations_path = Some(path.clone());
    }
    if let Some(secs) = std::env::var("TMDB_TIMEOUT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&s| s > 0)
    {
        config.timeout_secs = secs;
    }
    config
}

/// Write display settings into the platform config, keeping its other sections.
fn save_display(settings: Settings) -> anyhow::Result<PathBuf> {
    let mut file = config_file::config_path()
        .and_then(|p| config_file::load_from_path(&p))
        .unwrap_or_default();
    file.display = Some(config_file::DisplayConfig {
        layout: Some(settings.layout),
        sort: Some(settings.sort),
        filter: Some(settings.filter),
    });
    config_file::save_config(&file).map_err(anyhow::Error::msg)
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "marquee=debug,marquee_core=debug"
    } else {
        "marquee=info,marquee_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
