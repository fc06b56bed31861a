#![forbid(unsafe_code)]

//! Command line front-end: fetches one entity (or two channels), prints a
//! short summary and optionally caches the fetched document.

use std::{cmp::Ordering, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, warn};
use tubemeta_tools::{
    cache::{CacheSink, DocumentStore, JsonFileSink, replay_directory},
    config::{self, RuntimeConfig},
    duration::format_duration,
    provider::{EntityKind, LookupRequest, MetadataProvider, YouTubeProvider},
    snapshot::{Channel, Playlist, PlaylistVideo, Video, video_url},
};

const STORE_FILE: &str = "documents.db";

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize YouTube channels, videos and playlists.")]
struct Cli {
    #[arg(
        long = "config",
        value_name = "PATH",
        help = "Read settings from this env file instead of /etc/tubemeta-env"
    )]
    config: Option<PathBuf>,
    #[arg(
        long = "store",
        help = "Cache documents in the SQLite store instead of JSON files"
    )]
    store: bool,
    #[arg(
        long = "replay",
        help = "Answer from cached documents instead of the API (honours --store)"
    )]
    replay: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a channel's title, link and statistics.
    Channel {
        id: String,
        #[arg(long = "save", value_name = "NAME")]
        save: Option<String>,
    },
    /// Show a video, or report that it does not exist.
    Video {
        id: String,
        #[arg(long = "save", value_name = "NAME")]
        save: Option<String>,
    },
    /// Show a video together with the playlist it belongs to.
    PlaylistVideo { video_id: String, playlist_id: String },
    /// Show a playlist and optionally its total length and most liked video.
    Playlist {
        id: String,
        #[arg(long = "duration", help = "Print the summed length of all entries")]
        duration: bool,
        #[arg(long = "best", help = "Print a link to the most liked entry")]
        best: bool,
        #[arg(long = "save", value_name = "NAME")]
        save: Option<String>,
    },
    /// Compare two channels by subscriber count.
    Compare { first: String, second: String },
    /// Print the raw provider document for an id.
    Dump { kind: DumpKind, id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DumpKind {
    Channel,
    Video,
    Playlist,
    PlaylistItems,
}

impl From<DumpKind> for EntityKind {
    fn from(kind: DumpKind) -> Self {
        match kind {
            DumpKind::Channel => EntityKind::Channel,
            DumpKind::Video => EntityKind::Video,
            DumpKind::Playlist => EntityKind::Playlist,
            DumpKind::PlaylistItems => EntityKind::PlaylistItems,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let runtime = match &cli.config {
        Some(path) => config::load_runtime_config_from(path),
        None => config::load_runtime_config(),
    }
    .context("loading configuration")?;
    debug!(
        "api {} cache {} page size {}",
        runtime.api_base_url,
        runtime.cache_dir.display(),
        runtime.page_size
    );

    if cli.replay {
        let provider = if cli.store {
            open_store(&runtime)?
                .replay()
                .context("replaying document store")?
        } else {
            replay_directory(&runtime.cache_dir).with_context(|| {
                format!("replaying documents in {}", runtime.cache_dir.display())
            })?
        };
        return run(cli, &runtime, &provider);
    }

    let api_key = runtime.require_api_key()?;
    let provider = YouTubeProvider::with_base_url(api_key, &runtime.api_base_url);
    run(cli, &runtime, &provider)
}

fn run(cli: Cli, runtime: &RuntimeConfig, provider: &dyn MetadataProvider) -> Result<()> {
    match cli.command {
        Command::Channel { id, save } => {
            let channel = Channel::fetch(provider, &id)
                .with_context(|| format!("fetching channel {id}"))?;
            println!("{channel}");
            println!("URL: {}", channel.url());
            println!("Description: {}", channel.description());
            println!("Subscribers: {}", channel.subscriber_count());
            println!("Videos: {}", channel.video_count());
            println!("Views: {}", channel.view_count());
            if let Some(name) = save {
                save_document(cli.store, runtime, &name, channel.document())?;
            }
        }
        Command::Video { id, save } => {
            let video =
                Video::fetch(provider, &id).with_context(|| format!("fetching video {id}"))?;
            println!("{video}");
            if video.is_found() {
                println!("URL: {}", video.url());
                println!("Views: {}", display_count(video.view_count()));
                println!("Likes: {}", display_count(video.like_count()));
            }
            if let Some(name) = save {
                save_video(cli.store, runtime, &name, &video)?;
            }
        }
        Command::PlaylistVideo {
            video_id,
            playlist_id,
        } => {
            let entry = PlaylistVideo::fetch(provider, &video_id, &playlist_id)
                .with_context(|| format!("fetching video {video_id} of playlist {playlist_id}"))?;
            println!("{entry}");
            println!("Likes: {}", display_count(entry.video().like_count()));
        }
        Command::Playlist {
            id,
            duration,
            best,
            save,
        } => {
            let playlist = Playlist::fetch_with_page_size(provider, &id, runtime.page_size)
                .with_context(|| format!("fetching playlist {id}"))?;
            println!("{playlist}");
            println!("URL: {}", playlist.url());
            println!("Entries: {}", playlist.video_ids().len());
            if duration {
                let total = playlist
                    .total_duration(provider)
                    .context("summing playlist durations")?;
                println!(
                    "Total duration: {} ({} seconds)",
                    format_duration(total),
                    total.num_seconds()
                );
            }
            if best {
                match playlist
                    .best_video(provider)
                    .context("selecting most liked video")?
                {
                    Some(video_id) => println!("Most liked: {}", video_url(&video_id)),
                    None => println!("Most liked: none"),
                }
            }
            if let Some(name) = save {
                save_document(cli.store, runtime, &name, playlist.document())?;
                save_document(
                    cli.store,
                    runtime,
                    &descriptor_name(&name),
                    playlist.descriptor_document(),
                )?;
            }
        }
        Command::Compare { first, second } => {
            let first = Channel::fetch(provider, &first)
                .with_context(|| format!("fetching channel {first}"))?;
            let second = Channel::fetch(provider, &second)
                .with_context(|| format!("fetching channel {second}"))?;
            let verdict = match first.compare_subscribers(&second) {
                Ordering::Greater => "more subscribers than",
                Ordering::Less => "fewer subscribers than",
                Ordering::Equal => "as many subscribers as",
            };
            println!("{} has {verdict} {}", first.title(), second.title());
            println!(
                "Combined subscribers: {}",
                first.combined_subscribers(&second)
            );
        }
        Command::Dump { kind, id } => {
            let parts: &[&'static str] = match kind {
                DumpKind::Channel | DumpKind::Video => &["snippet", "statistics"],
                DumpKind::Playlist => &["snippet", "contentDetails"],
                DumpKind::PlaylistItems => &["snippet", "contentDetails"],
            };
            let mut request = LookupRequest::single(kind.into(), &id, parts);
            if matches!(kind, DumpKind::PlaylistItems) {
                request = request.with_max_results(runtime.page_size);
            }
            let document = provider
                .lookup(&request)
                .with_context(|| format!("looking up {id}"))?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(())
}

fn open_store(runtime: &RuntimeConfig) -> Result<DocumentStore> {
    let path = runtime.cache_dir.join(STORE_FILE);
    DocumentStore::open(&path).with_context(|| format!("opening document store {}", path.display()))
}

/// Caches the video's document; a video that was not found has none, so
/// nothing is written. Returns whether a document was saved.
fn save_video(use_store: bool, runtime: &RuntimeConfig, name: &str, video: &Video) -> Result<bool> {
    match video.document() {
        Some(document) => {
            save_document(use_store, runtime, name, document)?;
            Ok(true)
        }
        None => {
            warn!("video {} not found; nothing cached as {name}", video.id());
            println!("Not saved: video not found");
            Ok(false)
        }
    }
}

/// Name under which a playlist's own document is cached next to its entries.
fn descriptor_name(name: &str) -> String {
    match name.strip_suffix(".json") {
        Some(stem) => format!("{stem}.playlist.json"),
        None => format!("{name}.playlist"),
    }
}

fn save_document(
    use_store: bool,
    runtime: &RuntimeConfig,
    name: &str,
    document: &serde_json::Value,
) -> Result<()> {
    let sink: Box<dyn CacheSink> = if use_store {
        Box::new(open_store(runtime)?)
    } else {
        Box::new(JsonFileSink::new(&runtime.cache_dir))
    };
    sink.write(name, document)
        .with_context(|| format!("caching document {name}"))?;
    println!("Saved {name}");
    Ok(())
}

fn display_count(value: Option<u64>) -> String {
    value.map_or_else(|| "hidden".to_string(), |count| count.to_string())
}
