//! `trickplay` command-line entry point.
//!
//! Drives the resolver, geometry and preference store against live pages
//! without a browser host.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};
use trickplay_hover::config::{self, AppConfig};
use trickplay_hover::fetch::{FetchRequest, HttpFetcher, PageFetcher, serve_fetch_request};
use trickplay_hover::geometry;
use trickplay_hover::headless::HeadlessPage;
use trickplay_hover::image_probe::{HttpImageProbe, probe_sheet_size};
use trickplay_hover::listing::scan_listing;
use trickplay_hover::preferences::{Preferences, load_preferences, save_preferences};
use trickplay_hover::scheduler::IntervalScheduler;
use trickplay_hover::timecode::format_time;
use trickplay_hover::{
    EventRouter, HoverController, PointerEvent, ProviderRegistry, RouteEffect, SpriteResolver,
};
use url::Url;

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

#[derive(Parser, Debug)]
#[command(name = "trickplay", version, about = "Sprite-sheet hover previews for video listings")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the ranked sprite candidates of a detail page.
    Resolve { url: String },
    /// Resolve every item of a listing page.
    Scan { url: String },
    /// Print overlay placement for each candidate at a scrub position.
    Layout {
        url: String,
        #[arg(long, default_value_t = 320.0)]
        width: f64,
        #[arg(long, default_value_t = 180.0)]
        height: f64,
        #[arg(long, default_value_t = 0.0)]
        progress: f64,
    },
    /// Hover a single item headlessly and print the overlay mutations.
    Hover {
        url: String,
        #[arg(long, default_value_t = 320.0)]
        width: f64,
        #[arg(long, default_value_t = 180.0)]
        height: f64,
        /// Duration badge text, e.g. `12:34`.
        #[arg(long)]
        duration: Option<String>,
        /// Scrub positions in `[0, 1]`, visited in order.
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 0.5, 1.0])]
        positions: Vec<f64>,
    },
    /// List the supported embed providers in match order.
    Providers,
    /// Answer a fetch message the way the background proxy does.
    Fetch { url: String },
    /// Show or change stored preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    Show,
    SetMaxFrames { value: u32 },
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        config = %cli.config.display(),
        level = %config.log_level,
        "Starting trickplay"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(dispatch(cli.command, config))
}

async fn dispatch(command: Command, config: AppConfig) -> Result<()> {
    match command {
        Command::Resolve { url } => {
            let (resolver, _) = build_resolver(&config)?;
            let candidates = resolver.resolve(&url).await;
            print_json(&*candidates)
        }
        Command::Scan { url } => scan(&config, &url).await,
        Command::Layout {
            url,
            width,
            height,
            progress,
        } => layout(&config, &url, width, height, progress).await,
        Command::Hover {
            url,
            width,
            height,
            duration,
            positions,
        } => hover(&config, &url, width, height, duration, &positions).await,
        Command::Providers => {
            let names: Vec<_> = ProviderRegistry::builtin().names().collect();
            print_json(&names)
        }
        Command::Fetch { url } => {
            let fetcher = HttpFetcher::new(&config)?;
            let reply = serve_fetch_request(&fetcher, FetchRequest::Fetch { url }).await;
            print_json(&reply)
        }
        Command::Prefs { action } => prefs(&config, action),
    }
}

fn build_resolver(config: &AppConfig) -> Result<(SpriteResolver, Arc<HttpFetcher>)> {
    let fetcher = Arc::new(HttpFetcher::new(config)?);
    let resolver = SpriteResolver::new(fetcher.clone(), ProviderRegistry::builtin());
    Ok((resolver, fetcher))
}

async fn scan(config: &AppConfig, listing_url: &str) -> Result<()> {
    let base = Url::parse(listing_url).with_context(|| format!("Invalid URL {listing_url}"))?;
    let (resolver, fetcher) = build_resolver(config)?;
    let html = fetcher
        .fetch_page(listing_url)
        .await
        .map_err(|err| anyhow!("Failed to fetch listing {listing_url}: {err}"))?;

    let entries = scan_listing(&html, &base);
    info!(items = entries.len(), "Scanned listing");
    let mut report = Vec::with_capacity(entries.len());
    for entry in entries {
        let candidates = resolver.resolve(&entry.detail_url).await;
        report.push(json!({
            "detailUrl": entry.detail_url,
            "duration": format_time(entry.duration_secs),
            "thumbnail": entry.thumbnail_src,
            "providers": candidates.iter().map(|c| c.provider.as_str()).collect::<Vec<_>>(),
        }));
    }
    print_json(&report)
}

async fn layout(
    config: &AppConfig,
    detail_url: &str,
    width: f64,
    height: f64,
    progress: f64,
) -> Result<()> {
    let (resolver, fetcher) = build_resolver(config)?;
    let probe = HttpImageProbe::new(fetcher.client().clone());
    let candidates = resolver.resolve(detail_url).await;
    if candidates.is_empty() {
        warn!(%detail_url, "No sprite candidates");
    }

    let mut report = Vec::with_capacity(candidates.len());
    for candidate in candidates.iter() {
        let sheet = probe_sheet_size(&probe, candidate).await;
        let layer = match sheet {
            Some(sheet) => geometry::frame_rect(
                width,
                height,
                candidate.cols,
                candidate.rows,
                sheet.width,
                sheet.height,
            ),
            None => geometry::FrameRect::fill(width, height),
        };
        let cell = geometry::frame_for_progress(
            progress,
            candidate.cols,
            candidate.rows,
            candidate.frame_count,
        );
        report.push(json!({
            "provider": candidate.provider,
            "spriteUrl": candidate.sprite_url,
            "sheet": sheet,
            "layer": layer,
            "cell": cell,
            "backgroundSize": geometry::background_size_percent(candidate.cols, candidate.rows),
            "backgroundPosition": geometry::background_position_percent(cell, candidate.cols, candidate.rows),
        }));
    }
    print_json(&report)
}

async fn hover(
    config: &AppConfig,
    detail_url: &str,
    width: f64,
    height: f64,
    duration: Option<String>,
    positions: &[f64],
) -> Result<()> {
    let page = Arc::new(HeadlessPage::new(detail_url, width, height, duration)?);
    let (resolver, fetcher) = build_resolver(config)?;
    let probe = Arc::new(HttpImageProbe::new(fetcher.client().clone()));
    let scheduler = Arc::new(IntervalScheduler::new(config.frame_interval()));
    let controller = HoverController::new(page.clone(), Arc::new(resolver), probe, scheduler);
    let router = EventRouter::new(controller.clone(), page.clone());

    if let RouteEffect::SessionStarted(task) = router.handle(PointerEvent::Over {
        target: HeadlessPage::THUMBNAIL,
    }) {
        let outcome = task.await.context("Hover session task failed")?;
        info!(?outcome, phase = ?controller.phase(), "Hover settled");
    }
    for &progress in positions {
        router.handle(PointerEvent::Move {
            client_x: progress.clamp(0.0, 1.0) * width,
        });
        // Give the scheduled frame time to paint before the next move replaces it.
        tokio::time::sleep(config.frame_interval() * 2).await;
    }
    router.handle(PointerEvent::Out {
        target: HeadlessPage::ITEM,
        related: None,
    });
    print_json(&page.events())
}

fn prefs(config: &AppConfig, action: PrefsAction) -> Result<()> {
    let path = config.preferences_path();
    match action {
        PrefsAction::Show => print_json(&load_preferences(&path)),
        PrefsAction::SetMaxFrames { value } => {
            let prefs = Preferences::with_max_frames(value)?;
            save_preferences(&path, &prefs)?;
            info!(path = %path.display(), max_frames = value, "Updated preferences");
            print_json(&prefs)
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode JSON output")?;
    println!("{text}");
    Ok(())
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
