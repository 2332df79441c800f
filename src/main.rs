//! Entry point for the timeline narrator.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml` or `--config`.
//! - Build narration tracks from a timeline JSON file.
//! - Run the narration engine until the last track ends or Ctrl-C arrives.

use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use timeline_narrator::config::{AppConfig, load_config, serialize_config};
use timeline_narrator::gateway::{HttpSpeechGateway, SpeechGateway};
use timeline_narrator::media::{MediaPrimitive, SimulatedMedia};
use timeline_narrator::player::{
    Command, ControllerOptions, EngineHandle, NarrationEngine, PlaybackController, PlaybackStore,
    Transport,
};
use timeline_narrator::resource::BlobStore;
use timeline_narrator::scroll::{LoggingScroll, RecordingScroll, ScrollSynchronizer};
use timeline_narrator::timeline::{build_tracks, load_timeline};
use timeline_narrator::track::Track;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const DEFAULT_CONFIG_PATH: &str = "conf/config.toml";
const USAGE: &str =
    "Usage: timeline-narrator <timeline.json> [--config <path>] [--print-config] [--trace-scroll]";

struct CliArgs {
    timeline: Option<PathBuf>,
    config: PathBuf,
    print_config: bool,
    trace_scroll: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(&args.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    if args.print_config {
        print!("{}", serialize_config(&config)?);
        return Ok(());
    }

    let timeline_path = args.timeline.ok_or_else(|| anyhow!(USAGE))?;
    if !timeline_path.exists() {
        return Err(anyhow!("File not found: {}", timeline_path.display()));
    }
    let timeline = load_timeline(&timeline_path)?;
    let tracks = build_tracks(&timeline);
    info!(
        path = %timeline_path.display(),
        title = %timeline.title,
        tracks = tracks.len(),
        level = %config.log_level,
        "Starting timeline narration"
    );
    info!(
        endpoint = %config.tts_endpoint,
        advance_delay_ms = config.advance_delay_ms,
        auto_advance = config.auto_advance,
        auto_scroll = config.auto_scroll,
        "Active playback configuration"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?;
    runtime.block_on(narrate(config, tracks, args.trace_scroll))
}

async fn narrate(config: AppConfig, tracks: Vec<Track>, trace_scroll: bool) -> Result<()> {
    let blobs = BlobStore::new();
    let gateway: Arc<dyn SpeechGateway> =
        Arc::new(HttpSpeechGateway::new(&config, blobs.clone())?);
    let store = PlaybackStore::new(config.volume, config.start_muted);
    let recorder = trace_scroll.then(|| RecordingScroll::with_known_anchors(anchors(&tracks)));
    let scroll: Box<dyn ScrollSynchronizer> = match &recorder {
        Some(recorder) => Box::new(recorder.clone()),
        None => Box::new(LoggingScroll),
    };
    let controller = PlaybackController::new(
        store,
        open_media(&blobs),
        blobs.clone(),
        scroll,
        ControllerOptions::from(&config),
    );
    let (engine, handle) = NarrationEngine::new(controller, gateway, config.tick_interval());

    let interrupt = handle.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted; stopping narration");
        let _ = interrupt.send(Command::Shutdown);
    })
    .context("Failed to install Ctrl-C handler")?;

    handle.send(Command::LoadTracklist {
        tracks,
        start_index: 0,
    })?;
    handle.send(Command::Play)?;

    let (engine_result, report_result) = tokio::join!(engine.run(), report_until_done(handle));
    engine_result?;
    if let Some(recorder) = recorder {
        for request in recorder.requests() {
            info!(
                anchor = %request.anchor_id,
                parent = request.parent_anchor_id.as_deref().unwrap_or("-"),
                "Scroll request"
            );
        }
    }
    report_result?;
    if blobs.live_count() > 0 {
        warn!(live = blobs.live_count(), "Audio resources still registered at exit");
    }
    Ok(())
}

fn anchors(tracks: &[Track]) -> Vec<String> {
    tracks
        .iter()
        .flat_map(|track| [Some(track.anchor_id.clone()), track.parent_anchor_id.clone()])
        .flatten()
        .collect()
}

#[cfg(feature = "audio-output")]
fn open_media(blobs: &BlobStore) -> Box<dyn MediaPrimitive> {
    match timeline_narrator::media::RodioMedia::new(blobs.clone()) {
        Ok(media) => Box::new(media),
        Err(err) => {
            warn!("Audio output unavailable, narrating silently: {err}");
            Box::new(SimulatedMedia::new(blobs.clone()))
        }
    }
}

#[cfg(not(feature = "audio-output"))]
fn open_media(blobs: &BlobStore) -> Box<dyn MediaPrimitive> {
    info!("Built without audio output; using the simulated media clock");
    Box::new(SimulatedMedia::new(blobs.clone()))
}

/// Log track and transport changes; stop the engine once narration is over.
/// Without a UI there is no one to retry a failed track, so errors end the run.
async fn report_until_done(handle: EngineHandle) -> Result<()> {
    let mut views = handle.subscribe();
    let mut last = None;
    loop {
        let view = views.borrow_and_update().clone();
        let key = (view.track_index, view.transport);
        if last != Some(key) {
            last = Some(key);
            info!(
                track = view.current_track.as_ref().map_or("-", |track| track.id.as_str()),
                index = ?view.track_index,
                count = view.track_count,
                transport = %view.transport,
                "Narration state"
            );
        }
        if view.finished {
            info!("Narration complete");
            let _ = handle.send(Command::Shutdown);
            return Ok(());
        }
        if view.transport == Transport::Error {
            let message = view.error.unwrap_or_else(|| "unknown failure".to_string());
            let _ = handle.send(Command::Shutdown);
            return Err(anyhow!(message));
        }
        if views.changed().await.is_err() {
            return Ok(());
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        timeline: None,
        config: PathBuf::from(DEFAULT_CONFIG_PATH),
        print_config: false,
        trace_scroll: false,
    };
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                parsed.config = PathBuf::from(path);
            }
            "--print-config" => parsed.print_config = true,
            "--trace-scroll" => parsed.trace_scroll = true,
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            other if other.starts_with("--") => {
                return Err(anyhow!("Unknown option {other}\n{USAGE}"));
            }
            _ if parsed.timeline.is_none() => parsed.timeline = Some(PathBuf::from(&arg)),
            _ => return Err(anyhow!("Unexpected argument {arg}\n{USAGE}")),
        }
    }
    Ok(parsed)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_timeline_and_flags() {
        let parsed =
            parse_args(args(&["story.json", "--config", "alt.toml", "--print-config"])).unwrap();
        assert!(!parsed.trace_scroll);
        assert_eq!(parsed.timeline, Some(PathBuf::from("story.json")));
        assert_eq!(parsed.config, PathBuf::from("alt.toml"));
        assert!(parsed.print_config);

        let defaults = parse_args(args(&[])).unwrap();
        assert_eq!(defaults.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(defaults.timeline.is_none());
        assert!(parse_args(args(&["--trace-scroll", "x.json"])).unwrap().trace_scroll);
    }

    #[test]
    fn rejects_unknown_and_extra_arguments() {
        assert!(parse_args(args(&["--volume"])).is_err());
        assert!(parse_args(args(&["a.json", "b.json"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
    }
}
