mod commands;
mod core;
mod player;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use media_proto::api::{CommonsClient, MetadataApi};
use media_proto::catalog::{self, RecentCatalog};
use media_proto::config::Config;
use media_proto::fragment;
use media_proto::protocol::{MediaTitle, PlayerBackend, SourceMode};
use media_proto::resolver;
use media_proto::selector;
use media_proto::state::PlaybackState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

use crate::core::{PickerCore, PickerEvent, PickerUpdate};

#[derive(Parser)]
#[command(name = "media-picker", version, about = "Pick and play Commons media streams")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Resolve the file named by a fragment and show its streams
    Resolve {
        fragment: String,
        /// Print candidates as JSON
        #[arg(long)]
        json: bool,
    },
    /// Filter a catalog and list matching rows
    Catalog {
        #[arg(long)]
        source: Option<SourceMode>,
        filter: Option<String>,
    },
    /// Build a fragment from its parts
    Encode {
        #[arg(long)]
        title: String,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        mute: bool,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        player: Option<PlayerBackend>,
        #[arg(long)]
        source: Option<SourceMode>,
    },
    /// Interactive session driven by line commands on stdin
    Run { fragment: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = media_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("picker.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; otherwise debug for app code, HTTP client internals quiet.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("media-picker log: {}", log_path.display());
    tracing::info!("media-picker starting…");

    let config = Config::load().unwrap_or_default();

    match cli.command {
        Cmd::Resolve { fragment, json } => resolve(&config, &fragment, json).await,
        Cmd::Catalog { source, filter } => {
            let mode = source.unwrap_or(config.playback.default_source);
            list_catalog(&config, mode, filter.as_deref().unwrap_or_default()).await
        }
        Cmd::Encode {
            title,
            search,
            mute,
            size,
            player,
            source,
        } => {
            let mut state = PlaybackState {
                preferred_key: config.playback.default_preferred_key().to_string(),
                ..Default::default()
            };
            state.pick_title(MediaTitle::from_file_name(
                title.strip_prefix("File:").unwrap_or(&title),
            ));
            state.set_filter_text(search.unwrap_or_default());
            state.set_muted(mute);
            if let Some(key) = size {
                state.set_preferred_key(key);
            }
            state.set_player_backend(player.unwrap_or(config.playback.default_player));
            state.set_source_mode(source.unwrap_or(config.playback.default_source));
            println!("#{}", fragment::encode(&state));
            Ok(())
        }
        Cmd::Run { fragment } => run(config, fragment).await,
    }
}

async fn resolve(config: &Config, fragment_text: &str, json: bool) -> anyhow::Result<()> {
    let client = CommonsClient::new(&config.api)?;
    let playback = &config.playback;
    let state = fragment::decode(fragment_text)
        .into_state(&playback.default_title(), playback.default_preferred_key());

    let res = resolver::resolve(&client, &state.selected_title, state.source_mode).await?;
    let selection = selector::select(
        &res.candidates,
        &state.preferred_key,
        playback.fallback_policy,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&res.candidates)?);
        return Ok(());
    }

    println!("{} ({})", res.title.pretty(), res.info.media_type);
    if let Some(d) = res.info.duration {
        println!("duration: {:.1}s", d);
    }
    for c in &res.candidates {
        let marker = if c.key == selection.candidate.key { '*' } else { ' ' };
        let size = c
            .size
            .map(|s| format!("{:.1} MB", s as f64 / 1_000_000.0))
            .unwrap_or_else(|| "?".to_string());
        let rate = c
            .bitrate
            .map(|b| format!("{:.0} kbps", b / 1000.0))
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{} {:<12} {:>4}x{:<4} {:>10} {:>10}  {}",
            marker, c.key, c.width, c.height, size, rate, c.url
        );
    }
    if selection.degraded {
        println!("({} unavailable, using {})", state.preferred_key, selection.candidate.key);
    }
    Ok(())
}

async fn list_catalog(config: &Config, mode: SourceMode, filter_text: &str) -> anyhow::Result<()> {
    let client = CommonsClient::new(&config.api)?;
    let recent = if mode == SourceMode::Motd {
        catalog::fetch_recent(&client, chrono::Local::now().date_naive()).await?
    } else {
        RecentCatalog::default()
    };

    let entries = catalog::filter_entries(mode, filter_text, &recent, config.filter.recent_limit);
    let items = catalog::fetch_items(&client, &entries, &config.display).await?;
    print_items(&items);
    Ok(())
}

fn print_items(items: &[media_proto::protocol::MediaItem]) {
    if items.is_empty() {
        println!("No matches");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        match &item.description {
            Some(desc) => println!("{:>3}  {}  [{}] {}", i, item.title.pretty(), item.format_label, desc),
            None => println!("{:>3}  {}  [{}]", i, item.title.pretty(), item.format_label),
        }
    }
}

async fn run(config: Config, initial_fragment: Option<String>) -> anyhow::Result<()> {
    let api: Arc<dyn MetadataApi> = Arc::new(CommonsClient::new(&config.api)?);

    // ── PickerUpdate channel (core → stdout) ────────────────────────────────
    let (update_tx, mut update_rx) = broadcast::channel::<PickerUpdate>(256);

    // ── PickerEvent channel (stdin → core) ──────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<PickerEvent>(1024);

    let core = PickerCore::new(
        config,
        api,
        Box::new(player::MpvFactory),
        initial_fragment.as_deref(),
        event_tx.clone(),
        update_tx,
    );
    let core_handle = tokio::spawn(core.run(event_rx));

    tokio::spawn(async move {
        loop {
            match update_rx.recv().await {
                Ok(update) => print_update(&update),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("printer lagged by {} updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match commands::parse_line(&line) {
            Ok(Some(cmd)) => {
                let quit = cmd == commands::LineCommand::Quit;
                if event_tx.send(PickerEvent::Command(cmd)).await.is_err() || quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
    }
    let _ = event_tx.send(PickerEvent::Shutdown).await;

    core_handle.await?
}

fn print_update(update: &PickerUpdate) {
    match update {
        PickerUpdate::Fragment(f) => println!("#{}", f),
        PickerUpdate::Items(items) => print_items(items),
        PickerUpdate::Sources {
            title,
            keys,
            selected,
            degraded,
        } => {
            let note = if *degraded { " (fallback)" } else { "" };
            println!("{}: {} -> {}{}", title.pretty(), keys.join(" "), selected, note);
        }
        PickerUpdate::Playing { title, key, url } => {
            println!("ready: {} [{}] {}", title.pretty(), key, url)
        }
        PickerUpdate::Error(e) => eprintln!("error: {}", e),
    }
}
