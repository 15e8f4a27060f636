/// PickerCore: single-owner event loop for the picker session.
///
/// The core owns `PlaybackState`, the playback session and the filter state.
/// Network work (resolution, thumbnail lookups, the recency catalog) runs in
/// spawned tasks that report back as `PickerEvent`s tagged with the
/// generation ticket they were issued under; results whose ticket is no
/// longer current are dropped. Visible changes go out as `PickerUpdate`s on a
/// broadcast channel.
use std::sync::Arc;

use media_proto::api::MetadataApi;
use media_proto::catalog::{self, RecentCatalog};
use media_proto::config::Config;
use media_proto::filter::{Debouncer, Generation, Ticket};
use media_proto::fragment;
use media_proto::protocol::{MediaItem, MediaTitle, SourceMode};
use media_proto::resolver::{self, Resolution};
use media_proto::selector;
use media_proto::session::{PlaybackSession, PlayerFactory};
use media_proto::state::PlaybackState;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::commands::LineCommand;

// ── Events ────────────────────────────────────────────────────────────────────

/// All inputs into the PickerCore loop.
#[derive(Debug)]
pub enum PickerEvent {
    /// A line command from the user.
    Command(LineCommand),
    ResolutionDone {
        ticket: Ticket,
        result: media_proto::Result<Resolution>,
    },
    ItemsFetched {
        ticket: Ticket,
        result: media_proto::Result<Vec<MediaItem>>,
    },
    RecentLoaded(media_proto::Result<RecentCatalog>),
    Shutdown,
}

/// What the core broadcasts to whoever renders the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerUpdate {
    /// The shareable fragment for the current state.
    Fragment(String),
    /// Picker rows after a filter run. Empty means "No matches".
    Items(Vec<MediaItem>),
    /// Keys the resolved title offers, and the one in use.
    Sources {
        title: MediaTitle,
        keys: Vec<String>,
        selected: String,
        degraded: bool,
    },
    Playing {
        title: MediaTitle,
        key: String,
        url: String,
    },
    Error(String),
}

// ── PickerCore ────────────────────────────────────────────────────────────────

pub struct PickerCore {
    config: Config,
    api: Arc<dyn MetadataApi>,
    factory: Box<dyn PlayerFactory + Send>,
    state: PlaybackState,
    /// `audio=0` from the last fragment.
    skip_audio: bool,
    session: PlaybackSession,
    debouncer: Debouncer,
    filters: Generation,
    recent: RecentCatalog,
    recent_loading: bool,
    /// Rows from the last applied filter run; `pick N` indexes into these.
    items: Vec<MediaItem>,
    event_tx: mpsc::Sender<PickerEvent>,
    update_tx: broadcast::Sender<PickerUpdate>,
}

impl PickerCore {
    pub fn new(
        config: Config,
        api: Arc<dyn MetadataApi>,
        factory: Box<dyn PlayerFactory + Send>,
        initial_fragment: Option<&str>,
        event_tx: mpsc::Sender<PickerEvent>,
        update_tx: broadcast::Sender<PickerUpdate>,
    ) -> Self {
        let playback = &config.playback;
        let decoded = match initial_fragment {
            Some(f) => fragment::decode(f),
            None => fragment::DecodedFragment {
                player_backend: playback.default_player,
                source_mode: playback.default_source,
                ..Default::default()
            },
        };
        let skip_audio = decoded.skip_audio;
        let state = decoded.into_state(&playback.default_title(), playback.default_preferred_key());
        let debouncer = Debouncer::new(Duration::from_millis(config.filter.debounce_ms));

        Self {
            config,
            api,
            factory,
            state,
            skip_audio,
            session: PlaybackSession::new(),
            debouncer,
            filters: Generation::default(),
            recent: RecentCatalog::default(),
            recent_loading: false,
            items: Vec::new(),
            event_tx,
            update_tx,
        }
    }

    /// Run the core event loop. Returns on `Shutdown`, `quit`, or when the
    /// event channel closes.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PickerEvent>) -> anyhow::Result<()> {
        info!("PickerCore: starting event loop");

        self.publish_fragment();
        self.ensure_recent();
        self.refilter_now();
        self.load_media();

        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                evt = event_rx.recv() => match evt {
                    None => {
                        info!("PickerCore: event channel closed, shutting down");
                        break;
                    }
                    Some(PickerEvent::Shutdown) | Some(PickerEvent::Command(LineCommand::Quit)) => {
                        info!("PickerCore: shutdown requested");
                        break;
                    }
                    Some(evt) => self.handle_event(evt),
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(text) = self.debouncer.poll(Instant::now()) {
                        self.run_filter(text);
                    }
                }
            }
        }

        self.session.shutdown();
        Ok(())
    }

    fn handle_event(&mut self, evt: PickerEvent) {
        match evt {
            PickerEvent::Command(cmd) => {
                debug!("PickerCore: command {:?}", cmd);
                if let Err(e) = self.handle_command(cmd) {
                    error!("PickerCore: command error: {}", e);
                    self.publish(PickerUpdate::Error(e.to_string()));
                }
            }
            PickerEvent::ResolutionDone { ticket, result } => self.apply_resolution(ticket, result),
            PickerEvent::ItemsFetched { ticket, result } => self.apply_items(ticket, result),
            PickerEvent::RecentLoaded(result) => {
                self.recent_loading = false;
                match result {
                    Ok(recent) => {
                        self.recent = recent;
                        if self.state.source_mode == SourceMode::Motd {
                            self.debouncer.invalidate();
                            self.refilter_now();
                        }
                    }
                    Err(e) => {
                        warn!("PickerCore: media of the day list failed: {}", e);
                        self.publish(PickerUpdate::Error(e.to_string()));
                    }
                }
            }
            PickerEvent::Shutdown => {}
        }
    }

    fn handle_command(&mut self, cmd: LineCommand) -> anyhow::Result<()> {
        match cmd {
            LineCommand::FilterEdit(text) => {
                self.state.set_filter_text(text.clone());
                self.debouncer.edit(text, Instant::now());
            }
            LineCommand::FilterSubmit => self.refilter_now(),
            LineCommand::Navigate(f) => self.navigate(&f),
            LineCommand::Size(key) => {
                self.state.set_preferred_key(key);
                self.publish_fragment();
                self.load_media();
            }
            LineCommand::Player(backend) => {
                self.state.set_player_backend(backend);
                self.publish_fragment();
                self.load_media();
            }
            LineCommand::Source(mode) => {
                self.state.set_source_mode(mode);
                self.publish_fragment();
                self.catalog_changed();
                self.load_media();
            }
            LineCommand::ToggleMute => {
                let muted = !self.state.muted;
                self.state.set_muted(muted);
                self.session.set_muted(muted);
                self.publish_fragment();
            }
            LineCommand::Pick(n) => {
                let title = self
                    .items
                    .get(n)
                    .map(|item| item.title.clone())
                    .ok_or_else(|| anyhow::anyhow!("no item {} in the list", n))?;
                self.session.stop(&mut self.state);
                self.state.pick_title(title);
                self.publish_fragment();
                self.load_media();
            }
            LineCommand::Play => self.session.play()?,
            LineCommand::TogglePause => self.session.toggle_pause()?,
            LineCommand::Quit => {}
        }
        Ok(())
    }

    /// Apply a fragment as if the URL hash changed. Only a change of title,
    /// preferred key or backend restarts playback, and a restart begins at
    /// zero without autoplay.
    fn navigate(&mut self, fragment_text: &str) {
        let decoded = fragment::decode(fragment_text);
        self.skip_audio = decoded.skip_audio;
        let playback = &self.config.playback;
        let next = decoded.into_state(&playback.default_title(), playback.default_preferred_key());
        let restart = self.state.needs_restart(&next);

        if restart {
            self.session.stop(&mut self.state);
            self.state.reset_playhead();
        }
        if next.selected_title != self.state.selected_title {
            self.state.pick_title(next.selected_title.clone());
        }
        if next.preferred_key != self.state.preferred_key {
            self.state.set_preferred_key(next.preferred_key.clone());
        }
        if next.player_backend != self.state.player_backend {
            self.state.set_player_backend(next.player_backend);
        }
        if next.muted != self.state.muted {
            self.state.set_muted(next.muted);
            self.session.set_muted(next.muted);
        }

        let mode_changed = next.source_mode != self.state.source_mode;
        let filter_changed = next.filter_text != self.state.filter_text;
        if mode_changed {
            self.state.set_source_mode(next.source_mode);
        }
        if filter_changed {
            self.state.set_filter_text(next.filter_text);
        }
        if mode_changed {
            self.catalog_changed();
        } else if filter_changed {
            self.refilter_now();
        }

        if restart {
            self.load_media();
        }
    }

    // ── Catalog filtering ─────────────────────────────────────────────────────

    fn catalog_changed(&mut self) {
        self.ensure_recent();
        self.debouncer.invalidate();
        self.refilter_now();
    }

    fn ensure_recent(&mut self) {
        if self.state.source_mode != SourceMode::Motd
            || !self.recent.is_empty()
            || self.recent_loading
        {
            return;
        }
        self.recent_loading = true;

        let api = Arc::clone(&self.api);
        let tx = self.event_tx.clone();
        let today = chrono::Local::now().date_naive();
        tokio::spawn(async move {
            let result = catalog::fetch_recent(&*api, today).await;
            let _ = tx.send(PickerEvent::RecentLoaded(result)).await;
        });
    }

    fn refilter_now(&mut self) {
        if let Some(text) = self.debouncer.submit(self.state.filter_text.clone()) {
            self.run_filter(text);
        }
    }

    fn run_filter(&mut self, text: String) {
        let entries = catalog::filter_entries(
            self.state.source_mode,
            &text,
            &self.recent,
            self.config.filter.recent_limit,
        );
        let ticket = self.filters.issue();
        debug!(
            "PickerCore: filter {:?} in {} -> {} entries",
            text,
            self.state.source_mode,
            entries.len()
        );
        self.publish_fragment();

        let api = Arc::clone(&self.api);
        let display = self.config.display.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = catalog::fetch_items(&*api, &entries, &display).await;
            let _ = tx.send(PickerEvent::ItemsFetched { ticket, result }).await;
        });
    }

    fn apply_items(&mut self, ticket: Ticket, result: media_proto::Result<Vec<MediaItem>>) {
        if !self.filters.is_current(ticket) {
            debug!("PickerCore: dropping stale filter result {:?}", ticket);
            return;
        }
        match result {
            Ok(items) => {
                self.items = items.clone();
                self.publish(PickerUpdate::Items(items));
            }
            Err(e) => {
                warn!("PickerCore: thumbnail lookup failed: {}", e);
                self.publish(PickerUpdate::Error(e.to_string()));
            }
        }
    }

    // ── Resolution and playback ───────────────────────────────────────────────

    fn load_media(&mut self) {
        self.session.stop(&mut self.state);
        let ticket = self.session.begin_resolution();
        let title = self.state.selected_title.clone();
        let mode = self.state.source_mode;
        info!("PickerCore: resolving {} ({})", title, mode);

        let api = Arc::clone(&self.api);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = resolver::resolve(&*api, &title, mode).await;
            let _ = tx.send(PickerEvent::ResolutionDone { ticket, result }).await;
        });
    }

    fn apply_resolution(&mut self, ticket: Ticket, result: media_proto::Result<Resolution>) {
        if !self.session.is_current(ticket) {
            debug!("PickerCore: dropping stale resolution {:?}", ticket);
            return;
        }
        let resolution = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("PickerCore: resolving {} failed: {}", self.state.selected_title, e);
                self.publish(PickerUpdate::Error(format!(
                    "{}: {}",
                    self.state.selected_title, e
                )));
                return;
            }
        };

        let selection = match selector::select(
            &resolution.candidates,
            &self.state.preferred_key,
            self.config.playback.fallback_policy,
        ) {
            Ok(s) => s,
            Err(e) => {
                self.publish(PickerUpdate::Error(format!("{}: {}", resolution.title, e)));
                return;
            }
        };
        let chosen = selection.candidate;

        self.publish(PickerUpdate::Sources {
            title: resolution.title.clone(),
            keys: selector::available_keys(&resolution.candidates)
                .into_iter()
                .map(String::from)
                .collect(),
            selected: chosen.key.clone(),
            degraded: selection.degraded,
        });

        let started = self
            .session
            .start(
                &mut self.state,
                &resolution,
                chosen,
                self.factory.as_mut(),
                self.skip_audio,
            )
            .and_then(|()| self.session.on_loaded_metadata(&self.state));
        if let Err(e) = started {
            error!("PickerCore: player failed: {}", e);
            self.publish(PickerUpdate::Error(e.to_string()));
            return;
        }

        self.publish(PickerUpdate::Playing {
            title: resolution.title.clone(),
            key: chosen.key.clone(),
            url: chosen.url.clone(),
        });
    }

    // ── Output ────────────────────────────────────────────────────────────────

    fn publish_fragment(&self) {
        self.publish(PickerUpdate::Fragment(fragment::encode(&self.state)));
    }

    fn publish(&self, update: PickerUpdate) {
        // No subscribers is fine.
        let _ = self.update_tx.send(update);
    }
}
