//! Ownership of the one active player.
//!
//! A session holds at most one `Player`. Starting a new source always tears
//! the old player down first, capturing its playhead into `PlaybackState` so
//! the replacement can pick up where it left off.

use tracing::{debug, info};

use crate::filter::{Generation, Ticket};
use crate::protocol::{MediaInfo, PlayerBackend, SourceCandidate};
use crate::resolver::Resolution;
use crate::state::PlaybackState;

/// Sources taller than this get a bigger decoder memory budget.
const LARGE_FRAME_HEIGHT: u32 = 1080;
const LARGE_FRAME_MEMORY_LIMIT: u64 = 128 * 1024 * 1024;
/// Display box for audio-only sources.
const AUDIO_BOX: u32 = 256;

/// The decode-and-render component. Implementations own the actual output.
pub trait Player: Send {
    fn set_src(&mut self, url: &str);
    fn set_muted(&mut self, muted: bool);
    fn set_current_time(&mut self, seconds: f64);
    fn set_poster(&mut self, url: &str);
    fn set_size(&mut self, width: u32, height: u32);

    fn load(&mut self) -> anyhow::Result<()>;
    fn play(&mut self) -> anyhow::Result<()>;
    fn pause(&mut self) -> anyhow::Result<()>;
    /// Remove from its presentation context and stop. Called exactly once.
    fn detach(&mut self);

    fn current_time(&self) -> f64;
    fn is_paused(&self) -> bool;
}

/// Construction-time knobs derived from the backend and the chosen source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerOptions {
    pub memory_limit: Option<u64>,
    pub webgl: bool,
    pub force_webgl: bool,
    pub worker: bool,
    pub enable_webm: bool,
    pub skip_audio: bool,
    pub duration_hint: Option<f64>,
    pub width_hint: Option<u32>,
    pub height_hint: Option<u32>,
}

impl PlayerOptions {
    pub fn for_backend(
        backend: PlayerBackend,
        selected: &SourceCandidate,
        info: &MediaInfo,
        skip_audio: bool,
    ) -> Self {
        let mut options = PlayerOptions {
            memory_limit: (selected.height > LARGE_FRAME_HEIGHT).then_some(LARGE_FRAME_MEMORY_LIMIT),
            skip_audio,
            ..Default::default()
        };

        match backend {
            PlayerBackend::Js => {
                options.webgl = true;
                options.worker = true;
                options.enable_webm = true;
            }
            PlayerBackend::JsCpu => {
                options.worker = true;
                options.enable_webm = true;
            }
            PlayerBackend::JsNoWorker => {
                options.webgl = true;
                options.enable_webm = true;
            }
            PlayerBackend::WebGl => {
                options.webgl = true;
                options.force_webgl = true;
                options.worker = true;
                options.enable_webm = true;
            }
            PlayerBackend::Cortado => {
                options.duration_hint = info.duration;
                options.width_hint = Some(selected.width);
                options.height_hint = Some(selected.height);
            }
            PlayerBackend::Native => {}
        }
        options
    }
}

/// Builds players for a backend.
pub trait PlayerFactory {
    fn create(
        &mut self,
        backend: PlayerBackend,
        options: &PlayerOptions,
    ) -> anyhow::Result<Box<dyn Player>>;
}

#[derive(Default)]
pub struct PlaybackSession {
    player: Option<Box<dyn Player>>,
    resolutions: Generation,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.player.is_some()
    }

    /// Ticket for a resolution about to start; newer tickets supersede older.
    pub fn begin_resolution(&mut self) -> Ticket {
        self.resolutions.issue()
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.resolutions.is_current(ticket)
    }

    /// Tear down the active player, if any, remembering where it was.
    pub fn stop(&mut self, state: &mut PlaybackState) {
        let Some(mut player) = self.player.take() else {
            return;
        };
        let position = player.current_time();
        if position > 0.0 {
            state.start_time = position;
        }
        state.autoplay = !player.is_paused();
        player.detach();
        debug!(
            "session: player stopped at {:.2}s (autoplay={})",
            state.start_time, state.autoplay
        );
    }

    /// Replace the active player with one playing `selected`.
    pub fn start(
        &mut self,
        state: &mut PlaybackState,
        resolution: &Resolution,
        selected: &SourceCandidate,
        factory: &mut dyn PlayerFactory,
        skip_audio: bool,
    ) -> anyhow::Result<()> {
        self.stop(state);

        let options =
            PlayerOptions::for_backend(state.player_backend, selected, &resolution.info, skip_audio);
        let mut player = factory.create(state.player_backend, &options)?;

        if state.start_time == 0.0 {
            if let Some(poster) = &resolution.info.thumb_url {
                player.set_poster(poster);
            }
        }
        player.set_src(&selected.url);
        player.set_muted(state.muted);
        if selected.height == 0 {
            player.set_size(AUDIO_BOX, AUDIO_BOX);
        }

        state.selected_url = Some(selected.url.clone());
        info!(
            "session: {} via {} ({})",
            resolution.title, selected.key, state.player_backend
        );
        self.player = Some(player);
        Ok(())
    }

    /// Metadata is in: restore the playhead and resume if we were playing.
    pub fn on_loaded_metadata(&mut self, state: &PlaybackState) -> anyhow::Result<()> {
        let Some(player) = self.player.as_mut() else {
            return Ok(());
        };
        if state.start_time > 0.0 {
            player.set_current_time(state.start_time);
            if state.autoplay {
                player.play()?;
            }
        }
        Ok(())
    }

    /// Explicit user start.
    pub fn play(&mut self) -> anyhow::Result<()> {
        match self.player.as_mut() {
            Some(player) => {
                player.load()?;
                player.play()
            }
            None => Ok(()),
        }
    }

    /// Mute changes apply to the live player; they never need a restart.
    pub fn set_muted(&mut self, muted: bool) {
        if let Some(player) = self.player.as_mut() {
            player.set_muted(muted);
        }
    }

    pub fn toggle_pause(&mut self) -> anyhow::Result<()> {
        match self.player.as_mut() {
            Some(player) if player.is_paused() => player.play(),
            Some(player) => player.pause(),
            None => Ok(()),
        }
    }

    /// Release the player at shutdown.
    pub fn shutdown(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.detach();
        }
    }
}
