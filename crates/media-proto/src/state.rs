use crate::protocol::{MediaTitle, PlayerBackend, SourceMode, DEFAULT_PREFERRED_KEY};
use serde::{Deserialize, Serialize};

/// Everything the picker needs to know about the current selection.
///
/// There is one of these per session; it is threaded through the core loop
/// by value and only changed through the methods below, each of which leaves
/// every field consistent before the next resolution starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub selected_title: MediaTitle,
    /// URL handed to the player by the last successful selection.
    pub selected_url: Option<String>,
    pub preferred_key: String,
    pub muted: bool,
    /// Playhead to restore once the next player has loaded metadata.
    pub start_time: f64,
    pub autoplay: bool,
    pub player_backend: PlayerBackend,
    pub source_mode: SourceMode,
    pub filter_text: String,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            selected_title: MediaTitle::default(),
            selected_url: None,
            preferred_key: DEFAULT_PREFERRED_KEY.to_string(),
            muted: false,
            start_time: 0.0,
            autoplay: false,
            player_backend: PlayerBackend::default(),
            source_mode: SourceMode::default(),
            filter_text: String::new(),
        }
    }
}

impl PlaybackState {
    /// A title picked from the list always starts from the beginning, paused.
    pub fn pick_title(&mut self, title: MediaTitle) {
        self.selected_title = title;
        self.selected_url = None;
        self.start_time = 0.0;
        self.autoplay = false;
    }

    /// The playhead captured on teardown carries over to the new source.
    pub fn set_preferred_key(&mut self, key: impl Into<String>) {
        self.preferred_key = key.into();
        self.selected_url = None;
    }

    pub fn set_player_backend(&mut self, backend: PlayerBackend) {
        self.player_backend = backend;
        self.selected_url = None;
    }

    pub fn set_source_mode(&mut self, mode: SourceMode) {
        self.source_mode = mode;
        self.selected_url = None;
    }

    pub fn set_filter_text(&mut self, text: impl Into<String>) {
        self.filter_text = text.into();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Forget the playhead, e.g. when navigation switched to different media.
    pub fn reset_playhead(&mut self) {
        self.start_time = 0.0;
        self.autoplay = false;
    }

    /// True when switching from `self` to `next` needs a fresh player.
    pub fn needs_restart(&self, next: &PlaybackState) -> bool {
        self.selected_title != next.selected_title
            || self.preferred_key != next.preferred_key
            || self.player_backend != next.player_backend
    }
}
