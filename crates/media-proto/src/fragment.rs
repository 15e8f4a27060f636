//! URL-fragment codec for the shareable picker state.
//!
//! ```text
//! file=<name>[&search=<text>][&mute=1][&player=<backend>]&size=<key>[&source=<mode>]
//! ```
//!
//! Pair order is a convention of `encode`; `decode` accepts any order and
//! ignores keys it does not know.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::protocol::{MediaTitle, PlayerBackend, SourceMode};
use crate::state::PlaybackState;

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

pub fn decode_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Serialize `state` into a fragment (without the leading `#`).
pub fn encode(state: &PlaybackState) -> String {
    let mut pairs: Vec<(&str, String)> = vec![("file", state.selected_title.file_name())];

    if !state.filter_text.is_empty() {
        pairs.push(("search", state.filter_text.clone()));
    }
    if state.muted {
        pairs.push(("mute", "1".to_string()));
    }
    if !state.player_backend.is_default() {
        pairs.push(("player", state.player_backend.as_str().to_string()));
    }
    pairs.push(("size", state.preferred_key.clone()));
    if !state.source_mode.is_default() {
        pairs.push(("source", state.source_mode.as_str().to_string()));
    }

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Result of decoding a fragment. Fields the fragment omits hold defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedFragment {
    /// `None` when the fragment carries no `file`; the caller picks a default.
    pub title: Option<MediaTitle>,
    pub filter_text: String,
    pub muted: bool,
    pub preferred_key: Option<String>,
    pub player_backend: PlayerBackend,
    pub source_mode: SourceMode,
    /// Set by `audio=0`. Not part of `PlaybackState`; consumed by the player setup.
    pub skip_audio: bool,
}

impl DecodedFragment {
    /// Build a fresh state, filling the title and preferred key from the
    /// given fallbacks when the fragment has none.
    pub fn into_state(self, default_title: &MediaTitle, default_key: &str) -> PlaybackState {
        PlaybackState {
            selected_title: self.title.unwrap_or_else(|| default_title.clone()),
            selected_url: None,
            preferred_key: self
                .preferred_key
                .unwrap_or_else(|| default_key.to_string()),
            muted: self.muted,
            start_time: 0.0,
            autoplay: false,
            player_backend: self.player_backend,
            source_mode: self.source_mode,
            filter_text: self.filter_text,
        }
    }
}

/// Parse a fragment, with or without its leading `#`.
pub fn decode(fragment: &str) -> DecodedFragment {
    let body = fragment.strip_prefix('#').unwrap_or(fragment);
    let mut out = DecodedFragment::default();

    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode_component(raw_name);
        let value = decode_component(raw_value);

        match name.as_str() {
            "file" => out.title = Some(MediaTitle::from_file_name(&value)),
            "search" => out.filter_text = value,
            "mute" => out.muted = value == "1",
            "size" => out.preferred_key = Some(value),
            "audio" => out.skip_audio = value == "0",
            "player" => match value.parse() {
                Ok(backend) => out.player_backend = backend,
                Err(e) => debug!("fragment: ignoring {}", e),
            },
            "source" => match value.parse() {
                Ok(mode) => out.source_mode = mode,
                Err(e) => debug!("fragment: ignoring {}", e),
            },
            other => debug!("fragment: ignoring unknown key {:?}", other),
        }
    }

    out
}
