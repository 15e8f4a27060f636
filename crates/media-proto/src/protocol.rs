use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Namespace every playable title lives in.
pub const FILE_NAMESPACE: &str = "File:";

/// Title shown when the fragment does not name one.
pub const DEFAULT_TITLE: &str = "File:Curiosity's_Seven_Minutes_of_Terror.ogv";

pub const DEFAULT_PREFERRED_KEY: &str = "360p.ogv";
/// Used instead of `DEFAULT_PREFERRED_KEY` on devices flagged as slow.
pub const SLOW_DEVICE_PREFERRED_KEY: &str = "160p.ogv";

pub const ORIGINAL_KEY: &str = "original";

// ── MediaTitle ───────────────────────────────────────────────────────────────

/// A namespaced Commons title such as `File:Foo bar.webm`.
///
/// Commons treats spaces and underscores in titles as the same character, so
/// equality and hashing do too. The original spelling is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaTitle(String);

impl MediaTitle {
    pub fn new(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Build a title from a bare file name, adding the `File:` namespace.
    pub fn from_file_name(name: &str) -> Self {
        Self(format!("{}{}", FILE_NAMESPACE, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Title without the namespace prefix, spaces as underscores.
    pub fn file_name(&self) -> String {
        self.0
            .strip_prefix(FILE_NAMESPACE)
            .unwrap_or(&self.0)
            .replace(' ', "_")
    }

    /// Human-readable name: namespace stripped, underscores as spaces.
    pub fn pretty(&self) -> String {
        self.0
            .strip_prefix(FILE_NAMESPACE)
            .unwrap_or(&self.0)
            .replace('_', " ")
    }

    /// Link to the file description page on Commons.
    pub fn page_url(&self) -> String {
        format!(
            "https://commons.wikimedia.org/wiki/{}",
            crate::fragment::encode_component(&self.0)
        )
    }

    fn normalized(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().map(|c| if c == ' ' { '_' } else { c })
    }
}

impl PartialEq for MediaTitle {
    fn eq(&self, other: &Self) -> bool {
        self.normalized().eq(other.normalized())
    }
}

impl Eq for MediaTitle {}

impl Hash for MediaTitle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.normalized() {
            c.hash(state);
        }
    }
}

impl fmt::Display for MediaTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for MediaTitle {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

// ── Media records ─────────────────────────────────────────────────────────────

/// Facts about one file, produced once per resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub media_type: String,
    /// Seconds. `None` when the file carries neither `length` nor `playtime_seconds`.
    pub duration: Option<f64>,
    pub thumb_url: Option<String>,
    pub thumb_width: u32,
    pub thumb_height: u32,
}

/// One playable stream: the original upload or a transcode of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCandidate {
    /// `original` or `<height>p.<format>`; unique within a candidate list.
    pub key: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
    /// Bytes.
    pub size: Option<u64>,
    /// Bits per second.
    pub bitrate: Option<f64>,
}

impl SourceCandidate {
    pub fn is_original(&self) -> bool {
        self.key == ORIGINAL_KEY
    }

    pub fn is_audio_only(&self) -> bool {
        self.format == "oga"
    }
}

// ── SourceMode ────────────────────────────────────────────────────────────────

/// Which catalog feeds the picker and how transcodes are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    /// Recent media of the day.
    #[default]
    Motd,
    Blender,
    #[serde(rename = "highfps")]
    HighFps,
    Shortlist,
    ShortlistCbr,
    ShortlistProfile1,
}

/// How a mode enumerates transcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStrategy {
    /// Read completed transcodes from the live transcode status.
    Live,
    /// Synthesize candidates from fixed height/width tables.
    Catalog {
        heights: &'static [u32],
        widths: &'static [u32],
        formats: &'static [&'static str],
    },
}

const SHORTLIST_HEIGHTS: [u32; 8] = [160, 240, 360, 480, 720, 1080, 1440, 2160];
const SHORTLIST_WIDTHS: [u32; 8] = [284, 426, 640, 854, 1280, 1920, 2560, 3840];

const STREAMING_BASE: &str = "https://media-streaming.wmflabs.org";
const STREAMING_BASE_CBR: &str = "https://media-streaming.wmflabs.org/cbr-soft";
const STREAMING_BASE_PROFILE1: &str = "https://media-streaming.wmflabs.org/profile1";

impl SourceMode {
    pub const ALL: [SourceMode; 6] = [
        SourceMode::Motd,
        SourceMode::Blender,
        SourceMode::HighFps,
        SourceMode::Shortlist,
        SourceMode::ShortlistCbr,
        SourceMode::ShortlistProfile1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Motd => "motd",
            SourceMode::Blender => "blender",
            SourceMode::HighFps => "highfps",
            SourceMode::Shortlist => "shortlist",
            SourceMode::ShortlistCbr => "shortlist-cbr",
            SourceMode::ShortlistProfile1 => "shortlist-profile1",
        }
    }

    /// Streaming service that replaces the parsed base URL of transcodes.
    pub fn base_url_override(&self) -> Option<&'static str> {
        match self {
            SourceMode::Shortlist => Some(STREAMING_BASE),
            SourceMode::ShortlistCbr => Some(STREAMING_BASE_CBR),
            SourceMode::ShortlistProfile1 => Some(STREAMING_BASE_PROFILE1),
            _ => None,
        }
    }

    pub fn candidate_strategy(&self) -> CandidateStrategy {
        match self {
            SourceMode::Shortlist | SourceMode::ShortlistCbr => CandidateStrategy::Catalog {
                heights: &SHORTLIST_HEIGHTS,
                widths: &SHORTLIST_WIDTHS,
                formats: &["ogv", "webm"],
            },
            SourceMode::ShortlistProfile1 => CandidateStrategy::Catalog {
                heights: &SHORTLIST_HEIGHTS[..6],
                widths: &SHORTLIST_WIDTHS[..6],
                formats: &["webm"],
            },
            _ => CandidateStrategy::Live,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == SourceMode::default()
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown source mode: {}", s))
    }
}

// ── PlayerBackend ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerBackend {
    #[default]
    Js,
    JsCpu,
    #[serde(rename = "js-noworker")]
    JsNoWorker,
    #[serde(rename = "webgl")]
    WebGl,
    Cortado,
    Native,
}

impl PlayerBackend {
    pub const ALL: [PlayerBackend; 6] = [
        PlayerBackend::Js,
        PlayerBackend::JsCpu,
        PlayerBackend::JsNoWorker,
        PlayerBackend::WebGl,
        PlayerBackend::Cortado,
        PlayerBackend::Native,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerBackend::Js => "js",
            PlayerBackend::JsCpu => "js-cpu",
            PlayerBackend::JsNoWorker => "js-noworker",
            PlayerBackend::WebGl => "webgl",
            PlayerBackend::Cortado => "cortado",
            PlayerBackend::Native => "native",
        }
    }

    pub fn is_default(&self) -> bool {
        *self == PlayerBackend::default()
    }
}

impl fmt::Display for PlayerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlayerBackend::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown player backend: {}", s))
    }
}

// ── Catalog rows ──────────────────────────────────────────────────────────────

/// One row of a curated catalog table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub title: &'static str,
    /// Height and frame rate, e.g. `1080p24` or `1080p59.94`.
    pub format_tag: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    /// Frame rate embedded after the `p` of the format tag.
    pub fn frame_rate(&self) -> Option<f64> {
        let (_, fps) = self.format_tag.split_once('p')?;
        fps.parse::<f64>().ok().filter(|f| *f > 0.0)
    }
}

/// A picker row ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub title: MediaTitle,
    pub thumb_url: Option<String>,
    /// CSS-pixel size (thumbnail pixels divided by device pixel ratio).
    pub thumb_width: f64,
    pub thumb_height: f64,
    /// `WxH`, or `audio` for files without a picture, plus an optional ` <fps>fps`.
    pub format_label: String,
    pub description: Option<String>,
}
