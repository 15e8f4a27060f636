use thiserror::Error;

/// Failures that abort a resolution or selection attempt.
///
/// Non-fatal conditions (an unrecognized transcode key, for instance) are
/// logged with `tracing::warn!` where they happen and never show up here.
#[derive(Debug, Error)]
pub enum PickerError {
    #[error("no metadata page for {0}")]
    NotFound(String),

    #[error("page for {0} has no imageinfo")]
    MissingMetadata(String),

    #[error("unsupported original format: .{0}")]
    UnsupportedFormat(String),

    #[error("url does not follow the <base>/x/xx/<file> layout: {0}")]
    MalformedUrl(String),

    #[error("no ogv or oga source found")]
    NoPlayableSource,

    /// Only raised under `FallbackPolicy::Strict`.
    #[error("preferred source {0} is not available")]
    PreferenceUnavailable(String),

    #[error("metadata api request failed: {0}")]
    Transport(String),

    #[error("unexpected metadata api response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PickerError {
    fn from(e: reqwest::Error) -> Self {
        PickerError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PickerError>;
