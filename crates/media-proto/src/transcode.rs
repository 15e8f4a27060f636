//! Guess the URL of a server-side transcode from the original file URL.
//!
//! Commons serves originals from `<base>/<h>/<hh>/<file>` and transcodes from
//! `<base>/transcoded/<h>/<hh>/<file>/<file>.<height>p.<format>`. The API does
//! not report transcode URLs directly, so they are rebuilt here; if the
//! server-side naming ever changes these URLs silently go stale.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{PickerError, Result};
use crate::protocol::SourceMode;

fn hashed_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*)/([^/]{1,2}/[^/]{1,2})/([^/]+)$").expect("hashed path regex")
    })
}

/// Split an original URL into `(base, hash, filename)`.
pub fn split_original_url(url: &str) -> Result<(&str, &str, &str)> {
    let caps = hashed_path_re()
        .captures(url)
        .ok_or_else(|| PickerError::MalformedUrl(url.to_string()))?;
    let part = |i| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
    Ok((part(1), part(2), part(3)))
}

pub fn derive_url(original_url: &str, height: u32, format: &str, mode: SourceMode) -> Result<String> {
    let (base, hash, filename) = split_original_url(original_url)?;
    let base = mode.base_url_override().unwrap_or(base);
    Ok(format!(
        "{base}/transcoded/{hash}/{filename}/{filename}.{height}p.{format}"
    ))
}
