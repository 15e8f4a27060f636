//! Pick one stream out of a resolution's candidates.
//!
//! Priority: the preferred key, then the original if it is Ogg video, then any
//! audio-only `oga` transcode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::{PickerError, Result};
use crate::protocol::SourceCandidate;

/// How a missing preferred source is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Fall back without telling anyone but the debug log.
    #[default]
    Silent,
    /// Fall back and log a warning.
    Warn,
    /// Refuse to fall back.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub candidate: &'a SourceCandidate,
    /// True when the preferred key was not available.
    pub degraded: bool,
}

pub fn select<'a>(
    candidates: &'a [SourceCandidate],
    preferred_key: &str,
    policy: FallbackPolicy,
) -> Result<Selection<'a>> {
    if let Some(candidate) = candidates.iter().find(|c| c.key == preferred_key) {
        return Ok(Selection {
            candidate,
            degraded: false,
        });
    }

    if policy == FallbackPolicy::Strict {
        return Err(PickerError::PreferenceUnavailable(preferred_key.to_string()));
    }

    let fallback = candidates
        .iter()
        .find(|c| c.is_original() && c.format == "ogv")
        .or_else(|| candidates.iter().find(|c| c.is_audio_only()))
        .ok_or(PickerError::NoPlayableSource)?;

    match policy {
        FallbackPolicy::Warn => warn!(
            "selector: {} unavailable, falling back to {}",
            preferred_key, fallback.key
        ),
        _ => info!(
            "selector: {} unavailable, falling back to {}",
            preferred_key, fallback.key
        ),
    }

    Ok(Selection {
        candidate: fallback,
        degraded: true,
    })
}

/// Keys present in a candidate list; the UI enables only these preferences.
pub fn available_keys(candidates: &[SourceCandidate]) -> BTreeSet<&str> {
    candidates.iter().map(|c| c.key.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(key: &str, format: &str) -> SourceCandidate {
        SourceCandidate {
            key: key.to_string(),
            format: format.to_string(),
            width: 640,
            height: 360,
            url: format!("https://example.org/{}", key),
            size: None,
            bitrate: None,
        }
    }

    fn sample() -> Vec<SourceCandidate> {
        vec![
            candidate("original", "ogv"),
            candidate("360p.ogv", "ogv"),
            candidate("480p.webm", "webm"),
            candidate("audio.oga", "oga"),
        ]
    }

    #[test]
    fn test_exact_match_wins() {
        let candidates = sample();
        for c in &candidates {
            let sel = select(&candidates, &c.key, FallbackPolicy::Silent).unwrap();
            assert_eq!(sel.candidate.key, c.key);
            assert!(!sel.degraded);
        }
    }

    #[test]
    fn test_falls_back_to_original_ogv_before_oga() {
        let candidates = sample();
        let sel = select(&candidates, "1080p.webm", FallbackPolicy::Silent).unwrap();
        assert_eq!(sel.candidate.key, "original");
        assert!(sel.degraded);
    }

    #[test]
    fn test_original_webm_is_not_a_fallback() {
        let candidates = vec![candidate("original", "webm"), candidate("audio.oga", "oga")];
        let sel = select(&candidates, "360p.ogv", FallbackPolicy::Warn).unwrap();
        assert_eq!(sel.candidate.format, "oga");
        assert!(sel.degraded);
    }

    #[test]
    fn test_no_playable_source() {
        let candidates = vec![candidate("original", "webm"), candidate("480p.webm", "webm")];
        let err = select(&candidates, "360p.ogv", FallbackPolicy::Silent).unwrap_err();
        assert!(matches!(err, PickerError::NoPlayableSource));
        assert!(matches!(
            select(&[], "360p.ogv", FallbackPolicy::Silent),
            Err(PickerError::NoPlayableSource)
        ));
    }

    #[test]
    fn test_strict_policy_refuses_fallback() {
        let candidates = sample();
        let err = select(&candidates, "1080p.webm", FallbackPolicy::Strict).unwrap_err();
        assert!(matches!(err, PickerError::PreferenceUnavailable(k) if k == "1080p.webm"));
        assert!(select(&candidates, "360p.ogv", FallbackPolicy::Strict).is_ok());
    }

    #[test]
    fn test_available_keys() {
        let candidates = sample();
        let keys = available_keys(&candidates);
        assert!(keys.contains("480p.webm"));
        assert!(!keys.contains("720p.webm"));
        assert_eq!(keys.len(), 4);
    }
}
