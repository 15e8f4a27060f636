//! Turn a title into `MediaInfo` plus the list of streams it can be played from.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::api::{self, ImageInfo, MetadataApi, QueryResponse, TranscodeStatus};
use crate::error::{PickerError, Result};
use crate::protocol::{
    CandidateStrategy, MediaInfo, MediaTitle, SourceCandidate, SourceMode, ORIGINAL_KEY,
};
use crate::transcode::derive_url;

/// Requested size of the poster thumbnail.
const POSTER_WIDTH: u32 = 1280;
const POSTER_HEIGHT: u32 = 720;

/// Outcome of one resolution. Replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub title: MediaTitle,
    pub info: MediaInfo,
    /// Original first, then transcodes.
    pub candidates: Vec<SourceCandidate>,
}

pub async fn resolve<A: MetadataApi + ?Sized>(
    api: &A,
    title: &MediaTitle,
    mode: SourceMode,
) -> Result<Resolution> {
    let body = api
        .query(api::params([
            ("action", "query".to_string()),
            ("prop", "imageinfo|transcodestatus".to_string()),
            ("titles", title.to_string()),
            ("iiprop", "url|size|mediatype|metadata".to_string()),
            ("iiurlwidth", POSTER_WIDTH.to_string()),
            ("iiurlheight", POSTER_HEIGHT.to_string()),
        ]))
        .await?;

    let response: QueryResponse = api::parse(body)?;
    let page = response
        .query
        .and_then(|q| q.pages.into_iter().next())
        .ok_or_else(|| PickerError::NotFound(title.to_string()))?;

    let image = page
        .imageinfo
        .and_then(|infos| infos.into_iter().next())
        .ok_or_else(|| PickerError::MissingMetadata(title.to_string()))?;
    let transcodes = page.transcodestatus.unwrap_or_default();

    let info = media_info(&image);
    debug!(
        "resolver: {} type={} duration={:?}",
        title, info.media_type, info.duration
    );

    let mut candidates = vec![original_candidate(&image, info.duration)?];
    match mode.candidate_strategy() {
        CandidateStrategy::Catalog {
            heights,
            widths,
            formats,
        } => candidates.extend(catalog_candidates(&image, heights, widths, formats, mode)?),
        CandidateStrategy::Live => {
            candidates.extend(live_candidates(&image, &transcodes, info.duration, mode)?)
        }
    }

    Ok(Resolution {
        title: title.clone(),
        info,
        candidates,
    })
}

fn media_info(image: &ImageInfo) -> MediaInfo {
    let duration = image
        .metadata_number("length")
        .filter(|d| *d > 0.0)
        .or_else(|| image.metadata_number("playtime_seconds"))
        .filter(|d| *d > 0.0);

    MediaInfo {
        media_type: image.mediatype.clone(),
        duration,
        thumb_url: image.thumburl.clone(),
        thumb_width: image.thumbwidth,
        thumb_height: image.thumbheight,
    }
}

/// Container/codec tag for the original upload, from its extension.
pub fn original_format(url: &str) -> Result<&'static str> {
    let ext = url
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.contains('/'))
        .ok_or_else(|| PickerError::UnsupportedFormat(String::new()))?;

    match ext.as_str() {
        // .ogg could be audio-only, but uploads under that name are video in practice
        "ogg" | "ogv" => Ok("ogv"),
        "oga" => Ok("oga"),
        "webm" => Ok("webm"),
        _ => Err(PickerError::UnsupportedFormat(ext)),
    }
}

fn original_candidate(image: &ImageInfo, duration: Option<f64>) -> Result<SourceCandidate> {
    Ok(SourceCandidate {
        key: ORIGINAL_KEY.to_string(),
        format: original_format(&image.url)?.to_string(),
        width: image.width,
        height: image.height,
        url: image.url.clone(),
        size: Some(image.size),
        bitrate: duration.map(|d| image.size as f64 * 8.0 / d),
    })
}

fn catalog_candidates(
    image: &ImageInfo,
    heights: &[u32],
    widths: &[u32],
    formats: &[&str],
    mode: SourceMode,
) -> Result<Vec<SourceCandidate>> {
    let mut out = Vec::new();
    for (&size, &width) in heights.iter().zip(widths) {
        if width > image.width {
            continue;
        }
        // Keep the source aspect ratio rather than the table's 16:9.
        let height = (width as f64 * image.height as f64 / image.width as f64).round() as u32;
        for format in formats {
            out.push(SourceCandidate {
                key: format!("{}p.{}", size, format),
                format: format.to_string(),
                width,
                height,
                url: derive_url(&image.url, size, format, mode)?,
                size: None,
                bitrate: None,
            });
        }
    }
    Ok(out)
}

fn transcode_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)p\.(.+)$").expect("transcode key regex"))
}

/// Parse `<height>p.<format>`.
pub fn parse_transcode_key(key: &str) -> Option<(u32, &str)> {
    let caps = transcode_key_re().captures(key)?;
    let height = caps.get(1)?.as_str().parse().ok()?;
    Some((height, caps.get(2)?.as_str()))
}

fn live_candidates(
    image: &ImageInfo,
    transcodes: &BTreeMap<String, TranscodeStatus>,
    duration: Option<f64>,
    mode: SourceMode,
) -> Result<Vec<SourceCandidate>> {
    let mut out = Vec::new();
    for (key, status) in transcodes {
        if !status.is_complete() {
            continue;
        }
        let Some((height, format)) = parse_transcode_key(key) else {
            warn!("resolver: unexpected transcode key name: {}", key);
            continue;
        };

        let width = if image.height == 0 {
            0
        } else {
            (image.width as f64 * height as f64 / image.height as f64).round() as u32
        };
        let bitrate = status.final_bitrate;

        out.push(SourceCandidate {
            key: key.clone(),
            format: format.to_string(),
            width,
            height,
            url: derive_url(&image.url, height, format, mode)?,
            size: duration.map(|d| (bitrate * d / 8.0).round() as u64),
            bitrate: Some(bitrate),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_format_mapping() {
        assert_eq!(original_format("https://x/a/ab/Clip.OGG").unwrap(), "ogv");
        assert_eq!(original_format("https://x/a/ab/clip.ogv").unwrap(), "ogv");
        assert_eq!(original_format("https://x/a/ab/clip.oga").unwrap(), "oga");
        assert_eq!(original_format("https://x/a/ab/clip.webm").unwrap(), "webm");
        assert!(matches!(
            original_format("https://x/a/ab/clip.mp4"),
            Err(PickerError::UnsupportedFormat(ext)) if ext == "mp4"
        ));
        assert!(original_format("https://x/a/ab/clip").is_err());
    }

    #[test]
    fn test_parse_transcode_key() {
        assert_eq!(parse_transcode_key("720p.webm"), Some((720, "webm")));
        assert_eq!(parse_transcode_key("160p.ogv"), Some((160, "ogv")));
        assert_eq!(parse_transcode_key("ogg"), None);
        assert_eq!(parse_transcode_key("p.webm"), None);
    }
}
