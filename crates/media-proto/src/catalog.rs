//! Browsable title lists and the filtering that feeds the picker.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::api::{self, ExpandTemplatesResponse, ImageInfo, MetadataApi, QueryResponse};
use crate::config::DisplayConfig;
use crate::error::Result;
use crate::protocol::{CatalogEntry, MediaItem, MediaTitle, SourceMode};

// ── Curated tables ────────────────────────────────────────────────────────────

macro_rules! entries {
    ($( ($title:expr, $tag:expr, $desc:expr) ),* $(,)?) => {
        &[$( CatalogEntry { title: $title, format_tag: $tag, description: $desc } ),*]
    };
}

pub const BLENDER: &[CatalogEntry] = entries![
    ("File:Caminandes- Llama Drama - Short Movie.ogv", "1080p24", "3d animation"),
    ("File:Caminandes - Gran Dillama - Blender Foundation's new Open Movie.webm", "1080p24", "3d animated"),
    ("File:Glass Half - 3D animation with OpenGL cartoon rendering.webm", "2160p24", "2d animation"),
    ("File:Tears of Steel in 4k - Official Blender Foundation release.webm", "2160p24", "live action + CG effects"),
    ("File:Cosmos Laundromat - First Cycle - Official Blender Foundation release.webm", "1152p24", "3d animation"),
    ("File:Sintel movie 4K.webm", "2304p24", "3d animation (has 1000fps bug)"),
    ("File:Big Buck Bunny 4K.webm", "2250p60", "3d animation (has 1000fps bug)"),
    ("File:Elephants Dream (2006) 1080p24.webm", "1080p24", "3d animation"),
];

pub const HIGH_FPS: &[CatalogEntry] = entries![
    ("File:Spectator Mode for Job Simulator - a new way to display social VR footage.webm", "1080p60", "VR game footage"),
    ("File:ManifoldGarden BRoll01 E3 V01.webm", "1080p60", "game footage"),
    ("File:Big Buck Bunny 4K.webm", "2250p60", "animation (has 1000fps bug)"),
    ("File:Stugl,aerial video.webm", "1080p60", "aerial drone footage"),
    ("File:A Moment with Astronaut Kjell Lindgren.webm", "1080p59.94", "live action"),
    ("File:Red-tailed Hawk Eating a Rodent 1080p 60fps.ogv", "1080p59.94", "live action"),
];

pub const SHORTLIST: &[CatalogEntry] = entries![
    // Blender movies
    ("File:Caminandes - Gran Dillama - Blender Foundation's new Open Movie.webm", "1080p24", "3d animated"),
    ("File:Glass Half - 3D animation with OpenGL cartoon rendering.webm", "2160p24", "cartoon; some motion spikes"),
    ("File:Tears of Steel in 4k - Official Blender Foundation release.webm", "2160p24", "sci-fi; mix of scene types"),
    // Space
    ("File:Curiosity's Seven Minutes of Terror.ogv", "720p23.98", "live-action with CG elements"),
    ("File:RED 4K Video of Colorful Liquid in Space.webm", "2160p23.98", "UHD, modest motion"),
    ("File:Ultra High Definition Video from the International Space Station (Reel 1).webm", "2160p23.98", "UHD, mix of low and high motion"),
    ("File:Here's to Engineering.webm", "2160p23.98", "UHD, low motion"),
    // Wikipedia
    ("File:Art and Feminism Wikipedia Edit-a-thon, February 1, 2014.webm", "1080p23.98", "low motion with some spikes"),
    ("File:How Open Access Empowered a 16-Year-Old to Make Cancer Breakthrough.ogv", "1080p23.98", "talking heads; modest motion"),
    ("File:Knowledge for Everyone (short cut).webm", "1080p23.98", "mix of scenes"),
    ("File:Share-a-Fact on the Official Wikipedia Android app.webm", "1080p29.97", "short animation, some motion spikes"),
    ("File:Sneak Preview - Wikipedia VisualEditor.webm", "1080p23.98", "modest motion with spikes"),
    ("File:The Impact Of Wikipedia.webm", "1080p23.98", "low motion"),
    ("File:WikiArabia tech meetup in Ramallah 2016.webm", "1080p24", "modest motion"),
    ("File:Wikipedia Edit 2015.webm", "1080p24", "animated, many dupe frames"),
    ("File:Wiki Makes Video Intro 4 26.webm", "720p59.94", "high fps, mix of scenes"),
    ("File:This is the Wikimedia Foundation.webm", "1080p23.98", "mix of scenes"),
    // Misc
    ("File:Tawakkol Karman (English).ogv", "1080p50", "high fps, modest motion"),
    ("File:Eisbach surfen v1.ogv", "1080p30", "high motion"),
    ("File:FEZ trial gameplay HD.webm", "720p30", "animation"),
    ("File:Furcifer pardalis moving eyes.ogv", "1080p24", "low motion"),
    ("File:Red-tailed Hawk Eating a Rodent 1080p 60fps.ogv", "1080p59.94", "high fps, moderate motion"),
    ("File:Snowdonia by drone.webm", "1080p30", "mix of high and low motion scenes"),
    ("File:Stugl,aerial video.webm", "1080p60", "high fps, high motion"),
];

pub const SHORTLIST_PROFILE1: &[CatalogEntry] = entries![
    ("File:Glass Half - 3D animation with OpenGL cartoon rendering.webm", "2160p24", "cartoon; some motion spikes"),
    ("File:Tears of Steel in 4k - Official Blender Foundation release.webm", "2160p24", "sci-fi; mix of scene types"),
    ("File:Knowledge for Everyone (short cut).webm", "1080p23.98", "mix of scenes"),
    ("File:Stugl,aerial video.webm", "1080p60", "high fps, high motion"),
];

/// Curated table for a mode; `None` for the fetched recency catalog.
pub fn curated(mode: SourceMode) -> Option<&'static [CatalogEntry]> {
    match mode {
        SourceMode::Motd => None,
        SourceMode::Blender => Some(BLENDER),
        SourceMode::HighFps => Some(HIGH_FPS),
        SourceMode::Shortlist | SourceMode::ShortlistCbr => Some(SHORTLIST),
        SourceMode::ShortlistProfile1 => Some(SHORTLIST_PROFILE1),
    }
}

// ── Recency catalog ───────────────────────────────────────────────────────────

/// First day of the fetched media-of-the-day range.
pub const RECENT_START: (i32, u32, u32) = (2016, 9, 20);

/// Media of the day, keyed by `YYYY-MM-DD` so key order is date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentCatalog {
    by_date: BTreeMap<String, String>,
}

impl RecentCatalog {
    pub fn from_pairs<I, D, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, F)>,
        D: Into<String>,
        F: Into<String>,
    {
        Self {
            by_date: pairs
                .into_iter()
                .map(|(d, f)| (d.into(), f.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// File names (no namespace), oldest first.
    pub fn files(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.by_date.values().map(String::as_str)
    }

    /// Parse `expandtemplates` output: one `date|filename` per line.
    pub fn parse_expanded(text: &str) -> Self {
        let mut by_date = BTreeMap::new();
        for line in text.lines() {
            let mut bits = line.split('|');
            let date = bits.next().unwrap_or_default().trim();
            let filename = bits.next().unwrap_or_default().trim();
            if filename.is_empty()
                || filename.to_ascii_lowercase().ends_with(".gif")
                || filename.contains("[[")
                || filename.contains("{{")
            {
                continue;
            }
            by_date.insert(date.to_string(), filename.to_string());
        }
        Self { by_date }
    }
}

/// Template source asking for every media of the day from `RECENT_START`
/// through `today`. Days run to 31 in every month; the impossible dates
/// expand to nothing usable and are dropped when parsing.
pub fn motd_template_text(today: NaiveDate) -> String {
    let (mut year, mut month, mut day) = RECENT_START;
    let end = (today.year(), today.month(), today.day());
    let mut text = String::new();

    while (year, month, day) <= end {
        let ymd = format!("{}-{:02}-{:02}", year, month, day);
        text.push_str(&format!("{}|{{{{Motd/{}}}}}\n", ymd, ymd));

        day += 1;
        if day > 31 {
            day = 1;
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
    }
    text
}

pub async fn fetch_recent<A: MetadataApi + ?Sized>(api: &A, today: NaiveDate) -> Result<RecentCatalog> {
    let body = api
        .query(api::params([
            ("action", "expandtemplates".to_string()),
            ("text", motd_template_text(today)),
        ]))
        .await?;
    let response: ExpandTemplatesResponse = api::parse(body)?;
    let catalog = RecentCatalog::parse_expanded(
        &response.expandtemplates.map(|b| b.text).unwrap_or_default(),
    );
    info!("catalog: media of the day list has {} entries", catalog.len());
    Ok(catalog)
}

// ── Filtering ─────────────────────────────────────────────────────────────────

/// A title that passed the filter, with what the picker shows beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredEntry {
    pub title: MediaTitle,
    pub frame_rate: Option<f64>,
    pub description: Option<String>,
}

/// Case-insensitive substring match against the trimmed filter text.
#[derive(Debug, Clone)]
pub struct Predicate {
    needle: String,
}

impl Predicate {
    pub fn new(filter_text: &str) -> Self {
        Self {
            needle: filter_text.trim().to_lowercase(),
        }
    }

    pub fn matches(&self, haystack: &str) -> bool {
        self.needle.is_empty() || haystack.to_lowercase().contains(&self.needle)
    }
}

/// Entries of the catalog selected by `mode` that match `filter_text`.
///
/// The recency catalog matches on title only and returns the newest
/// `recent_limit` matches first; curated tables also match the format tag and
/// description and keep table order.
pub fn filter_entries(
    mode: SourceMode,
    filter_text: &str,
    recent: &RecentCatalog,
    recent_limit: usize,
) -> Vec<FilteredEntry> {
    let predicate = Predicate::new(filter_text);

    match curated(mode) {
        None => recent
            .files()
            .rev()
            .filter(|file| predicate.matches(file))
            .take(recent_limit)
            .map(|file| FilteredEntry {
                title: MediaTitle::from_file_name(file),
                frame_rate: None,
                description: None,
            })
            .collect(),
        Some(table) => table
            .iter()
            .filter(|e| {
                predicate.matches(e.title)
                    || predicate.matches(e.format_tag)
                    || predicate.matches(e.description)
            })
            .map(|e| FilteredEntry {
                title: MediaTitle::new(e.title),
                frame_rate: e.frame_rate(),
                description: Some(e.description.to_string()),
            })
            .collect(),
    }
}

/// `WxH` of the file (or `audio` for 0x0), plus the catalog frame rate.
pub fn format_label(width: u32, height: u32, frame_rate: Option<f64>) -> String {
    let mut label = if width == 0 && height == 0 {
        "audio".to_string()
    } else {
        format!("{}x{}", width, height)
    };
    if let Some(fps) = frame_rate {
        label.push_str(&format!(" {}fps", fps));
    }
    label
}

/// One batched thumbnail lookup for `entries`. Rows without thumbnail data
/// are dropped; the rest keep filter order.
pub async fn fetch_items<A: MetadataApi + ?Sized>(
    api: &A,
    entries: &[FilteredEntry],
    display: &DisplayConfig,
) -> Result<Vec<MediaItem>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let px = display.thumb_pixels().to_string();
    let titles = entries
        .iter()
        .map(|e| e.title.as_str())
        .collect::<Vec<_>>()
        .join("|");
    let body = api
        .query(api::params([
            ("action", "query".to_string()),
            ("prop", "imageinfo".to_string()),
            ("iiprop", "url|size".to_string()),
            ("iiurlwidth", px.clone()),
            ("iiurlheight", px),
            ("titles", titles),
        ]))
        .await?;

    let response: QueryResponse = api::parse(body)?;
    let infos: HashMap<MediaTitle, ImageInfo> = response
        .query
        .map(|q| q.pages)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|page| {
            let info = page.imageinfo?.into_iter().next()?;
            Some((MediaTitle::new(page.title), info))
        })
        .collect();

    let ratio = display.device_pixel_ratio;
    let items: Vec<MediaItem> = entries
        .iter()
        .filter_map(|entry| {
            let info = infos.get(&entry.title)?;
            Some(MediaItem {
                title: entry.title.clone(),
                thumb_url: info.thumburl.clone(),
                thumb_width: info.thumbwidth as f64 / ratio,
                thumb_height: info.thumbheight as f64 / ratio,
                format_label: format_label(info.width, info.height, entry.frame_rate),
                description: entry.description.clone(),
            })
        })
        .collect();

    debug!(
        "catalog: {} of {} entries have thumbnails",
        items.len(),
        entries.len()
    );
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent() -> RecentCatalog {
        RecentCatalog::from_pairs([
            ("2016-09-20", "Old_bunny.webm"),
            ("2016-09-21", "Middle.ogv"),
            ("2016-09-22", "New_Bunny.webm"),
        ])
    }

    #[test]
    fn test_predicate_trims_and_ignores_case() {
        let p = Predicate::new("  BuNNy ");
        assert!(p.matches("Big Buck Bunny 4K"));
        assert!(!p.matches("Sintel"));
        assert!(Predicate::new("   ").matches("anything"));
    }

    #[test]
    fn test_recent_filter_is_newest_first_title_only() {
        let out = filter_entries(SourceMode::Motd, "bunny", &recent(), 40);
        let titles: Vec<_> = out.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["File:New_Bunny.webm", "File:Old_bunny.webm"]);
        assert!(out.iter().all(|e| e.frame_rate.is_none()));
    }

    #[test]
    fn test_recent_filter_caps_results() {
        let many = RecentCatalog::from_pairs(
            (1..=60).map(|i| (format!("2017-01-{:02}", i), format!("Clip_{}.webm", i))),
        );
        let out = filter_entries(SourceMode::Motd, "", &many, 40);
        assert_eq!(out.len(), 40);
    }

    #[test]
    fn test_curated_filter_matches_tag_and_description() {
        let by_tag = filter_entries(SourceMode::HighFps, "59.94", &RecentCatalog::default(), 40);
        assert_eq!(by_tag.len(), 2);
        assert!(by_tag.iter().all(|e| e.frame_rate == Some(59.94)));

        let by_desc = filter_entries(SourceMode::Blender, "1000FPS BUG", &RecentCatalog::default(), 40);
        let titles: Vec<_> = by_desc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["File:Sintel movie 4K.webm", "File:Big Buck Bunny 4K.webm"]);
    }

    #[test]
    fn test_shortlist_cbr_shares_table() {
        let a = filter_entries(SourceMode::Shortlist, "", &RecentCatalog::default(), 40);
        let b = filter_entries(SourceMode::ShortlistCbr, "", &RecentCatalog::default(), 40);
        assert_eq!(a, b);
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn test_parse_expanded_skips_gifs_and_blanks() {
        let text = "2016-09-20|A.webm\n2016-09-21|Anim.GIF\n2016-09-22|\n2016-09-31|[[:Template:Motd/2016-09-31]]\n2016-09-23|B.ogv";
        let catalog = RecentCatalog::parse_expanded(text);
        let files: Vec<_> = catalog.files().collect();
        assert_eq!(files, ["A.webm", "B.ogv"]);
    }

    #[test]
    fn test_motd_template_text_range() {
        let today = NaiveDate::from_ymd_opt(2016, 10, 2).unwrap();
        let text = motd_template_text(today);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"2016-09-20|{{Motd/2016-09-20}}"));
        assert!(lines.contains(&"2016-09-31|{{Motd/2016-09-31}}"));
        assert_eq!(lines.last(), Some(&"2016-10-02|{{Motd/2016-10-02}}"));
        // 20..=31 in September, 1..=2 in October
        assert_eq!(lines.len(), 14);
    }

    #[test]
    fn test_motd_range_begins_at_recent_start() {
        let (y, m, d) = RECENT_START;
        let start = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(motd_template_text(start), "2016-09-20|{{Motd/2016-09-20}}\n");
        assert!(motd_template_text(start.pred_opt().unwrap()).is_empty());
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1920, 1080, Some(24.0)), "1920x1080 24fps");
        assert_eq!(format_label(1920, 1080, Some(59.94)), "1920x1080 59.94fps");
        assert_eq!(format_label(0, 0, None), "audio");
        assert_eq!(format_label(640, 360, None), "640x360");
    }
}
