mod common;

use chrono::NaiveDate;
use common::fake_api::FakeApi;
use media_proto::catalog::{fetch_items, fetch_recent, filter_entries, RecentCatalog};
use media_proto::config::DisplayConfig;
use media_proto::protocol::SourceMode;
use serde_json::json;

fn thumb_page(title: &str, width: u32, height: u32) -> serde_json::Value {
    json!({
        "title": title,
        "imageinfo": [{
            "url": format!("https://upload.wikimedia.org/x/{}", title),
            "size": 1000,
            "width": width,
            "height": height,
            "thumburl": format!("https://upload.wikimedia.org/thumb/{}.jpg", title),
            "thumbwidth": 256,
            "thumbheight": 144
        }]
    })
}

#[tokio::test]
async fn items_keep_filter_order_and_drop_missing_rows() {
    let entries = filter_entries(SourceMode::HighFps, "", &RecentCatalog::default(), 40);
    assert_eq!(entries.len(), 6);

    // Page ids sort in a different order than the table; one title has no imageinfo.
    let api = FakeApi::with([json!({
        "query": {"pages": {
            "1": thumb_page("File:Stugl,aerial video.webm", 1920, 1080),
            "2": thumb_page("File:Spectator Mode for Job Simulator - a new way to display social VR footage.webm", 1920, 1080),
            "3": {"title": "File:ManifoldGarden BRoll01 E3 V01.webm", "missing": ""},
            "4": thumb_page("File:Big_Buck_Bunny_4K.webm", 3840, 2160)
        }}
    })]);

    let display = DisplayConfig {
        device_pixel_ratio: 2.0,
        thumb_size: 128,
    };
    let items = fetch_items(&api, &entries, &display).await.unwrap();

    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        [
            "File:Spectator Mode for Job Simulator - a new way to display social VR footage.webm",
            "File:Big Buck Bunny 4K.webm",
            "File:Stugl,aerial video.webm",
        ]
    );

    let bunny = &items[1];
    assert_eq!(bunny.format_label, "3840x2160 60fps");
    assert_eq!((bunny.thumb_width, bunny.thumb_height), (128.0, 72.0));
    assert_eq!(bunny.description.as_deref(), Some("animation (has 1000fps bug)"));

    // One batched request at DPR-scaled size.
    assert_eq!(api.calls().len(), 1);
    assert_eq!(api.param(0, "iiurlwidth").as_deref(), Some("256"));
    assert_eq!(api.param(0, "prop").as_deref(), Some("imageinfo"));
    let titles_param = api.param(0, "titles").unwrap();
    assert_eq!(titles_param.split('|').count(), 6);
    assert!(titles_param.starts_with("File:Spectator Mode"));
}

#[tokio::test]
async fn audio_files_are_labelled() {
    let recent = RecentCatalog::from_pairs([("2017-03-01", "Birdsong.oga")]);
    let entries = filter_entries(SourceMode::Motd, "bird", &recent, 40);
    let api = FakeApi::with([json!({
        "query": {"pages": {"7": thumb_page("File:Birdsong.oga", 0, 0)}}
    })]);

    let items = fetch_items(&api, &entries, &DisplayConfig::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].format_label, "audio");
    assert_eq!(items[0].description, None);
    assert_eq!(api.param(0, "iiurlheight").as_deref(), Some("128"));
}

#[tokio::test]
async fn empty_filter_result_skips_request() {
    let api = FakeApi::default();
    let entries = filter_entries(SourceMode::Blender, "no such thing", &RecentCatalog::default(), 40);
    assert!(entries.is_empty());

    let items = fetch_items(&api, &entries, &DisplayConfig::default())
        .await
        .unwrap();
    assert!(items.is_empty());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn recent_catalog_from_expanded_templates() {
    let api = FakeApi::with([json!({
        "expandtemplates": {
            "*": "2016-09-20|First.webm\n2016-09-21|Loop.gif\n2016-09-22|Second.ogv\n"
        }
    })]);
    let today = NaiveDate::from_ymd_opt(2016, 9, 22).unwrap();

    let recent = fetch_recent(&api, today).await.unwrap();
    assert_eq!(recent.files().collect::<Vec<_>>(), ["First.webm", "Second.ogv"]);

    assert_eq!(api.param(0, "action").as_deref(), Some("expandtemplates"));
    let text = api.param(0, "text").unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.ends_with("2016-09-22|{{Motd/2016-09-22}}\n"));

    let newest_first = filter_entries(SourceMode::Motd, "", &recent, 40);
    assert_eq!(newest_first[0].title.as_str(), "File:Second.ogv");
}

#[tokio::test]
#[ignore]
async fn live_commons_lookup() {
    use media_proto::api::CommonsClient;
    use media_proto::config::ApiConfig;
    use media_proto::protocol::MediaTitle;
    use media_proto::resolver::resolve;

    let client = CommonsClient::new(&ApiConfig::default()).unwrap();
    let res = resolve(&client, &MediaTitle::default(), SourceMode::Motd)
        .await
        .unwrap();
    assert!(res.candidates[0].is_original());
    assert_eq!(res.candidates[0].format, "ogv");
}
