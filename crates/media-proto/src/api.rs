//! Commons metadata API client and the response shapes the picker reads.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{PickerError, Result};

/// Ordered `name → value` request parameters.
pub type Params = Vec<(String, String)>;

/// Build a parameter list from string pairs.
pub fn params<const N: usize>(pairs: [(&str, String); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Anything that can run a metadata query and hand back the parsed JSON body.
#[async_trait]
pub trait MetadataApi: Send + Sync {
    async fn query(&self, params: Params) -> Result<Value>;
}

/// `MetadataApi` over HTTP: form-encoded POST to the configured endpoint.
#[derive(Clone)]
pub struct CommonsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CommonsClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl MetadataApi for CommonsClient {
    async fn query(&self, mut params: Params) -> Result<Value> {
        params.push(("format".to_string(), "json".to_string()));
        debug!("api: POST {} {:?}", self.endpoint, params);

        let response = self
            .client
            .post(&self.endpoint)
            // anonymous CORS
            .query(&[("origin", "*")])
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(PickerError::Transport(format!(
                "unexpected status {} from metadata api",
                status
            )));
        }

        Ok(response.json().await?)
    }
}

// ── Response shapes ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub query: Option<QueryBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryBody {
    #[serde(default, deserialize_with = "pages_map")]
    pub pages: Vec<Page>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub imageinfo: Option<Vec<ImageInfo>>,
    #[serde(default, deserialize_with = "transcode_map")]
    pub transcodestatus: Option<BTreeMap<String, TranscodeStatus>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub mediatype: String,
    #[serde(default)]
    pub metadata: Option<Vec<MetadataPair>>,
    #[serde(default)]
    pub thumburl: Option<String>,
    #[serde(default)]
    pub thumbwidth: u32,
    #[serde(default)]
    pub thumbheight: u32,
}

impl ImageInfo {
    /// Numeric metadata value by name. Accepts numbers and numeric strings.
    pub fn metadata_number(&self, name: &str) -> Option<f64> {
        self.metadata
            .as_ref()?
            .iter()
            .find(|pair| pair.name == name)
            .and_then(|pair| value_as_f64(&pair.value))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataPair {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// One entry of `transcodestatus`, reduced to the two fields the resolver uses.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct TranscodeStatus {
    /// Empty (or null) until the transcode has finished.
    #[serde(default, deserialize_with = "lenient_string")]
    pub time_success: String,
    /// Bits per second. Zero while the transcode is still in progress.
    #[serde(default, deserialize_with = "lenient_number")]
    pub final_bitrate: f64,
}

impl TranscodeStatus {
    /// Finished and usable. A zero bitrate is taken to mean "still running";
    /// the API has no explicit in-progress flag, so this is a heuristic.
    pub fn is_complete(&self) -> bool {
        !self.time_success.is_empty() && self.final_bitrate > 0.0
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpandTemplatesResponse {
    #[serde(default)]
    pub expandtemplates: Option<ExpandTemplatesBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpandTemplatesBody {
    #[serde(rename = "*", default)]
    pub text: String,
}

/// Deserialize a JSON body into one of the shapes above.
pub fn parse<T: for<'de> Deserialize<'de>>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| PickerError::InvalidResponse(e.to_string()))
}

// ── Lenient field helpers ─────────────────────────────────────────────────────

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_as_f64(&value).unwrap_or(0.0))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// `pages` is an object keyed by page id; order by id is good enough for the
/// single-title lookup and the thumbnail batch keys rows by title anyway.
fn pages_map<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<Page>, D::Error> {
    let pages: Option<BTreeMap<String, Page>> = Option::deserialize(d)?;
    Ok(pages.map(|m| m.into_values().collect()).unwrap_or_default())
}

/// The API sends `[]` instead of `{}` for a file with no transcodes.
fn transcode_map<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<BTreeMap<String, TranscodeStatus>>, D::Error> {
    match Value::deserialize(d)? {
        Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (key, entry) in map {
                let status = serde_json::from_value(entry).map_err(serde::de::Error::custom)?;
                out.insert(key, status);
            }
            Ok(Some(out))
        }
        Value::Array(_) => Ok(Some(BTreeMap::new())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transcode_status_lenient_fields() {
        let status: TranscodeStatus =
            serde_json::from_value(json!({"time_success": "2020", "final_bitrate": "0"})).unwrap();
        assert_eq!(status.time_success, "2020");
        assert_eq!(status.final_bitrate, 0.0);
        assert!(!status.is_complete());

        let status: TranscodeStatus =
            serde_json::from_value(json!({"time_success": null, "final_bitrate": 512000})).unwrap();
        assert!(!status.is_complete());

        let status: TranscodeStatus = serde_json::from_value(
            json!({"time_success": "20160101000000", "final_bitrate": "512000"}),
        )
        .unwrap();
        assert!(status.is_complete());
    }

    #[test]
    fn test_page_with_array_transcodestatus() {
        let resp: QueryResponse = parse(json!({
            "query": {"pages": {"12": {"title": "File:A.ogv", "transcodestatus": []}}}
        }))
        .unwrap();
        let pages = resp.query.unwrap().pages;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].transcodestatus.as_ref().map(|m| m.len()), Some(0));
        assert!(pages[0].imageinfo.is_none());
    }

    #[test]
    fn test_metadata_number_accepts_strings() {
        let info: ImageInfo = serde_json::from_value(json!({
            "metadata": [
                {"name": "playtime_seconds", "value": "12.5"},
                {"name": "length", "value": 30}
            ]
        }))
        .unwrap();
        assert_eq!(info.metadata_number("length"), Some(30.0));
        assert_eq!(info.metadata_number("playtime_seconds"), Some(12.5));
        assert_eq!(info.metadata_number("width"), None);
    }

    #[test]
    fn test_expandtemplates_body() {
        let resp: ExpandTemplatesResponse =
            parse(json!({"expandtemplates": {"*": "2016-09-20|A.webm\n"}})).unwrap();
        assert_eq!(resp.expandtemplates.unwrap().text, "2016-09-20|A.webm\n");
    }
}
