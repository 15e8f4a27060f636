#![allow(dead_code)]

use async_trait::async_trait;
use media_proto::api::{MetadataApi, Params};
use media_proto::{PickerError, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned bodies in order and records every request.
#[derive(Default)]
pub struct FakeApi {
    responses: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<Params>>,
}

impl FakeApi {
    pub fn with(bodies: impl IntoIterator<Item = Value>) -> Self {
        let api = Self::default();
        for body in bodies {
            api.push(Ok(body));
        }
        api
    }

    pub fn push(&self, response: Result<Value>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<Params> {
        self.calls.lock().unwrap().clone()
    }

    pub fn param(&self, call: usize, name: &str) -> Option<String> {
        self.calls()
            .get(call)?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl MetadataApi for FakeApi {
    async fn query(&self, params: Params) -> Result<Value> {
        self.calls.lock().unwrap().push(params);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PickerError::Transport("no canned response".into())))
    }
}

pub const ORIGINAL_URL: &str =
    "https://upload.wikimedia.org/wikipedia/commons/a/ab/Clip.webm";

/// A `prop=imageinfo|transcodestatus` body for a 1920x1080 webm.
pub fn media_page(metadata: Value, transcodes: Value) -> Value {
    json!({
        "query": {
            "pages": {
                "4242": {
                    "title": "File:Clip.webm",
                    "imageinfo": [{
                        "url": ORIGINAL_URL,
                        "size": 24_000_000u64,
                        "width": 1920,
                        "height": 1080,
                        "mediatype": "VIDEO",
                        "metadata": metadata,
                        "thumburl": "https://upload.wikimedia.org/thumb/Clip.webm.jpg",
                        "thumbwidth": 1280,
                        "thumbheight": 720
                    }],
                    "transcodestatus": transcodes
                }
            }
        }
    })
}
