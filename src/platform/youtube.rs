// src/platform/youtube.rs

//! HTTP implementation of [`Platform`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::{CrawlerConfig, Cursor};
use crate::platform::Platform;
use crate::services::{ItemDetail, PLAYER_RESPONSE, extract_embedded_json, parse_item_detail};
use crate::utils::http::{check_status, create_async_client};

/// Talks to the web frontend: plain page GETs plus the `browse` endpoint for
/// continuations.
#[derive(Clone)]
pub struct YoutubePlatform {
    client: Client,
    base_url: String,
    client_version: String,
}

impl YoutubePlatform {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_version: config.client_version.clone(),
        })
    }

    fn browse_url(&self) -> String {
        format!("{}/youtubei/v1/browse?prettyPrint=false", self.base_url)
    }

    fn watch_url(&self, item_id: &str) -> String {
        format!("{}/watch?v={}", self.base_url, item_id)
    }

    fn continuation_body(&self, cursor: &Cursor) -> Value {
        json!({
            "context": {
                "client": {
                    "clientName": "WEB",
                    "clientVersion": self.client_version,
                    "hl": "en",
                    "gl": "US",
                    "originalUrl": cursor.context_url,
                }
            },
            "continuation": cursor.token,
        })
    }
}

#[async_trait]
impl Platform for YoutubePlatform {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        check_status(url, response.status())?;
        Ok(response.text().await?)
    }

    async fn fetch_continuation(&self, cursor: &Cursor) -> Result<Value> {
        let url = self.browse_url();
        log::debug!("POST {} (continuation for {})", url, cursor.context_url);
        let response = self
            .client
            .post(&url)
            .json(&self.continuation_body(cursor))
            .send()
            .await?;
        check_status(&url, response.status())?;
        Ok(response.json().await?)
    }

    async fn fetch_item_detail(&self, item_id: &str) -> Result<ItemDetail> {
        let page = self.fetch_page(&self.watch_url(item_id)).await?;
        let player_response = extract_embedded_json(&page, PLAYER_RESPONSE)?;
        Ok(parse_item_detail(&player_response))
    }
}
