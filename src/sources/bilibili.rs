//! Bilibili video metadata source.
//!
//! Fetches title, uploader, view count and duration from the public
//! `x/web-interface/view` endpoint and turns each video into a [`Document`]
//! whose metadata matches [`FieldSchema::video_metadata`](crate::selfquery::FieldSchema::video_metadata).

use crate::sources::pacer::RequestPacer;
use crate::types::{AppError, Document, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.bilibili.com";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com/";
const VIDEO_PAGE_BASE: &str = "https://www.bilibili.com/video";

/// HTTP settings for [`BilibiliClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub user_agent: String,
    pub referer: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<ViewData>,
}

#[derive(Debug, Deserialize)]
struct ViewData {
    title: String,
    owner: Owner,
    stat: Stat,
    duration: i64,
}

#[derive(Debug, Deserialize)]
struct Owner {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Stat {
    view: i64,
}

/// Metadata of one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub bvid: String,
    pub title: String,
    pub author: String,
    pub view_count: i64,
    /// Duration in seconds
    pub length: i64,
}

impl VideoInfo {
    pub fn source_url(&self) -> String {
        format!("{}/{}", VIDEO_PAGE_BASE, self.bvid)
    }

    pub fn into_document(self) -> Document {
        let content = format!(
            "Title: {}\nAuthor: {}\nViews: {}\nDuration: {}s",
            self.title, self.author, self.view_count, self.length
        );
        let source = self.source_url();
        Document::new(content)
            .with_metadata("title", self.title)
            .with_metadata("author", self.author)
            .with_metadata("view_count", self.view_count)
            .with_metadata("length", self.length)
            .with_metadata("source", source)
    }
}

/// Video id from a video page URL: the last non-empty path segment with
/// any query string or fragment removed.
///
/// ```
/// use selfquery::sources::bilibili::extract_bvid;
///
/// assert_eq!(
///     extract_bvid("https://www.bilibili.com/video/BV1Bo4y1A7FU/?spm_id_from=333"),
///     Some("BV1Bo4y1A7FU".to_string())
/// );
/// ```
pub fn extract_bvid(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .map(str::trim)
        .rfind(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .map(str::to_string)
}

/// Client for the video metadata API.
#[derive(Debug, Clone)]
pub struct BilibiliClient {
    http: Client,
    base_url: String,
}

impl BilibiliClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = Client::builder()
            .user_agent(options.user_agent)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let referer = reqwest::header::HeaderValue::from_str(&options.referer)
                    .map_err(|e| AppError::Configuration(format!("Invalid referer: {}", e)))?;
                headers.insert(reqwest::header::REFERER, referer);
                headers
            })
            .timeout(options.timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one video's metadata.
    ///
    /// # Errors
    ///
    /// [`AppError::SourceFetch`] on network failure, a non-success HTTP
    /// status, a malformed body, or a non-zero API `code`.
    pub async fn fetch_video(&self, bvid: &str) -> Result<VideoInfo> {
        if bvid.trim().is_empty() {
            return Err(AppError::InvalidInput("Video id cannot be empty".to_string()));
        }

        let url = format!("{}/x/web-interface/view", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("bvid", bvid)])
            .send()
            .await
            .map_err(|e| AppError::SourceFetch(format!("Request for {} failed: {}", bvid, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::SourceFetch(format!(
                "Request for {} returned HTTP {}",
                bvid, status
            )));
        }

        let body: ViewResponse = response.json().await.map_err(|e| {
            AppError::SourceFetch(format!("Malformed response for {}: {}", bvid, e))
        })?;

        if body.code != 0 {
            return Err(AppError::SourceFetch(format!(
                "API returned code {} for {}: {}",
                body.code, bvid, body.message
            )));
        }

        let data = body
            .data
            .ok_or_else(|| AppError::SourceFetch(format!("Response for {} has no data", bvid)))?;

        debug!(bvid, title = %data.title, "Fetched video metadata");
        Ok(VideoInfo {
            bvid: bvid.to_string(),
            title: data.title,
            author: data.owner.name,
            view_count: data.stat.view,
            length: data.duration,
        })
    }
}

/// Batch loader: fetches videos one at a time through a [`RequestPacer`].
pub struct VideoLoader {
    client: BilibiliClient,
    pacer: RequestPacer,
}

impl VideoLoader {
    pub fn new(client: BilibiliClient, pacer: RequestPacer) -> Self {
        Self { client, pacer }
    }

    /// Load every URL that can be fetched, skipping the rest.
    ///
    /// # Errors
    ///
    /// [`AppError::SourceFetch`] if `urls` is empty or no video loaded.
    pub async fn load(&self, urls: &[String]) -> Result<Vec<Document>> {
        if urls.is_empty() {
            return Err(AppError::SourceFetch("No video URLs given".to_string()));
        }

        let mut documents = Vec::with_capacity(urls.len());
        for url in urls {
            let bvid = match extract_bvid(url) {
                Some(bvid) => bvid,
                None => {
                    warn!(url = %url, "Could not extract a video id, skipping");
                    continue;
                }
            };

            self.pacer.wait().await;
            match self.client.fetch_video(&bvid).await {
                Ok(video) => {
                    info!(bvid = %bvid, title = %video.title, "Loaded video");
                    documents.push(video.into_document());
                }
                Err(e) => warn!(url = %url, error = %e, "Skipping video"),
            }
        }

        if documents.is_empty() {
            return Err(AppError::SourceFetch(format!(
                "None of the {} videos could be loaded",
                urls.len()
            )));
        }

        info!(loaded = documents.len(), requested = urls.len(), "Video loading complete");
        Ok(documents)
    }
}
