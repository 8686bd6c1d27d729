//! Client for the remote task store.
//!
//! The store exposes a plain resource API under one base URL:
//! `GET` lists, `POST` creates, `PATCH {id}` updates and `DELETE {id}` removes.

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tasklist_shared::{Ack, Task, TaskCreate, TaskPatch};
use tracing::{debug, instrument};

use crate::config::Config;

pub mod memory;

const BODY_EXCERPT_LIMIT: usize = 256;

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Task>>;

    async fn create(&self, create: &TaskCreate) -> anyhow::Result<Ack>;

    async fn update(&self, id: &str, patch: &TaskPatch) -> anyhow::Result<Ack>;

    async fn delete(&self, id: &str) -> anyhow::Result<Ack>;
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: cfg.api_url()?,
            timeout: cfg.api_timeout()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpTaskApi {
    pub fn new(settings: &ApiSettings) -> anyhow::Result<Self> {
        let base = Url::parse(&settings.base_url)
            .with_context(|| format!("invalid api url: {}", settings.base_url))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("api url cannot be a base: {base}"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tasklist/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build http client")?;

        debug!(base = %base, timeout_ms = settings.timeout.as_millis() as u64, "http task api ready");
        Ok(Self { client, base })
    }

    /// `/api/tasks` for listing.
    fn collection_url(&self) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
        }
        url
    }

    /// `/api/tasks/` for creating.
    fn create_url(&self) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("");
        }
        url
    }

    fn item_url(&self, id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }

    async fn send<B, R>(&self, method: Method, url: Url, body: Option<&B>) -> anyhow::Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("failed to read {method} {url} response body"))?;

        debug!(%method, %url, status = status.as_u16(), body_len = text.len(), "store responded");

        if !status.is_success() {
            return Err(anyhow!(
                "{method} {url} returned {status}: {}",
                excerpt(&text)
            ));
        }

        serde_json::from_str(&text)
            .with_context(|| format!("failed to decode {method} {url} response: {}", excerpt(&text)))
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    #[instrument(skip(self))]
    async fn list(&self) -> anyhow::Result<Vec<Task>> {
        self.send::<(), _>(Method::GET, self.collection_url(), None)
            .await
            .context("failed to list tasks")
    }

    #[instrument(skip(self, create), fields(title_len = create.title.len()))]
    async fn create(&self, create: &TaskCreate) -> anyhow::Result<Ack> {
        self.send(Method::POST, self.create_url(), Some(create))
            .await
            .context("failed to create task")
    }

    #[instrument(skip(self, patch), fields(status = %patch.completed))]
    async fn update(&self, id: &str, patch: &TaskPatch) -> anyhow::Result<Ack> {
        self.send(Method::PATCH, self.item_url(id), Some(patch))
            .await
            .with_context(|| format!("failed to update task {id}"))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> anyhow::Result<Ack> {
        self.send::<(), _>(Method::DELETE, self.item_url(id), None)
            .await
            .with_context(|| format!("failed to delete task {id}"))
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_EXCERPT_LIMIT).collect();
    out.push('…');
    out
}
