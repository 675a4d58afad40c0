//! HTTP 媒体提供方
//!
//! 两个提供方都是 `GET <base>?url=<来源链接>`，只是成功响应的形态不同。

use std::sync::Arc;

use application::{MediaProvider, ProviderError};
use async_trait::async_trait;
use config::{ProviderConfig, ProviderKind};
use domain::{MediaLocator, SourceUrl};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// 发起一次查询并把响应体解析成 `T`
async fn query_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    base_url: &str,
    source: &SourceUrl,
) -> Result<T, ProviderError> {
    let response = client
        .get(base_url)
        .query(&[("url", source.as_str())])
        .send()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::Malformed(format!("HTTP {}: {e}", status.as_u16()))
    })
}

fn locator(raw: &str) -> Result<MediaLocator, ProviderError> {
    MediaLocator::parse(raw).map_err(|e| ProviderError::Declined(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct DurgeshResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    video: Option<String>,
}

/// `{"status": "success", "video": "<url>"}`
pub struct DurgeshProvider {
    client: reqwest::Client,
    base_url: String,
}

impl DurgeshProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MediaProvider for DurgeshProvider {
    fn name(&self) -> &'static str {
        "durgesh"
    }

    async fn attempt_resolve(&self, source: &SourceUrl) -> Result<MediaLocator, ProviderError> {
        let body: DurgeshResponse = query_json(&self.client, &self.base_url, source).await?;
        match (body.status.as_deref(), body.video.as_deref()) {
            (Some("success"), Some(video)) if !video.is_empty() => locator(video),
            (status, _) => Err(ProviderError::Declined(format!(
                "status={}",
                status.unwrap_or("<missing>")
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HazexResult {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HazexResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    result: Option<HazexResult>,
}

impl HazexResponse {
    /// `error` 缺失或为假值（null、false、0、空串、空容器）时视为没有错误
    fn has_error(&self) -> bool {
        use serde_json::Value;

        match &self.error {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(fields)) => !fields.is_empty(),
        }
    }
}

/// `{"error": false, "result": {"url": "<url>"}}`
pub struct HazexProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HazexProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MediaProvider for HazexProvider {
    fn name(&self) -> &'static str {
        "hazex"
    }

    async fn attempt_resolve(&self, source: &SourceUrl) -> Result<MediaLocator, ProviderError> {
        let body: HazexResponse = query_json(&self.client, &self.base_url, source).await?;
        if body.has_error() {
            return Err(ProviderError::Declined(format!(
                "error={}",
                body.error.unwrap_or_default()
            )));
        }
        match body.result.and_then(|r| r.url) {
            Some(url) if !url.is_empty() => locator(&url),
            _ => Err(ProviderError::Declined("missing result.url".into())),
        }
    }
}

/// 按配置顺序构建提供方列表
pub fn build_providers(
    client: &reqwest::Client,
    configs: &[ProviderConfig],
) -> Vec<Arc<dyn MediaProvider>> {
    configs
        .iter()
        .map(|cfg| -> Arc<dyn MediaProvider> {
            match cfg.kind {
                ProviderKind::Durgesh => {
                    Arc::new(DurgeshProvider::new(client.clone(), cfg.base_url.clone()))
                }
                ProviderKind::Hazex => {
                    Arc::new(HazexProvider::new(client.clone(), cfg.base_url.clone()))
                }
            }
        })
        .collect()
}
