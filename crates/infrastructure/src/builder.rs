use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use application::{
    audience::memory::MemoryAudienceStore, AudienceStore, AudioExtractor, MediaFetcher,
    MediaProvider,
};
use config::AppConfig;
use thiserror::Error;

use crate::{
    audience::RedisAudienceStore, fetcher::HttpMediaFetcher, providers::build_providers,
    telegram::BotApiClient, ytdlp::YtDlpExtractor,
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// 组装好的外部适配器
#[derive(Clone)]
pub struct Infrastructure {
    pub bot: Arc<BotApiClient>,
    pub providers: Vec<Arc<dyn MediaProvider>>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub audience: Arc<dyn AudienceStore>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub scratch_dir: PathBuf,
}

impl Infrastructure {
    pub fn build(config: &AppConfig) -> Result<Self, InfrastructureError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.telegram.request_timeout_secs))
            .build()?;

        // 长轮询自带超时，单独一个不设全局超时的客户端
        let bot_http = reqwest::Client::builder().build()?;
        let bot = Arc::new(BotApiClient::new(
            bot_http,
            &config.telegram.api_base,
            &config.telegram.bot_token,
            Duration::from_secs(config.telegram.poll_timeout_secs),
        ));

        let audience: Arc<dyn AudienceStore> = match &config.redis.url {
            Some(url) => {
                let client = redis::Client::open(url.as_str())?;
                tracing::info!("受众存储：Redis");
                Arc::new(RedisAudienceStore::new(Arc::new(client)))
            }
            None => {
                tracing::warn!("未配置 Redis，受众数据只保存在内存中，重启后丢失");
                Arc::new(MemoryAudienceStore::new())
            }
        };

        let providers = build_providers(&http, &config.providers);
        tracing::info!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "媒体提供方已就绪"
        );

        Ok(Self {
            bot,
            providers,
            fetcher: Arc::new(HttpMediaFetcher::new(http)),
            audience,
            extractor: Arc::new(YtDlpExtractor::new(
                &config.media.ytdlp_binary,
                &config.media.audio_dir,
            )),
            scratch_dir: PathBuf::from(&config.media.scratch_dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_in_memory_audience() {
        let mut config = AppConfig::default();
        config.telegram.bot_token = "TOKEN".into();

        let infra = Infrastructure::build(&config).unwrap();

        assert_eq!(infra.providers.len(), 2);
        assert_eq!(infra.scratch_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn rejects_malformed_redis_url() {
        let mut config = AppConfig::default();
        config.redis.url = Some("not-a-redis-url".into());

        assert!(matches!(
            Infrastructure::build(&config),
            Err(InfrastructureError::Redis(_))
        ));
    }
}
