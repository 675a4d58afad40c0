//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - Bot API 接入
//! - 媒体提供方列表
//! - 订阅门槛与运营名单
//! - 广播、链接缓存、Redis 与本地媒体目录
//!
//! 加载顺序：内置默认值 → 可选配置文件（`REELCAST_CONFIG_FILE`）→ 环境变量（`REELCAST_*`，
//! 嵌套字段用 `__` 分隔，例如 `REELCAST_TELEGRAM__BOT_TOKEN`）。

use std::time::Duration;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const ENV_PREFIX: &str = "REELCAST_";
pub const CONFIG_FILE_ENV: &str = "REELCAST_CONFIG_FILE";

/// Bot API 配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelegramConfig {
    #[validate(length(min = 1, message = "bot token is required"))]
    pub bot_token: String,
    #[validate(url)]
    pub api_base: String,
    /// getUpdates 长轮询时长
    pub poll_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".into(),
            poll_timeout_secs: 30,
            request_timeout_secs: 60,
        }
    }
}

/// 媒体提供方的接口形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `{"status": "success", "video": "..."}`
    Durgesh,
    /// `{"error": false, "result": {"url": "..."}}`
    Hazex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[validate(url)]
    pub base_url: String,
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            kind: ProviderKind::Durgesh,
            base_url: "https://insta-dl-api.durgesh-024.workers.dev/".into(),
        },
        ProviderConfig {
            kind: ProviderKind::Hazex,
            base_url: "https://insta-dl.hazex.workers.dev/".into(),
        },
    ]
}

/// 订阅门槛：两个会话都可以不配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// 必须直接加入的会话（`@username` 或数字 ID）
    #[serde(default)]
    pub direct_chat: Option<String>,
    /// 加入请求即可的会话
    #[serde(default)]
    pub request_chat: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub inter_send_delay_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            inter_send_delay_ms: 100,
        }
    }
}

impl BroadcastConfig {
    pub fn inter_send_delay(&self) -> Duration {
        Duration::from_millis(self.inter_send_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LinkCacheConfig {
    #[validate(range(min = 1))]
    pub ttl_secs: u64,
    #[validate(range(min = 1))]
    pub max_capacity: u64,
}

impl Default for LinkCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 6 * 60 * 60,
            max_capacity: 10_000,
        }
    }
}

impl LinkCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// 未配置 URL 时使用内存受众存储
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RedisConfig {
    #[serde(default)]
    #[validate(url)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// 本地上传回退时的临时目录
    pub scratch_dir: String,
    /// yt-dlp 输出目录
    pub audio_dir: String,
    pub ytdlp_binary: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            scratch_dir: "downloads".into(),
            audio_dir: "downloads/audio".into(),
            ytdlp_binary: "yt-dlp".into(),
        }
    }
}

/// 消息键盘中的更新频道与支持群链接
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LinksConfig {
    #[serde(default)]
    #[validate(url)]
    pub support_channel: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub support_group: Option<String>,
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub telegram: TelegramConfig,
    /// 按顺序尝试的提供方
    #[serde(default = "default_providers")]
    #[validate(nested)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    /// 可以执行统计与广播命令的用户 ID
    #[serde(default)]
    pub operators: Vec<i64>,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    #[validate(nested)]
    pub link_cache: LinkCacheConfig,
    #[serde(default)]
    #[validate(nested)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    #[validate(nested)]
    pub links: LinksConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            providers: default_providers(),
            subscription: SubscriptionConfig::default(),
            operators: Vec::new(),
            broadcast: BroadcastConfig::default(),
            link_cache: LinkCacheConfig::default(),
            redis: RedisConfig::default(),
            media: MediaConfig::default(),
            links: LinksConfig::default(),
        }
    }
}

impl AppConfig {
    /// 按 默认值 → 配置文件 → 环境变量 的优先级加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(fig: Figment) -> Result<Self, ConfigError> {
        let cfg: AppConfig = fig.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 从 TOML/YAML/JSON 字符串解析，按简单特征判断格式
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = if s.trim_start().starts_with('{') {
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else if s.contains('[') || s.contains('=') {
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// 字段校验之外的整体约束
    pub fn validate(&self) -> Result<(), ConfigError> {
        Validate::validate(self)?;

        if self.providers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one media provider must be configured".into(),
            ));
        }
        for (field, value) in [
            ("subscription.direct_chat", &self.subscription.direct_chat),
            ("subscription.request_chat", &self.subscription.request_chat),
        ] {
            if matches!(value.as_deref(), Some(v) if v.trim().trim_start_matches('@').is_empty()) {
                return Err(ConfigError::Invalid(format!("{field} cannot be blank")));
            }
        }
        if self.media.scratch_dir.trim().is_empty() || self.media.audio_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("media directories cannot be empty".into()));
        }

        Ok(())
    }

    /// 日志用的脱敏表示
    pub fn sanitize(&self) -> String {
        let mut copy = self.clone();
        if !copy.telegram.bot_token.is_empty() {
            copy.telegram.bot_token = "[REDACTED]".into();
        }
        if copy.redis.url.is_some() {
            copy.redis.url = Some("[REDACTED]".into());
        }
        format!("{copy:?}")
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
