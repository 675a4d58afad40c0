//! 主应用程序入口
//!
//! 加载配置、组装适配器与用例服务，然后长轮询 Bot API 并逐个分发更新。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use application::{
    AdminService, AdminServiceDependencies, BroadcastDispatcher, CommunityLinks, DeliveryResolver,
    EphemeralLinkCache, MediaService, MediaServiceDependencies, MessagingPlatform, PlatformError,
    ProviderChain, SubscriptionGate, UpdateRouter, UpdateSource,
};
use config::AppConfig;
use domain::{ChatRef, RequirementKind, SubscriptionRequirement, UserId};
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;

/// 轮询失败后的等待时间
const POLL_BACKOFF: Duration = Duration::from_secs(3);

fn subscription_requirements(config: &AppConfig) -> anyhow::Result<Vec<SubscriptionRequirement>> {
    let mut requirements = Vec::new();
    for (raw, kind) in [
        (&config.subscription.direct_chat, RequirementKind::Join),
        (&config.subscription.request_chat, RequirementKind::JoinRequest),
    ] {
        if let Some(raw) = raw {
            let chat = ChatRef::parse(raw)
                .with_context(|| format!("invalid subscription chat: {raw}"))?;
            requirements.push(SubscriptionRequirement::new(chat, kind));
        }
    }
    Ok(requirements)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(config = %config.sanitize(), "配置已加载");

    let infra = Infrastructure::build(&config)?;
    let platform: Arc<dyn MessagingPlatform> = infra.bot.clone();

    let me = platform.get_me().await.context("cannot reach Bot API")?;
    tracing::info!(bot = %me.username, "机器人身份已确认");

    let links = CommunityLinks {
        support_channel: config.links.support_channel.clone(),
        support_group: config.links.support_group.clone(),
    };

    let gate = Arc::new(SubscriptionGate::new(
        platform.clone(),
        subscription_requirements(&config)?,
    ));

    let media = Arc::new(MediaService::new(MediaServiceDependencies {
        platform: platform.clone(),
        gate,
        chain: ProviderChain::new(infra.providers.clone()),
        cache: EphemeralLinkCache::new(config.link_cache.ttl(), config.link_cache.max_capacity),
        resolver: DeliveryResolver::new(
            platform.clone(),
            infra.fetcher.clone(),
            infra.scratch_dir.clone(),
        ),
        extractor: infra.extractor.clone(),
        links: links.clone(),
    }));

    let dispatcher = Arc::new(BroadcastDispatcher::new(
        platform.clone(),
        infra.audience.clone(),
        config.broadcast.inter_send_delay(),
    ));
    let admin = Arc::new(AdminService::new(AdminServiceDependencies {
        platform: platform.clone(),
        audience: infra.audience.clone(),
        dispatcher,
        operators: config.operators.iter().copied().map(UserId).collect::<HashSet<_>>(),
        links,
    }));

    let router = Arc::new(UpdateRouter::new(platform, media, admin));
    let updates: Arc<dyn UpdateSource> = infra.bot.clone();

    tracing::info!("开始接收更新");
    tokio::select! {
        _ = poll_loop(updates, router) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("收到退出信号，停止接收更新");
        }
    }

    Ok(())
}

async fn poll_loop(updates: Arc<dyn UpdateSource>, router: Arc<UpdateRouter>) {
    loop {
        match updates.poll().await {
            Ok(events) => {
                for event in events {
                    let router = router.clone();
                    tokio::spawn(async move {
                        router.dispatch(event).await;
                    });
                }
            }
            Err(PlatformError::RateLimited { retry_after }) => {
                tracing::warn!(retry_after_secs = retry_after.as_secs(), "拉取更新被限流");
                tokio::time::sleep(retry_after).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "拉取更新失败");
                tokio::time::sleep(POLL_BACKOFF).await;
            }
        }
    }
}
