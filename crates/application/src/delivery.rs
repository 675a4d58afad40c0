//! 媒体投递
//!
//! 先让平台直接拉取远程地址；失败后下载到临时文件再上传。
//! 临时文件在任何退出路径上都会被删除。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use domain::{ChatId, InlineKeyboard, MediaLocator, MessageId};
use thiserror::Error;

use crate::fetcher::{FetchError, MediaFetcher};
use crate::platform::{MediaSource, MessagingPlatform, PlatformError};
use crate::progress::ProgressMessage;

/// 投递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    RemoteReference,
    LocalUpload { bytes: u64 },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    #[error("Failed to download video locally: {0}")]
    Download(#[from] FetchError),

    #[error("{0}")]
    Upload(PlatformError),
}

/// 投递目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    pub chat_id: ChatId,
    pub reply_to: Option<MessageId>,
    /// 决定临时文件名，通常是原始消息 ID
    pub scratch_key: String,
}

/// 随作用域结束删除的临时文件
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    pub fn new(dir: &Path, key: &str) -> Self {
        Self::adopt(dir.join(format!("{key}.mp4")))
    }

    /// 接管一个已存在的文件，作用域结束时删除
    pub fn adopt(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 正常路径上异步删除；失败时交给 `Drop` 再试一次
    pub async fn remove(mut self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "临时文件已删除");
                self.removed = true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.removed = true,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "异步删除临时文件失败");
            }
        }
    }
}

impl Drop for ScratchFile {
    // 提前返回或 panic 时兜底，只有一次 unlink，直接同步执行
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "临时文件已删除"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "删除临时文件失败"),
        }
    }
}

pub struct DeliveryResolver {
    platform: Arc<dyn MessagingPlatform>,
    fetcher: Arc<dyn MediaFetcher>,
    scratch_dir: PathBuf,
}

impl DeliveryResolver {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        fetcher: Arc<dyn MediaFetcher>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            fetcher,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub async fn deliver(
        &self,
        locator: &MediaLocator,
        target: &DeliveryTarget,
        keyboard: Option<&InlineKeyboard>,
        progress: Option<&ProgressMessage>,
    ) -> Result<DeliveryMethod, DeliveryError> {
        let remote = MediaSource::Remote(locator.clone());
        match self
            .platform
            .send_video(target.chat_id, &remote, target.reply_to, keyboard)
            .await
        {
            Ok(_) => return Ok(DeliveryMethod::RemoteReference),
            Err(e) => {
                tracing::info!(
                    chat_id = %target.chat_id,
                    error = %e,
                    "平台无法直接拉取远程地址，改为本地上传"
                );
            }
        }

        if let Some(progress) = progress {
            progress.update("⏳ Uploading video...").await;
        }

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        let scratch = ScratchFile::new(&self.scratch_dir, &target.scratch_key);
        let bytes = self.fetcher.fetch_to_file(locator, scratch.path()).await?;

        let local = MediaSource::LocalFile(scratch.path().to_path_buf());
        self.platform
            .send_video(target.chat_id, &local, target.reply_to, keyboard)
            .await
            .map_err(DeliveryError::Upload)?;
        scratch.remove().await;

        Ok(DeliveryMethod::LocalUpload { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFetcher, FakePlatform};

    fn locator() -> MediaLocator {
        MediaLocator::parse("https://cdn.example/reel.mp4").unwrap()
    }

    fn target() -> DeliveryTarget {
        DeliveryTarget {
            chat_id: ChatId(10),
            reply_to: Some(MessageId(77)),
            scratch_key: "77".into(),
        }
    }

    #[tokio::test]
    async fn scratch_file_is_removed_on_both_paths() {
        let dir = tempfile::tempdir().unwrap();

        let explicit = ScratchFile::new(dir.path(), "500_1");
        tokio::fs::write(explicit.path(), b"v").await.unwrap();
        let path = explicit.path().to_path_buf();
        explicit.remove().await;
        assert!(!path.exists());

        let dropped = ScratchFile::new(dir.path(), "500_2");
        tokio::fs::write(dropped.path(), b"v").await.unwrap();
        let path = dropped.path().to_path_buf();
        drop(dropped);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn remote_reference_is_tried_first() {
        let platform = Arc::new(FakePlatform::default());
        let fetcher = Arc::new(FakeFetcher::ok(b"video"));
        let dir = tempfile::tempdir().unwrap();
        let resolver = DeliveryResolver::new(platform.clone(), fetcher.clone(), dir.path());

        let method = resolver.deliver(&locator(), &target(), None, None).await.unwrap();

        assert_eq!(method, DeliveryMethod::RemoteReference);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(platform.videos().len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_local_upload_and_removes_scratch_file() {
        let platform = Arc::new(FakePlatform::default());
        platform.fail_remote_videos();
        let fetcher = Arc::new(FakeFetcher::ok(b"video-bytes"));
        let dir = tempfile::tempdir().unwrap();
        let resolver = DeliveryResolver::new(platform.clone(), fetcher.clone(), dir.path());

        let method = resolver.deliver(&locator(), &target(), None, None).await.unwrap();

        assert_eq!(method, DeliveryMethod::LocalUpload { bytes: 11 });
        let uploads = platform.local_uploads();
        assert_eq!(uploads.len(), 1);
        let (path, existed_at_send) = &uploads[0];
        assert_eq!(path, &dir.path().join("77.mp4"));
        assert!(existed_at_send, "file must exist while uploading");
        assert!(!path.exists(), "scratch file must be removed");
    }

    #[tokio::test]
    async fn scratch_file_removed_when_local_upload_fails() {
        let platform = Arc::new(FakePlatform::default());
        platform.fail_remote_videos();
        platform.fail_local_videos();
        let fetcher = Arc::new(FakeFetcher::ok(b"video-bytes"));
        let dir = tempfile::tempdir().unwrap();
        let resolver = DeliveryResolver::new(platform.clone(), fetcher, dir.path());

        let err = resolver
            .deliver(&locator(), &target(), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Upload(_)));
        assert!(!dir.path().join("77.mp4").exists());
    }

    #[tokio::test]
    async fn non_success_download_is_a_hard_failure() {
        let platform = Arc::new(FakePlatform::default());
        platform.fail_remote_videos();
        let fetcher = Arc::new(FakeFetcher::status(404));
        let dir = tempfile::tempdir().unwrap();
        let resolver = DeliveryResolver::new(platform.clone(), fetcher, dir.path());

        let err = resolver
            .deliver(&locator(), &target(), None, None)
            .await
            .unwrap_err();

        assert_eq!(err, DeliveryError::Download(FetchError::Status(404)));
        assert!(platform.local_uploads().is_empty());
        assert!(!dir.path().join("77.mp4").exists());
    }
}
