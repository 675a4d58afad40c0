//! 通过 yt-dlp 提取 mp3 音频

use std::path::PathBuf;
use std::process::Stdio;

use application::{AudioExtractor, ExtractError, ExtractedAudio};
use async_trait::async_trait;
use domain::MediaLocator;
use tokio::process::Command;

pub struct YtDlpExtractor {
    binary: PathBuf,
    output_dir: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(binary: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
        }
    }

    fn output_template(&self) -> String {
        self.output_dir
            .join("%(id)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

/// 按打印顺序取出标题和最终文件路径
fn parse_printed(stdout: &str) -> Option<(String, PathBuf)> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let path = lines.next_back()?;
    let title = lines.next_back().unwrap_or_default();
    Some((title.to_string(), PathBuf::from(path)))
}

#[async_trait]
impl AudioExtractor for YtDlpExtractor {
    async fn extract(&self, locator: &MediaLocator) -> Result<ExtractedAudio, ExtractError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ExtractError::Io(e.to_string()))?;

        let output = Command::new(&self.binary)
            .args(["-x", "--audio-format", "mp3", "--audio-quality", "192K"])
            .arg("-o")
            .arg(self.output_template())
            .args(["--print", "after_move:title", "--print", "after_move:filepath"])
            .arg(locator.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExtractError::Failed(format!("cannot run {}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("unknown error")
                .trim()
                .to_string();
            tracing::warn!(status = ?output.status.code(), reason = %reason, "yt-dlp 执行失败");
            return Err(ExtractError::Failed(reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (title, path) = parse_printed(&stdout)
            .ok_or_else(|| ExtractError::Failed("yt-dlp printed no output file".into()))?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ExtractError::Io(format!("missing output {}", path.display())));
        }

        let title = if title.is_empty() {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio".into())
        } else {
            title
        };

        tracing::info!(path = %path.display(), "音频提取完成");
        Ok(ExtractedAudio { path, title })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printed_lines_give_title_then_path() {
        let (title, path) = parse_printed("My Reel\n/tmp/out/abc.mp3\n\n").unwrap();
        assert_eq!(title, "My Reel");
        assert_eq!(path, PathBuf::from("/tmp/out/abc.mp3"));

        let (title, _) = parse_printed("/tmp/out/abc.mp3").unwrap();
        assert!(title.is_empty());

        assert!(parse_printed("  \n").is_none());
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_the_produced_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio");
        let mp3 = out.join("abc.mp3");
        let binary = script(
            dir.path(),
            &format!("printf 'ID3' > '{}'\necho 'Sunset Reel'\necho '{}'", mp3.display(), mp3.display()),
        );
        let locator = MediaLocator::parse("https://cdn.example/v.mp4").unwrap();

        let audio = YtDlpExtractor::new(binary, &out).extract(&locator).await.unwrap();

        assert_eq!(audio.path, mp3);
        assert_eq!(audio.title, "Sunset Reel");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_run_reports_last_stderr_line() {
        let dir = tempfile::tempdir().unwrap();
        let binary = script(dir.path(), "echo 'WARNING: x' >&2\necho 'ERROR: ffmpeg not found' >&2\nexit 1");
        let locator = MediaLocator::parse("https://cdn.example/v.mp4").unwrap();

        let err = YtDlpExtractor::new(binary, dir.path().join("audio"))
            .extract(&locator)
            .await
            .unwrap_err();

        assert_eq!(err, ExtractError::Failed("ERROR: ffmpeg not found".into()));
    }
}
