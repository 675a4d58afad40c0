//! 测试替身：内存版平台、下载器、音频提取器

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::{
    ChatId, ChatRef, InlineKeyboard, MediaLocator, MembershipStatus, MessageId, UserId,
};
use tokio::sync::Notify;

use crate::extractor::{AudioExtractor, ExtractError, ExtractedAudio};
use crate::fetcher::{FetchError, MediaFetcher};
use crate::platform::{
    AudioUpload, BotProfile, ChatInfo, MediaSource, MessagingPlatform, PlatformError, SentMessage,
};

#[derive(Default)]
struct Recorded {
    texts: Vec<(ChatId, String, Option<InlineKeyboard>)>,
    edits: Vec<(ChatId, MessageId, String)>,
    deletes: Vec<(ChatId, MessageId)>,
    videos: Vec<(ChatId, MediaSource, Option<InlineKeyboard>)>,
    local_uploads: Vec<(PathBuf, bool)>,
    audios: Vec<(ChatId, AudioUpload, bool)>,
    copies: Vec<(ChatId, ChatId, MessageId)>,
    pins: Vec<(ChatId, MessageId)>,
    callbacks: Vec<(String, Option<String>, bool)>,
    send_attempts: HashMap<ChatId, usize>,
}

/// 记录所有调用的平台替身，失败行为可按会话编排
#[derive(Default)]
pub struct FakePlatform {
    next_id: AtomicI64,
    recorded: Mutex<Recorded>,
    fail_remote: AtomicBool,
    fail_local: AtomicBool,
    fail_pins: AtomicBool,
    scripted_failures: Mutex<HashMap<ChatId, VecDeque<PlatformError>>>,
    permanent_failures: Mutex<HashMap<ChatId, PlatformError>>,
    memberships: Mutex<HashMap<(ChatRef, UserId), Result<MembershipStatus, PlatformError>>>,
    chats: Mutex<HashMap<ChatRef, ChatInfo>>,
    send_gate: Mutex<Option<Arc<Notify>>>,
    membership_lookups: AtomicUsize,
}

impl FakePlatform {
    fn next_message(&self, chat_id: ChatId) -> SentMessage {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1000;
        SentMessage {
            chat_id,
            message_id: MessageId(id),
        }
    }

    pub fn fail_remote_videos(&self) {
        self.fail_remote.store(true, Ordering::SeqCst);
    }

    pub fn fail_local_videos(&self) {
        self.fail_local.store(true, Ordering::SeqCst);
    }

    pub fn fail_pins(&self) {
        self.fail_pins.store(true, Ordering::SeqCst);
    }

    /// 对某个会话的下一次发送依次返回这些错误
    pub fn script_failures(&self, chat_id: ChatId, errors: Vec<PlatformError>) {
        self.scripted_failures
            .lock()
            .unwrap()
            .insert(chat_id, errors.into());
    }

    /// 对某个会话的发送始终失败
    pub fn always_fail(&self, chat_id: ChatId, error: PlatformError) {
        self.permanent_failures
            .lock()
            .unwrap()
            .insert(chat_id, error);
    }

    pub fn set_membership(
        &self,
        chat: ChatRef,
        user: UserId,
        status: Result<MembershipStatus, PlatformError>,
    ) {
        self.memberships
            .lock()
            .unwrap()
            .insert((chat, user), status);
    }

    pub fn set_chat(&self, chat: ChatRef, info: ChatInfo) {
        self.chats.lock().unwrap().insert(chat, info);
    }

    /// 广播发送在通知之前保持挂起
    pub fn hold_sends(&self, gate: Arc<Notify>) {
        *self.send_gate.lock().unwrap() = Some(gate);
    }

    pub fn texts(&self) -> Vec<(ChatId, String, Option<InlineKeyboard>)> {
        self.recorded.lock().unwrap().texts.clone()
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.texts()
            .into_iter()
            .filter(|(c, _, _)| *c == chat_id)
            .map(|(_, t, _)| t)
            .collect()
    }

    pub fn edits(&self) -> Vec<(ChatId, MessageId, String)> {
        self.recorded.lock().unwrap().edits.clone()
    }

    pub fn deletes(&self) -> Vec<(ChatId, MessageId)> {
        self.recorded.lock().unwrap().deletes.clone()
    }

    pub fn videos(&self) -> Vec<(ChatId, MediaSource, Option<InlineKeyboard>)> {
        self.recorded.lock().unwrap().videos.clone()
    }

    /// 本地上传路径，以及上传时文件是否存在
    pub fn local_uploads(&self) -> Vec<(PathBuf, bool)> {
        self.recorded.lock().unwrap().local_uploads.clone()
    }

    pub fn audios(&self) -> Vec<(ChatId, AudioUpload, bool)> {
        self.recorded.lock().unwrap().audios.clone()
    }

    pub fn copies(&self) -> Vec<(ChatId, ChatId, MessageId)> {
        self.recorded.lock().unwrap().copies.clone()
    }

    pub fn pins(&self) -> Vec<(ChatId, MessageId)> {
        self.recorded.lock().unwrap().pins.clone()
    }

    pub fn callbacks(&self) -> Vec<(String, Option<String>, bool)> {
        self.recorded.lock().unwrap().callbacks.clone()
    }

    pub fn send_attempts(&self, chat_id: ChatId) -> usize {
        self.recorded
            .lock()
            .unwrap()
            .send_attempts
            .get(&chat_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn membership_lookups(&self) -> usize {
        self.membership_lookups.load(Ordering::SeqCst)
    }

    /// 广播类发送（文本、复制）共用的失败编排
    async fn broadcast_send(&self, chat_id: ChatId) -> Result<(), PlatformError> {
        let gate = self.send_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        *self
            .recorded
            .lock()
            .unwrap()
            .send_attempts
            .entry(chat_id)
            .or_insert(0) += 1;

        if let Some(err) = self.permanent_failures.lock().unwrap().get(&chat_id) {
            return Err(err.clone());
        }
        if let Some(queue) = self.scripted_failures.lock().unwrap().get_mut(&chat_id) {
            if let Some(err) = queue.pop_front() {
                return Err(err);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPlatform for FakePlatform {
    async fn get_me(&self) -> Result<BotProfile, PlatformError> {
        Ok(BotProfile {
            id: UserId(999),
            username: "reel_bot".into(),
        })
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        _reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError> {
        self.broadcast_send(chat_id).await?;
        self.recorded
            .lock()
            .unwrap()
            .texts
            .push((chat_id, text.to_string(), keyboard.cloned()));
        Ok(self.next_message(chat_id))
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: &MediaSource,
        _reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError> {
        match video {
            MediaSource::Remote(_) => {
                if self.fail_remote.load(Ordering::SeqCst) {
                    return Err(PlatformError::api("failed to get HTTP URL content"));
                }
            }
            MediaSource::LocalFile(path) => {
                self.recorded
                    .lock()
                    .unwrap()
                    .local_uploads
                    .push((path.clone(), path.exists()));
                if self.fail_local.load(Ordering::SeqCst) {
                    return Err(PlatformError::api("file too big"));
                }
            }
        }
        self.recorded
            .lock()
            .unwrap()
            .videos
            .push((chat_id, video.clone(), keyboard.cloned()));
        Ok(self.next_message(chat_id))
    }

    async fn send_audio(
        &self,
        chat_id: ChatId,
        audio: &AudioUpload,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError> {
        let existed = audio.path.exists();
        self.recorded
            .lock()
            .unwrap()
            .audios
            .push((chat_id, audio.clone(), existed));
        Ok(self.next_message(chat_id))
    }

    async fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat: ChatId,
        message_id: MessageId,
    ) -> Result<SentMessage, PlatformError> {
        self.broadcast_send(chat_id).await?;
        self.recorded
            .lock()
            .unwrap()
            .copies
            .push((chat_id, from_chat, message_id));
        Ok(self.next_message(chat_id))
    }

    async fn pin_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        _disable_notification: bool,
    ) -> Result<(), PlatformError> {
        if self.fail_pins.load(Ordering::SeqCst) {
            return Err(PlatformError::api("not enough rights to pin"));
        }
        self.recorded
            .lock()
            .unwrap()
            .pins
            .push((chat_id, message_id));
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), PlatformError> {
        self.recorded
            .lock()
            .unwrap()
            .edits
            .push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), PlatformError> {
        self.recorded
            .lock()
            .unwrap()
            .deletes
            .push((chat_id, message_id));
        Ok(())
    }

    async fn get_chat_member(
        &self,
        chat: &ChatRef,
        user_id: UserId,
    ) -> Result<MembershipStatus, PlatformError> {
        self.membership_lookups.fetch_add(1, Ordering::SeqCst);
        self.memberships
            .lock()
            .unwrap()
            .get(&(chat.clone(), user_id))
            .cloned()
            .unwrap_or_else(|| Err(PlatformError::api("Bad Request: user not found")))
    }

    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo, PlatformError> {
        self.chats
            .lock()
            .unwrap()
            .get(chat)
            .cloned()
            .ok_or_else(|| PlatformError::api("Bad Request: chat not found"))
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError> {
        self.recorded.lock().unwrap().callbacks.push((
            callback_id.to_string(),
            text.map(str::to_string),
            show_alert,
        ));
        Ok(())
    }
}

/// 写入固定内容或返回固定状态码的下载器
pub struct FakeFetcher {
    body: Option<Vec<u8>>,
    status: u16,
    calls: AtomicUsize,
    seen: Mutex<Vec<MediaLocator>>,
}

impl FakeFetcher {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            body: Some(body.to_vec()),
            status: 200,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            body: None,
            status,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// 按调用顺序记录的媒体地址
    pub fn locators(&self) -> Vec<MediaLocator> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch_to_file(&self, locator: &MediaLocator, dest: &Path) -> Result<u64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(locator.clone());
        match &self.body {
            Some(body) => {
                tokio::fs::write(dest, body)
                    .await
                    .map_err(|e| FetchError::Io(e.to_string()))?;
                Ok(body.len() as u64)
            }
            None => Err(FetchError::Status(self.status)),
        }
    }
}

/// 在指定目录写出一个 mp3 文件的提取器
pub struct FakeExtractor {
    dir: PathBuf,
    fail: bool,
    seen: Mutex<Vec<MediaLocator>>,
}

impl FakeExtractor {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(dir: &Path) -> Self {
        Self {
            fail: true,
            ..Self::new(dir)
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// 按调用顺序记录的媒体地址
    pub fn locators(&self) -> Vec<MediaLocator> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract(&self, locator: &MediaLocator) -> Result<ExtractedAudio, ExtractError> {
        self.seen.lock().unwrap().push(locator.clone());
        if self.fail {
            return Err(ExtractError::Failed("ffmpeg not found".into()));
        }
        let path = self.dir.join("clip.mp3");
        tokio::fs::write(&path, b"ID3")
            .await
            .map_err(|e| ExtractError::Io(e.to_string()))?;
        Ok(ExtractedAudio {
            path,
            title: "clip".into(),
        })
    }
}
