//! 各类回复附带的内联键盘

use domain::{InlineButton, InlineKeyboard, MessageId};

/// "提取音频"按钮回调前缀，后接原始消息 ID
pub const AUDIO_CALLBACK_PREFIX: &str = "audio_";

/// 更新频道与支持群链接
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityLinks {
    pub support_channel: Option<String>,
    pub support_group: Option<String>,
}

impl CommunityLinks {
    /// 已配置链接组成的一行按钮，可能为空
    pub fn row(&self) -> Vec<InlineButton> {
        let mut row = Vec::new();
        if let Some(url) = &self.support_channel {
            row.push(InlineButton::url("🚀 Update", url.clone()));
        }
        if let Some(url) = &self.support_group {
            row.push(InlineButton::url("💬 Support", url.clone()));
        }
        row
    }

    pub fn keyboard(&self) -> Option<InlineKeyboard> {
        let keyboard = InlineKeyboard::new().row(self.row());
        (!keyboard.is_empty()).then_some(keyboard)
    }
}

/// 视频消息附带的键盘：提取音频 + 社区链接
pub fn delivery_keyboard(request: MessageId, links: &CommunityLinks) -> InlineKeyboard {
    InlineKeyboard::new()
        .row(vec![InlineButton::callback(
            "Download Audio 🎵",
            audio_callback_data(request),
        )])
        .row(links.row())
}

/// /start 欢迎消息附带的键盘
pub fn welcome_keyboard(bot_username: &str, links: &CommunityLinks) -> InlineKeyboard {
    InlineKeyboard::new()
        .row(vec![InlineButton::url(
            "➕ Add me to your Group",
            format!("https://t.me/{bot_username}?startgroup=true"),
        )])
        .row(links.row())
}

pub fn audio_callback_data(request: MessageId) -> String {
    format!("{AUDIO_CALLBACK_PREFIX}{request}")
}

/// 解析 `audio_<id>`，格式不符时返回 `None`
pub fn parse_audio_callback(data: &str) -> Option<MessageId> {
    let raw = data.strip_prefix(AUDIO_CALLBACK_PREFIX)?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
