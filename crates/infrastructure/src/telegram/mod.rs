//! Telegram Bot API 适配器

mod client;
pub mod types;

pub use client::{map_api_error, BotApiClient};
