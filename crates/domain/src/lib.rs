//! 媒体转发机器人核心领域模型
//!
//! 包含来源链接、媒体定位符、订阅门槛、广播内容与入站事件等值对象。

pub mod broadcast;
pub mod errors;
pub mod keyboard;
pub mod media;
pub mod subscription;
pub mod update;
pub mod value_objects;

// 重新导出常用类型
pub use broadcast::*;
pub use errors::*;
pub use keyboard::*;
pub use media::*;
pub use subscription::*;
pub use update::*;
pub use value_objects::*;
