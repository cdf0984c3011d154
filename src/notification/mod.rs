//! 通知层 - 组装、渲染、投递
//!
//! # 设计目标
//! 1. 组装与投递分离：`NotificationComposer` 只产出消息体，`NotificationDispatcher` 负责发送
//! 2. 渲染可替换：`Renderer` trait，找不到浏览器时自动退回文本
//! 3. 目标隔离：单个目标发送失败不影响其他目标
//!
//! # 使用示例
//! ```ignore
//! use star_monitor::notification::{NotificationDispatcher, OpenclawMessageSender};
//!
//! let sender = Arc::new(OpenclawMessageSender::new(Default::default()));
//! let dispatcher = NotificationDispatcher::new(sender, vec!["telegram:123456".into()]);
//! dispatcher.send_text("hello").await;
//! ```

pub mod channel;
pub mod channels;
pub mod composer;
pub mod dispatcher;
pub mod render;
pub mod templates;

pub use channel::{Destination, MessageSender, OutgoingMessage, SendResult};
pub use channels::{OpenclawMessageConfig, OpenclawMessageSender};
pub use composer::{
    ComposedNotification, CompositionPath, NotificationBody, NotificationComposer,
};
pub use dispatcher::NotificationDispatcher;
pub use render::{ChromiumRenderer, RenderError, Renderer};
