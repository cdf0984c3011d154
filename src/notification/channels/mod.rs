//! 具体发送器实现

pub mod openclaw_message;

pub use openclaw_message::{OpenclawMessageConfig, OpenclawMessageSender};
