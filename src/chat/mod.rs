//! 对话式范围界定：会话持久化与多轮对话服务

pub mod service;
pub mod store;

pub use service::ChatService;
pub use store::SessionStore;
