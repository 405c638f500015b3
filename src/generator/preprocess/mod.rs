//! 文档预处理：从上传的文件中提取纯文本

pub mod document;

pub use document::{DocumentKind, extract_text};
