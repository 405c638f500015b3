use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::state::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Assistant,
}

impl ChatSender {
    pub fn label(&self) -> &'static str {
        match self {
            ChatSender::User => "User",
            ChatSender::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: ChatSender,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: ChatSender, message: impl Into<String>) -> Self {
        Self {
            sender,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// 以 `User: ...` / `Assistant: ...` 形式输出
    pub fn as_transcript_line(&self) -> String {
        format!("{}: {}", self.sender.label(), self.message)
    }
}

/// 持久化的对话会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub topic: Option<String>,
    pub title: String,
    /// 长期记忆
    pub memory: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// 最近一轮的流水线状态快照
    pub state: Option<PipelineState>,
}

impl ChatSession {
    pub fn new(first_message: &str, topic: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            topic,
            title: first_message.chars().take(50).collect(),
            memory: None,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            state: None,
        }
    }

    pub fn push(&mut self, sender: ChatSender, message: impl Into<String>) {
        self.messages.push(ChatMessage::new(sender, message));
        self.updated_at = Utc::now();
    }

    /// 最近 n 条消息，每条一行
    pub fn recent_lines(&self, n: usize) -> Vec<String> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages[skip..]
            .iter()
            .map(ChatMessage::as_transcript_line)
            .collect()
    }

    /// 最近 n 条消息的对话文本
    pub fn recent_transcript(&self, n: usize) -> String {
        self.recent_lines(n).join("\n")
    }

    /// 完整对话文本
    pub fn full_transcript(&self) -> String {
        self.recent_transcript(self.messages.len())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub is_complete: bool,
    pub problem_statement: Option<String>,
    pub domain: Option<String>,
    pub goals: Vec<String>,
    pub prerequisites: Vec<String>,
    pub key_topics: Vec<String>,
    pub summary: Option<String>,
}

/// 会话列表中的摘要信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionInfo {
    pub id: Uuid,
    pub title: String,
    pub topic: Option<String>,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&ChatSession> for ChatSessionInfo {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id,
            title: session.title.clone(),
            topic: session.topic.clone(),
            message_count: session.messages.len(),
            updated_at: session.updated_at,
        }
    }
}
