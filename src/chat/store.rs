use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::types::chat::{ChatSession, ChatSessionInfo};

/// 会话快照存储，每个会话一个JSON文件
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn session_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// 按字符串ID查找会话；ID无法解析或文件不存在时返回 None
    pub async fn find(&self, id: &str) -> Result<Option<ChatSession>> {
        let Ok(id) = Uuid::parse_str(id.trim()) else {
            return Ok(None);
        };
        let path = self.session_path(&id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        Ok(Some(session))
    }

    /// 加载会话，不存在时返回 `SessionNotFound`
    pub async fn load(&self, id: &str) -> Result<ChatSession> {
        self.find(id)
            .await?
            .ok_or_else(|| PipelineError::SessionNotFound(id.to_string()).into())
    }

    pub async fn save(&self, session: &ChatSession) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let content = serde_json::to_string_pretty(session)?;
        fs::write(self.session_path(&session.id), content).await?;
        tracing::debug!("会话已保存: {} ({} 条消息)", session.id, session.messages.len());
        Ok(())
    }

    /// 创建并立即持久化一个新会话
    pub async fn create(&self, first_message: &str, topic: Option<String>) -> Result<ChatSession> {
        let session = ChatSession::new(first_message, topic);
        self.save(&session).await?;
        tracing::info!("🆕 创建会话 {}", session.id);
        Ok(session)
    }

    /// 按更新时间倒序列出全部会话，损坏的文件会被跳过
    pub async fn list(&self) -> Result<Vec<ChatSessionInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .await
                .map_err(anyhow::Error::from)
                .and_then(|content| Ok(serde_json::from_str::<ChatSession>(&content)?));
            match parsed {
                Ok(session) => sessions.push(ChatSessionInfo::from(&session)),
                Err(e) => tracing::warn!("⚠️ 跳过无法解析的会话文件 {}: {}", path.display(), e),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}
