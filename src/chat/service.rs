use anyhow::Result;

use crate::chat::store::SessionStore;
use crate::error::PipelineError;
use crate::generator::context::GeneratorContext;
use crate::generator::pipelines;
use crate::generator::progress::ProgressReporter;
use crate::types::chat::{ChatRequest, ChatResponse, ChatSender, ChatSession, ChatSessionInfo};
use crate::types::state::PipelineState;

const DEFAULT_REPLY: &str = "Could you share more details?";

fn memory_prompt(conversation: &str) -> String {
    format!(
        r#"You are a summarization assistant. Summarize the following research conversation between a user and an assistant.

Provide a **brief and concise** summary that captures necessary research points and user concerns.

Conversation:
{}

Concise Summary:"#,
        conversation
    )
}

/// 多轮范围界定对话
pub struct ChatService {
    context: GeneratorContext,
    store: SessionStore,
}

impl ChatService {
    pub fn new(context: GeneratorContext) -> Self {
        let store = SessionStore::new(context.config.chat.sessions_dir.clone());
        Self { context, store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// 找到请求中的会话；缺省或未知ID都会新建会话
    async fn open_session(&self, request: &ChatRequest) -> Result<ChatSession> {
        if let Some(id) = request.session_id.as_deref().filter(|id| !id.trim().is_empty()) {
            if let Some(session) = self.store.find(id).await? {
                return Ok(session);
            }
            tracing::info!("会话 {} 不存在，创建新会话", id);
        }
        self.store
            .create(request.message.trim(), request.topic.clone())
            .await
    }

    /// 处理一条用户消息并返回助手回复
    pub async fn send_message(&self, request: ChatRequest) -> Result<ChatResponse> {
        if request.message.trim().is_empty() {
            return Err(PipelineError::EmptyInput.into());
        }
        let chat_config = &self.context.config.chat;
        let mut session = self.open_session(&request).await?;
        session.push(ChatSender::User, request.message.trim());

        // 记忆只覆盖上一轮为止，本轮的用户消息需要追加在后面
        let context_text = match session.memory.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(memory) => format!("{}\n{}", memory.trim_end(), session.recent_transcript(1)),
            None => session.recent_transcript(chat_config.recent_window),
        };

        let state = pipelines::chat_turn(&self.context, &context_text).await?;
        let reply = state
            .conversation
            .reply_text
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REPLY.to_string());

        session.push(ChatSender::Assistant, reply.clone());
        session.state = Some(state.clone());
        session.memory = Some(self.updated_memory(&session).await);
        self.store.save(&session).await?;

        Ok(response_from(&session, reply, &state))
    }

    /// 由最近的消息刷新长期记忆；行数较多时请模型压缩
    async fn updated_memory(&self, session: &ChatSession) -> String {
        let chat_config = &self.context.config.chat;
        let lines = session.recent_lines(chat_config.memory_window);
        let verbatim = lines.join("\n");
        if lines.len() <= chat_config.memory_summarize_threshold {
            return verbatim;
        }

        match self.context.llm.complete(&memory_prompt(&verbatim)).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => verbatim,
            Err(e) => {
                tracing::warn!("⚠️ 会话记忆摘要失败，保留原始对话: {}", e);
                verbatim
            }
        }
    }

    /// 用会话内容生成路线图
    pub async fn roadmap(&self, session_id: &str, reporter: &ProgressReporter) -> Result<PipelineState> {
        let session = self.store.load(session_id).await?;
        let transcript = session
            .memory
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| session.full_transcript());
        pipelines::roadmap_from_transcript(&self.context, &transcript, reporter).await
    }

    pub async fn list(&self) -> Result<Vec<ChatSessionInfo>> {
        self.store.list().await
    }
}

fn response_from(session: &ChatSession, reply: String, state: &PipelineState) -> ChatResponse {
    let fields = &state.fields;
    ChatResponse {
        session_id: session.id.to_string(),
        reply,
        is_complete: state.conversation.completed,
        problem_statement: fields.problem_statement.clone(),
        domain: fields.domain.clone(),
        goals: fields.goals.clone(),
        prerequisites: fields.prerequisites.clone(),
        key_topics: fields.key_topics.clone(),
        summary: state.summary.clone(),
    }
}
