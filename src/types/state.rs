use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::feasibility::FeasibilityState;
use crate::types::research::ResearchState;
use crate::types::scoping::{ScopingField, ScopingFields};

/// 对话流程相关的状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// 对话记忆（长期记忆或最近消息）
    pub memory_text: Option<String>,
    /// 本轮要回复给用户的文本
    pub reply_text: Option<String>,
    /// 字段是否已收集完整
    #[serde(default)]
    pub completed: bool,
    /// 用户对追问的回答
    pub user_input: Option<String>,
    /// 最近一次提出的问题
    pub last_question: Option<String>,
    #[serde(default)]
    pub followup_attempts: u32,
}

/// 贯穿整个流水线的共享状态
///
/// 各节点只补充或细化字段，不会用空值覆盖已有内容；需要清空时调用 [`PipelineState::reset`]。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    pub file_path: Option<PathBuf>,
    pub raw_text: Option<String>,
    pub is_research_like: Option<bool>,
    #[serde(flatten)]
    pub fields: ScopingFields,
    /// 首次生成的摘要快照
    pub initial_summary: Option<String>,
    /// 当前（细化后）的摘要
    pub summary: Option<String>,
    #[serde(default)]
    pub missing_fields: Vec<ScopingField>,
    #[serde(default)]
    pub research: ResearchState,
    #[serde(default)]
    pub feasibility: FeasibilityState,
    pub roadmap: Option<String>,
    #[serde(default)]
    pub conversation: ConversationState,
}

impl PipelineState {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            raw_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_summary(summary: impl Into<String>) -> Self {
        let summary = summary.into();
        Self {
            initial_summary: Some(summary.clone()),
            summary: Some(summary),
            ..Default::default()
        }
    }

    pub fn from_transcript(transcript: impl Into<String>) -> Self {
        Self {
            conversation: ConversationState {
                memory_text: Some(transcript.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// 清空全部状态
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn raw_text(&self) -> &str {
        self.raw_text.as_deref().unwrap_or_default()
    }

    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    /// 记录新的摘要；首次记录时同时保存快照
    pub fn record_summary(&mut self, summary: &str) {
        let summary = summary.trim();
        if summary.is_empty() {
            return;
        }
        if self.initial_summary.is_none() {
            self.initial_summary = Some(summary.to_string());
        }
        self.summary = Some(summary.to_string());
    }

    /// 细化当前摘要，空文本不会覆盖已有摘要
    pub fn refine_summary(&mut self, refined: &str) {
        let refined = refined.trim();
        if !refined.is_empty() {
            self.summary = Some(refined.to_string());
        }
    }

    pub fn set_roadmap(&mut self, roadmap: &str) {
        let roadmap = roadmap.trim();
        if !roadmap.is_empty() {
            self.roadmap = Some(roadmap.to_string());
        }
    }

    /// 重新计算缺失字段
    pub fn refresh_missing(&mut self) {
        self.missing_fields = self.fields.missing();
    }

    /// 最适合生成路线图的上下文：调研报告 > 累积调研 > 摘要
    pub fn primary_context(&self) -> Option<&str> {
        let non_empty = |s: &str| !s.trim().is_empty();
        self.research
            .research_report
            .as_deref()
            .filter(|s| non_empty(s))
            .or(Some(self.research.consolidated.as_str()).filter(|s| non_empty(s)))
            .or(self.summary.as_deref().filter(|s| non_empty(s)))
    }
}
