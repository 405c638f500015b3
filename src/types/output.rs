use serde::{Deserialize, Serialize};

use crate::types::scoping::{ScopingField, ScopingFields};
use crate::types::state::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Warning,
    Error,
}

/// 路线图流水线的返回结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapOutput {
    pub status: RunStatus,
    pub message: Option<String>,
    pub roadmap: Option<String>,
    pub initial_summary: Option<String>,
    pub refined_summary: Option<String>,
    #[serde(flatten)]
    pub fields: ScopingFields,
}

impl RoadmapOutput {
    pub fn from_state(state: &PipelineState) -> Self {
        if state.is_research_like == Some(false) {
            return Self::not_research(crate::error::PipelineError::NotResearchPaper.to_string());
        }
        let (status, message) = if state.roadmap.is_some() {
            (RunStatus::Success, None)
        } else {
            (
                RunStatus::Warning,
                Some("Roadmap missing (no source text)".to_string()),
            )
        };
        Self {
            status,
            message,
            roadmap: state.roadmap.clone(),
            initial_summary: state.initial_summary.clone(),
            refined_summary: state.summary.clone(),
            fields: state.fields.clone(),
        }
    }

    /// 非研究类文档的提前返回
    pub fn not_research(message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Warning,
            message: Some(message.into()),
            roadmap: None,
            initial_summary: None,
            refined_summary: None,
            fields: ScopingFields::default(),
        }
    }
}

/// 范围界定流水线的返回结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopingOutput {
    pub status: RunStatus,
    pub message: Option<String>,
    pub summary: Option<String>,
    #[serde(flatten)]
    pub fields: ScopingFields,
    pub missing_fields: Vec<ScopingField>,
}

impl ScopingOutput {
    pub fn from_state(state: &PipelineState) -> Self {
        if state.is_research_like == Some(false) {
            return Self {
                status: RunStatus::Warning,
                message: Some(crate::error::PipelineError::NotResearchPaper.to_string()),
                summary: None,
                fields: ScopingFields::default(),
                missing_fields: Vec::new(),
            };
        }
        Self {
            status: RunStatus::Success,
            message: None,
            summary: state.summary.clone(),
            fields: state.fields.clone(),
            missing_fields: state.missing_fields.clone(),
        }
    }
}

/// 摘要流水线的返回结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
}
