use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 可行性评估的五个维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeasibilityDimension {
    #[serde(rename = "technical")]
    Technical,
    #[serde(rename = "resources")]
    Resource,
    #[serde(rename = "skills")]
    Skills,
    #[serde(rename = "scope")]
    Scope,
    #[serde(rename = "risk")]
    Risk,
}

impl FeasibilityDimension {
    pub const ALL: [FeasibilityDimension; 5] = [
        FeasibilityDimension::Technical,
        FeasibilityDimension::Resource,
        FeasibilityDimension::Skills,
        FeasibilityDimension::Scope,
        FeasibilityDimension::Risk,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FeasibilityDimension::Technical => "technical",
            FeasibilityDimension::Resource => "resources",
            FeasibilityDimension::Skills => "skills",
            FeasibilityDimension::Scope => "scope",
            FeasibilityDimension::Risk => "risk",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeasibilityDimension::Technical => "Technical",
            FeasibilityDimension::Resource => "Resources",
            FeasibilityDimension::Skills => "Skills",
            FeasibilityDimension::Scope => "Scope",
            FeasibilityDimension::Risk => "Risk",
        }
    }
}

impl std::fmt::Display for FeasibilityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// 模型为单个维度返回的评估草稿
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SubScoreDraft {
    /// 0到100的分数
    pub score: f64,
    /// 评分理由
    pub explanation: String,
    /// 改进建议
    pub recommendation: String,
}

/// 单个维度的评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilitySubScore {
    pub score: u8,
    pub explanation: String,
    pub recommendation: String,
    /// 是否为失败后的中性兜底值
    #[serde(default)]
    pub degraded: bool,
}

impl FeasibilitySubScore {
    pub fn neutral(score: u8) -> Self {
        Self {
            score,
            explanation: "Assessment unavailable; a neutral score was used.".to_string(),
            recommendation: "Re-run the assessment or review this dimension manually.".to_string(),
            degraded: true,
        }
    }

    pub fn from_draft(draft: SubScoreDraft) -> Self {
        Self {
            score: draft.score.round().clamp(0.0, 100.0) as u8,
            explanation: draft.explanation.trim().to_string(),
            recommendation: draft.recommendation.trim().to_string(),
            degraded: false,
        }
    }
}

/// 可行性评估的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub final_score: u8,
    pub sub_scores: BTreeMap<FeasibilityDimension, u8>,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub detailed_report: String,
    /// 使用了中性兜底分数的维度
    #[serde(default)]
    pub degraded_dimensions: Vec<FeasibilityDimension>,
}

/// 累积在流水线状态中的可行性数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeasibilityState {
    #[serde(default)]
    pub sub_scores: BTreeMap<FeasibilityDimension, FeasibilitySubScore>,
    pub final_score: Option<u8>,
    pub overall_explanation: Option<String>,
    pub final_report: Option<String>,
}

impl FeasibilityState {
    pub fn is_assessed(&self) -> bool {
        self.sub_scores.len() == FeasibilityDimension::ALL.len()
    }

    /// 生成对外的评估结果
    pub fn to_report(&self) -> Option<FeasibilityReport> {
        let final_score = self.final_score?;
        let sub_scores = self
            .sub_scores
            .iter()
            .map(|(dim, sub)| (*dim, sub.score))
            .collect();
        let recommendations = self
            .sub_scores
            .values()
            .map(|sub| sub.recommendation.clone())
            .filter(|r| !r.trim().is_empty())
            .collect();
        let degraded_dimensions = self
            .sub_scores
            .iter()
            .filter(|(_, sub)| sub.degraded)
            .map(|(dim, _)| *dim)
            .collect();

        Some(FeasibilityReport {
            final_score,
            sub_scores,
            explanation: self.overall_explanation.clone().unwrap_or_default(),
            recommendations,
            detailed_report: self.final_report.clone().unwrap_or_default(),
            degraded_dimensions,
        })
    }
}
