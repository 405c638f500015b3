use serde::{Deserialize, Serialize};

/// 外部知识来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeSourceKind {
    /// 百科类来源，适合学术、领域知识密集的主题
    Encyclopedia,
    /// 网络搜索，适合市场、趋势类主题
    WebSearch,
}

impl KnowledgeSourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            KnowledgeSourceKind::Encyclopedia => "encyclopedia",
            KnowledgeSourceKind::WebSearch => "web search",
        }
    }
}

impl std::fmt::Display for KnowledgeSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次知识补充的按字段归类结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentFindings {
    pub domain_context: Vec<String>,
    pub problem_context: Vec<String>,
    pub goals_context: Vec<String>,
    pub prerequisites_context: Vec<String>,
    pub key_topics_context: Vec<String>,
}

impl EnrichmentFindings {
    pub fn is_empty(&self) -> bool {
        self.domain_context.is_empty()
            && self.problem_context.is_empty()
            && self.goals_context.is_empty()
            && self.prerequisites_context.is_empty()
            && self.key_topics_context.is_empty()
    }
}

/// 路由决策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub source: KnowledgeSourceKind,
    pub reason: String,
}

/// 调研相关的累积状态，只增不减
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    /// 最近一次的路由决策
    pub route: Option<RouteDecision>,
    pub encyclopedia: Option<EnrichmentFindings>,
    pub web: Option<EnrichmentFindings>,
    /// 模型综合生成的调研报告
    pub research_report: Option<String>,
    /// 所有补充内容的累积文本
    #[serde(default)]
    pub consolidated: String,
}

impl ResearchState {
    pub fn findings(&self, kind: KnowledgeSourceKind) -> Option<&EnrichmentFindings> {
        match kind {
            KnowledgeSourceKind::Encyclopedia => self.encyclopedia.as_ref(),
            KnowledgeSourceKind::WebSearch => self.web.as_ref(),
        }
    }

    pub fn has_findings(&self, kind: KnowledgeSourceKind) -> bool {
        self.findings(kind).is_some()
    }

    /// 首次记录某一来源的结果，已存在时不覆盖
    pub fn record_findings(&mut self, kind: KnowledgeSourceKind, findings: EnrichmentFindings) {
        let slot = match kind {
            KnowledgeSourceKind::Encyclopedia => &mut self.encyclopedia,
            KnowledgeSourceKind::WebSearch => &mut self.web,
        };
        if slot.is_none() {
            *slot = Some(findings);
        }
    }

    /// 追加一段内容到累积文本
    pub fn append_consolidated(&mut self, block: &str) {
        let block = block.trim();
        if block.is_empty() {
            return;
        }
        if self.consolidated.is_empty() {
            self.consolidated = block.to_string();
        } else {
            self.consolidated.push_str("\n\n");
            self.consolidated.push_str(block);
        }
    }

    pub fn has_context(&self) -> bool {
        !self.consolidated.trim().is_empty()
            || self
                .research_report
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty())
    }
}
