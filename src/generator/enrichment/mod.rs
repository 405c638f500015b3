//! 外部知识补充：百科与网络搜索两种来源，以及两者之间的路由

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::types::research::{EnrichmentFindings, KnowledgeSourceKind};
use crate::types::scoping::ScopingFields;

pub mod router;
pub mod web;
pub mod wiki;

pub use router::{route, route_heuristic};
pub use web::DuckDuckGoSource;
pub use wiki::WikipediaSource;

/// 外部知识来源
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// 按项目字段收集补充材料
    async fn gather(&self, fields: &ScopingFields) -> Result<EnrichmentFindings>;
}

pub(crate) static CHALLENGE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(challenge|problem|need|issue|gap|barrier)s?\b").expect("valid regex")
});

pub(crate) static IMPROVEMENT_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)improv|enhanc|increas|reduc|streamlin|optimi[sz]|accelerat|enabl|advanc")
        .expect("valid regex")
});

pub(crate) static REQUIREMENT_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(require(s|d)?|requirements?|prerequisites?|need(ed|s)?|necessitates?|depend(s|ed|ency|encies)?)\b")
        .expect("valid regex")
});

/// 挑选匹配的条目；一条都不匹配时退化为前 `fallback` 条
pub(crate) fn select_matching(
    items: &[String],
    pattern: &Regex,
    limit: usize,
    fallback: usize,
) -> Vec<String> {
    let matched: Vec<String> = items
        .iter()
        .filter(|s| pattern.is_match(s))
        .take(limit)
        .cloned()
        .collect();
    if matched.is_empty() {
        items.iter().take(fallback).cloned().collect()
    } else {
        matched
    }
}

/// 主题片段：开头若干条，再补充若干条包含改进类动词的内容，并加上主题前缀
pub(crate) fn topic_snippets(topic: &str, items: &[String], head: usize, extra: usize) -> Vec<String> {
    let mut picked: Vec<&String> = items.iter().take(head).collect();
    picked.extend(
        items
            .iter()
            .skip(head)
            .filter(|s| IMPROVEMENT_TERMS.is_match(s))
            .take(extra),
    );
    picked
        .into_iter()
        .map(|s| format!("[{}] {}", topic, s))
        .collect()
}

/// 补充结果为空时，用项目字段本身兜底
pub(crate) fn apply_field_fallbacks(findings: &mut EnrichmentFindings, fields: &ScopingFields) {
    if findings.problem_context.is_empty()
        && let Some(problem) = fields.problem_statement.as_ref().filter(|p| !p.trim().is_empty())
    {
        findings.problem_context.push(problem.clone());
    }
    if findings.goals_context.is_empty() {
        findings.goals_context = fields.goals.iter().take(8).cloned().collect();
    }
    if findings.prerequisites_context.is_empty() {
        findings.prerequisites_context = fields.prerequisites.iter().take(8).cloned().collect();
    }
}

/// 将补充结果渲染为追加到累积调研文本中的段落
pub fn render_block(kind: KnowledgeSourceKind, findings: &EnrichmentFindings) -> String {
    match kind {
        KnowledgeSourceKind::Encyclopedia => {
            let parts = [
                ("Domain", findings.domain_context.iter().take(5), " "),
                ("Problem Context", findings.problem_context.iter().take(5), " "),
                ("Goals Context", findings.goals_context.iter().take(5), " "),
                (
                    "Prerequisites Context",
                    findings.prerequisites_context.iter().take(5),
                    " ",
                ),
                (
                    "Key Topics Context",
                    findings.key_topics_context.iter().take(10),
                    " ",
                ),
            ];
            join_labelled(parts, "\n\n")
        }
        KnowledgeSourceKind::WebSearch => {
            let parts = [
                ("Domain(Web)", findings.domain_context.iter().take(3), " | "),
                ("Problem(Web)", findings.problem_context.iter().take(3), " | "),
                ("Goals(Web)", findings.goals_context.iter().take(4), " | "),
                (
                    "Prerequisites(Web)",
                    findings.prerequisites_context.iter().take(4),
                    " | ",
                ),
                (
                    "Key Topics(Web)",
                    findings.key_topics_context.iter().take(6),
                    " | ",
                ),
            ];
            join_labelled(parts, "\n")
        }
    }
}

fn join_labelled<'a, I>(parts: [(&str, I, &str); 5], separator: &str) -> String
where
    I: Iterator<Item = &'a String>,
{
    parts
        .into_iter()
        .filter_map(|(label, items, joiner)| {
            let text = items
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(joiner);
            (!text.trim().is_empty()).then(|| format!("{}: {}", label, text))
        })
        .collect::<Vec<_>>()
        .join(separator)
}
