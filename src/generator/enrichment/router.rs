use serde_json::Value;

use crate::config::RouterMode;
use crate::llm::LanguageModel;
use crate::types::research::{KnowledgeSourceKind, RouteDecision};
use crate::types::scoping::ScopingFields;
use crate::utils::parse_llm_json;

/// 学术、领域知识密集型主题
const ENCYCLOPEDIC_TERMS: &[&str] = &[
    "research",
    "science",
    "scientific",
    "academic",
    "theory",
    "theoretical",
    "biology",
    "biotechnology",
    "chemistry",
    "physics",
    "mathematics",
    "medicine",
    "medical",
    "clinical",
    "neuroscience",
    "genetics",
    "genomics",
    "ecology",
    "astronomy",
    "quantum",
    "materials",
    "linguistics",
    "psychology",
    "philosophy",
    "history",
    "pharmacology",
    "epidemiology",
];

/// 市场、产品、趋势类主题
const WEB_TERMS: &[&str] = &[
    "market",
    "marketing",
    "startup",
    "business",
    "product",
    "consumer",
    "retail",
    "e-commerce",
    "ecommerce",
    "fintech",
    "trend",
    "trends",
    "industry",
    "sales",
    "brand",
    "branding",
    "saas",
    "pricing",
    "customer",
    "advertising",
    "tourism",
    "fashion",
    "gaming",
    "social media",
];

fn matches_any(domain_lower: &str, terms: &[&str]) -> bool {
    let words: Vec<&str> = domain_lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    terms.iter().any(|term| {
        if term.contains(' ') {
            domain_lower.contains(term)
        } else {
            words.contains(term)
        }
    })
}

/// 基于领域关键词的确定性路由：只有命中网络类且未命中百科类时才走网络搜索
pub fn route_heuristic(fields: &ScopingFields) -> RouteDecision {
    let Some(domain) = fields.domain.as_deref().filter(|d| !d.trim().is_empty()) else {
        return RouteDecision {
            source: KnowledgeSourceKind::Encyclopedia,
            reason: "No domain available; defaulting to encyclopedia".to_string(),
        };
    };

    let lower = domain.to_lowercase();
    let encyclopedic = matches_any(&lower, ENCYCLOPEDIC_TERMS);
    let web = matches_any(&lower, WEB_TERMS);

    if web && !encyclopedic {
        RouteDecision {
            source: KnowledgeSourceKind::WebSearch,
            reason: format!("Domain '{}' is market or trend oriented", domain),
        }
    } else {
        RouteDecision {
            source: KnowledgeSourceKind::Encyclopedia,
            reason: if encyclopedic {
                format!("Domain '{}' is academic or knowledge heavy", domain)
            } else {
                format!("Domain '{}' has no market signal; defaulting to encyclopedia", domain)
            },
        }
    }
}

fn decision_prompt(fields: &ScopingFields) -> String {
    format!(
        r#"You are routing a research enrichment step.
Choose "wiki" for deep, academic or domain-heavy topics that benefit from encyclopedic background.
Choose "ddg" for broad, trend-driven or multi-goal needs that benefit from current web results.

Problem: {problem}
Domain: {domain}
Goals: {goals}
Key topics: {topics}

Respond with STRICT JSON only: {{"source": "wiki" | "ddg", "reason": "<one sentence>"}}"#,
        problem = fields.problem_statement.as_deref().unwrap_or("(none)"),
        domain = fields.domain.as_deref().unwrap_or("(none)"),
        goals = fields.goals.join("; "),
        topics = fields.key_topics.join(", "),
    )
}

/// 解析模型的路由回复，无法识别时返回 None
pub fn parse_decision(raw: &str) -> Option<RouteDecision> {
    let map = parse_llm_json(raw);
    let source = map.get("source").and_then(Value::as_str)?.trim().to_lowercase();
    let source = match source.as_str() {
        "wiki" | "wikipedia" | "encyclopedia" => KnowledgeSourceKind::Encyclopedia,
        "ddg" | "duckduckgo" | "web" | "web_search" | "websearch" => KnowledgeSourceKind::WebSearch,
        _ => return None,
    };
    let reason = map
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("Chosen by model")
        .trim()
        .to_string();
    Some(RouteDecision { source, reason })
}

/// 按配置选择路由方式；模型路由失败时退回百科
pub async fn route(llm: &dyn LanguageModel, mode: RouterMode, fields: &ScopingFields) -> RouteDecision {
    match mode {
        RouterMode::Heuristic => route_heuristic(fields),
        RouterMode::Llm => match llm.complete(&decision_prompt(fields)).await {
            Ok(raw) => parse_decision(&raw).unwrap_or_else(|| RouteDecision {
                source: KnowledgeSourceKind::Encyclopedia,
                reason: "Unrecognised routing reply; defaulting to encyclopedia".to_string(),
            }),
            Err(e) => {
                tracing::warn!("⚠️ 路由决策调用失败，使用百科: {}", e);
                RouteDecision {
                    source: KnowledgeSourceKind::Encyclopedia,
                    reason: "Routing call failed; defaulting to encyclopedia".to_string(),
                }
            }
        },
    }
}
