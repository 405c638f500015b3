use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{
    CHALLENGE_TERMS, IMPROVEMENT_TERMS, KnowledgeSource, REQUIREMENT_TERMS, apply_field_fallbacks,
    select_matching, topic_snippets,
};
use crate::config::EnrichmentConfig;
use crate::types::research::EnrichmentFindings;
use crate::types::scoping::ScopingFields;
use crate::utils::text::{dedup_preserving_order, first_words};

const DOMAIN_CAP: usize = 8;
const PROBLEM_CAP: usize = 8;
const GOALS_CAP: usize = 15;
const PREREQUISITES_CAP: usize = 15;
const TOPICS_CAP: usize = 30;

/// 基于DuckDuckGo Instant Answer接口的网络搜索来源
pub struct DuckDuckGoSource {
    http: reqwest::Client,
    api_url: String,
    max_topic_pages: usize,
}

impl DuckDuckGoSource {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build web search HTTP client")?;
        Ok(Self {
            http,
            api_url: config.web_search_api_url.clone(),
            max_topic_pages: config.max_topic_pages,
        })
    }

    /// 执行一次搜索，返回去重后的文本片段
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let params = [
            ("q", query),
            ("format", "json"),
            ("no_redirect", "1"),
            ("no_html", "1"),
        ];
        let response = self
            .http
            .get(&self.api_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = serde_json::from_str(&response.text().await?)
            .context("Web search returned malformed JSON")?;
        Ok(flatten_results(&body))
    }

    async fn search_or_empty(&self, query: &str) -> Vec<String> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        match self.search(query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(query, "⚠️ 网络搜索失败: {}", e);
                Vec::new()
            }
        }
    }
}

/// 展开摘要与相关主题（包括嵌套的分组主题）
pub fn flatten_results(body: &Value) -> Vec<String> {
    let mut items = Vec::new();

    for key in ["AbstractText", "Abstract"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            items.push(text.trim().to_string());
        }
    }

    if let Some(related) = body.get("RelatedTopics").and_then(Value::as_array) {
        for topic in related {
            if let Some(text) = topic.get("Text").and_then(Value::as_str) {
                items.push(text.trim().to_string());
            }
            if let Some(nested) = topic.get("Topics").and_then(Value::as_array) {
                items.extend(
                    nested
                        .iter()
                        .filter_map(|t| t.get("Text").and_then(Value::as_str))
                        .map(|t| t.trim().to_string()),
                );
            }
        }
    }

    dedup_preserving_order(items.into_iter().filter(|s| !s.is_empty()))
}

#[async_trait]
impl KnowledgeSource for DuckDuckGoSource {
    async fn gather(&self, fields: &ScopingFields) -> Result<EnrichmentFindings> {
        let domain = fields
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let mut findings = EnrichmentFindings::default();

        if let Some(domain) = domain {
            findings.domain_context = self
                .search_or_empty(domain)
                .await
                .into_iter()
                .take(DOMAIN_CAP)
                .collect();
        }

        let problem_query = match (&fields.problem_statement, domain) {
            (Some(problem), _) if !problem.trim().is_empty() => first_words(problem, 12),
            (_, Some(domain)) => format!("{} challenge", domain),
            _ => String::new(),
        };
        let problem_results = self.search_or_empty(&problem_query).await;
        findings.problem_context =
            select_matching(&problem_results, &CHALLENGE_TERMS, PROBLEM_CAP, 5);

        for goal in fields.goals.iter().take(6) {
            let results = self.search_or_empty(goal).await;
            findings
                .goals_context
                .extend(select_matching(&results, &IMPROVEMENT_TERMS, 4, 2));
        }
        findings.goals_context.truncate(GOALS_CAP);

        for prerequisite in fields.prerequisites.iter().take(6) {
            let results = self.search_or_empty(&first_words(prerequisite, 6)).await;
            findings
                .prerequisites_context
                .extend(select_matching(&results, &REQUIREMENT_TERMS, 4, 2));
        }
        if findings.prerequisites_context.is_empty()
            && let Some(domain) = domain
        {
            findings.prerequisites_context = self
                .search_or_empty(&format!("{} requirements", domain))
                .await
                .into_iter()
                .take(6)
                .collect();
        }
        findings.prerequisites_context.truncate(PREREQUISITES_CAP);

        for topic in fields.key_topics.iter().take(self.max_topic_pages) {
            let results = self.search_or_empty(topic).await;
            findings
                .key_topics_context
                .extend(topic_snippets(topic, &results, 2, 2));
        }
        findings.key_topics_context.truncate(TOPICS_CAP);

        apply_field_fallbacks(&mut findings, fields);
        tracing::debug!(
            domain = findings.domain_context.len(),
            problem = findings.problem_context.len(),
            goals = findings.goals_context.len(),
            prerequisites = findings.prerequisites_context.len(),
            topics = findings.key_topics_context.len(),
            "网络搜索资料收集完成"
        );
        Ok(findings)
    }
}
