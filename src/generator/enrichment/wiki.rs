use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use super::{
    CHALLENGE_TERMS, IMPROVEMENT_TERMS, KnowledgeSource, REQUIREMENT_TERMS, apply_field_fallbacks,
    topic_snippets,
};
use crate::config::EnrichmentConfig;
use crate::types::research::EnrichmentFindings;
use crate::types::scoping::ScopingFields;
use crate::utils::text::split_sentences;

const TOPIC_SNIPPET_CAP: usize = 25;

/// 基于MediaWiki extracts接口的百科来源
pub struct WikipediaSource {
    http: reqwest::Client,
    api_url: String,
    max_topic_pages: usize,
}

impl WikipediaSource {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build encyclopedia HTTP client")?;
        Ok(Self {
            http,
            api_url: config.wiki_api_url.clone(),
            max_topic_pages: config.max_topic_pages,
        })
    }

    /// 获取页面纯文本摘要，页面不存在时返回 None
    pub async fn fetch_extract(&self, title: &str) -> Result<Option<String>> {
        let params = [
            ("action", "query"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("format", "json"),
            ("titles", title),
        ];

        let mut response = self.http.get(&self.api_url).query(&params).send().await?;
        // 偶发的403通常是限流，重试一次
        if response.status() == StatusCode::FORBIDDEN {
            tokio::time::sleep(Duration::from_millis(500)).await;
            response = self.http.get(&self.api_url).query(&params).send().await?;
        }
        let response = response.error_for_status()?;
        let body: Value = serde_json::from_str(&response.text().await?)
            .context("Encyclopedia returned malformed JSON")?;
        Ok(parse_extract(&body))
    }

    async fn fetch_or_skip(&self, title: &str) -> Option<String> {
        match self.fetch_extract(title).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(title, "⚠️ 百科页面获取失败: {}", e);
                None
            }
        }
    }
}

/// 从接口返回中取出第一个页面的正文
pub fn parse_extract(body: &Value) -> Option<String> {
    let pages = body.get("query")?.get("pages")?.as_object()?;
    let page = pages.values().next()?;
    if page.get("missing").is_some() {
        return None;
    }
    page.get("extract")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 由领域页面和主题页面构造补充结果
pub fn build_findings(
    fields: &ScopingFields,
    domain_page: Option<&str>,
    topic_pages: &[(String, String)],
) -> EnrichmentFindings {
    let sentences = domain_page.map(split_sentences).unwrap_or_default();
    let pick = |pattern: &regex::Regex, limit: usize| -> Vec<String> {
        sentences
            .iter()
            .filter(|s| pattern.is_match(s))
            .take(limit)
            .cloned()
            .collect()
    };

    let mut findings = EnrichmentFindings {
        domain_context: sentences.iter().take(5).cloned().collect(),
        problem_context: pick(&CHALLENGE_TERMS, 5),
        goals_context: pick(&IMPROVEMENT_TERMS, 8),
        prerequisites_context: pick(&REQUIREMENT_TERMS, 8),
        key_topics_context: Vec::new(),
    };

    for (topic, page) in topic_pages {
        let topic_sentences = split_sentences(page);
        findings
            .key_topics_context
            .extend(topic_snippets(topic, &topic_sentences, 3, 2));
    }
    findings.key_topics_context.truncate(TOPIC_SNIPPET_CAP);

    apply_field_fallbacks(&mut findings, fields);
    findings
}

#[async_trait]
impl KnowledgeSource for WikipediaSource {
    async fn gather(&self, fields: &ScopingFields) -> Result<EnrichmentFindings> {
        let domain_page = match fields.domain.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(domain) => self.fetch_or_skip(domain).await,
            None => None,
        };

        let mut topic_pages = Vec::new();
        for topic in fields.key_topics.iter().take(self.max_topic_pages) {
            if let Some(page) = self.fetch_or_skip(topic).await {
                topic_pages.push((topic.clone(), page));
            }
        }

        tracing::debug!(
            domain_found = domain_page.is_some(),
            topic_pages = topic_pages.len(),
            "百科资料收集完成"
        );
        Ok(build_findings(fields, domain_page.as_deref(), &topic_pages))
    }
}
