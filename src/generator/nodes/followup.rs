//! 范围界定的人工补充回合：把用户的自由回答归一到缺失字段

use serde_json::{Map, Value};

use crate::generator::nodes::fields::normalize_fields;
use crate::llm::LanguageModel;
use crate::types::scoping::ScopingField;
use crate::types::state::PipelineState;
use crate::utils::extract_json_object;
use crate::utils::json::parse_key_value_lines;

/// 向用户展示的补充提示
pub fn followup_question(missing: &[ScopingField]) -> Option<String> {
    if missing.is_empty() {
        return None;
    }
    let keys = missing.iter().map(|f| f.key()).collect::<Vec<_>>().join(", ");
    Some(format!(
        "To complete your research roadmap, please provide: {}. You can reply in JSON or simple 'key: value' lines.",
        keys
    ))
}

fn normalize_prompt(response: &str, missing: &[ScopingField]) -> String {
    let keys = missing.iter().map(|f| f.key()).collect::<Vec<_>>();
    format!(
        r#"You are an assistant helping fill missing fields in a research roadmap state.
The user replied (unstructured):
{}

Missing fields (fill ONLY these keys): {:?}

Return STRICT JSON only. Do not add commentary. Keys must match exactly."#,
        response, keys
    )
}

fn only_missing(map: Map<String, Value>, missing: &[ScopingField]) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| ScopingField::from_key(key).is_some_and(|f| missing.contains(&f)))
        .collect()
}

/// 用用户回答补齐缺失字段并重新计算缺失列表
///
/// 优先让模型输出JSON；模型失败或回复不可解析时按 `key: value` 行解析原始回答。
/// 只会写入此前缺失的字段。
pub async fn apply_user_response(llm: &dyn LanguageModel, state: &mut PipelineState, response: &str) {
    if response.trim().is_empty() {
        return;
    }
    if state.missing_fields.is_empty() {
        state.refresh_missing();
    }
    let missing = state.missing_fields.clone();
    if missing.is_empty() {
        return;
    }

    let updates = match llm.complete(&normalize_prompt(response, &missing)).await {
        Ok(raw) => extract_json_object(&raw),
        Err(e) => {
            tracing::warn!("⚠️ 回答归一化失败，按 key: value 解析: {}", e);
            None
        }
    }
    .unwrap_or_else(|| parse_key_value_lines(response));

    state.fields.merge(normalize_fields(&only_missing(updates, &missing)));
    state.refresh_missing();
    state.conversation.user_input = None;
}
