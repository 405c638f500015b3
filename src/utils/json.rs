//! 从模型输出中恢复JSON对象

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:[\w-]+)?\s*|\s*```$").expect("valid fence regex"));

/// 去掉包裹在回复外层的markdown代码块标记
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw.trim(), "").trim().to_string()
}

/// 截取回复中最外层的 `{...}` 并解析为对象
pub fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    let cleaned = strip_code_fences(raw);
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// 宽松解析 `key: value` 行
///
/// 键统一为小写下划线形式，值保留为字符串。
pub fn parse_key_value_lines(raw: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for line in raw.lines() {
        let line = line
            .trim()
            .trim_start_matches(['-', '*', '•'])
            .trim_start();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = normalize_key(key);
        let value = value
            .trim()
            .trim_end_matches(',')
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        map.insert(key, Value::String(value.to_string()));
    }
    map
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '*')
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// 先尝试严格JSON，失败后退化为 `key: value` 解析，永不报错
pub fn parse_llm_json(raw: &str) -> Map<String, Value> {
    extract_json_object(raw).unwrap_or_else(|| parse_key_value_lines(&strip_code_fences(raw)))
}
