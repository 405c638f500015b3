use serde_json::Value;
use std::collections::HashSet;

/// 按字符数截断，保证不会切断多字节字符
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 在句末标点后跟空白处切分句子
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            push_trimmed(&mut sentences, &current);
            current.clear();
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
        }
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}

/// 取前 n 个单词
pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// 将自由文本切分为列表项：优先按分号和换行，只得到一项时再按逗号
pub fn split_list_text(text: &str) -> Vec<String> {
    let primary: Vec<String> = text
        .split([';', '\n'])
        .map(clean_item)
        .filter(|s| !s.is_empty())
        .collect();
    if primary.len() > 1 {
        return primary;
    }

    text.split([';', '\n', ','])
        .map(clean_item)
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_item(item: &str) -> String {
    item.trim()
        .trim_start_matches(['-', '*', '•'])
        .trim()
        .to_string()
}

/// 将任意JSON值规整为字符串列表
pub fn coerce_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => split_list_text(s),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => clean_item(s),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Bool(_) | Value::Number(_) => vec![value.to_string()],
        Value::Object(_) => Vec::new(),
    }
}

/// 将任意JSON值规整为可选字符串，空值返回 None
pub fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(_) => coerce_list(value).join(", "),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Null | Value::Object(_) => String::new(),
    };
    if text.is_empty() { None } else { Some(text) }
}

/// 去重并保持原有顺序
pub fn dedup_preserving_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
