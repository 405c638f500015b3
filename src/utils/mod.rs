pub mod json;
pub mod text;

pub use json::{extract_json_object, parse_llm_json, strip_code_fences};
pub use text::{coerce_list, coerce_text, truncate_chars};
