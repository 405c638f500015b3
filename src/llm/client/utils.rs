use crate::config::LLMConfig;

/// 超过该长度的prompt直接使用高质量模型
const EFFICIENT_MODEL_PROMPT_LIMIT: usize = 32 * 1024;

/// 根据prompt长度选择模型，返回（首选模型，备选模型）
pub fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> (String, Option<String>) {
    let powerful_differs = llm_config.model_powerful != llm_config.model_efficient
        && !llm_config.model_powerful.trim().is_empty();

    if system_prompt.len() + user_prompt.len() <= EFFICIENT_MODEL_PROMPT_LIMIT {
        let fallover = powerful_differs.then(|| llm_config.model_powerful.clone());
        return (llm_config.model_efficient.clone(), fallover);
    }
    (llm_config.model_powerful.clone(), None)
}
