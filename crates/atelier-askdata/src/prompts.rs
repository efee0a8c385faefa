use serde::{Deserialize, Serialize};

use atelier_store::BlobStore;

/// Store key for user-edited prompt overrides.
pub const PROMPTS_KEY: &str = "custom_prompts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Prompt templates for the two LLM calls of the pipeline. Placeholders
/// use `{{name}}` and are filled by [`render`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub code_generation: PromptPair,
    pub summarization: PromptPair,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            code_generation: PromptPair {
                system: DEFAULT_CODE_SYSTEM.to_string(),
                user: DEFAULT_CODE_USER.to_string(),
            },
            summarization: PromptPair {
                system: DEFAULT_SUMMARY_SYSTEM.to_string(),
                user: DEFAULT_SUMMARY_USER.to_string(),
            },
        }
    }
}

const DEFAULT_CODE_SYSTEM: &str = r#"=== 一、角色设定 ===
你是一位精通数据分析与计算的专家，擅长使用 Python Pandas 处理 Excel 数据。

=== 二、任务目标 ===
1.查看"用户问题"、"表格信息"与"历史代码和结果"(如有)，
2.根据"代码模板"和"代码生成规则"，直接生成代码进行输出。

=== 三、参考信息 ===
- "用户问题"：{{user_question}}
- 针对每个数据表的每个Sheet页的 "表格信息-表结构（字段名、数据类型）"、"表格信息-数据预览（前5行示例）": {{sheets}}
- "Excel文件路径"：{{file_path}}

=== 四、输出限制 ===
直接输出代码时，从 import pandas as pd 开始直接输出，严禁将代码嵌套入代码块中输出

=== 五、代码生成规则 ===
1.仅使用 Pandas，不引入其他外部库。
2.返回格式必须严格符合 {"results": …, "errorMessage": …}
3.凡要返回为 JSON 的数据，先统一清洗掉 NaN/±Infinity——把它们转为 None，只返回已清洗字段。
4.无需包含任何注释。"#;

const DEFAULT_CODE_USER: &str = r#"历史代码结果：{{history}}
用户问题：
{{user_question}}

如果问题为总体分析、宽泛问题或者没有明确要求，只进行简单分析，代码尽量短"#;

const DEFAULT_SUMMARY_SYSTEM: &str =
    "你是一名资深数据分析师，擅长把 Pandas 结果用 Markdown 方式简洁描述。";

const DEFAULT_SUMMARY_USER: &str = r#"你是一名数据分析助手，请用专业且简洁的 Markdown 语气总结以下执行结果，突出与用户问题相关的洞察。不要重复代码内容，可用表格/列表表达。

- 用户问题：{{user_question}}
- 执行结果（JSON 格式）：{{execution_result}}"#;

/// Questions answered in context mode carry the recent exchanges into
/// the next generation prompt. Only the last three are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextHistory {
    entries: Vec<(String, String)>,
}

const MAX_CONTEXT_ENTRIES: usize = 3;

impl ContextHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push((question.into(), answer.into()));
        if self.entries.len() > MAX_CONTEXT_ENTRIES {
            let excess = self.entries.len() - MAX_CONTEXT_ENTRIES;
            self.entries.drain(..excess);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append the recorded exchanges to a user prompt; an empty history
    /// leaves the prompt unchanged.
    pub fn apply_to(&self, user_prompt: &str) -> String {
        if self.entries.is_empty() {
            return user_prompt.to_string();
        }
        let context = self
            .entries
            .iter()
            .map(|(question, answer)| format!("历史问题：{} 历史答案：{}", question, answer))
            .collect::<Vec<_>>()
            .join("；");
        format!("{}\n\n{}", user_prompt, context)
    }
}

/// Fill `{{name}}` placeholders.
pub fn render(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in replacements {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Store-backed prompt overrides: edited templates persist, a missing
/// or corrupt blob falls back to the defaults.
pub struct PromptStore<S> {
    store: S,
}

impl<S: BlobStore> PromptStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> PromptTemplates {
        match self.store.get(PROMPTS_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Ok(None) => PromptTemplates::default(),
            Err(err) => {
                tracing::warn!("failed to load custom prompts: {err}");
                PromptTemplates::default()
            }
        }
    }

    pub async fn save(&self, prompts: &PromptTemplates) -> atelier_store::Result<()> {
        let encoded = serde_json::to_vec(prompts)
            .map_err(|e| atelier_store::StoreError::Internal(e.to_string()))?;
        self.store.put(PROMPTS_KEY, &encoded).await
    }

    pub async fn reset(&self) -> atelier_store::Result<()> {
        self.store.remove(PROMPTS_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_store::MemoryStore;

    #[test]
    fn render_replaces_all_occurrences() {
        let rendered = render(
            "问：{{q}}；再问：{{q}}；路径：{{path}}",
            &[("q", "总销量"), ("path", "/tmp/book.xlsx")],
        );
        assert_eq!(rendered, "问：总销量；再问：总销量；路径：/tmp/book.xlsx");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        assert_eq!(render("{{unknown}}", &[("q", "x")]), "{{unknown}}");
    }

    #[test]
    fn context_history_caps_at_three_entries() {
        let mut history = ContextHistory::new();
        for i in 1..=4 {
            history.record(format!("问题{i}"), format!("答案{i}"));
        }

        let prompt = history.apply_to("用户问题");
        assert!(!prompt.contains("问题1"));
        assert!(prompt.contains("历史问题：问题2 历史答案：答案2"));
        assert!(prompt.contains("问题4"));
        assert!(prompt.starts_with("用户问题\n\n"));
    }

    #[test]
    fn empty_context_leaves_prompt_unchanged() {
        assert_eq!(ContextHistory::new().apply_to("原始提示"), "原始提示");
    }

    #[tokio::test]
    async fn load_falls_back_to_defaults() {
        let prompts = PromptStore::new(MemoryStore::new()).load().await;
        assert_eq!(prompts, PromptTemplates::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = PromptStore::new(MemoryStore::new());
        let mut prompts = PromptTemplates::default();
        prompts.summarization.system = "更简短地总结".to_string();

        store.save(&prompts).await.unwrap();
        assert_eq!(store.load().await, prompts);

        store.reset().await.unwrap();
        assert_eq!(store.load().await, PromptTemplates::default());
    }

    #[tokio::test]
    async fn corrupt_blob_reads_as_defaults() {
        let memory = MemoryStore::new();
        use atelier_store::BlobStore as _;
        memory.put(PROMPTS_KEY, b"not json").await.unwrap();

        let prompts = PromptStore::new(memory).load().await;
        assert_eq!(prompts, PromptTemplates::default());
    }
}
