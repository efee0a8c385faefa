use serde::Serialize;
use serde_json::Value;

use crate::api::{
    AskDataBackend, CodeExecutionRequest, CodeGenerationRequest, SummarizationRequest,
};

/// Bounded retry: after this many failed generate/execute rounds the
/// pipeline gives up and reports terminal failure.
pub const MAX_ATTEMPTS: usize = 3;

const RESULT_PREVIEW_LIMIT: usize = 800;

/// Pipeline lifecycle. Transitions:
/// `Idle → Querying → Summarizing → Completed`, with `Failed` reachable
/// from `Querying` (retries exhausted) and `Summarizing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Idle,
    Querying,
    Summarizing,
    Completed,
    Failed,
}

/// One generate/execute round. Append-only within a question; a new
/// question starts an empty list.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionAttempt {
    pub attempt: usize,
    pub code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub question: String,
    pub file_path: String,
    pub sheets: Option<std::collections::BTreeMap<String, crate::api::WorkbookInfo>>,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
    pub summary_system_prompt: Option<String>,
    pub summary_user_prompt: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            file_path: file_path.into(),
            sheets: None,
            system_prompt: None,
            user_prompt: None,
            summary_system_prompt: None,
            summary_user_prompt: None,
        }
    }
}

/// Terminal result of one question.
#[derive(Debug)]
pub enum QueryOutcome {
    /// All the way through summarization.
    Answered {
        markdown: String,
        attempts: Vec<ExecutionAttempt>,
    },
    /// Execution succeeded but the summary call failed; not retried.
    SummaryFailed {
        reason: String,
        attempts: Vec<ExecutionAttempt>,
    },
    /// Retries exhausted; `message` embeds the last recorded error.
    Failed {
        message: String,
        attempts: Vec<ExecutionAttempt>,
    },
}

/// generate-code → execute-code → summarize, with up to
/// [`MAX_ATTEMPTS`] sequential rounds. No backoff, no jitter, and no
/// error-class distinction: a transport failure consumes an attempt
/// exactly like an application error, and its text feeds the next
/// round's history context the same way.
pub struct QueryPipeline<B> {
    backend: B,
    phase: QueryPhase,
}

impl<B: AskDataBackend> QueryPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            phase: QueryPhase::Idle,
        }
    }

    pub fn phase(&self) -> QueryPhase {
        self.phase
    }

    pub async fn run(&mut self, request: QueryRequest) -> QueryOutcome {
        self.phase = QueryPhase::Querying;

        let mut attempts: Vec<ExecutionAttempt> = Vec::new();
        let mut history = build_history_text(&attempts);
        let mut execution_result: Option<Value> = None;
        let mut failure_reason = String::new();

        for _ in 1..=MAX_ATTEMPTS {
            let entry = self.attempt_round(&request, &history, attempts.len() + 1).await;
            let succeeded = entry.success;
            if succeeded {
                execution_result = entry.result.clone();
            } else {
                failure_reason = entry
                    .error
                    .clone()
                    .unwrap_or_else(|| "未知错误".to_string());
            }
            attempts.push(entry);

            if succeeded {
                break;
            }
            history = build_history_text(&attempts);
        }

        let Some(result) = execution_result else {
            self.phase = QueryPhase::Failed;
            return QueryOutcome::Failed {
                message: build_failure_message(&failure_reason),
                attempts,
            };
        };

        self.phase = QueryPhase::Summarizing;
        let summary = self
            .backend
            .summarize(SummarizationRequest {
                question: request.question.clone(),
                result,
                custom_system_prompt: request.summary_system_prompt.clone(),
                custom_user_prompt: request.summary_user_prompt.clone(),
            })
            .await;

        match summary {
            Ok(response) if !response.markdown.is_empty() => {
                self.phase = QueryPhase::Completed;
                QueryOutcome::Answered {
                    markdown: response.markdown,
                    attempts,
                }
            }
            Ok(_) => {
                self.phase = QueryPhase::Failed;
                QueryOutcome::SummaryFailed {
                    reason: "生成总结失败".to_string(),
                    attempts,
                }
            }
            Err(err) => {
                self.phase = QueryPhase::Failed;
                QueryOutcome::SummaryFailed {
                    reason: err.to_string(),
                    attempts,
                }
            }
        }
    }

    /// One sequential generate-then-execute round, folded into a log
    /// entry. Failed rounds keep neither code nor output; their error
    /// text is what the next round sees.
    async fn attempt_round(
        &self,
        request: &QueryRequest,
        history: &str,
        attempt: usize,
    ) -> ExecutionAttempt {
        let generated = self
            .backend
            .generate_code(CodeGenerationRequest {
                question: request.question.clone(),
                file_path: request.file_path.clone(),
                sheets: request.sheets.clone(),
                history: Some(history.to_string()),
                custom_system_prompt: request.system_prompt.clone(),
                custom_user_prompt: request.user_prompt.clone(),
            })
            .await;

        let code = match generated {
            Ok(response) => response.code,
            Err(err) => {
                return ExecutionAttempt {
                    attempt,
                    code: String::new(),
                    success: false,
                    result: None,
                    stdout: None,
                    error: Some(err.to_string()),
                }
            }
        };

        let executed = self
            .backend
            .execute_code(CodeExecutionRequest { code: code.clone() })
            .await;

        match executed {
            Ok(response) => {
                let error = response
                    .outer_error()
                    .or_else(|| response.inner_error())
                    .map(str::to_string);
                let success = error.is_none();
                ExecutionAttempt {
                    attempt,
                    code: if success { code } else { String::new() },
                    success,
                    result: if success { response.result } else { None },
                    stdout: if success { response.stdout } else { None },
                    error,
                }
            }
            Err(err) => ExecutionAttempt {
                attempt,
                code: String::new(),
                success: false,
                result: None,
                stdout: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Render the attempt log as the history context for the next
/// generation prompt.
pub fn build_history_text(attempts: &[ExecutionAttempt]) -> String {
    if attempts.is_empty() {
        return "（暂无历史记录）".to_string();
    }
    attempts
        .iter()
        .map(|log| {
            if log.success {
                format!(
                    "第{}次尝试（成功）\n结果：{}",
                    log.attempt,
                    truncate(&stringify_result(log.result.as_ref()), RESULT_PREVIEW_LIMIT)
                )
            } else {
                format!(
                    "第{}次尝试（失败）\n错误：{}",
                    log.attempt,
                    log.error.as_deref().unwrap_or("未知错误")
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

pub fn build_failure_message(reason: &str) -> String {
    format!("❌ 查询失败：{}\n\n请重新描述问题或重新上传表格后再试。", reason)
}

fn stringify_result(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(attempt: usize, success: bool, error: Option<&str>) -> ExecutionAttempt {
        ExecutionAttempt {
            attempt,
            code: String::new(),
            success,
            result: success.then(|| serde_json::json!({"results": 42})),
            stdout: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn empty_history_placeholder() {
        assert_eq!(build_history_text(&[]), "（暂无历史记录）");
    }

    #[test]
    fn history_renders_failures_then_success() {
        let logs = vec![
            attempt(1, false, Some("KeyError: 销量")),
            attempt(2, true, None),
        ];
        let text = build_history_text(&logs);
        assert!(text.contains("第1次尝试（失败）\n错误：KeyError: 销量"));
        assert!(text.contains("第2次尝试（成功）"));
        assert!(text.contains("\n---\n"));
    }

    #[test]
    fn failure_message_embeds_reason() {
        let message = build_failure_message("连续三次执行失败");
        assert!(message.starts_with("❌ 查询失败：连续三次执行失败"));
        assert!(message.contains("请重新描述问题或重新上传表格后再试"));
    }

    #[test]
    fn truncate_caps_long_results() {
        let long = "很".repeat(900);
        let rendered = truncate(&long, 800);
        assert_eq!(rendered.chars().count(), 801);
        assert!(rendered.ends_with('…'));
    }
}
