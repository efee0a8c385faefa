use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use pretty_assertions::assert_eq;

use atelier_askdata::{
    AskDataBackend, CodeExecutionRequest, CodeExecutionResponse, CodeGenerationRequest,
    CodeGenerationResponse, QueryOutcome, QueryPhase, QueryPipeline, QueryRequest,
    SummarizationRequest, SummarizationResponse, MAX_ATTEMPTS,
};

enum ExecOutcome {
    Success(serde_json::Value),
    AppError(&'static str),
    TransportError(&'static str),
}

enum SummaryScript {
    Markdown(&'static str),
    Empty,
    Fails(&'static str),
}

struct ScriptedBackend {
    generate_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    summarize_calls: AtomicUsize,
    histories: Mutex<Vec<String>>,
    executions: Mutex<VecDeque<ExecOutcome>>,
    summary: SummaryScript,
}

impl ScriptedBackend {
    fn new(executions: Vec<ExecOutcome>, summary: SummaryScript) -> Self {
        Self {
            generate_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
            executions: Mutex::new(executions.into()),
            summary,
        }
    }
}

#[async_trait]
impl<'a> AskDataBackend for &'a ScriptedBackend {
    async fn generate_code(&self, request: CodeGenerationRequest) -> Result<CodeGenerationResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.histories
            .lock()
            .unwrap()
            .push(request.history.unwrap_or_default());
        Ok(CodeGenerationResponse {
            code: "import pandas as pd".to_string(),
        })
    }

    async fn execute_code(&self, _request: CodeExecutionRequest) -> Result<CodeExecutionResponse> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .executions
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected execute call");
        match outcome {
            ExecOutcome::Success(result) => Ok(CodeExecutionResponse {
                result: Some(result),
                stdout: Some(String::new()),
                error_message: None,
            }),
            ExecOutcome::AppError(message) => Ok(CodeExecutionResponse {
                result: None,
                stdout: None,
                error_message: Some(message.to_string()),
            }),
            ExecOutcome::TransportError(message) => bail!("{message}"),
        }
    }

    async fn summarize(&self, _request: SummarizationRequest) -> Result<SummarizationResponse> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        match &self.summary {
            SummaryScript::Markdown(markdown) => Ok(SummarizationResponse {
                markdown: markdown.to_string(),
            }),
            SummaryScript::Empty => Ok(SummarizationResponse {
                markdown: String::new(),
            }),
            SummaryScript::Fails(message) => bail!("{message}"),
        }
    }
}

fn request() -> QueryRequest {
    QueryRequest::new("上个月总销量是多少", "/tmp/book.xlsx")
}

#[tokio::test]
async fn fail_fail_success_makes_three_rounds_and_one_summary() {
    let backend = ScriptedBackend::new(
        vec![
            ExecOutcome::AppError("KeyError: 销量"),
            ExecOutcome::AppError("NameError: df2"),
            ExecOutcome::Success(serde_json::json!({"results": 1280})),
        ],
        SummaryScript::Markdown("**总销量为 1280**"),
    );

    let mut pipeline = QueryPipeline::new(&backend);
    let outcome = pipeline.run(request()).await;

    assert_eq!(backend.generate_calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    assert_eq!(backend.execute_calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    assert_eq!(backend.summarize_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.phase(), QueryPhase::Completed);

    match outcome {
        QueryOutcome::Answered { markdown, attempts } => {
            assert_eq!(markdown, "**总销量为 1280**");
            assert_eq!(attempts.len(), 3);
            assert!(!attempts[0].success);
            assert!(!attempts[1].success);
            assert!(attempts[2].success);
        }
        other => panic!("expected Answered, got {other:?}"),
    }

    // Each failed round feeds the next prompt's history context.
    let histories = backend.histories.lock().unwrap();
    assert_eq!(histories[0], "（暂无历史记录）");
    assert!(histories[1].contains("第1次尝试（失败）\n错误：KeyError: 销量"));
    assert!(histories[2].contains("第1次尝试（失败）"));
    assert!(histories[2].contains("第2次尝试（失败）\n错误：NameError: df2"));
}

#[tokio::test]
async fn three_failures_skip_summary_and_embed_last_error() {
    let backend = ScriptedBackend::new(
        vec![
            ExecOutcome::AppError("错误一"),
            ExecOutcome::AppError("错误二"),
            ExecOutcome::AppError("错误三"),
        ],
        SummaryScript::Markdown("unused"),
    );

    let mut pipeline = QueryPipeline::new(&backend);
    let outcome = pipeline.run(request()).await;

    assert_eq!(backend.execute_calls.load(Ordering::SeqCst), 3);
    assert_eq!(backend.summarize_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.phase(), QueryPhase::Failed);

    match outcome {
        QueryOutcome::Failed { message, attempts } => {
            assert!(message.starts_with("❌ 查询失败：错误三"));
            assert_eq!(attempts.len(), 3);
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_errors_consume_attempts_like_app_errors() {
    let backend = ScriptedBackend::new(
        vec![
            ExecOutcome::TransportError("connection refused"),
            ExecOutcome::Success(serde_json::json!({"results": []})),
        ],
        SummaryScript::Markdown("空结果"),
    );

    let mut pipeline = QueryPipeline::new(&backend);
    let outcome = pipeline.run(request()).await;

    assert_eq!(backend.execute_calls.load(Ordering::SeqCst), 2);
    match outcome {
        QueryOutcome::Answered { attempts, .. } => {
            assert_eq!(attempts.len(), 2);
            assert_eq!(attempts[0].error.as_deref(), Some("connection refused"));
            assert!(attempts[1].success);
        }
        other => panic!("expected Answered, got {other:?}"),
    }
    // The transport failure's text entered the retry context.
    let histories = backend.histories.lock().unwrap();
    assert!(histories[1].contains("connection refused"));
}

#[tokio::test]
async fn first_try_success_makes_exactly_one_round() {
    let backend = ScriptedBackend::new(
        vec![ExecOutcome::Success(serde_json::json!({"results": 7}))],
        SummaryScript::Markdown("共 7 条"),
    );

    let mut pipeline = QueryPipeline::new(&backend);
    let outcome = pipeline.run(request()).await;

    assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.execute_calls.load(Ordering::SeqCst), 1);
    assert!(matches!(outcome, QueryOutcome::Answered { .. }));
}

#[tokio::test]
async fn summary_failure_is_terminal_without_retry() {
    let backend = ScriptedBackend::new(
        vec![ExecOutcome::Success(serde_json::json!({"results": 7}))],
        SummaryScript::Fails("总结服务超时"),
    );

    let mut pipeline = QueryPipeline::new(&backend);
    let outcome = pipeline.run(request()).await;

    assert_eq!(backend.summarize_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.phase(), QueryPhase::Failed);
    match outcome {
        QueryOutcome::SummaryFailed { reason, .. } => {
            assert!(reason.contains("总结服务超时"));
        }
        other => panic!("expected SummaryFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_summary_markdown_counts_as_summary_failure() {
    let backend = ScriptedBackend::new(
        vec![ExecOutcome::Success(serde_json::json!({"results": 7}))],
        SummaryScript::Empty,
    );

    let mut pipeline = QueryPipeline::new(&backend);
    match pipeline.run(request()).await {
        QueryOutcome::SummaryFailed { reason, .. } => assert_eq!(reason, "生成总结失败"),
        other => panic!("expected SummaryFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn inner_error_in_result_payload_fails_the_attempt() {
    let backend = ScriptedBackend::new(
        vec![
            ExecOutcome::Success(serde_json::json!({"results": null, "errorMessage": "除零错误"})),
            ExecOutcome::Success(serde_json::json!({"results": 3})),
        ],
        SummaryScript::Markdown("第 3 行"),
    );

    let mut pipeline = QueryPipeline::new(&backend);
    let outcome = pipeline.run(request()).await;

    match outcome {
        QueryOutcome::Answered { attempts, .. } => {
            assert_eq!(attempts.len(), 2);
            assert_eq!(attempts[0].error.as_deref(), Some("除零错误"));
        }
        other => panic!("expected Answered, got {other:?}"),
    }
}
