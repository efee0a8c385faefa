//! Spreadsheet question-answering client.
//!
//! The backend analyzes an uploaded workbook, generates pandas code for
//! a question, executes it, and summarizes the result. This crate owns
//! the client-side orchestration: the upload session gating questions
//! ([`SpreadsheetSession`]) and the bounded generate→execute→summarize
//! retry pipeline ([`QueryPipeline`]).

pub mod api;
pub mod pipeline;
pub mod prompts;
pub mod session;

pub use api::{
    AnalysisResult, AskDataBackend, CodeExecutionRequest, CodeExecutionResponse,
    CodeGenerationRequest, CodeGenerationResponse, HttpBackend, SheetInfo, SheetSummary,
    SummarizationRequest, SummarizationResponse, WorkbookInfo,
};
pub use pipeline::{
    build_failure_message, build_history_text, ExecutionAttempt, QueryOutcome, QueryPhase,
    QueryPipeline, QueryRequest, MAX_ATTEMPTS,
};
pub use prompts::{ContextHistory, PromptPair, PromptStore, PromptTemplates};
pub use session::{CachedFileMeta, SpreadsheetSession, UploadOutcome};
