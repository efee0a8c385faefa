use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use atelier_client::ApiClient;

/// Result of analyzing an uploaded workbook.
///
/// A non-empty `error_message` is an application-level failure inside a
/// 2xx response; callers treat it exactly like a transport failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets: Option<BTreeMap<String, WorkbookInfo>>,
}

impl AnalysisResult {
    pub fn has_error(&self) -> bool {
        self.error_message.as_deref().is_some_and(|m| !m.is_empty())
    }

    pub fn has_sheets(&self) -> bool {
        self.sheets.as_ref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookInfo {
    pub file_name: String,
    pub file_path: String,
    pub sheets: BTreeMap<String, SheetInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SheetSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_columns: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeGenerationRequest {
    pub question: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets: Option<BTreeMap<String, WorkbookInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_user_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeGenerationResponse {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeExecutionRequest {
    pub code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeExecutionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CodeExecutionResponse {
    /// The executed code itself returns `{"results":…,"errorMessage":…}`;
    /// an error there counts as much as the outer field.
    pub fn inner_error(&self) -> Option<&str> {
        self.result
            .as_ref()?
            .get("errorMessage")?
            .as_str()
            .filter(|m| !m.is_empty())
    }

    pub fn outer_error(&self) -> Option<&str> {
        self.error_message.as_deref().filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummarizationRequest {
    pub question: String,
    pub result: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_user_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizationResponse {
    pub markdown: String,
}

/// The three calls the retry pipeline makes, behind a seam so tests can
/// script outcomes.
#[async_trait]
pub trait AskDataBackend: Send + Sync {
    async fn generate_code(&self, request: CodeGenerationRequest) -> Result<CodeGenerationResponse>;

    async fn execute_code(&self, request: CodeExecutionRequest) -> Result<CodeExecutionResponse>;

    async fn summarize(&self, request: SummarizationRequest) -> Result<SummarizationResponse>;
}

/// HTTP implementation over the backend API.
#[derive(Clone)]
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AskDataBackend for HttpBackend {
    async fn generate_code(&self, request: CodeGenerationRequest) -> Result<CodeGenerationResponse> {
        self.client
            .post_json("/api/generate-code", &request)
            .await
            .context("code generation request failed")
    }

    async fn execute_code(&self, request: CodeExecutionRequest) -> Result<CodeExecutionResponse> {
        self.client
            .post_json("/api/execute-code", &request)
            .await
            .context("code execution request failed")
    }

    async fn summarize(&self, request: SummarizationRequest) -> Result<SummarizationResponse> {
        self.client
            .post_json("/api/summarize-result", &request)
            .await
            .context("result summarization request failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_error_is_read_from_result_payload() {
        let response: CodeExecutionResponse = serde_json::from_str(
            r#"{"result":{"results":null,"errorMessage":"KeyError: 销量"},"stdout":""}"#,
        )
        .unwrap();
        assert_eq!(response.inner_error(), Some("KeyError: 销量"));
        assert_eq!(response.outer_error(), None);
    }

    #[test]
    fn empty_error_strings_do_not_count() {
        let response: CodeExecutionResponse =
            serde_json::from_str(r#"{"result":{"errorMessage":""},"errorMessage":""}"#).unwrap();
        assert_eq!(response.inner_error(), None);
        assert_eq!(response.outer_error(), None);
    }

    #[test]
    fn analysis_result_gating() {
        let ok: AnalysisResult = serde_json::from_str(
            r#"{"sheets":{"book.xlsx":{"file_name":"book.xlsx","file_path":"/tmp/book.xlsx","sheets":{}}},"stored_file_path":"/tmp/book.xlsx"}"#,
        )
        .unwrap();
        assert!(ok.has_sheets());
        assert!(!ok.has_error());

        let failed: AnalysisResult =
            serde_json::from_str(r#"{"errorMessage":"无法解析文件"}"#).unwrap();
        assert!(failed.has_error());
        assert!(!failed.has_sheets());
    }
}
