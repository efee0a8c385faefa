use std::time::Duration;

use serde::{Deserialize, Serialize};

use atelier_client::{ApiClient, Result};

use crate::types::{Outline, ResearchRequest};
use crate::runner::{ResearchRun, ResearchRunner};

/// PDF rendering is the one bounded call in the tool: the backend
/// renders synchronously and slow documents are cut off.
const PDF_TIMEOUT: Duration = Duration::from_secs(70);

/// Typed wrappers over the smart-report endpoints.
#[derive(Clone)]
pub struct ReportApi {
    client: ApiClient,
}

#[derive(Debug, Serialize)]
struct RequirementBody<'a> {
    requirement: &'a str,
}

#[derive(Debug, Serialize)]
struct DocIdBody<'a> {
    doc_id: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    k: Option<u32>,
}

#[derive(Debug, Serialize)]
struct InitializeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    force_rebuild: Option<bool>,
}

#[derive(Debug, Serialize)]
struct PdfBody<'a> {
    content: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedDocument {
    pub doc_id: String,
    pub filename: String,
    pub chunks: u32,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<UploadedDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeSearchHit {
    pub content: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeSearchResponse {
    pub results: Vec<KnowledgeSearchHit>,
    pub query: String,
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResponse {
    pub message: String,
    pub documents_loaded: u32,
    #[serde(default)]
    pub chunks_loaded: Option<u32>,
    #[serde(default)]
    pub documents_dir: String,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkInfo {
    pub chunk_id: String,
    pub content: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkList {
    pub chunks: Vec<ChunkInfo>,
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchHit {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchResponse {
    pub results: Vec<WebSearchHit>,
    pub query: String,
    pub total: u32,
}

impl ReportApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Generate an outline for a requirement without running the full
    /// workflow.
    pub async fn generate_outline(&self, requirement: &str) -> Result<Outline> {
        self.client
            .post_json(
                "/api/smartreport/deep-research/generate-outline",
                &RequirementBody { requirement },
            )
            .await
    }

    /// Start the streaming deep-research run.
    pub fn run(&self, request: ResearchRequest) -> ResearchRun {
        ResearchRunner::spawn(self.client.clone(), request)
    }

    // --- knowledge base ---

    pub async fn upload_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedDocument> {
        self.client
            .post_multipart("/api/smartreport/knowledge-base/upload", "file", file_name, bytes)
            .await
    }

    pub async fn list_documents(&self) -> Result<DocumentList> {
        self.client
            .get_json("/api/smartreport/knowledge-base/list")
            .await
    }

    pub async fn clear_knowledge_base(&self) -> Result<Acknowledgement> {
        self.client
            .post_json("/api/smartreport/knowledge-base/clear", &serde_json::json!({}))
            .await
    }

    pub async fn delete_document(&self, doc_id: &str) -> Result<Acknowledgement> {
        self.client
            .post_json(
                "/api/smartreport/knowledge-base/delete",
                &DocIdBody { doc_id },
            )
            .await
    }

    pub async fn search_knowledge_base(
        &self,
        query: &str,
        k: Option<u32>,
    ) -> Result<KnowledgeSearchResponse> {
        self.client
            .post_json(
                "/api/smartreport/knowledge-base/search",
                &SearchBody { query, k },
            )
            .await
    }

    pub async fn initialize_knowledge_base(
        &self,
        force_rebuild: Option<bool>,
    ) -> Result<InitializeResponse> {
        self.client
            .post_json(
                "/api/smartreport/knowledge-base/initialize",
                &InitializeBody { force_rebuild },
            )
            .await
    }

    pub async fn list_chunks(&self) -> Result<ChunkList> {
        self.client
            .get_json("/api/smartreport/knowledge-base/chunks")
            .await
    }

    // --- web search ---

    pub async fn web_search(&self, query: &str, k: Option<u32>) -> Result<WebSearchResponse> {
        self.client
            .post_json("/api/smartreport/web-search/search", &SearchBody { query, k })
            .await
    }

    // --- export ---

    /// Render the assembled report as a PDF. The endpoint answers with
    /// the document bytes; the call is bounded by a 70-second timeout.
    pub async fn generate_pdf(&self, title: &str, content: &str) -> Result<Vec<u8>> {
        let base_url = self.client.base_url();
        let body = PdfBody {
            content,
            title,
            base_url: if base_url.is_empty() { None } else { Some(base_url) },
        };
        self.client
            .post_json_bytes("/api/smartreport/generate-pdf", &body, PDF_TIMEOUT)
            .await
    }
}
