use anyhow::Result;
use serde::{Deserialize, Serialize};

use atelier_client::ApiClient;
use atelier_store::BlobStore;

use crate::api::AnalysisResult;

/// Store key for the cached upload metadata.
pub const EXCEL_CACHE_KEY: &str = "excel_file";

/// Metadata of the last successfully analyzed workbook, kept in the
/// injected store so a restart can offer re-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedFileMeta {
    pub name: String,
    pub size: usize,
    /// Milliseconds since the epoch.
    pub uploaded_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Analysis succeeded; questions are enabled.
    Ready,
    /// Analysis answered with an application-level error; any stored
    /// file is cleared and questions stay disabled.
    Rejected { message: String },
}

/// Upload/analyze session for one workbook.
///
/// Questions are allowed only once an analysis has produced both a
/// non-empty sheet map and a stored file path.
pub struct SpreadsheetSession<S> {
    client: ApiClient,
    store: S,
    analysis: Option<AnalysisResult>,
    stored_file_path: Option<String>,
}

impl<S: BlobStore> SpreadsheetSession<S> {
    pub fn new(client: ApiClient, store: S) -> Self {
        Self {
            client,
            store,
            analysis: None,
            stored_file_path: None,
        }
    }

    pub fn can_ask(&self) -> bool {
        self.analysis
            .as_ref()
            .is_some_and(AnalysisResult::has_sheets)
            && self
                .stored_file_path
                .as_deref()
                .is_some_and(|p| !p.is_empty())
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn stored_file_path(&self) -> Option<&str> {
        self.stored_file_path.as_deref()
    }

    /// Upload a workbook for analysis.
    ///
    /// Transport failures are `Err`; an `errorMessage` inside a 2xx
    /// response is `Ok(Rejected)`. Both clear the session and the
    /// cached file.
    pub async fn upload(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<UploadOutcome> {
        let size = bytes.len();
        let result: AnalysisResult = match self
            .client
            .post_multipart("/api/analyze", "file", file_name, bytes)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                self.clear().await;
                return Err(err.into());
            }
        };

        if result.has_error() {
            let message = result.error_message.clone().unwrap_or_default();
            self.clear().await;
            return Ok(UploadOutcome::Rejected { message });
        }

        self.stored_file_path = result.stored_file_path.clone().filter(|p| !p.is_empty());
        self.analysis = Some(result);

        if self.can_ask() {
            let meta = CachedFileMeta {
                name: file_name.to_string(),
                size,
                uploaded_at: chrono::Utc::now().timestamp_millis(),
            };
            if let Ok(encoded) = serde_json::to_vec(&meta) {
                if let Err(err) = self.store.put(EXCEL_CACHE_KEY, &encoded).await {
                    tracing::warn!("failed to cache upload metadata: {err}");
                }
            }
        }

        Ok(UploadOutcome::Ready)
    }

    /// Metadata of the previously cached upload, if any. A corrupt blob
    /// reads as no cache.
    pub async fn cached_file(&self) -> Option<CachedFileMeta> {
        let bytes = self.store.get(EXCEL_CACHE_KEY).await.ok().flatten()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub async fn clear(&mut self) {
        self.analysis = None;
        self.stored_file_path = None;
        if let Err(err) = self.store.remove(EXCEL_CACHE_KEY).await {
            tracing::warn!("failed to clear cached upload metadata: {err}");
        }
    }
}
