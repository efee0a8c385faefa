//! # Atelier — client-side orchestration for the portfolio AI tools
//!
//! The backend runs the heavy pipelines (spreadsheet analysis, code
//! generation and execution, deep-research report writing, menu
//! recommendation); Atelier is the consumer side:
//!
//! - **atelier-client**: HTTP transport and SSE event-stream decoding
//! - **atelier-report**: deep-research workflow events folded into a
//!   log, a section timeline and monotonic progress
//! - **atelier-askdata**: spreadsheet Q&A session and the bounded
//!   generate→execute→summarize retry pipeline
//! - **atelier-order**: cart state and recommendation-schema parsing
//! - **atelier-store**: explicit key/blob persistence seam
//!
//! ## Streaming a report
//!
//! ```rust,no_run
//! use atelier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ApiClient::new(ClientConfig::from_env())?;
//!     let api = ReportApi::new(client);
//!
//!     let outline = api.generate_outline("写一份新能源行业分析报告").await?;
//!     let mut run = api.run(
//!         ResearchRequest::new("写一份新能源行业分析报告").with_outline(outline),
//!     );
//!
//!     let mut reducer = WorkflowReducer::new();
//!     while let Some(event) = run.next_event().await {
//!         reducer.apply(&event);
//!         println!(
//!             "{:3}% {}",
//!             reducer.progress().overall_progress,
//!             reducer.progress().description
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Asking a spreadsheet
//!
//! ```rust,no_run
//! use atelier::prelude::*;
//! use atelier::askdata::{HttpBackend, QueryRequest};
//! use atelier::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ApiClient::new(ClientConfig::from_env())?;
//!     let mut session = SpreadsheetSession::new(client.clone(), MemoryStore::new());
//!     session.upload("book.xlsx", std::fs::read("book.xlsx")?).await?;
//!
//!     if session.can_ask() {
//!         let mut pipeline = QueryPipeline::new(HttpBackend::new(client));
//!         let request = QueryRequest::new(
//!             "上个月总销量是多少",
//!             session.stored_file_path().unwrap(),
//!         );
//!         let outcome = pipeline.run(request).await;
//!         println!("{outcome:?}");
//!     }
//!     Ok(())
//! }
//! ```

// Re-export member crates under short names
pub use atelier_askdata as askdata;
pub use atelier_client as client;
pub use atelier_order as order;
pub use atelier_report as report;
pub use atelier_store as store;

// Re-export commonly used types
pub use atelier_askdata::{QueryOutcome, QueryPipeline, SpreadsheetSession};
pub use atelier_client::{ApiClient, ClientConfig};
pub use atelier_order::{Cart, RecommendClient};
pub use atelier_report::{ReportApi, ResearchRequest, WorkflowEvent, WorkflowReducer};
pub use atelier_store::BlobStore;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::askdata::{QueryOutcome, QueryPipeline, SpreadsheetSession};
    pub use crate::client::{ApiClient, ClientConfig};
    pub use crate::order::{AiResponse, Cart, RecommendClient};
    pub use crate::report::{
        ReportApi, ResearchRequest, RunOutcome, WorkflowEvent, WorkflowReducer,
    };
    pub use anyhow::Result;
}
