//! HTTP transport for the Atelier backend API.
//!
//! All tool crates talk to the backend through [`ApiClient`]: plain JSON
//! requests, multipart uploads, and POST-initiated SSE event streams
//! decoded by [`sse::event_stream`].

pub mod client;
pub mod config;
pub mod error;
pub mod sse;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use sse::{event_stream, SseFrameBuffer};
