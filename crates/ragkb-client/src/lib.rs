//! Async client for a retrieval-augmented-generation knowledge-base service.
//!
//! Covers document upload and deletion, health checks, synchronous queries and
//! streamed queries. Streamed answers arrive as newline-delimited
//! `data: {"type": ..., "data": ...}` frames and are exposed as a lazy,
//! pull-based [`QueryStream`] of [`StreamEvent`]s.
//!
//! # Streaming a query
//!
//! ```no_run
//! use ragkb_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = RagClient::new(ClientConfig::new("http://localhost:8000/api/v1"))?;
//!
//! let mut stream = client.query_stream(QueryRequest::new("What is in my notes?").top_k(4))?;
//! while let Some(event) = stream.next_event().await {
//!     match event? {
//!         StreamEvent::Sources(chunks) => println!("{} sources", chunks.len()),
//!         StreamEvent::Answer(text) => print!("{text}"),
//!         StreamEvent::Done => println!(),
//!         StreamEvent::Error(message) => eprintln!("backend error: {message}"),
//!         StreamEvent::Unknown { .. } => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// HTTP client for every backend endpoint.
pub mod client;
/// Client configuration and endpoint layout.
pub mod config;
/// Pull-based stream consumer.
pub mod consumer;
/// Retrieved chunks and caller-side answer accumulation.
pub mod content;
/// Error taxonomy.
pub mod errors;
/// Line decoding and event classification for streamed responses.
pub mod frame;
/// Request and response documents.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// Classified stream events.
pub mod stream;
/// Transport seam for streamed queries.
pub mod transport;

pub use client::RagClient;
pub use config::ClientConfig;
pub use consumer::{ConsumerState, QueryStream};
pub use content::{PartialAnswer, RetrievedChunk, StreamedAnswer};
pub use errors::{ApiErrorBody, ClientError};
pub use model::{DeleteResponse, HealthResponse, QueryRequest, QueryResponse, UploadResponse};
pub use stream::StreamEvent;
pub use transport::{ByteStream, HttpTransport, StreamTransport};
