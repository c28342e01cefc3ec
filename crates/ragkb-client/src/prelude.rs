//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used request,
//! response and streaming types so application code needs fewer import lines.
pub use crate::{
    ClientConfig, ClientError, PartialAnswer, QueryRequest, QueryResponse, QueryStream,
    RagClient, RetrievedChunk, StreamEvent, StreamedAnswer, UploadResponse,
};
