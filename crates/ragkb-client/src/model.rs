use crate::content::RetrievedChunk;
use crate::errors::ClientError;

/// Body of a query request, shared by the synchronous and streaming endpoints.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QueryRequest {
    /// Natural-language question.
    pub query: String,
    /// Number of chunks to retrieve. The backend default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Set by the client to match the endpoint being called.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl QueryRequest {
    /// Creates a request for the given question.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            stream: None,
        }
    }

    /// Sets how many chunks the backend should retrieve.
    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub(crate) fn streaming(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.query.trim().is_empty() {
            return Err(ClientError::validation("query must not be empty"));
        }
        if self.top_k == Some(0) {
            return Err(ClientError::validation("top_k must be greater than 0"));
        }
        Ok(())
    }
}

/// Response of the synchronous query endpoint.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
    /// Backend-reported processing time in seconds.
    pub processing_time: f64,
}

/// Response of the upload endpoint, returned to callers unchanged.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub document_id: String,
    pub filename: String,
    pub chunks_created: u64,
}

/// Response of the delete endpoint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Response of the health endpoint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub app_name: String,
    pub version: String,
    pub environment: String,
    pub chromadb_status: String,
    pub embedding_model: String,
}
