use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::consumer::QueryStream;
use crate::errors::{ClientError, api_error_from_body};
use crate::model::{DeleteResponse, HealthResponse, QueryRequest, QueryResponse, UploadResponse};
use crate::transport::{HttpTransport, StreamTransport};

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    transport: Arc<dyn StreamTransport>,
}

/// Async client for the knowledge-base API.
///
/// Cheap to clone. Every `query_stream` call returns an independent
/// `QueryStream` with its own decoder and body.
#[derive(Clone)]
pub struct RagClient {
    inner: Arc<ClientInner>,
}

impl RagClient {
    /// Creates a client that talks to `config.base_url` over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let http = build_http_client(&config)?;
        let transport = Arc::new(HttpTransport::new(http.clone(), config.clone()));
        Ok(Self::from_parts(http, config, transport))
    }

    /// Creates a client whose streamed queries go through `transport`.
    ///
    /// Non-streaming endpoints still use HTTP against `config.base_url`.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn StreamTransport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let http = build_http_client(&config)?;
        Ok(Self::from_parts(http, config, transport))
    }

    /// Creates a client from `RAGKB_API_URL` / `RAGKB_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    fn from_parts(
        http: reqwest::Client,
        config: ClientConfig,
        transport: Arc<dyn StreamTransport>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                transport,
            }),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Fetches backend health.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let request = self.inner.http.get(self.config().health_url());
        self.send_json(request, "health").await
    }

    /// Uploads a document from memory as multipart field `file`.
    pub async fn upload_document(
        &self,
        filename: impl Into<String>,
        contents: impl Into<Vec<u8>>,
    ) -> Result<UploadResponse, ClientError> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(ClientError::validation("filename must not be empty"));
        }
        let contents = contents.into();
        debug!(filename = %filename, bytes = contents.len(), "uploading document");
        let part = reqwest::multipart::Part::bytes(contents).file_name(filename.clone());
        let form = reqwest::multipart::Form::new().part("file", part);
        let request = self.inner.http.post(self.config().upload_url()).multipart(form);
        let response: UploadResponse = self.send_json(request, "upload").await?;
        info!(
            document_id = %response.document_id,
            filename = %response.filename,
            chunks = response.chunks_created,
            "document uploaded"
        );
        Ok(response)
    }

    /// Reads a file from disk and uploads it under its file name.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadResponse, ClientError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClientError::validation(format!("path has no usable file name: {}", path.display()))
            })?
            .to_string();
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Io(format!("failed to read {}: {e}", path.display())))?;
        self.upload_document(filename, contents).await
    }

    /// Deletes a document by id.
    pub async fn delete_document(&self, document_id: &str) -> Result<DeleteResponse, ClientError> {
        if document_id.trim().is_empty() {
            return Err(ClientError::validation("document id must not be empty"));
        }
        let request = self
            .inner
            .http
            .delete(self.config().document_url(document_id));
        let response: DeleteResponse = self.send_json(request, "delete").await?;
        info!(document_id = %document_id, success = response.success, "document delete finished");
        Ok(response)
    }

    /// Runs a query and waits for the complete answer.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, ClientError> {
        request.validate()?;
        let body = request.streaming(false);
        let request = self.inner.http.post(self.config().query_url()).json(&body);
        let response: QueryResponse = self.send_json(request, "query").await?;
        debug!(
            sources = response.sources.len(),
            processing_time = response.processing_time,
            "query answered"
        );
        Ok(response)
    }

    /// Prepares a streamed query.
    ///
    /// Nothing is sent until the first `QueryStream::next_event` call.
    pub fn query_stream(&self, request: QueryRequest) -> Result<QueryStream, ClientError> {
        request.validate()?;
        Ok(QueryStream::new(
            self.inner.transport.clone(),
            request.streaming(true),
        ))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T, ClientError> {
        let response = request
            .timeout(self.config().request_timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(operation, error = %e, "request failed");
                ClientError::transport(format!("{operation} request failed: {e}"))
            })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            ClientError::transport(format!("{operation} response read failed: {e}"))
        })?;
        if !status.is_success() {
            let err = api_error_from_body(status.as_u16(), &body);
            warn!(operation, status = status.as_u16(), error = %err, "request rejected");
            return Err(err);
        }
        serde_json::from_slice(&body).map_err(|e| {
            warn!(operation, status = status.as_u16(), error = %e, "response body not understood");
            ClientError::Decode(format!("{operation} response: {e}"))
        })
    }
}

fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))
}
