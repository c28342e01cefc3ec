use std::pin::Pin;

use futures::StreamExt as _;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::errors::{ClientError, api_error_from_body};
use crate::model::QueryRequest;

/// Response body of a streamed query, as raw byte chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ClientError>> + Send + 'static>>;

/// Opens streamed queries against the backend.
///
/// `HttpTransport` is the production implementation; other implementations
/// can feed `QueryStream` from any byte source.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Sends the request and returns the response body once the backend has
    /// accepted it.
    ///
    /// Implementations return `ClientError::Api` for non-success statuses and
    /// `ClientError::MissingBody` when there is nothing to stream.
    async fn open(&self, request: &QueryRequest) -> Result<ByteStream, ClientError>;
}

/// reqwest-backed transport for the streaming query endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport sharing an existing reqwest client.
    pub fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait::async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, request: &QueryRequest) -> Result<ByteStream, ClientError> {
        let url = self.config.query_stream_url();
        debug!(url = %url, top_k = ?request.top_k, "opening streamed query");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("streamed query request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let err = api_error_from_body(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "streamed query rejected");
            return Err(err);
        }
        if response.content_length() == Some(0) {
            warn!(status = status.as_u16(), "streamed query returned an empty body");
            return Err(ClientError::MissingBody);
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ClientError::transport(format!("streaming read failed: {e}")))
        });
        Ok(Box::pin(stream))
    }
}
