use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, bail};
use ragkb_client::{QueryRequest, QueryStream, RagClient, StreamEvent, StreamedAnswer};
use tracing::{info, warn};

use crate::output::{self, OutputFormat};

pub async fn health(client: &RagClient, format: OutputFormat) -> anyhow::Result<()> {
    let health = client.health().await.context("health check failed")?;
    output::print(&health, output::health_text, format);
    Ok(())
}

/// Uploads each file in turn. Failures are reported and the rest still run.
pub async fn upload(
    client: &RagClient,
    files: &[PathBuf],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut failed = 0usize;
    for path in files {
        match client.upload_file(path).await {
            Ok(response) => output::print(&response, output::upload_text, format),
            Err(err) => {
                failed += 1;
                warn!(path = %path.display(), error = %err, "upload failed");
                eprintln!("[failed] {}: {}", path.display(), describe(&err));
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} uploads failed", files.len());
    }
    Ok(())
}

pub async fn delete(
    client: &RagClient,
    document_id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let response = client
        .delete_document(document_id)
        .await
        .with_context(|| format!("failed to delete document {document_id}"))?;
    output::print(&response, output::delete_text, format);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AskOptions {
    pub query: String,
    pub top_k: Option<u32>,
    pub stream: bool,
    pub show_sources: bool,
}

impl AskOptions {
    fn request(&self) -> QueryRequest {
        let request = QueryRequest::new(self.query.clone());
        match self.top_k {
            Some(top_k) => request.top_k(top_k),
            None => request,
        }
    }
}

pub async fn ask(
    client: &RagClient,
    options: &AskOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    ask_to(client, options, format, &mut std::io::stdout()).await
}

async fn ask_to<W: Write>(
    client: &RagClient,
    options: &AskOptions,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<()> {
    if !options.stream {
        return ask_sync(client, options, format, out).await;
    }
    let stream = client.query_stream(options.request())?;
    info!(stream_id = %stream.stream_id(), "asking");

    let answer = match format {
        OutputFormat::Json => collect_json(stream, &options.query, out).await?,
        OutputFormat::Text => render_stream(stream, options.show_sources, out).await?,
    };
    if let Some(message) = answer.error {
        bail!("backend reported an error: {message}");
    }
    Ok(())
}

async fn ask_sync<W: Write>(
    client: &RagClient,
    options: &AskOptions,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<()> {
    let response = client
        .query(options.request())
        .await
        .map_err(anyhow_from_client)?;
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&response)?)?,
        OutputFormat::Text => {
            if options.show_sources {
                writeln!(out, "{}\n", output::sources_text(&response.sources))?;
            }
            writeln!(out, "{}", response.answer)?;
            eprintln!("({:.2}s)", response.processing_time);
        }
    }
    Ok(())
}

/// Writes one JSON document for the query, also when the stream fails part way.
///
/// A failed stream is written with `completed: false` and the failure as
/// `error`, then reported as an error.
async fn collect_json<W: Write>(
    stream: QueryStream,
    query: &str,
    out: &mut W,
) -> anyhow::Result<StreamedAnswer> {
    let (answer, failure) = match stream.collect_answer().await {
        Ok(answer) => (answer, None),
        Err(partial) => {
            let message = describe(&partial.error);
            let mut answer = partial.answer;
            answer.error = Some(message.clone());
            (answer, Some(message))
        }
    };
    let document = output::answer_json(query, &answer);
    writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
    if let Some(message) = failure {
        bail!(message);
    }
    Ok(answer)
}

/// Writes sources as they arrive and answer fragments as they stream in.
async fn render_stream<W: Write>(
    mut stream: QueryStream,
    show_sources: bool,
    out: &mut W,
) -> anyhow::Result<StreamedAnswer> {
    let mut answer = StreamedAnswer::default();
    while let Some(item) = stream.next_event().await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                if !answer.answer.is_empty() {
                    writeln!(out)?;
                }
                return Err(anyhow_from_client(err));
            }
        };
        match &event {
            StreamEvent::Sources(chunks) if show_sources => {
                writeln!(out, "{}\n", output::sources_text(chunks))?;
            }
            StreamEvent::Answer(fragment) => {
                write!(out, "{fragment}")?;
                out.flush()?;
            }
            StreamEvent::Done => writeln!(out)?,
            StreamEvent::Error(message) => {
                if !answer.answer.is_empty() {
                    writeln!(out)?;
                }
                eprintln!("Error: {message}");
            }
            _ => {}
        }
        answer.apply(&event);
    }
    Ok(answer)
}

fn anyhow_from_client(err: ragkb_client::ClientError) -> anyhow::Error {
    anyhow::anyhow!(describe(&err))
}

/// One-line description including the backend detail when there is one.
pub fn describe(err: &ragkb_client::ClientError) -> String {
    match err.detail() {
        Some(detail) => format!("{err} ({detail})"),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use ragkb_client::{ByteStream, ClientConfig, ClientError, StreamTransport};

    use super::*;

    const SOURCES: &str = "data: {\"type\":\"sources\",\"data\":[{\"content\":\"Rayleigh scattering\",\"metadata\":{\"filename\":\"sky.pdf\"},\"similarity_score\":0.91}]}\n";

    /// Replays fixed body chunks for every streamed query.
    struct ScriptedTransport {
        chunks: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl StreamTransport for ScriptedTransport {
        async fn open(&self, _request: &QueryRequest) -> Result<ByteStream, ClientError> {
            let chunks: Vec<Result<Bytes, ClientError>> =
                self.chunks.iter().map(|c| Ok(Bytes::from(*c))).collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    fn client_over(chunks: &[&'static str]) -> RagClient {
        let transport = ScriptedTransport {
            chunks: chunks.to_vec(),
        };
        RagClient::with_transport(ClientConfig::default(), Arc::new(transport)).expect("client")
    }

    fn streamed(show_sources: bool) -> AskOptions {
        AskOptions {
            query: "why is the sky blue?".into(),
            top_k: None,
            stream: true,
            show_sources,
        }
    }

    async fn run_ask(
        chunks: &[&'static str],
        options: &AskOptions,
        format: OutputFormat,
    ) -> (anyhow::Result<()>, String) {
        let mut out = Vec::new();
        let result = ask_to(&client_over(chunks), options, format, &mut out).await;
        (result, String::from_utf8(out).expect("utf8"))
    }

    #[tokio::test]
    async fn text_mode_streams_sources_then_answer() {
        let (result, out) = run_ask(
            &[
                SOURCES,
                "data: {\"type\":\"answer\",\"data\":\"The sky \"}\n",
                "data: {\"type\":\"answer\",\"data\":\"is blue.\"}\ndata: {\"type\":\"done\"}\n",
            ],
            &streamed(true),
            OutputFormat::Text,
        )
        .await;
        result.expect("ask");
        assert!(out.starts_with("Sources (1):\n[1] sky.pdf (91% match)"), "{out}");
        assert!(out.ends_with("\n\nThe sky is blue.\n"), "{out}");
    }

    #[tokio::test]
    async fn backend_error_event_fails_the_command() {
        let (result, out) = run_ask(
            &[
                "data: {\"type\":\"answer\",\"data\":\"partial\"}\n",
                "data: {\"type\":\"error\",\"data\":\"LLM timeout\"}\n",
            ],
            &streamed(false),
            OutputFormat::Text,
        )
        .await;
        let err = result.expect_err("backend error");
        assert_eq!(err.to_string(), "backend reported an error: LLM timeout");
        assert_eq!(out, "partial\n");
    }

    #[tokio::test]
    async fn text_mode_keeps_partial_answer_on_truncation() {
        let (result, out) = run_ask(
            &["data: {\"type\":\"answer\",\"data\":\"The sky \"}\n"],
            &streamed(false),
            OutputFormat::Text,
        )
        .await;
        let err = result.expect_err("truncated");
        assert_eq!(err.to_string(), "stream ended before a terminal event");
        assert_eq!(out, "The sky \n");
    }

    #[tokio::test]
    async fn json_mode_prints_partial_document_on_truncation() {
        let (result, out) = run_ask(
            &[SOURCES, "data: {\"type\":\"answer\",\"data\":\"The sky \"}\n"],
            &streamed(true),
            OutputFormat::Json,
        )
        .await;
        assert!(result.is_err());
        let document: serde_json::Value = serde_json::from_str(&out).expect("json document");
        assert_eq!(document["query"], "why is the sky blue?");
        assert_eq!(document["answer"], "The sky ");
        assert_eq!(document["sources"].as_array().map(Vec::len), Some(1));
        assert_eq!(document["completed"], false);
        assert_eq!(document["error"], "stream ended before a terminal event");
    }

    #[tokio::test]
    async fn json_mode_prints_completed_document() {
        let (result, out) = run_ask(
            &[
                "data: {\"type\":\"answer\",\"data\":\"The sky is blue.\"}\n",
                "data: {\"type\":\"done\"}\n",
            ],
            &streamed(true),
            OutputFormat::Json,
        )
        .await;
        result.expect("ask");
        let document: serde_json::Value = serde_json::from_str(&out).expect("json document");
        assert_eq!(document["answer"], "The sky is blue.");
        assert_eq!(document["completed"], true);
        assert!(document["error"].is_null());
    }

    #[test]
    fn describe_appends_detail() {
        let err = ClientError::api(422, "Unsupported file type", Some("only pdf, txt, md".into()));
        assert_eq!(
            describe(&err),
            "api error (422): Unsupported file type (only pdf, txt, md)"
        );
        assert_eq!(
            describe(&ClientError::MissingBody),
            "streaming response has no body"
        );
    }

    #[test]
    fn ask_options_build_request() {
        let options = AskOptions {
            query: "what?".into(),
            top_k: Some(3),
            stream: true,
            show_sources: false,
        };
        let request = options.request();
        assert_eq!(request.query, "what?");
        assert_eq!(request.top_k, Some(3));
    }
}
