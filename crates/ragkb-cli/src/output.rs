//! Output formatting for the CLI.

use clap::ValueEnum;
use ragkb_client::{
    DeleteResponse, HealthResponse, RetrievedChunk, StreamedAnswer, UploadResponse,
};

/// Characters of chunk content shown per source in text mode.
const PREVIEW_CHARS: usize = 160;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Prints a serializable response, or its text rendering.
pub fn print<T: serde::Serialize>(
    value: &T,
    text: impl FnOnce(&T) -> String,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Text => println!("{}", text(value)),
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{}", text(value)),
        },
    }
}

pub fn health_text(health: &HealthResponse) -> String {
    [
        row("Status", &health.status),
        row("App", &health.app_name),
        row("Version", &health.version),
        row("Environment", &health.environment),
        row("Vector store", &health.chromadb_status),
        row("Embeddings", &health.embedding_model),
    ]
    .join("\n")
}

pub fn upload_text(upload: &UploadResponse) -> String {
    let mark = if upload.success { "ok" } else { "failed" };
    format!(
        "[{mark}] {} -> {} ({} chunks) {}",
        upload.filename, upload.document_id, upload.chunks_created, upload.message
    )
}

pub fn delete_text(delete: &DeleteResponse) -> String {
    let mark = if delete.success { "ok" } else { "failed" };
    format!("[{mark}] {}", delete.message)
}

/// Renders one source as a heading line plus an indented content preview.
pub fn source_text(index: usize, chunk: &RetrievedChunk) -> String {
    let name = chunk
        .metadata_str("filename")
        .or_else(|| chunk.metadata_str("source"))
        .unwrap_or("unknown source");
    let page = chunk
        .metadata
        .get("page")
        .map(|p| match p.as_str() {
            Some(s) => format!(", page {s}"),
            None => format!(", page {p}"),
        })
        .unwrap_or_default();
    format!(
        "[{}] {name}{page} ({:.0}% match)\n    {}",
        index + 1,
        chunk.clamped_score() * 100.0,
        preview(&chunk.content, PREVIEW_CHARS)
    )
}

pub fn sources_text(sources: &[RetrievedChunk]) -> String {
    if sources.is_empty() {
        return "No sources.".to_string();
    }
    let mut out = format!("Sources ({}):", sources.len());
    for (index, chunk) in sources.iter().enumerate() {
        out.push('\n');
        out.push_str(&source_text(index, chunk));
    }
    out
}

/// JSON document printed for `ask` in JSON mode.
pub fn answer_json(query: &str, answer: &StreamedAnswer) -> serde_json::Value {
    serde_json::json!({
        "query": query,
        "answer": answer.answer,
        "sources": answer.sources,
        "completed": answer.completed,
        "error": answer.error,
    })
}

/// Collapses whitespace and truncates to `max_chars` characters.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

fn row(label: &str, value: &str) -> String {
    format!("  {:<14} {}", format!("{label}:"), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(metadata: serde_json::Value, score: f64) -> RetrievedChunk {
        RetrievedChunk {
            content: "Rayleigh   scattering\nexplains the colour".into(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            similarity_score: score,
        }
    }

    #[test]
    fn source_shows_clamped_percentage_and_page() {
        let text = source_text(
            0,
            &chunk(serde_json::json!({"filename":"sky.pdf","page":3}), 1.4),
        );
        assert_eq!(
            text,
            "[1] sky.pdf, page 3 (100% match)\n    Rayleigh scattering explains the colour"
        );
    }

    #[test]
    fn source_without_metadata_uses_placeholder() {
        let text = source_text(1, &chunk(serde_json::json!({}), 0.456));
        assert!(text.starts_with("[2] unknown source (46% match)"));
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn empty_sources_render_placeholder() {
        assert_eq!(sources_text(&[]), "No sources.");
    }

    #[test]
    fn answer_json_carries_all_fields() {
        let answer = StreamedAnswer {
            sources: vec![chunk(serde_json::json!({"filename":"a.txt"}), 0.5)],
            answer: "The sky is blue.".into(),
            completed: true,
            error: None,
        };
        let json = answer_json("why?", &answer);
        assert_eq!(json["answer"], "The sky is blue.");
        assert_eq!(json["sources"][0]["metadata"]["filename"], "a.txt");
        assert_eq!(json["completed"], true);
        assert!(json["error"].is_null());
    }

    #[test]
    fn upload_text_summarizes_result() {
        let upload = UploadResponse {
            success: true,
            message: "ok".into(),
            document_id: "abc123".into(),
            filename: "x.pdf".into(),
            chunks_created: 4,
        };
        assert_eq!(upload_text(&upload), "[ok] x.pdf -> abc123 (4 chunks) ok");
    }
}
