use crate::errors::ClientError;
use crate::stream::StreamEvent;

/// A unit of source material returned alongside an answer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetrievedChunk {
    /// Text of the chunk.
    pub content: String,
    /// Backend metadata (file name, page, chunk index, ...).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Similarity to the query, nominally in `[0, 1]`.
    ///
    /// Passed through exactly as the backend sent it.
    pub similarity_score: f64,
}

impl RetrievedChunk {
    /// Returns the similarity score clamped to `[0, 1]` for display.
    ///
    /// `NaN` maps to `0.0`.
    pub fn clamped_score(&self) -> f64 {
        if self.similarity_score.is_nan() {
            return 0.0;
        }
        self.similarity_score.clamp(0.0, 1.0)
    }

    /// Returns a string metadata value, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Caller-side accumulation of one streamed query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamedAnswer {
    /// Sources in arrival order. Later `sources` events are appended.
    pub sources: Vec<RetrievedChunk>,
    /// `answer` fragments concatenated in arrival order.
    pub answer: String,
    /// True once a `done` event has been seen.
    pub completed: bool,
    /// Message of a terminal `error` event, if one arrived.
    pub error: Option<String>,
}

impl StreamedAnswer {
    /// Folds one event into the accumulated state.
    ///
    /// Unknown event kinds are ignored.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Sources(chunks) => self.sources.extend(chunks.iter().cloned()),
            StreamEvent::Answer(fragment) => self.answer.push_str(fragment),
            StreamEvent::Done => self.completed = true,
            StreamEvent::Error(message) => self.error = Some(message.clone()),
            StreamEvent::Unknown { .. } => {}
        }
    }
}

/// A streamed answer cut short by an error, with everything received before it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct PartialAnswer {
    /// Sources and answer text accumulated before the failure.
    pub answer: StreamedAnswer,
    pub error: ClientError,
}

impl From<PartialAnswer> for ClientError {
    fn from(value: PartialAnswer) -> Self {
        value.error
    }
}
