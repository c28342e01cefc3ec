use crate::content::RetrievedChunk;

/// Classified events yielded by `QueryStream`.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Retrieved chunks backing the answer, in backend order.
    Sources(Vec<RetrievedChunk>),
    /// Incremental answer text. Fragments concatenate in arrival order.
    Answer(String),
    /// Terminal success event.
    Done,
    /// Terminal failure event reported by the backend.
    Error(String),
    /// Event kind this client does not know. Callers should ignore it.
    Unknown {
        kind: String,
        data: serde_json::Value,
    },
}

impl StreamEvent {
    /// Returns true for `Done` and `Error`, the only events that end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }

    /// Returns the wire name of the event kind.
    pub fn kind(&self) -> &str {
        match self {
            Self::Sources(_) => "sources",
            Self::Answer(_) => "answer",
            Self::Done => "done",
            Self::Error(_) => "error",
            Self::Unknown { kind, .. } => kind,
        }
    }
}
