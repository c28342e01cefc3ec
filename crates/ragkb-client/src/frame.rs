use crate::content::RetrievedChunk;
use crate::errors::ClientError;
use crate::stream::StreamEvent;

/// Literal prefix of a recognized event frame.
pub const FRAME_PREFIX: &str = "data: ";

const GENERIC_STREAM_ERROR: &str = "stream reported an error";

/// Splits a byte stream into complete `\n`-terminated lines.
///
/// Bytes after the last terminator stay buffered until the next chunk, so
/// chunk boundaries (including ones inside a multi-byte UTF-8 sequence) never
/// change the decoded lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    /// Appends a chunk and returns every line it completed, without terminators.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let Some(last_newline) = self.buf.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = self.buf.drain(..=last_newline).collect();
        complete[..complete.len() - 1]
            .split(|b| *b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// Returns the number of buffered bytes not yet forming a complete line.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

/// Returns the payload of a recognized frame line, or `None` for anything else
/// (blank keep-alives, comments, other field names).
pub fn frame_payload(line: &str) -> Option<&str> {
    line.strip_prefix(FRAME_PREFIX)
}

#[derive(serde::Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parses and classifies one frame payload.
pub fn decode_event(payload: &str) -> Result<StreamEvent, ClientError> {
    let raw: RawFrame = serde_json::from_str(payload)
        .map_err(|e| ClientError::malformed(format!("invalid frame JSON: {e}")))?;
    match raw.kind.as_str() {
        "sources" => {
            let chunks: Vec<RetrievedChunk> = serde_json::from_value(raw.data)
                .map_err(|e| ClientError::malformed(format!("invalid sources data: {e}")))?;
            Ok(StreamEvent::Sources(chunks))
        }
        "answer" => match raw.data {
            serde_json::Value::String(text) => Ok(StreamEvent::Answer(text)),
            other => Err(ClientError::malformed(format!(
                "answer data must be a string, got {other}"
            ))),
        },
        "done" => Ok(StreamEvent::Done),
        "error" => {
            let message = match raw.data {
                serde_json::Value::String(message) => message,
                serde_json::Value::Null => GENERIC_STREAM_ERROR.to_string(),
                other => other.to_string(),
            };
            Ok(StreamEvent::Error(message))
        }
        _ => Ok(StreamEvent::Unknown {
            kind: raw.kind,
            data: raw.data,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = LineDecoder::default();
        let mut out = Vec::new();
        for chunk in chunks {
            for line in decoder.push_chunk(chunk) {
                if let Some(payload) = frame_payload(&line) {
                    out.push(decode_event(payload).expect("decode"));
                }
            }
        }
        out
    }

    #[test]
    fn frame_split_mid_payload_matches_single_chunk() {
        let split = frames(&[b"data: {\"typ", b"e\":\"done\"}\n"]);
        let whole = frames(&[b"data: {\"type\":\"done\"}\n"]);
        assert_eq!(split, vec![StreamEvent::Done]);
        assert_eq!(split, whole);
    }

    #[test]
    fn every_split_point_yields_the_same_frames() {
        let input: &[u8] = "data: {\"type\":\"sources\",\"data\":[]}\n\n: ping\ndata: {\"type\":\"answer\",\"data\":\"héllo \"}\ndata: {\"type\":\"answer\",\"data\":\"wörld\"}\r\ndata: {\"type\":\"done\"}\n".as_bytes();
        let expected = frames(&[input]);
        assert_eq!(expected.len(), 4);
        for a in 0..input.len() {
            for b in a..input.len() {
                let got = frames(&[&input[..a], &input[a..b], &input[b..]]);
                assert_eq!(got, expected, "split at {a}/{b}");
            }
        }
    }

    #[test]
    fn multibyte_sequence_split_across_chunks_is_preserved() {
        let line = "data: {\"type\":\"answer\",\"data\":\"日本\"}\n".as_bytes();
        let idx = line.iter().position(|b| *b >= 0x80).expect("multibyte") + 1;
        let got = frames(&[&line[..idx], &line[idx..]]);
        assert_eq!(got, vec![StreamEvent::Answer("日本".into())]);
    }

    #[test]
    fn partial_line_is_retained_until_terminated() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push_chunk(b"data: {\"type\":").is_empty());
        assert_eq!(decoder.pending_len(), 14);
        let lines = decoder.push_chunk(b"\"done\"}\ndata: tail");
        assert_eq!(lines, vec!["data: {\"type\":\"done\"}".to_string()]);
        assert_eq!(decoder.pending_len(), "data: tail".len());
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        for line in ["", ": keep-alive", "event: message", "data:{\"type\":\"done\"}", "id: 4"] {
            assert_eq!(frame_payload(line), None, "{line:?}");
        }
        assert!(frames(&[b"\n\n: ping\nretry: 100\n"]).is_empty());
    }

    #[test]
    fn classifies_known_kinds() {
        let sources = decode_event(
            r#"{"type":"sources","data":[{"content":"c","metadata":{"filename":"a.pdf"},"similarity_score":0.7}]}"#,
        )
        .expect("sources");
        let StreamEvent::Sources(chunks) = sources else {
            panic!("expected sources");
        };
        assert_eq!(chunks[0].metadata_str("filename"), Some("a.pdf"));

        assert_eq!(
            decode_event(r#"{"type":"answer","data":"hi"}"#).expect("answer"),
            StreamEvent::Answer("hi".into())
        );
        assert_eq!(
            decode_event(r#"{"type":"done","data":null}"#).expect("done"),
            StreamEvent::Done
        );
        assert_eq!(
            decode_event(r#"{"type":"error","data":"LLM unavailable"}"#).expect("error"),
            StreamEvent::Error("LLM unavailable".into())
        );
        assert_eq!(
            decode_event(r#"{"type":"error"}"#).expect("error without data"),
            StreamEvent::Error(GENERIC_STREAM_ERROR.into())
        );
    }

    #[test]
    fn unknown_kind_is_forwarded() {
        let event = decode_event(r#"{"type":"usage","data":{"tokens":12}}"#).expect("unknown");
        assert_eq!(event.kind(), "usage");
        assert!(!event.is_terminal());
        assert!(matches!(
            event,
            StreamEvent::Unknown { ref data, .. } if data["tokens"] == 12
        ));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for payload in [
            "{not json",
            "[1,2]",
            r#"{"data":"no type"}"#,
            r#"{"type":"answer","data":5}"#,
            r#"{"type":"sources","data":"nope"}"#,
        ] {
            assert!(
                matches!(decode_event(payload), Err(ClientError::MalformedFrame(_))),
                "{payload}"
            );
        }
    }
}
