use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt as _;
use tracing::{debug, warn};

use crate::content::{PartialAnswer, StreamedAnswer};
use crate::errors::ClientError;
use crate::frame::{LineDecoder, decode_event, frame_payload};
use crate::model::QueryRequest;
use crate::stream::StreamEvent;
use crate::transport::{ByteStream, StreamTransport};

/// Lifecycle of a `QueryStream`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerState {
    /// Nothing sent yet; the request goes out on the first pull.
    Idle,
    /// Waiting for the next body chunk.
    Reading,
    /// Complete frames from the last chunk are queued for the caller.
    Yielding,
    /// A terminal event was handed out and the body released.
    Draining,
    /// No more items will be produced.
    Closed,
}

/// Owns the response body and drops it exactly once, on whichever exit path
/// comes first.
struct BodyGuard {
    stream_id: uuid::Uuid,
    body: Option<ByteStream>,
}

impl BodyGuard {
    fn new(stream_id: uuid::Uuid) -> Self {
        Self {
            stream_id,
            body: None,
        }
    }

    fn attach(&mut self, body: ByteStream) {
        self.body = Some(body);
    }

    fn stream_mut(&mut self) -> Option<&mut ByteStream> {
        self.body.as_mut()
    }

    fn release(&mut self) {
        if let Some(body) = self.body.take() {
            drop(body);
            debug!(stream_id = %self.stream_id, "released response body");
        }
    }
}

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lazy, pull-based sequence of events for one streamed query.
///
/// Created by `RagClient::query_stream`. The request is sent on the first call
/// to [`next_event`](Self::next_event), and at most one body chunk is read per
/// pull. Frames already received in that chunk are queued and parsed one at a
/// time, so nothing after a terminal event is ever parsed.
///
/// Dropping the stream releases the response body.
pub struct QueryStream {
    stream_id: uuid::Uuid,
    request: QueryRequest,
    transport: Arc<dyn StreamTransport>,
    state: ConsumerState,
    body: BodyGuard,
    decoder: LineDecoder,
    pending: VecDeque<String>,
    events_yielded: u64,
}

impl QueryStream {
    pub(crate) fn new(transport: Arc<dyn StreamTransport>, request: QueryRequest) -> Self {
        let stream_id = uuid::Uuid::new_v4();
        Self {
            stream_id,
            request,
            transport,
            state: ConsumerState::Idle,
            body: BodyGuard::new(stream_id),
            decoder: LineDecoder::default(),
            pending: VecDeque::new(),
            events_yielded: 0,
        }
    }

    /// Returns the id used to correlate this stream in logs.
    pub fn stream_id(&self) -> uuid::Uuid {
        self.stream_id
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Returns the request this stream was created for.
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Pulls the next event.
    ///
    /// Returns `None` once the stream is closed. An `Err` item is always the
    /// last item: request failures, transport read failures, malformed frames
    /// and a body that ends without `done`/`error` (`IncompleteStream`) all
    /// close the stream.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, ClientError>> {
        loop {
            match self.state {
                ConsumerState::Idle => match self.transport.open(&self.request).await {
                    Ok(body) => {
                        debug!(stream_id = %self.stream_id, "streamed query accepted");
                        self.body.attach(body);
                        self.state = ConsumerState::Reading;
                    }
                    Err(err) => {
                        warn!(
                            stream_id = %self.stream_id,
                            error = %err,
                            "streamed query failed to start"
                        );
                        self.close();
                        return Some(Err(err));
                    }
                },
                ConsumerState::Reading => {
                    let next = match self.body.stream_mut() {
                        Some(body) => body.next().await,
                        None => None,
                    };
                    match next {
                        Some(Ok(chunk)) => {
                            debug!(
                                stream_id = %self.stream_id,
                                bytes = chunk.len(),
                                "stream chunk received"
                            );
                            self.pending.extend(
                                self.decoder
                                    .push_chunk(&chunk)
                                    .iter()
                                    .filter_map(|line| frame_payload(line))
                                    .map(ToOwned::to_owned),
                            );
                            if !self.pending.is_empty() {
                                self.state = ConsumerState::Yielding;
                            }
                        }
                        Some(Err(err)) => {
                            warn!(stream_id = %self.stream_id, error = %err, "stream read failed");
                            self.close();
                            return Some(Err(err));
                        }
                        None => {
                            warn!(
                                stream_id = %self.stream_id,
                                events = self.events_yielded,
                                dropped_bytes = self.decoder.pending_len(),
                                "stream ended without a terminal event"
                            );
                            self.close();
                            return Some(Err(ClientError::IncompleteStream));
                        }
                    }
                }
                ConsumerState::Yielding => {
                    let Some(payload) = self.pending.pop_front() else {
                        self.state = ConsumerState::Reading;
                        continue;
                    };
                    match decode_event(&payload) {
                        Ok(event) => {
                            self.events_yielded += 1;
                            if event.is_terminal() {
                                debug!(
                                    stream_id = %self.stream_id,
                                    kind = event.kind(),
                                    events = self.events_yielded,
                                    "terminal event received"
                                );
                                self.drain();
                            } else if self.pending.is_empty() {
                                self.state = ConsumerState::Reading;
                            }
                            return Some(Ok(event));
                        }
                        Err(err) => {
                            warn!(stream_id = %self.stream_id, error = %err, "malformed frame");
                            self.close();
                            return Some(Err(err));
                        }
                    }
                }
                ConsumerState::Draining => {
                    self.close();
                    return None;
                }
                ConsumerState::Closed => return None,
            }
        }
    }

    /// Consumes the stream and accumulates sources and answer text.
    ///
    /// A backend `error` event is recorded in `StreamedAnswer::error`. An `Err`
    /// item ends collection and is returned together with whatever was
    /// accumulated up to that point.
    pub async fn collect_answer(mut self) -> Result<StreamedAnswer, PartialAnswer> {
        let mut answer = StreamedAnswer::default();
        while let Some(item) = self.next_event().await {
            match item {
                Ok(event) => answer.apply(&event),
                Err(error) => return Err(PartialAnswer { answer, error }),
            }
        }
        Ok(answer)
    }

    /// Adapts the stream into a `futures::Stream`.
    pub fn into_stream(
        self,
    ) -> impl futures::Stream<Item = Result<StreamEvent, ClientError>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next_event().await?;
            Some((item, stream))
        })
    }

    fn drain(&mut self) {
        self.state = ConsumerState::Draining;
        self.pending.clear();
        self.body.release();
    }

    fn close(&mut self) {
        self.pending.clear();
        self.body.release();
        self.state = ConsumerState::Closed;
    }
}
