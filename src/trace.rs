//! Execution trace: the run-scoped progress feed.
//!
//! Every text emission of a run (reasoning, tool output, delegation
//! boundaries, the final answer, errors) is appended to an
//! [`ExecutionTrace`] and read from the paired [`TraceStream`]. A manager
//! and the sub-agents it delegates to write to the same trace, so the
//! stream carries one global sequence for the whole orchestration.
//!
//! Buffering is unbounded. Emitting never blocks the agent loop and never
//! fails: chunks produced before the consumer starts reading are kept until
//! read, and chunks emitted after the consumer is dropped are discarded.
//! [`ExecutionTrace::finish`] sends the single end-of-stream marker.

use crate::types::RunId;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// What a chunk of trace text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkKind {
    /// The model's announcement of what it is about to do
    Reasoning,
    /// The observation a tool produced
    ToolOutput,
    /// A final answer
    Final,
    /// A failure: tool error, malformed reply, exhaustion
    Error,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reasoning => write!(f, "reasoning"),
            Self::ToolOutput => write!(f, "tool-output"),
            Self::Final => write!(f, "final"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One tagged piece of trace text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceChunk {
    /// Position in the trace, starting at 1, strictly increasing by 1
    pub seq: u64,
    /// The run that emitted the chunk
    pub run_id: RunId,
    /// Name of the agent that emitted the chunk
    pub agent: String,
    /// Step of that run the chunk belongs to; 0 for run-level chunks
    pub step: usize,
    /// What the text is
    pub kind: ChunkKind,
    /// The text itself
    pub text: String,
    /// When the chunk was emitted
    pub timestamp: DateTime<Utc>,
}

/// An item read from a [`TraceStream`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A chunk of run output
    Chunk(TraceChunk),
    /// No more chunks will follow
    EndOfStream {
        /// Number of chunks emitted before the marker
        chunks: u64,
    },
}

impl TraceEvent {
    /// Returns the chunk, if this is one.
    #[must_use]
    pub fn chunk(&self) -> Option<&TraceChunk> {
        match self {
            Self::Chunk(chunk) => Some(chunk),
            Self::EndOfStream { .. } => None,
        }
    }

    /// Returns true for the end-of-stream marker.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::EndOfStream { .. })
    }
}

/// Producer half of a trace. Cheap to clone; clones share the sequence.
#[derive(Clone, Default)]
pub struct ExecutionTrace {
    sender: Option<mpsc::UnboundedSender<TraceEvent>>,
    seq: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl ExecutionTrace {
    /// A trace that records nothing, for runs nobody observes.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns true if chunks are delivered somewhere.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Number of chunks emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Appends a chunk.
    ///
    /// Does nothing once the trace has finished. Never blocks.
    pub fn emit(
        &self,
        run_id: &RunId,
        agent: &str,
        step: usize,
        kind: ChunkKind,
        text: impl Into<String>,
    ) {
        let Some(sender) = &self.sender else {
            return;
        };
        if self.finished.load(Ordering::SeqCst) {
            tracing::debug!(agent, "dropping trace chunk emitted after end of stream");
            return;
        }

        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let chunk = TraceChunk {
            seq,
            run_id: run_id.clone(),
            agent: agent.to_string(),
            step,
            kind,
            text: text.into(),
            timestamp: Utc::now(),
        };
        // A dropped consumer is not an error for the producer.
        let _ = sender.send(TraceEvent::Chunk(chunk));
    }

    /// Sends the end-of-stream marker. Only the first call has any effect.
    pub fn finish(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = sender.send(TraceEvent::EndOfStream {
            chunks: self.emitted(),
        });
    }
}

impl fmt::Debug for ExecutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionTrace")
            .field("enabled", &self.is_enabled())
            .field("emitted", &self.emitted())
            .field("finished", &self.finished.load(Ordering::SeqCst))
            .finish()
    }
}

/// Consumer half of a trace.
#[derive(Debug)]
pub struct TraceStream {
    receiver: mpsc::UnboundedReceiver<TraceEvent>,
    ended: bool,
}

impl TraceStream {
    /// Waits for the next event; `None` after the end-of-stream marker.
    pub async fn next_event(&mut self) -> Option<TraceEvent> {
        if self.ended {
            return None;
        }
        let event = self.receiver.recv().await;
        if event.as_ref().map_or(true, TraceEvent::is_end) {
            self.ended = true;
        }
        event
    }

    /// Reads everything up to and including the end-of-stream marker.
    pub async fn collect_all(mut self) -> Vec<TraceEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    /// Returns the events already buffered, without waiting.
    pub fn drain_ready(&mut self) -> Vec<TraceEvent> {
        let mut events = Vec::new();
        while !self.ended {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.ended = event.is_end();
                    events.push(event);
                }
                Err(_) => break,
            }
        }
        events
    }
}

impl Stream for TraceStream {
    type Item = TraceEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.ended {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(event) => {
                if event.as_ref().map_or(true, TraceEvent::is_end) {
                    self.ended = true;
                }
                Poll::Ready(event)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Creates a connected producer/consumer pair.
#[must_use]
pub fn trace_channel() -> (ExecutionTrace, TraceStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let trace = ExecutionTrace {
        sender: Some(sender),
        seq: Arc::new(AtomicU64::new(0)),
        finished: Arc::new(AtomicBool::new(false)),
    };
    (
        trace,
        TraceStream {
            receiver,
            ended: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn chunks_are_numbered_from_one() {
        let (trace, stream) = trace_channel();
        let run = RunId::new();
        trace.emit(&run, "manager_agent", 1, ChunkKind::Reasoning, "thinking");
        trace.clone().emit(&run, "calc_agent", 1, ChunkKind::Final, "4");
        trace.finish();

        let events = stream.collect_all().await;
        assert_eq!(events.len(), 3);
        let seqs: Vec<u64> = events.iter().filter_map(|e| e.chunk()).map(|c| c.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(events[2], TraceEvent::EndOfStream { chunks: 2 });
    }

    #[tokio::test]
    async fn finish_is_idempotent() {
        let (trace, stream) = trace_channel();
        trace.finish();
        trace.finish();
        trace.emit(&RunId::new(), "a", 1, ChunkKind::Error, "late");

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events, vec![TraceEvent::EndOfStream { chunks: 0 }]);
    }

    #[tokio::test]
    async fn late_consumer_sees_backlog() {
        let (trace, mut stream) = trace_channel();
        let run = RunId::new();
        for i in 0..5 {
            trace.emit(&run, "web_agent", i, ChunkKind::ToolOutput, format!("page {i}"));
        }

        let ready = stream.drain_ready();
        assert_eq!(ready.len(), 5);
        assert!(stream.drain_ready().is_empty());
    }

    #[test]
    fn emit_without_consumer_does_not_block() {
        let (trace, stream) = trace_channel();
        drop(stream);
        trace.emit(&RunId::new(), "a", 1, ChunkKind::Reasoning, "nobody listens");
        trace.finish();
        assert_eq!(trace.emitted(), 1);
    }

    #[test]
    fn disabled_trace_is_silent() {
        let trace = ExecutionTrace::disabled();
        trace.emit(&RunId::new(), "a", 1, ChunkKind::Reasoning, "x");
        trace.finish();
        assert!(!trace.is_enabled());
        assert_eq!(trace.emitted(), 0);
    }

    #[test]
    fn chunk_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(ChunkKind::ToolOutput).unwrap(),
            serde_json::json!("tool-output")
        );
        assert_eq!(ChunkKind::ToolOutput.to_string(), "tool-output");
    }

    #[test]
    fn end_of_stream_serializes_with_tag() {
        let value = serde_json::to_value(TraceEvent::EndOfStream { chunks: 3 }).unwrap();
        assert_eq!(value["event"], "end_of_stream");
        assert_eq!(value["chunks"], 3);
    }
}
