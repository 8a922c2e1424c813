//! Streaming types for LLM responses

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::FinishReason;
use crate::agents::domain::TokenUsage;
use crate::agents::error::LlmError;

type ChunkResult = Result<StreamChunk, LlmError>;

/// A chunk of streamed LLM response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Delta content (text being generated)
    #[serde(default)]
    pub content: String,
    /// Finish reason (if this is the final chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Token usage (usually only in final chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    /// Create a text content chunk
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: None,
            usage: None,
        }
    }

    /// Check if this chunk has content
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Streaming response from an LLM provider
pub struct LlmStream {
    receiver: mpsc::Receiver<ChunkResult>,
}

impl LlmStream {
    /// Create a channel pair for building an LLM stream
    pub fn channel(buffer: usize) -> (LlmStreamSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (LlmStreamSender { sender: tx }, Self { receiver: rx })
    }

    /// Close the receiving side; the producer observes it through
    /// [`LlmStreamSender::closed`]
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Stream for LlmStream {
    type Item = ChunkResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Sender half for building an LLM stream
#[derive(Clone)]
pub struct LlmStreamSender {
    sender: mpsc::Sender<ChunkResult>,
}

impl LlmStreamSender {
    /// Send a chunk
    pub async fn send(&self, chunk: StreamChunk) -> Result<(), mpsc::error::SendError<ChunkResult>> {
        self.sender.send(Ok(chunk)).await
    }

    /// Send an error
    pub async fn send_error(&self, error: LlmError) -> Result<(), mpsc::error::SendError<ChunkResult>> {
        self.sender.send(Err(error)).await
    }

    /// Send text content
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), mpsc::error::SendError<ChunkResult>> {
        self.send(StreamChunk::text(text)).await
    }

    /// Check if the receiver is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the receiver has been closed or dropped
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let (sender, mut stream) = LlmStream::channel(8);
        sender.send_text("Hello").await.unwrap();
        sender.send_text("").await.unwrap();
        sender.send_error(LlmError::Streaming("cut".to_string())).await.unwrap();
        drop(sender);

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.has_content());
        assert_eq!(first.content, "Hello");
        assert!(!stream.next().await.unwrap().unwrap().has_content());
        assert!(matches!(stream.next().await, Some(Err(LlmError::Streaming(_)))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_sender_observes_close() {
        let (sender, mut stream) = LlmStream::channel(1);
        assert!(!sender.is_closed());
        stream.close();
        sender.closed().await;
        assert!(sender.is_closed());
        assert!(sender.send_text("late").await.is_err());
    }
}
