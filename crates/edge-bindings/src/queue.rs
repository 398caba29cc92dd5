//! In-memory queue binding.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use edge_core::{BindingError, Queue};
use tokio::sync::Mutex;

/// Queue that keeps messages in memory until drained.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    messages: Mutex<Vec<Bytes>>,
    capacity: Option<usize>,
}

impl MemoryQueue {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that rejects messages past `capacity`.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    /// Create a queue behind an `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Take all pending messages.
    pub async fn drain(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.messages.lock().await)
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn send(&self, message: Bytes) -> Result<(), BindingError> {
        let mut messages = self.messages.lock().await;
        if let Some(capacity) = self.capacity {
            if messages.len() >= capacity {
                return Err(BindingError::QueueClosed(format!(
                    "queue full ({} messages)",
                    capacity
                )));
            }
        }
        messages.push(message);
        Ok(())
    }
}
