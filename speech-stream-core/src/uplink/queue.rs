//! Single-producer, single-consumer FIFO between the foreground tick and the
//! uplink sender task.
//!
//! Pushing never blocks: a live feed would rather lose a chunk than stall the
//! tick. Whether the queue has a bound, and what happens at the bound, is
//! chosen with [`QueuePolicy`].

use tokio::sync::mpsc;

use crate::models::audio_models::AudioChunk;

/// Bound and drop behaviour of the uplink queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Never drops while open; memory grows if the consumer stalls.
    #[default]
    Unbounded,
    /// Holds at most `capacity` chunks; pushes beyond that are dropped.
    Bounded { capacity: usize },
}

/// Result of a best-effort push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The queue was closed, or its consumer is gone.
    DroppedClosed,
    /// A bounded queue was full.
    DroppedFull,
}

impl PushOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }
}

enum SenderInner {
    Unbounded(mpsc::UnboundedSender<AudioChunk>),
    Bounded(mpsc::Sender<AudioChunk>),
}

enum ReceiverInner {
    Unbounded(mpsc::UnboundedReceiver<AudioChunk>),
    Bounded(mpsc::Receiver<AudioChunk>),
}

/// Producer side. Owned by the session.
pub struct UplinkSender {
    inner: Option<SenderInner>,
}

/// Consumer side. Owned by the sender task.
pub struct UplinkReceiver {
    inner: ReceiverInner,
}

/// Create a queue with the given policy.
pub fn uplink_queue(policy: QueuePolicy) -> (UplinkSender, UplinkReceiver) {
    let (tx, rx) = match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (SenderInner::Unbounded(tx), ReceiverInner::Unbounded(rx))
        }
        QueuePolicy::Bounded { capacity } => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (SenderInner::Bounded(tx), ReceiverInner::Bounded(rx))
        }
    };
    (UplinkSender { inner: Some(tx) }, UplinkReceiver { inner: rx })
}

impl UplinkSender {
    /// Enqueue without waiting.
    pub fn push(&self, chunk: AudioChunk) -> PushOutcome {
        match &self.inner {
            None => PushOutcome::DroppedClosed,
            Some(SenderInner::Unbounded(tx)) => match tx.send(chunk) {
                Ok(()) => PushOutcome::Queued,
                Err(_) => PushOutcome::DroppedClosed,
            },
            Some(SenderInner::Bounded(tx)) => match tx.try_send(chunk) {
                Ok(()) => PushOutcome::Queued,
                Err(mpsc::error::TrySendError::Full(_)) => PushOutcome::DroppedFull,
                Err(mpsc::error::TrySendError::Closed(_)) => PushOutcome::DroppedClosed,
            },
        }
    }

    /// No more chunks will be pushed. Queued chunks are still delivered.
    pub fn close(&mut self) {
        self.inner = None;
    }

    pub fn is_closed(&self) -> bool {
        match &self.inner {
            None => true,
            Some(SenderInner::Unbounded(tx)) => tx.is_closed(),
            Some(SenderInner::Bounded(tx)) => tx.is_closed(),
        }
    }
}

impl UplinkReceiver {
    /// Next chunk in push order; suspends while empty, `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<AudioChunk> {
        match &mut self.inner {
            ReceiverInner::Unbounded(rx) => rx.recv().await,
            ReceiverInner::Bounded(rx) => rx.recv().await,
        }
    }
}
