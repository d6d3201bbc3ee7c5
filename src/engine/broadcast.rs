// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-producer, multi-consumer ordered fan-out.
//!
//! Every subscriber owns a bounded queue. `emit` pushes the item into each
//! queue in turn and waits while any of them is full, so the producer can
//! never run more than `capacity` items ahead of its slowest consumer.

use crate::config::JobId;
use crate::engine::RunScope;
use crate::errors::JobError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Semaphore};

struct StreamState<T> {
    subscribers: Vec<mpsc::Sender<T>>,
    closed: bool,
}

pub struct BroadcastStream<T> {
    source: JobId,
    capacity: usize,
    state: Mutex<StreamState<T>>,
}

impl<T: Clone + Send> BroadcastStream<T> {
    /// `capacity` is clamped to what a tokio channel can hold, and to at least 1.
    pub fn new(source: JobId, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.clamp(1, Semaphore::MAX_PERMITS),
            state: Mutex::new(StreamState {
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    pub fn source(&self) -> &JobId {
        &self.source
    }

    /// Register a consumer; it receives every item emitted from now on.
    ///
    /// # Panics
    /// If the stream is already closed.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut state = self.lock();
        assert!(!state.closed, "subscribe on closed stream '{}'", self.source);

        let (sender, receiver) = mpsc::channel(self.capacity);
        state.subscribers.push(sender);
        Subscription {
            source: self.source.clone(),
            receiver,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Deliver `item` to every current subscriber, in emission order.
    ///
    /// Returns once every subscriber has accepted it, or with the scope's
    /// reason if the run is cancelled first. Subscribers that went away are
    /// dropped from the list and no longer hold the producer back.
    ///
    /// # Panics
    /// If the stream is already closed.
    pub async fn emit(&self, scope: &RunScope, item: T) -> Result<(), JobError> {
        let subscribers = {
            let state = self.lock();
            assert!(!state.closed, "emit on closed stream '{}'", self.source);
            state.subscribers.clone()
        };

        let mut lost_subscriber = false;
        for sender in &subscribers {
            tokio::select! {
                biased;
                reason = scope.cancelled() => return Err(reason),
                sent = sender.send(item.clone()) => lost_subscriber |= sent.is_err(),
            }
        }

        if lost_subscriber {
            self.lock().subscribers.retain(|sender| !sender.is_closed());
        }
        Ok(())
    }

    /// End of stream. Consumers drain what is queued, then see the stream as
    /// closed. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, StreamState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Consumer end of a [`BroadcastStream`].
#[derive(Debug)]
pub struct Subscription<T> {
    source: JobId,
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// The job producing this stream.
    pub fn source(&self) -> &JobId {
        &self.source
    }

    /// Next item, in emission order.
    ///
    /// Fails with [`JobError::DependencyClosed`] once the producer has closed
    /// and everything queued has been read, or with the scope's reason if the
    /// run is cancelled first.
    pub async fn recv(&mut self, scope: &RunScope) -> Result<T, JobError> {
        tokio::select! {
            biased;
            reason = scope.cancelled() => Err(reason),
            item = self.receiver.recv() => item.ok_or_else(|| JobError::DependencyClosed {
                dependency: self.source.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn stream(capacity: usize) -> Arc<BroadcastStream<u32>> {
        Arc::new(BroadcastStream::new("producer".into(), capacity))
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_item_in_order() {
        let scope = RunScope::new(None);
        let stream = stream(8);
        let mut first = stream.subscribe();
        let mut second = stream.subscribe();

        for item in 0..5 {
            stream.emit(&scope, item).await.unwrap();
        }
        stream.close();

        for subscription in [&mut first, &mut second] {
            let mut seen = Vec::new();
            while let Ok(item) = subscription.recv(&scope).await {
                seen.push(item);
            }
            assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        }
    }

    #[tokio::test]
    async fn test_recv_after_close_reports_dependency_closed() {
        let scope = RunScope::new(None);
        let stream = stream(1);
        let mut subscription = stream.subscribe();
        stream.close();
        stream.close();

        assert!(stream.is_closed());
        assert_eq!(
            subscription.recv(&scope).await,
            Err(JobError::DependencyClosed {
                dependency: "producer".into()
            })
        );
    }

    #[tokio::test]
    async fn test_emit_blocks_on_full_subscriber() {
        let scope = RunScope::new(None);
        let stream = stream(1);
        let mut slow = stream.subscribe();

        stream.emit(&scope, 1).await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), stream.emit(&scope, 2)).await;
        assert!(blocked.is_err(), "emit should wait for the slow subscriber");

        assert_eq!(slow.recv(&scope).await, Ok(1));
        stream.emit(&scope, 3).await.unwrap();
        assert_eq!(slow.recv(&scope).await, Ok(3));
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_emit_and_recv() {
        let scope = RunScope::new(None);
        let stream = stream(1);
        let mut idle = stream.subscribe();
        stream.emit(&scope, 1).await.unwrap();

        let producer = {
            let (stream, scope) = (stream.clone(), scope.clone());
            tokio::spawn(async move { stream.emit(&scope, 2).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        scope.cancel();

        assert_eq!(producer.await.unwrap(), Err(JobError::Cancelled));
        assert_eq!(idle.recv(&scope).await, Err(JobError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let scope = RunScope::new(None);
        let stream = stream(1);
        let gone = stream.subscribe();
        let mut kept = stream.subscribe();
        drop(gone);

        stream.emit(&scope, 7).await.unwrap();
        assert_eq!(stream.subscriber_count(), 1);
        assert_eq!(kept.recv(&scope).await, Ok(7));
        stream.emit(&scope, 8).await.unwrap();
        assert_eq!(kept.recv(&scope).await, Ok(8));
    }

    #[test]
    #[should_panic(expected = "subscribe on closed stream")]
    fn test_subscribe_after_close_panics() {
        let stream = stream(1);
        stream.close();
        let _ = stream.subscribe();
    }

    #[tokio::test]
    #[should_panic(expected = "emit on closed stream")]
    async fn test_emit_after_close_panics() {
        let scope = RunScope::new(None);
        let stream = stream(1);
        let _subscriber = stream.subscribe();
        stream.close();
        let _ = stream.emit(&scope, 7).await;
    }

    #[tokio::test]
    async fn test_oversized_capacity_is_clamped() {
        let scope = RunScope::new(None);
        let stream = stream(usize::MAX);
        let mut subscriber = stream.subscribe();
        stream.emit(&scope, 1).await.unwrap();
        assert_eq!(subscriber.recv(&scope).await, Ok(1));
    }
}
