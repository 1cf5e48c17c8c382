use crate::metrics;
use crate::subscription::{SubscriptionGuard, SubscriptionRegistry};
use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStartResponse {
    pub started: bool,
    pub genesis_time: u64,
}

/// Notifies subscribers, exactly once each, when the chain starts.
pub struct ChainStartNotifier {
    /// `Some(genesis_time)` once the chain has started.
    ///
    /// Always locked before `subscribers` so a subscriber cannot register between the genesis
    /// time being set and the subscribers being drained.
    genesis_time: Mutex<Option<u64>>,
    subscribers: SubscriptionRegistry<oneshot::Sender<ChainStartResponse>>,
}

impl Default for ChainStartNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStartNotifier {
    pub fn new() -> Self {
        Self {
            genesis_time: Mutex::new(None),
            subscribers: SubscriptionRegistry::new(&metrics::CHAIN_START_SUBSCRIPTIONS),
        }
    }

    /// Returns the genesis time, if the chain has started.
    pub fn genesis_time(&self) -> Option<u64> {
        *self.genesis_time.lock()
    }

    pub fn is_started(&self) -> bool {
        self.genesis_time().is_some()
    }

    /// Opens a subscription which yields a single `ChainStartResponse` once the chain has started,
    /// immediately if it already has.
    pub fn subscribe(&self) -> ChainStartStream {
        let genesis_time = self.genesis_time.lock();
        let (sender, receiver) = oneshot::channel();

        let guard = match *genesis_time {
            Some(genesis_time) => {
                // The receiver is still alive, sending cannot fail.
                let _ = sender.send(ChainStartResponse {
                    started: true,
                    genesis_time,
                });
                metrics::inc_counter_vec(&metrics::NOTIFICATIONS_SENT, &["chain_start"]);
                None
            }
            None => Some(self.subscribers.register(sender)),
        };

        ChainStartStream {
            receiver: Some(receiver),
            _guard: guard,
        }
    }

    /// Records that the chain started at `genesis_time` and notifies every waiting subscriber.
    ///
    /// Returns the number of subscribers notified, or `None` if the chain had already started.
    pub fn notify(&self, genesis_time: u64) -> Option<usize> {
        let mut started = self.genesis_time.lock();
        if started.is_some() {
            return None;
        }
        *started = Some(genesis_time);

        let response = ChainStartResponse {
            started: true,
            genesis_time,
        };
        let notified = self
            .subscribers
            .drain()
            .into_iter()
            .map(|sender| sender.send(response))
            .filter(Result::is_ok)
            .count();
        metrics::inc_counter_vec_by(
            &metrics::NOTIFICATIONS_SENT,
            &["chain_start"],
            notified as u64,
        );

        Some(notified)
    }

    /// Returns the number of subscribers still waiting.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// A stream yielding at most one `ChainStartResponse`. Dropping it cancels the subscription.
pub struct ChainStartStream {
    receiver: Option<oneshot::Receiver<ChainStartResponse>>,
    _guard: Option<SubscriptionGuard<oneshot::Sender<ChainStartResponse>>>,
}

impl Stream for ChainStartStream {
    type Item = ChainStartResponse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(receiver).poll(cx) {
            Poll::Ready(result) => {
                self.receiver = None;
                Poll::Ready(result.ok())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
