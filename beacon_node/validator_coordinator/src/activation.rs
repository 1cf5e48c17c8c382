//! Streams validator status changes to clients waiting for their validators to activate.

use crate::metrics;
use crate::status::ValidatorStatus;
use crate::subscription::{SubscriptionGuard, SubscriptionRegistry};
use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use types::PublicKeyBytes;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorActivationStatus {
    pub public_key: PublicKeyBytes,
    pub status: ValidatorStatus,
}

/// The status of every key of a subscription, in the order the keys were requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorActivationResponse {
    pub statuses: Vec<ValidatorActivationStatus>,
}

impl ValidatorActivationResponse {
    fn new(pubkeys: &[PublicKeyBytes], statuses: &[ValidatorStatus]) -> Self {
        Self {
            statuses: pubkeys
                .iter()
                .zip(statuses)
                .map(|(public_key, status)| ValidatorActivationStatus {
                    public_key: *public_key,
                    status: *status,
                })
                .collect(),
        }
    }

    /// Returns `true` if every key has reached `Active`.
    pub fn all_activated(&self) -> bool {
        self.statuses.iter().all(|s| s.status.is_activated())
    }
}

struct ActivationEntry {
    pubkeys: Vec<PublicKeyBytes>,
    last_statuses: Vec<ValidatorStatus>,
    sender: mpsc::UnboundedSender<ValidatorActivationResponse>,
}

impl ActivationEntry {
    /// Merges freshly resolved statuses into `last_statuses`, keeping the previous status of any
    /// key which could not be resolved.
    ///
    /// Returns the response to emit, or `None` if nothing changed.
    fn merge(
        &mut self,
        resolved: &[Option<ValidatorStatus>],
    ) -> Option<ValidatorActivationResponse> {
        let statuses: Vec<_> = self
            .last_statuses
            .iter()
            .zip(resolved)
            .map(|(last, resolved)| resolved.unwrap_or(*last))
            .collect();

        if statuses == self.last_statuses {
            return None;
        }
        self.last_statuses = statuses;

        Some(ValidatorActivationResponse::new(&self.pubkeys, &self.last_statuses))
    }
}

/// The outcome of one evaluator pass over the activation subscriptions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActivationPass {
    pub notified: usize,
    pub resolved: usize,
    pub disconnected: usize,
}

pub struct ActivationWatcher {
    subscriptions: SubscriptionRegistry<ActivationEntry>,
    /// Serializes passes, so statuses are applied in the order they were observed.
    pass_lock: Mutex<()>,
}

impl Default for ActivationWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationWatcher {
    pub fn new() -> Self {
        Self {
            subscriptions: SubscriptionRegistry::new(&metrics::ACTIVATION_SUBSCRIPTIONS),
            pass_lock: Mutex::new(()),
        }
    }

    /// Opens a subscription for `pubkeys`, whose current statuses are `statuses`.
    ///
    /// If every key is already active the stream yields a single response and ends. Otherwise it
    /// yields a response each time an evaluator pass observes a status change and ends after the
    /// pass in which the last key activates.
    pub fn subscribe(
        &self,
        pubkeys: Vec<PublicKeyBytes>,
        statuses: Vec<ValidatorStatus>,
    ) -> ActivationStream {
        let (sender, receiver) = mpsc::unbounded_channel();

        if statuses.iter().all(ValidatorStatus::is_activated) {
            // The receiver is still alive, sending cannot fail.
            let _ = sender.send(ValidatorActivationResponse::new(&pubkeys, &statuses));
            metrics::inc_counter_vec(&metrics::NOTIFICATIONS_SENT, &["activation"]);
            return ActivationStream {
                receiver,
                _guard: None,
            };
        }

        let guard = self.subscriptions.register(ActivationEntry {
            pubkeys,
            last_statuses: statuses,
            sender,
        });

        ActivationStream {
            receiver,
            _guard: Some(guard),
        }
    }

    /// Re-resolves every watched key with `resolve` and notifies the subscriptions which changed.
    ///
    /// `resolve` returns `None` for a key whose status could not be determined, that key keeps its
    /// previous status. Subscriptions whose keys are all active receive their final response and
    /// are removed, as are those whose client has gone away.
    ///
    /// The subscription list is only locked while copying the watched keys and while applying the
    /// result for each subscription, never while `resolve` runs.
    pub fn on_pass<F>(&self, mut resolve: F) -> ActivationPass
    where
        F: FnMut(&PublicKeyBytes) -> Option<ValidatorStatus>,
    {
        let _pass = self.pass_lock.lock();
        let mut pass = ActivationPass::default();

        let watched = self
            .subscriptions
            .collect(|entry| (!entry.sender.is_closed()).then(|| entry.pubkeys.clone()));

        for (id, pubkeys) in watched {
            // Disconnected subscriptions are removed below without resolving their keys.
            let resolved: Vec<_> = match pubkeys {
                Some(pubkeys) => pubkeys.iter().map(&mut resolve).collect(),
                None => vec![],
            };

            self.subscriptions.update(id, |entry| {
                if entry.sender.is_closed() {
                    pass.disconnected += 1;
                    return false;
                }

                let Some(response) = entry.merge(&resolved) else {
                    return true;
                };
                let activated = response.all_activated();

                if entry.sender.send(response).is_err() {
                    pass.disconnected += 1;
                    return false;
                }
                metrics::inc_counter_vec(&metrics::NOTIFICATIONS_SENT, &["activation"]);
                pass.notified += 1;

                if activated {
                    pass.resolved += 1;
                }
                !activated
            });
        }

        pass
    }

    /// Returns the number of open subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

/// A stream of `ValidatorActivationResponse`. Dropping it cancels the subscription.
pub struct ActivationStream {
    receiver: mpsc::UnboundedReceiver<ValidatorActivationResponse>,
    _guard: Option<SubscriptionGuard<ActivationEntry>>,
}

impl Stream for ActivationStream {
    type Item = ValidatorActivationResponse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::deterministic_pubkey;
    use futures::StreamExt;
    use std::collections::HashMap;

    fn keys(n: usize) -> Vec<PublicKeyBytes> {
        (0..n).map(deterministic_pubkey).collect()
    }

    #[tokio::test]
    async fn already_active_emits_once() {
        let watcher = ActivationWatcher::new();
        let mut stream = watcher.subscribe(keys(2), vec![ValidatorStatus::Active; 2]);

        let response = stream.next().await.unwrap();
        assert!(response.all_activated());
        assert_eq!(response.statuses.len(), 2);
        assert_eq!(stream.next().await, None);
        assert!(watcher.is_empty());
    }

    #[tokio::test]
    async fn emits_on_change_and_terminates() {
        let watcher = ActivationWatcher::new();
        let pubkeys = keys(2);
        let mut stream = watcher.subscribe(
            pubkeys.clone(),
            vec![ValidatorStatus::Pending, ValidatorStatus::Active],
        );

        let mut statuses: HashMap<_, _> = pubkeys
            .iter()
            .map(|k| (*k, ValidatorStatus::Pending))
            .collect();
        statuses.insert(pubkeys[1], ValidatorStatus::Active);

        // No change, no emission.
        let pass = watcher.on_pass(|k| Some(statuses[k]));
        assert_eq!(pass, ActivationPass::default());

        statuses.insert(pubkeys[0], ValidatorStatus::Active);
        let pass = watcher.on_pass(|k| Some(statuses[k]));
        assert_eq!(pass.notified, 1);
        assert_eq!(pass.resolved, 1);

        let response = stream.next().await.unwrap();
        assert!(response.all_activated());
        assert_eq!(response.statuses[0].public_key, pubkeys[0]);
        assert_eq!(stream.next().await, None);
        assert!(watcher.is_empty());
    }

    #[tokio::test]
    async fn dropped_stream_is_deregistered() {
        let watcher = ActivationWatcher::new();
        let stream = watcher.subscribe(keys(1), vec![ValidatorStatus::Pending]);
        assert_eq!(watcher.len(), 1);

        drop(stream);
        assert!(watcher.is_empty());
        assert_eq!(
            watcher.on_pass(|_| Some(ValidatorStatus::Active)),
            ActivationPass::default()
        );
    }

    #[tokio::test]
    async fn skipping_past_active_still_resolves() {
        let watcher = ActivationWatcher::new();
        let mut stream = watcher.subscribe(keys(1), vec![ValidatorStatus::Pending]);

        watcher.on_pass(|_| Some(ValidatorStatus::Exiting));

        let response = stream.next().await.unwrap();
        assert_eq!(response.statuses[0].status, ValidatorStatus::Exiting);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn unresolved_key_keeps_previous_status() {
        let watcher = ActivationWatcher::new();
        let pubkeys = keys(2);
        let mut stream = watcher.subscribe(
            pubkeys.clone(),
            vec![ValidatorStatus::Deposited, ValidatorStatus::Pending],
        );

        // The first key cannot be resolved, the second is unchanged.
        let pass = watcher.on_pass(|k| (*k == pubkeys[1]).then_some(ValidatorStatus::Pending));
        assert_eq!(pass, ActivationPass::default());

        // Only the resolved key moves, the other keeps its last known status.
        let pass = watcher.on_pass(|k| (*k == pubkeys[1]).then_some(ValidatorStatus::Active));
        assert_eq!(pass.notified, 1);
        let response = stream.next().await.unwrap();
        assert_eq!(response.statuses[0].status, ValidatorStatus::Deposited);
        assert_eq!(response.statuses[1].status, ValidatorStatus::Active);
        assert_eq!(watcher.len(), 1);
    }

    #[tokio::test]
    async fn subscribing_does_not_wait_for_a_pass() {
        let watcher = ActivationWatcher::new();
        let _stream = watcher.subscribe(keys(1), vec![ValidatorStatus::Pending]);

        let mut opened = vec![];
        watcher.on_pass(|_| {
            // Runs while the pass is in progress.
            opened.push(watcher.subscribe(keys(2), vec![ValidatorStatus::Pending; 2]));
            Some(ValidatorStatus::Pending)
        });

        assert_eq!(opened.len(), 1);
        assert_eq!(watcher.len(), 2);

        drop(opened);
        assert_eq!(watcher.len(), 1);
    }
}
