//! The background task which reacts to chain events and drives the subscriptions.

use crate::activation::{ActivationPass, ActivationWatcher};
use crate::backend::ChainBackend;
use crate::chain_start::ChainStartNotifier;
use crate::metrics;
use crate::registry::RegistrySnapshot;
use crate::status::{resolve_pubkey, ValidatorStatus};
use slog::{debug, error, info, warn, Logger};
use std::sync::Arc;
use tokio::sync::mpsc;
use types::{Epoch, PublicKeyBytes};

/// An update from the rest of the beacon node which may change validator statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEvent {
    /// The canonical head changed.
    HeadUpdated,
    /// A new epoch was finalized.
    FinalizedEpoch(Epoch),
    /// The eth1 deposit watcher imported logs up to `latest_block`.
    DepositLogs { latest_block: u64 },
    /// The deposit watcher observed the genesis threshold.
    ChainStarted { genesis_time: u64 },
}

/// Feeds chain events to a running evaluator. The evaluator stops once every sender is dropped.
pub type EventSender = mpsc::Sender<ChainEvent>;

/// The single writer of subscription state.
pub struct Evaluator<T> {
    backend: Arc<T>,
    activations: Arc<ActivationWatcher>,
    chain_start: Arc<ChainStartNotifier>,
    log: Logger,
}

impl<T: ChainBackend> Evaluator<T> {
    pub fn new(
        backend: Arc<T>,
        activations: Arc<ActivationWatcher>,
        chain_start: Arc<ChainStartNotifier>,
        log: Logger,
    ) -> Self {
        Self {
            backend,
            activations,
            chain_start,
            log,
        }
    }

    /// Handles a single event, pushing notifications to every affected subscription.
    pub fn on_event(&self, event: ChainEvent) {
        let _timer = metrics::start_timer(&metrics::EVALUATOR_PASS_TIMES);
        metrics::inc_counter(&metrics::EVALUATOR_PASSES);

        debug!(self.log, "Processing chain event"; "event" => ?event);

        if let ChainEvent::ChainStarted { genesis_time } = event {
            self.notify_chain_start(genesis_time);
        }

        self.evaluate_activations();
    }

    /// Runs until every `EventSender` has been dropped.
    pub async fn run(self, mut events: mpsc::Receiver<ChainEvent>) {
        while let Some(event) = events.recv().await {
            self.on_event(event);
        }

        debug!(self.log, "Evaluator stopped"; "reason" => "event channel closed");
    }

    fn notify_chain_start(&self, genesis_time: u64) {
        if let Some(notified) = self.chain_start.notify(genesis_time) {
            info!(
                self.log,
                "Chain started";
                "genesis_time" => genesis_time,
                "notified_subscribers" => notified,
            );
        }
    }

    fn evaluate_activations(&self) {
        let snapshot = match self.backend.head_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    self.log,
                    "Failed to read head state";
                    "error" => ?e,
                    "open_subscriptions" => self.activations.len(),
                );
                return;
            }
        };

        // A head state implies genesis, even if the deposit watcher has not said so yet.
        if let Some(snapshot) = snapshot.as_ref() {
            self.notify_chain_start(snapshot.genesis_time());
        }

        if self.activations.is_empty() {
            return;
        }

        let pass = self
            .activations
            .on_pass(|pubkey| self.resolve_status(snapshot.as_deref(), pubkey));

        if pass != ActivationPass::default() {
            debug!(
                self.log,
                "Activation subscriptions updated";
                "notified" => pass.notified,
                "resolved" => pass.resolved,
                "disconnected" => pass.disconnected,
            );
        }
    }

    /// Resolves the status of `pubkey`, or `None` if it is outside the registry and its deposit
    /// could not be looked up. The next pass retries it.
    fn resolve_status(
        &self,
        snapshot: Option<&RegistrySnapshot>,
        pubkey: &PublicKeyBytes,
    ) -> Option<ValidatorStatus> {
        let in_registry =
            snapshot.map_or(false, |snapshot| snapshot.get_validator_by_pubkey(pubkey).is_some());

        // The deposit only decides the status of keys outside the registry.
        let deposit = if in_registry {
            None
        } else {
            match self.backend.eth1_deposit_block_number(pubkey) {
                Ok(deposit) => deposit,
                Err(e) => {
                    warn!(
                        self.log,
                        "Failed to read eth1 deposit";
                        "error" => ?e,
                        "pubkey" => %pubkey,
                    );
                    return None;
                }
            }
        };

        Some(resolve_pubkey(snapshot, pubkey, deposit).status)
    }
}
