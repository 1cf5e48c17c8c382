use crate::activation::{ActivationStream, ActivationWatcher};
use crate::backend::ChainBackend;
use crate::chain_start::{ChainStartNotifier, ChainStartStream};
use crate::config::Config;
use crate::duties::{Duty, DutyScheduler};
use crate::errors::Error;
use crate::evaluator::{ChainEvent, Evaluator, EventSender};
use crate::metrics;
use crate::registry::RegistrySnapshot;
use crate::status::{resolve_pubkey, ValidatorStatusResponse};
use slog::{debug, info, warn, Logger};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use types::{
    Attestation, AttestationData, BeaconBlock, ChainSpec, CommitteeIndex, Epoch, Fork, Graffiti,
    Hash256, PublicKeyBytes, RandaoReveal, SignedBeaconBlock, SignedVoluntaryExit, Slot,
};

/// Serves validator clients: duties, statuses, signature domains, block and attestation
/// production, and the activation and chain start subscriptions.
///
/// Cloning is cheap, every clone shares the same caches and subscriptions.
pub struct CoordinationService<T> {
    backend: Arc<T>,
    spec: Arc<ChainSpec>,
    config: Config,
    duties: Arc<DutyScheduler>,
    activations: Arc<ActivationWatcher>,
    chain_start: Arc<ChainStartNotifier>,
    log: Logger,
}

impl<T> Clone for CoordinationService<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            spec: self.spec.clone(),
            config: self.config.clone(),
            duties: self.duties.clone(),
            activations: self.activations.clone(),
            chain_start: self.chain_start.clone(),
            log: self.log.clone(),
        }
    }
}

impl<T: ChainBackend> CoordinationService<T> {
    pub fn new(backend: Arc<T>, spec: Arc<ChainSpec>, config: Config, log: Logger) -> Self {
        Self {
            backend,
            spec,
            duties: Arc::new(DutyScheduler::new(config.shuffling_cache_size)),
            config,
            activations: Arc::new(ActivationWatcher::new()),
            chain_start: Arc::new(ChainStartNotifier::new()),
            log: log.new(slog::o!("service" => "validator_coordinator")),
        }
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &Arc<T> {
        &self.backend
    }

    /// Returns the duties of each of `public_keys` at `epoch`, in the same order.
    ///
    /// Keys which are not in the registry yield an `Unknown` duty rather than an error.
    pub fn get_duties(&self, epoch: Epoch, public_keys: &[Vec<u8>]) -> Result<Vec<Duty>, Error> {
        metrics::inc_counter(&metrics::DUTIES_REQUESTS);
        let _timer = metrics::start_timer(&metrics::DUTIES_COMPUTE_TIMES);

        let pubkeys = parse_pubkeys(public_keys)?;
        let head = self.head()?;
        self.check_lookahead(&head, epoch)?;

        let duties = self.duties.compute_duties(&head, epoch, &pubkeys)?;

        debug!(
            self.log,
            "Computed validator duties";
            "epoch" => %epoch,
            "requested" => pubkeys.len(),
            "state_root" => ?head.state_root(),
        );

        Ok(duties)
    }

    /// Returns the committees attesting at `slot`, as validator indices.
    pub fn committees_at_slot(&self, slot: Slot) -> Result<Vec<Vec<usize>>, Error> {
        let head = self.head()?;
        self.check_lookahead(&head, slot.epoch(self.spec.slots_per_epoch))?;
        Ok(self.duties.committees_at_slot(&head, slot)?)
    }

    /// Returns the signature domain for `domain_tag` at `epoch`.
    ///
    /// Prior to genesis the genesis fork is used.
    pub fn domain_data(&self, epoch: Epoch, domain_tag: u32) -> Result<u64, Error> {
        let fork = match self.backend.head_snapshot()? {
            Some(head) => *head.fork(),
            None => Fork::genesis(self.spec.genesis_fork_version),
        };

        Ok(self.spec.get_domain_for_tag(epoch, domain_tag, &fork))
    }

    pub fn validator_index(&self, public_key: &[u8]) -> Result<u64, Error> {
        let pubkey = PublicKeyBytes::deserialize(public_key)?;
        let head = self.head()?;
        Ok(head.validator_index(&pubkey)? as u64)
    }

    /// Returns the status of `public_key`, which need not be in the registry.
    pub fn validator_status(&self, public_key: &[u8]) -> Result<ValidatorStatusResponse, Error> {
        let pubkey = PublicKeyBytes::deserialize(public_key)?;
        metrics::inc_counter(&metrics::STATUS_REQUESTS);

        let head = self.backend.head_snapshot()?;
        let deposit = self.backend.eth1_deposit_block_number(&pubkey)?;

        Ok(resolve_pubkey(head.as_deref(), &pubkey, deposit))
    }

    /// Returns the status of each of `public_keys`, in the same order.
    ///
    /// A failed deposit lookup for one key is logged and that key resolved without deposit data,
    /// the other keys are unaffected.
    pub fn multiple_validator_status(
        &self,
        public_keys: &[Vec<u8>],
    ) -> Result<Vec<ValidatorStatusResponse>, Error> {
        let pubkeys = parse_pubkeys(public_keys)?;
        metrics::inc_counter_by(&metrics::STATUS_REQUESTS, pubkeys.len() as u64);

        let head = self.backend.head_snapshot()?;

        Ok(pubkeys
            .iter()
            .map(|pubkey| {
                let deposit = self
                    .backend
                    .eth1_deposit_block_number(pubkey)
                    .unwrap_or_else(|e| {
                        warn!(
                            self.log,
                            "Failed to read eth1 deposit";
                            "error" => ?e,
                            "pubkey" => %pubkey,
                        );
                        None
                    });
                resolve_pubkey(head.as_deref(), pubkey, deposit)
            })
            .collect())
    }

    /// Opens a stream of status updates for `public_keys` which ends once they are all active.
    ///
    /// Malformed keys fail here. Keys which never enter the registry keep the stream open until
    /// the client drops it.
    pub fn wait_for_activation(&self, public_keys: &[Vec<u8>]) -> Result<ActivationStream, Error> {
        if public_keys.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one public key is required".to_string(),
            ));
        }
        let pubkeys = parse_pubkeys(public_keys)?;

        // Unreadable state is treated like absent state, the evaluator will catch up.
        let head = self.backend.head_snapshot().unwrap_or_else(|e| {
            warn!(self.log, "Failed to read head state"; "error" => ?e);
            None
        });
        let statuses = pubkeys
            .iter()
            .map(|pubkey| {
                // An unreadable deposit starts the key as unknown, the evaluator moves it forward
                // once the deposit can be read.
                let deposit = self
                    .backend
                    .eth1_deposit_block_number(pubkey)
                    .unwrap_or_else(|e| {
                        warn!(
                            self.log,
                            "Failed to read eth1 deposit";
                            "error" => ?e,
                            "pubkey" => %pubkey,
                        );
                        None
                    });
                resolve_pubkey(head.as_deref(), pubkey, deposit).status
            })
            .collect();

        Ok(self.activations.subscribe(pubkeys, statuses))
    }

    /// Opens a stream which yields once the chain has started.
    pub fn wait_for_chain_start(&self) -> ChainStartStream {
        match self.backend.head_snapshot() {
            Ok(Some(head)) => {
                self.chain_start.notify(head.genesis_time());
            }
            Ok(None) => {}
            Err(e) => warn!(self.log, "Failed to read head state"; "error" => ?e),
        }

        self.chain_start.subscribe()
    }

    pub fn get_block(
        &self,
        slot: Slot,
        randao_reveal: &[u8],
        graffiti: &[u8],
    ) -> Result<BeaconBlock, Error> {
        let randao_reveal = RandaoReveal::deserialize(randao_reveal)?;
        let graffiti = Graffiti::deserialize(graffiti)?;
        let head = self.head()?;
        self.check_lookahead(&head, slot.epoch(self.spec.slots_per_epoch))?;

        Ok(self.backend.produce_block(slot, randao_reveal, graffiti)?)
    }

    pub fn propose_block(&self, block: SignedBeaconBlock) -> Result<Hash256, Error> {
        self.head()?;
        let slot = block.slot();

        let root = self.backend.process_block(block).map_err(|e| {
            warn!(self.log, "Block rejected"; "slot" => %slot, "error" => ?e);
            Error::from(e)
        })?;

        info!(self.log, "Valid block from validator client"; "slot" => %slot, "root" => ?root);
        Ok(root)
    }

    /// Returns the data committee `committee_index` at `slot` should attest to.
    pub fn get_attestation_data(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Result<AttestationData, Error> {
        let head = self.head()?;
        self.check_lookahead(&head, slot.epoch(self.spec.slots_per_epoch))?;

        let committee_count = self.duties.committees_at_slot(&head, slot)?.len() as u64;
        if committee_index >= committee_count {
            return Err(Error::InvalidArgument(format!(
                "Committee index {} is not less than the {} committees at slot {}",
                committee_index, committee_count, slot
            )));
        }

        Ok(self.backend.produce_attestation_data(slot, committee_index)?)
    }

    /// Checks `attestation` against its committee and forwards it for verification and
    /// publishing.
    pub fn propose_attestation(&self, attestation: Attestation) -> Result<Hash256, Error> {
        let head = self.head()?;
        let data = attestation.data;
        let epoch = data.slot.epoch(self.spec.slots_per_epoch);
        self.check_lookahead(&head, epoch)?;

        let shuffling = self.duties.shuffling(&head, epoch)?;
        let committee = shuffling
            .committee_at(data.slot, data.index)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "No committee {} at slot {}",
                    data.index, data.slot
                ))
            })?;
        if attestation.aggregation_bits.len() != committee.len() {
            return Err(Error::InvalidArgument(format!(
                "Aggregation bits length {} does not match committee length {}",
                attestation.aggregation_bits.len(),
                committee.len()
            )));
        }

        let root = self.backend.process_attestation(attestation).map_err(|e| {
            warn!(
                self.log,
                "Attestation rejected";
                "slot" => %data.slot,
                "index" => data.index,
                "error" => ?e,
            );
            Error::from(e)
        })?;

        debug!(
            self.log,
            "Valid attestation from validator client";
            "slot" => %data.slot,
            "index" => data.index,
        );
        Ok(root)
    }

    pub fn propose_exit(&self, exit: SignedVoluntaryExit) -> Result<(), Error> {
        let head = self.head()?;
        let validator_index = exit.message.validator_index;
        head.get_validator(validator_index as usize)?;

        self.backend.process_voluntary_exit(exit)?;

        info!(
            self.log,
            "Voluntary exit accepted";
            "validator_index" => validator_index,
        );
        Ok(())
    }

    /// Handles `event` on the calling thread, as the spawned evaluator would.
    pub fn on_chain_event(&self, event: ChainEvent) {
        self.evaluator().on_event(event)
    }

    /// Spawns the evaluator on the current tokio runtime.
    ///
    /// The evaluator runs until every clone of the returned `EventSender` has been dropped.
    pub fn spawn_evaluator(&self) -> (EventSender, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(self.config.event_channel_capacity.max(1));
        let handle = tokio::spawn(self.evaluator().run(receiver));

        info!(
            self.log,
            "Validator coordinator evaluator started";
            "channel_capacity" => self.config.event_channel_capacity,
        );

        (sender, handle)
    }

    fn evaluator(&self) -> Evaluator<T> {
        Evaluator::new(
            self.backend.clone(),
            self.activations.clone(),
            self.chain_start.clone(),
            self.log.clone(),
        )
    }

    /// Returns the head snapshot, failing prior to genesis.
    fn head(&self) -> Result<Arc<RegistrySnapshot>, Error> {
        self.backend
            .head_snapshot()?
            .ok_or_else(Error::chain_not_started)
    }

    fn check_lookahead(&self, head: &RegistrySnapshot, epoch: Epoch) -> Result<(), Error> {
        let limit = head
            .current_epoch()
            .safe_add(self.config.duties_lookahead_epochs)?;
        if epoch > limit {
            return Err(Error::InvalidArgument(format!(
                "Epoch {} is beyond the current epoch {} plus the lookahead of {} epochs",
                epoch,
                head.current_epoch(),
                self.config.duties_lookahead_epochs
            )));
        }
        Ok(())
    }
}

fn parse_pubkeys(public_keys: &[Vec<u8>]) -> Result<Vec<PublicKeyBytes>, Error> {
    public_keys
        .iter()
        .map(|bytes| PublicKeyBytes::deserialize(bytes).map_err(Error::from))
        .collect()
}
