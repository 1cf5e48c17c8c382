//! Read-only views over the validator registry of a single chain state.

use crate::activation_queue::ActivationQueue;
use ethereum_hashing::hash_fixed;
use safe_arith::{ArithError, SafeArith};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use types::{ChainSpec, Checkpoint, Domain, Epoch, Fork, Hash256, PublicKeyBytes, Slot, Validator};

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    UnknownPubkey(PublicKeyBytes),
    UnknownValidator(usize),
    DuplicatePubkey {
        pubkey: PublicKeyBytes,
        first: usize,
        second: usize,
    },
    /// The state does not carry the randao history required to compute seeds.
    InsufficientRandaoMixes {
        expected: u64,
        found: usize,
    },
    Arith(ArithError),
}

impl From<ArithError> for RegistryError {
    fn from(e: ArithError) -> RegistryError {
        RegistryError::Arith(e)
    }
}

/// The parts of a beacon state that validator coordination reads, as handed over by the state
/// store.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainState {
    pub state_root: Hash256,
    pub slot: Slot,
    pub genesis_time: u64,
    pub fork: Fork,
    pub finalized_checkpoint: Checkpoint,
    pub validators: Vec<Validator>,
    pub randao_mixes: Vec<Hash256>,
}

/// An immutable snapshot of the validator registry at `state_root`, with the caches required to
/// answer validator queries.
///
/// Once built a snapshot never changes, it may be shared between threads and read without locks.
#[derive(Debug)]
pub struct RegistrySnapshot {
    state: ChainState,
    spec: Arc<ChainSpec>,
    pubkey_cache: HashMap<PublicKeyBytes, usize>,
    /// Built on first use, for `current_epoch()` only.
    activation_queue: OnceLock<ActivationQueue>,
}

impl RegistrySnapshot {
    /// Builds a snapshot, checking that public keys are unique and that the state carries a full
    /// randao history.
    pub fn new(state: ChainState, spec: Arc<ChainSpec>) -> Result<Self, RegistryError> {
        if (state.randao_mixes.len() as u64) < spec.epochs_per_historical_vector {
            return Err(RegistryError::InsufficientRandaoMixes {
                expected: spec.epochs_per_historical_vector,
                found: state.randao_mixes.len(),
            });
        }

        let mut pubkey_cache = HashMap::with_capacity(state.validators.len());
        for (index, validator) in state.validators.iter().enumerate() {
            if let Some(first) = pubkey_cache.insert(validator.pubkey, index) {
                return Err(RegistryError::DuplicatePubkey {
                    pubkey: validator.pubkey,
                    first,
                    second: index,
                });
            }
        }

        Ok(Self {
            state,
            spec,
            pubkey_cache,
            activation_queue: OnceLock::new(),
        })
    }

    pub fn state_root(&self) -> Hash256 {
        self.state.state_root
    }

    pub fn slot(&self) -> Slot {
        self.state.slot
    }

    pub fn current_epoch(&self) -> Epoch {
        self.state.slot.epoch(self.spec.slots_per_epoch)
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.state.finalized_checkpoint
    }

    pub fn finalized_epoch(&self) -> Epoch {
        self.state.finalized_checkpoint.epoch
    }

    pub fn genesis_time(&self) -> u64 {
        self.state.genesis_time
    }

    pub fn fork(&self) -> &Fork {
        &self.state.fork
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    /// The effective balance below which active validators are ejected.
    pub fn ejection_balance(&self) -> u64 {
        self.spec.ejection_balance
    }

    pub fn validators(&self) -> &[Validator] {
        &self.state.validators
    }

    pub fn num_validators(&self) -> usize {
        self.state.validators.len()
    }

    /// Returns the index of the validator with `pubkey`.
    pub fn validator_index(&self, pubkey: &PublicKeyBytes) -> Result<usize, RegistryError> {
        self.pubkey_cache
            .get(pubkey)
            .copied()
            .ok_or(RegistryError::UnknownPubkey(*pubkey))
    }

    /// Safe indexer for the `validators` list.
    pub fn get_validator(&self, validator_index: usize) -> Result<&Validator, RegistryError> {
        self.state
            .validators
            .get(validator_index)
            .ok_or(RegistryError::UnknownValidator(validator_index))
    }

    /// Returns the index and record of the validator with `pubkey`, if any.
    pub fn get_validator_by_pubkey(&self, pubkey: &PublicKeyBytes) -> Option<(usize, &Validator)> {
        let index = self.validator_index(pubkey).ok()?;
        self.state
            .validators
            .get(index)
            .map(|validator| (index, validator))
    }

    /// Returns the indices of all validators active at `epoch`, in ascending order.
    pub fn get_active_validator_indices(&self, epoch: Epoch) -> Vec<usize> {
        self.state
            .validators
            .iter()
            .enumerate()
            .filter_map(|(index, validator)| validator.is_active_at(epoch).then_some(index))
            .collect()
    }

    /// Returns the activation queue at `epoch`.
    ///
    /// The queue for `current_epoch()` is cached, other epochs are computed on demand.
    pub fn activation_queue(&self, epoch: Epoch) -> ActivationQueueRef<'_> {
        if epoch == self.current_epoch() {
            ActivationQueueRef::Cached(self.activation_queue.get_or_init(|| {
                ActivationQueue::new(&self.state.validators, epoch, &self.spec)
            }))
        } else {
            ActivationQueueRef::Computed(ActivationQueue::new(
                &self.state.validators,
                epoch,
                &self.spec,
            ))
        }
    }

    /// Generate a seed for the given `epoch`.
    pub fn get_seed(&self, epoch: Epoch, domain: Domain) -> Result<Hash256, RegistryError> {
        let mix = {
            let i = epoch
                .as_u64()
                .safe_add(self.spec.epochs_per_historical_vector)?
                .safe_sub(self.spec.min_seed_lookahead.as_u64())?
                .safe_sub(1)?;
            let i_mod = i.safe_rem(self.state.randao_mixes.len() as u64)? as usize;
            self.state
                .randao_mixes
                .get(i_mod)
                .copied()
                .ok_or(RegistryError::InsufficientRandaoMixes {
                    expected: self.spec.epochs_per_historical_vector,
                    found: self.state.randao_mixes.len(),
                })?
        };

        const NUM_DOMAIN_BYTES: usize = 4;
        const NUM_EPOCH_BYTES: usize = 8;
        const MIX_OFFSET: usize = NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES;
        const NUM_MIX_BYTES: usize = 32;

        let mut preimage = [0; NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES + NUM_MIX_BYTES];
        preimage[0..NUM_DOMAIN_BYTES]
            .copy_from_slice(&self.spec.get_domain_constant(domain).to_le_bytes());
        preimage[NUM_DOMAIN_BYTES..MIX_OFFSET].copy_from_slice(&epoch.as_u64().to_le_bytes());
        preimage[MIX_OFFSET..].copy_from_slice(mix.as_bytes());

        Ok(Hash256::from(hash_fixed(&preimage)))
    }

    /// Returns the seed used to select the proposer at `slot`.
    pub fn get_beacon_proposer_seed(&self, slot: Slot) -> Result<Hash256, RegistryError> {
        let epoch = slot.epoch(self.spec.slots_per_epoch);
        let mut preimage = self
            .get_seed(epoch, Domain::BeaconProposer)?
            .as_bytes()
            .to_vec();
        preimage.extend_from_slice(&slot.as_u64().to_le_bytes());
        Ok(Hash256::from(hash_fixed(&preimage)))
    }
}

/// Either the snapshot's cached activation queue or one computed for another epoch.
pub enum ActivationQueueRef<'a> {
    Cached(&'a ActivationQueue),
    Computed(ActivationQueue),
}

impl std::ops::Deref for ActivationQueueRef<'_> {
    type Target = ActivationQueue;

    fn deref(&self) -> &ActivationQueue {
        match self {
            ActivationQueueRef::Cached(queue) => queue,
            ActivationQueueRef::Computed(queue) => queue,
        }
    }
}
