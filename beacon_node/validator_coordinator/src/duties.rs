//! Committee and proposer assignments for an epoch.

use crate::metrics;
use crate::registry::{RegistryError, RegistrySnapshot};
use crate::status::{classify, ValidatorStatus};
use ethereum_hashing::hash;
use lru::LruCache;
use parking_lot::Mutex;
use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use swap_or_not_shuffle::{compute_shuffled_index, shuffle_list};
use types::{ChainSpec, CommitteeIndex, Domain, Epoch, Hash256, PublicKeyBytes, Slot};

const MAX_RANDOM_BYTE: u64 = (1 << 8) - 1;

/// Upper bound on proposer sampling rounds for one slot.
///
/// Only reached when nearly every active validator has a zero effective balance.
const MAX_PROPOSER_SAMPLES: usize = 4_096;

#[derive(Debug, Clone, PartialEq)]
pub enum ShufflingError {
    UnableToShuffle,
    ShuffleIndexOutOfBounds(usize),
    /// No candidate passed the balance check within the sampling limit.
    ProposerSamplingExhausted {
        samples: usize,
    },
    Registry(RegistryError),
    Arith(ArithError),
}

impl From<RegistryError> for ShufflingError {
    fn from(e: RegistryError) -> ShufflingError {
        ShufflingError::Registry(e)
    }
}

impl From<ArithError> for ShufflingError {
    fn from(e: ArithError) -> ShufflingError {
        ShufflingError::Arith(e)
    }
}

/// Identifies a shuffling: the committees of `shuffling_epoch` as seen from the state at
/// `state_root`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShufflingId {
    pub state_root: Hash256,
    pub shuffling_epoch: Epoch,
}

/// The attestation obligation of one validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestationDuty {
    pub slot: Slot,
    /// Index of the committee within `slot`.
    pub index: CommitteeIndex,
    /// Position of the validator within its committee.
    pub committee_position: usize,
    pub committee_len: usize,
}

/// The duties of one requested public key.
///
/// Keys which are not in the registry have an `Unknown` status and no assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duty {
    /// Validator indices of the whole committee the validator attests with.
    pub committee: Vec<u64>,
    pub committee_index: Option<CommitteeIndex>,
    pub attester_slot: Option<Slot>,
    /// The first slot of the epoch at which the validator proposes, if any.
    pub proposer_slot: Option<Slot>,
    pub public_key: PublicKeyBytes,
    pub status: ValidatorStatus,
    pub validator_index: Option<u64>,
}

impl Duty {
    fn unassigned(public_key: PublicKeyBytes, status: ValidatorStatus) -> Self {
        Self {
            committee: vec![],
            committee_index: None,
            attester_slot: None,
            proposer_slot: None,
            public_key,
            status,
            validator_index: None,
        }
    }
}

/// The committees and proposers of a single epoch.
///
/// Committee `i` of the epoch is the `i`-th even split of the shuffled active set. It attests at
/// slot `epoch_start + (i % slots_per_epoch)` with in-slot index `i / slots_per_epoch`.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochShuffling {
    epoch: Epoch,
    slots_per_epoch: u64,
    committee_count: u64,
    shuffling: Vec<usize>,
    /// Maps validator index to the epoch-wide committee number, `None` if not active.
    committee_of: Vec<Option<u64>>,
    /// Proposer index per slot of the epoch, empty if nobody is active.
    proposers: Vec<usize>,
}

impl EpochShuffling {
    /// Computes the shuffling of `epoch` from `snapshot`.
    pub fn new(snapshot: &RegistrySnapshot, epoch: Epoch) -> Result<Self, ShufflingError> {
        let spec = snapshot.spec();
        let active_indices = snapshot.get_active_validator_indices(epoch);
        let committee_count = spec.get_committee_count(active_indices.len());

        let shuffling = if active_indices.is_empty() {
            vec![]
        } else {
            let seed = snapshot.get_seed(epoch, Domain::BeaconAttester)?;
            shuffle_list(
                active_indices.clone(),
                spec.shuffle_round_count,
                seed.as_bytes(),
                false,
            )
            .ok_or(ShufflingError::UnableToShuffle)?
        };

        let mut committee_of = vec![None; snapshot.num_validators()];
        for i in 0..committee_count {
            let range = committee_range(shuffling.len(), i, committee_count)?;
            for &validator_index in shuffling.get(range).unwrap_or(&[]) {
                if let Some(entry) = committee_of.get_mut(validator_index) {
                    *entry = Some(i);
                }
            }
        }

        let proposers = if active_indices.is_empty() {
            vec![]
        } else {
            epoch
                .slot_iter(spec.slots_per_epoch)
                .map(|slot| {
                    let seed = snapshot.get_beacon_proposer_seed(slot)?;
                    compute_proposer_index(
                        snapshot,
                        &active_indices,
                        seed.as_bytes(),
                        spec,
                        MAX_PROPOSER_SAMPLES,
                    )
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            epoch,
            slots_per_epoch: spec.slots_per_epoch,
            committee_count,
            shuffling,
            committee_of,
            proposers,
        })
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Total number of committees in the epoch.
    pub fn committee_count(&self) -> u64 {
        self.committee_count
    }

    /// The number of active validators, i.e. the sum of all committee sizes.
    pub fn active_validator_count(&self) -> usize {
        self.shuffling.len()
    }

    /// Returns the epoch-wide committee `i`.
    pub fn committee(&self, i: u64) -> Option<&[usize]> {
        if i >= self.committee_count {
            return None;
        }
        let range = committee_range(self.shuffling.len(), i, self.committee_count).ok()?;
        self.shuffling.get(range)
    }

    /// Returns the committees attesting at `slot`, ordered by in-slot index.
    ///
    /// Empty if `slot` is not in this epoch.
    pub fn committees_at_slot(&self, slot: Slot) -> Vec<&[usize]> {
        let Some(position) = self.epoch.position(slot, self.slots_per_epoch) else {
            return vec![];
        };

        (position as u64..self.committee_count)
            .step_by(self.slots_per_epoch as usize)
            .filter_map(|i| self.committee(i))
            .collect()
    }

    /// Returns committee `index` at `slot`.
    pub fn committee_at(&self, slot: Slot, index: CommitteeIndex) -> Option<&[usize]> {
        let position = self.epoch.position(slot, self.slots_per_epoch)? as u64;
        let i = index
            .checked_mul(self.slots_per_epoch)?
            .checked_add(position)?;
        self.committee(i)
    }

    /// Returns the attestation duty of `validator_index`, if it is active in this epoch.
    pub fn attestation_duty(&self, validator_index: usize) -> Option<AttestationDuty> {
        let i = (*self.committee_of.get(validator_index)?)?;
        let committee = self.committee(i)?;
        let committee_position = committee.iter().position(|v| *v == validator_index)?;

        Some(AttestationDuty {
            slot: self.epoch.start_slot(self.slots_per_epoch) + i % self.slots_per_epoch,
            index: i / self.slots_per_epoch,
            committee_position,
            committee_len: committee.len(),
        })
    }

    /// Returns the proposer of `slot`, if `slot` is in this epoch and anyone is active.
    pub fn proposer(&self, slot: Slot) -> Option<usize> {
        let position = self.epoch.position(slot, self.slots_per_epoch)?;
        self.proposers.get(position).copied()
    }

    /// Returns the first slot of the epoch at which `validator_index` proposes.
    pub fn proposer_slot(&self, validator_index: usize) -> Option<Slot> {
        self.proposers
            .iter()
            .position(|proposer| *proposer == validator_index)
            .map(|position| self.epoch.start_slot(self.slots_per_epoch) + position as u64)
    }
}

/// The range of the shuffled list which forms committee `index` out of `count`.
fn committee_range(list_size: usize, index: u64, count: u64) -> Result<Range<usize>, ArithError> {
    let start = (list_size as u64).safe_mul(index)?.safe_div(count)?;
    let end = (list_size as u64)
        .safe_mul(index.safe_add(1)?)?
        .safe_div(count)?;
    Ok(start as usize..end as usize)
}

/// Selects a proposer from `indices`, weighting candidates by effective balance.
///
/// Fails rather than picking an unweighted candidate if none is accepted within `max_samples`.
fn compute_proposer_index(
    snapshot: &RegistrySnapshot,
    indices: &[usize],
    seed: &[u8],
    spec: &ChainSpec,
    max_samples: usize,
) -> Result<usize, ShufflingError> {
    let candidate = |i: usize| -> Result<usize, ShufflingError> {
        let shuffled_index = compute_shuffled_index(
            i.safe_rem(indices.len())?,
            indices.len(),
            seed,
            spec.shuffle_round_count,
        )
        .ok_or(ShufflingError::UnableToShuffle)?;
        indices
            .get(shuffled_index)
            .copied()
            .ok_or(ShufflingError::ShuffleIndexOutOfBounds(shuffled_index))
    };

    for i in 0..max_samples {
        let candidate_index = candidate(i)?;
        let random_byte = shuffling_random_byte(i, seed)?;
        let effective_balance = snapshot.get_validator(candidate_index)?.effective_balance;
        if effective_balance.saturating_mul(MAX_RANDOM_BYTE)
            >= spec
                .max_effective_balance
                .safe_mul(u64::from(random_byte))?
        {
            return Ok(candidate_index);
        }
    }

    Err(ShufflingError::ProposerSamplingExhausted {
        samples: max_samples,
    })
}

/// Get a random byte from the given `seed`.
fn shuffling_random_byte(i: usize, seed: &[u8]) -> Result<u8, ShufflingError> {
    let mut preimage = seed.to_vec();
    preimage.extend_from_slice(&(i.safe_div(32)? as u64).to_le_bytes());
    let index = i.safe_rem(32)?;
    hash(&preimage)
        .get(index)
        .copied()
        .ok_or(ShufflingError::ShuffleIndexOutOfBounds(index))
}

/// Computes duties, caching the shuffling of each `(state_root, epoch)` pair it is asked about.
pub struct DutyScheduler {
    cache: Mutex<LruCache<ShufflingId, Arc<EpochShuffling>>>,
}

impl DutyScheduler {
    pub fn new(cache_size: usize) -> Self {
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    /// Returns the shuffling of `epoch` from `snapshot`, computing it on a cache miss.
    ///
    /// The cache lock is not held while computing, concurrent misses for the same key may both
    /// compute, the results are identical.
    pub fn shuffling(
        &self,
        snapshot: &RegistrySnapshot,
        epoch: Epoch,
    ) -> Result<Arc<EpochShuffling>, ShufflingError> {
        let id = ShufflingId {
            state_root: snapshot.state_root(),
            shuffling_epoch: epoch,
        };

        if let Some(shuffling) = self.cache.lock().get(&id) {
            metrics::inc_counter(&metrics::SHUFFLING_CACHE_HITS);
            return Ok(shuffling.clone());
        }
        metrics::inc_counter(&metrics::SHUFFLING_CACHE_MISSES);

        let shuffling = Arc::new(EpochShuffling::new(snapshot, epoch)?);
        self.cache.lock().put(id, shuffling.clone());

        Ok(shuffling)
    }

    /// Returns one `Duty` per key in `pubkeys`, in the same order.
    ///
    /// Unknown keys produce an `Unknown` duty without affecting the others.
    pub fn compute_duties(
        &self,
        snapshot: &RegistrySnapshot,
        epoch: Epoch,
        pubkeys: &[PublicKeyBytes],
    ) -> Result<Vec<Duty>, ShufflingError> {
        let shuffling = self.shuffling(snapshot, epoch)?;

        let duties = pubkeys
            .iter()
            .map(|pubkey| {
                let Some((validator_index, validator)) = snapshot.get_validator_by_pubkey(pubkey)
                else {
                    return Duty::unassigned(*pubkey, ValidatorStatus::Unknown);
                };

                let status = classify(validator, epoch, snapshot.spec());
                let attestation_duty = shuffling.attestation_duty(validator_index);
                let committee = attestation_duty
                    .and_then(|duty| shuffling.committee_at(duty.slot, duty.index))
                    .map(|committee| committee.iter().map(|v| *v as u64).collect())
                    .unwrap_or_default();

                Duty {
                    committee,
                    committee_index: attestation_duty.map(|duty| duty.index),
                    attester_slot: attestation_duty.map(|duty| duty.slot),
                    proposer_slot: shuffling.proposer_slot(validator_index),
                    public_key: *pubkey,
                    status,
                    validator_index: Some(validator_index as u64),
                }
            })
            .collect();

        Ok(duties)
    }

    /// Returns the committees attesting at `slot`, ordered by in-slot committee index.
    pub fn committees_at_slot(
        &self,
        snapshot: &RegistrySnapshot,
        slot: Slot,
    ) -> Result<Vec<Vec<usize>>, ShufflingError> {
        let epoch = slot.epoch(snapshot.spec().slots_per_epoch);
        let shuffling = self.shuffling(snapshot, epoch)?;
        Ok(shuffling
            .committees_at_slot(slot)
            .into_iter()
            .map(<[usize]>::to_vec)
            .collect())
    }
}
