//! Registries and a chain backend for testing, without a beacon chain behind them.

use crate::backend::{BackendError, ChainBackend, StoreError};
use crate::registry::{ChainState, RegistrySnapshot};
use ethereum_hashing::hash_fixed;
use parking_lot::{Mutex, RwLock};
use sloggers::{null::NullLoggerBuilder, Build};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use types::{
    Attestation, AttestationData, BeaconBlock, ChainSpec, Checkpoint, CommitteeIndex, Epoch, Fork,
    Graffiti, Hash256, PublicKeyBytes, RandaoReveal, SignedBeaconBlock, SignedVoluntaryExit, Slot,
    Validator, PUBLIC_KEY_BYTES_LEN,
};

// 4th September 2019
pub const HARNESS_GENESIS_TIME: u64 = 1_567_552_690;

pub fn null_logger() -> slog::Logger {
    NullLoggerBuilder.build().expect("logger should build")
}

/// Returns a public key unique to `index`, never equal to `PublicKeyBytes::empty()`.
pub fn deterministic_pubkey(index: usize) -> PublicKeyBytes {
    let mut bytes = [0; PUBLIC_KEY_BYTES_LEN];
    bytes[..8].copy_from_slice(&(index as u64).to_le_bytes());
    bytes[PUBLIC_KEY_BYTES_LEN - 1] = 0xaa;
    PublicKeyBytes::from(bytes)
}

/// Builds `RegistrySnapshot`s for tests.
///
/// Unless set explicitly, the state root is derived from the registry contents so distinct
/// registries never share shuffling cache entries.
#[derive(Clone)]
pub struct SnapshotBuilder {
    spec: ChainSpec,
    slot: Slot,
    genesis_time: u64,
    fork: Option<Fork>,
    finalized_checkpoint: Checkpoint,
    state_root: Option<Hash256>,
    validators: Vec<Validator>,
}

impl SnapshotBuilder {
    pub fn new(spec: ChainSpec) -> Self {
        Self {
            spec,
            slot: Slot::new(0),
            genesis_time: HARNESS_GENESIS_TIME,
            fork: None,
            finalized_checkpoint: Checkpoint::default(),
            state_root: None,
            validators: vec![],
        }
    }

    pub fn minimal() -> Self {
        Self::new(ChainSpec::minimal())
    }

    /// Appends `count` validators which are active from genesis with the maximum balance.
    pub fn active_validators(mut self, count: usize) -> Self {
        let first = self.validators.len();
        for index in first..first + count {
            self.validators.push(Validator {
                pubkey: deterministic_pubkey(index),
                effective_balance: self.spec.max_effective_balance,
                activation_eligibility_epoch: Epoch::new(0),
                activation_epoch: Epoch::new(0),
                ..Validator::default()
            });
        }
        self
    }

    /// Appends `count` validators which are eligible for, but not yet assigned, activation.
    pub fn pending_validators(mut self, count: usize) -> Self {
        let first = self.validators.len();
        for index in first..first + count {
            self.validators.push(Validator {
                pubkey: deterministic_pubkey(index),
                effective_balance: self.spec.max_effective_balance,
                activation_eligibility_epoch: Epoch::new(0),
                ..Validator::default()
            });
        }
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Applies `f` to the validator at `index`.
    pub fn modify_validator<F: FnOnce(&mut Validator)>(mut self, index: usize, f: F) -> Self {
        if let Some(validator) = self.validators.get_mut(index) {
            f(validator)
        }
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    pub fn epoch(self, epoch: Epoch) -> Self {
        let slot = epoch.start_slot(self.spec.slots_per_epoch);
        self.slot(slot)
    }

    pub fn genesis_time(mut self, genesis_time: u64) -> Self {
        self.genesis_time = genesis_time;
        self
    }

    pub fn fork(mut self, fork: Fork) -> Self {
        self.fork = Some(fork);
        self
    }

    pub fn finalized_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.finalized_checkpoint = checkpoint;
        self
    }

    pub fn state_root(mut self, state_root: Hash256) -> Self {
        self.state_root = Some(state_root);
        self
    }

    pub fn chain_state(&self) -> ChainState {
        let randao_mixes = (0..self.spec.epochs_per_historical_vector)
            .map(|i| Hash256::from_low_u64_be(i + 1))
            .collect();

        ChainState {
            state_root: self.state_root.unwrap_or_else(|| self.derived_state_root()),
            slot: self.slot,
            genesis_time: self.genesis_time,
            fork: self
                .fork
                .unwrap_or_else(|| Fork::genesis(self.spec.genesis_fork_version)),
            finalized_checkpoint: self.finalized_checkpoint,
            validators: self.validators.clone(),
            randao_mixes,
        }
    }

    pub fn build(self) -> Arc<RegistrySnapshot> {
        let state = self.chain_state();
        Arc::new(RegistrySnapshot::new(state, Arc::new(self.spec)).expect("snapshot should build"))
    }

    fn derived_state_root(&self) -> Hash256 {
        let mut preimage = self.slot.as_u64().to_le_bytes().to_vec();
        for v in &self.validators {
            preimage.extend_from_slice(v.pubkey.as_bytes());
            preimage.extend_from_slice(&v.effective_balance.to_le_bytes());
            preimage.push(v.slashed as u8);
            for epoch in [
                v.activation_eligibility_epoch,
                v.activation_epoch,
                v.exit_epoch,
                v.withdrawable_epoch,
            ] {
                preimage.extend_from_slice(&epoch.as_u64().to_le_bytes());
            }
        }
        Hash256::from(hash_fixed(&preimage))
    }
}

/// A `ChainBackend` whose head and deposits are set by the test.
///
/// Submitted blocks, attestations and exits are recorded and accepted unless `reject_submissions`
/// is set.
#[derive(Default)]
pub struct TestingBackend {
    head: RwLock<Option<Arc<RegistrySnapshot>>>,
    deposits: RwLock<HashMap<PublicKeyBytes, u64>>,
    fail_store_reads: AtomicBool,
    fail_eth1_reads: AtomicBool,
    reject_submissions: AtomicBool,
    blocks: Mutex<Vec<SignedBeaconBlock>>,
    attestations: Mutex<Vec<Attestation>>,
    exits: Mutex<Vec<SignedVoluntaryExit>>,
}

impl TestingBackend {
    /// A backend prior to genesis.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head(snapshot: Arc<RegistrySnapshot>) -> Self {
        let backend = Self::new();
        backend.set_head(snapshot);
        backend
    }

    pub fn set_head(&self, snapshot: Arc<RegistrySnapshot>) {
        *self.head.write() = Some(snapshot);
    }

    pub fn add_deposit(&self, pubkey: PublicKeyBytes, block_number: u64) {
        self.deposits.write().insert(pubkey, block_number);
    }

    /// Makes every state store read fail while `fail` is `true`.
    pub fn set_store_failure(&self, fail: bool) {
        self.fail_store_reads.store(fail, Ordering::Relaxed);
    }

    /// Makes eth1 deposit lookups fail while `fail` is `true`, head reads are unaffected.
    pub fn set_eth1_failure(&self, fail: bool) {
        self.fail_eth1_reads.store(fail, Ordering::Relaxed);
    }

    pub fn set_reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::Relaxed);
    }

    pub fn processed_blocks(&self) -> Vec<SignedBeaconBlock> {
        self.blocks.lock().clone()
    }

    pub fn processed_attestations(&self) -> Vec<Attestation> {
        self.attestations.lock().clone()
    }

    pub fn processed_exits(&self) -> Vec<SignedVoluntaryExit> {
        self.exits.lock().clone()
    }

    fn read(&self) -> Result<(), StoreError> {
        if self.fail_store_reads.load(Ordering::Relaxed) {
            Err(StoreError::ReadFailed("store reads disabled".to_string()))
        } else {
            Ok(())
        }
    }

    fn accept(&self) -> Result<(), BackendError> {
        if self.reject_submissions.load(Ordering::Relaxed) {
            Err(BackendError::Rejected("submissions disabled".to_string()))
        } else {
            Ok(())
        }
    }

    fn head(&self) -> Result<Arc<RegistrySnapshot>, BackendError> {
        self.head
            .read()
            .clone()
            .ok_or_else(|| BackendError::Unavailable("no head state".to_string()))
    }
}

impl ChainBackend for TestingBackend {
    fn head_snapshot(&self) -> Result<Option<Arc<RegistrySnapshot>>, StoreError> {
        self.read()?;
        Ok(self.head.read().clone())
    }

    fn eth1_deposit_block_number(
        &self,
        pubkey: &PublicKeyBytes,
    ) -> Result<Option<u64>, StoreError> {
        self.read()?;
        if self.fail_eth1_reads.load(Ordering::Relaxed) {
            return Err(StoreError::ReadFailed("eth1 cache unavailable".to_string()));
        }
        Ok(self.deposits.read().get(pubkey).copied())
    }

    fn produce_block(
        &self,
        slot: Slot,
        randao_reveal: RandaoReveal,
        graffiti: Graffiti,
    ) -> Result<BeaconBlock, BackendError> {
        let head = self.head()?;
        Ok(BeaconBlock {
            slot,
            proposer_index: 0,
            parent_root: head.state_root(),
            state_root: Hash256::zero(),
            randao_reveal,
            graffiti,
            body: vec![],
        })
    }

    fn process_block(&self, block: SignedBeaconBlock) -> Result<Hash256, BackendError> {
        self.accept()?;
        let mut preimage = block.slot().as_u64().to_le_bytes().to_vec();
        preimage.extend_from_slice(block.message.parent_root.as_bytes());
        self.blocks.lock().push(block);
        Ok(Hash256::from(hash_fixed(&preimage)))
    }

    fn produce_attestation_data(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<AttestationData, BackendError> {
        let head = self.head()?;
        let epoch = slot.epoch(head.spec().slots_per_epoch);
        Ok(AttestationData {
            slot,
            index,
            beacon_block_root: head.state_root(),
            source: head.finalized_checkpoint(),
            target: Checkpoint {
                epoch,
                root: head.state_root(),
            },
        })
    }

    fn process_attestation(&self, attestation: Attestation) -> Result<Hash256, BackendError> {
        self.accept()?;
        let data = attestation.data;
        let mut preimage = data.slot.as_u64().to_le_bytes().to_vec();
        preimage.extend_from_slice(&data.index.to_le_bytes());
        preimage.extend_from_slice(data.beacon_block_root.as_bytes());
        self.attestations.lock().push(attestation);
        Ok(Hash256::from(hash_fixed(&preimage)))
    }

    fn process_voluntary_exit(&self, exit: SignedVoluntaryExit) -> Result<(), BackendError> {
        self.accept()?;
        self.exits.lock().push(exit);
        Ok(())
    }
}
