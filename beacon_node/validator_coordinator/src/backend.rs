//! The boundary between this crate and the rest of the beacon node.
//!
//! Everything behind `ChainBackend` (the state store, the eth1 deposit cache, block production and
//! the block/attestation/exit processing pipelines) is owned by other components. This crate only
//! reads from it and forwards validator submissions to it.

use crate::registry::RegistrySnapshot;
use std::sync::Arc;
use types::{
    Attestation, AttestationData, BeaconBlock, CommitteeIndex, Graffiti, Hash256, PublicKeyBytes,
    RandaoReveal, SignedBeaconBlock, SignedVoluntaryExit, Slot,
};

/// A failure to read chain data from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store could not be read (e.g. a database error).
    ReadFailed(String),
    /// The store is missing a state it previously advertised.
    MissingState(Hash256),
}

/// A failure reported by one of the block/attestation/exit collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The submitted or requested object was invalid for the current chain.
    Rejected(String),
    /// The collaborator was unable to service the request.
    Unavailable(String),
}

pub trait ChainBackend: Send + Sync + 'static {
    /// Returns the registry snapshot at the head of the canonical chain, or `None` prior to
    /// genesis.
    ///
    /// Implementations must return a fully-built, immutable snapshot: the same `Arc` may be read
    /// concurrently by many requests.
    fn head_snapshot(&self) -> Result<Option<Arc<RegistrySnapshot>>, StoreError>;

    /// Returns the number of the eth1 block which contains the first deposit for `pubkey`, if the
    /// eth1 deposit watcher has seen one.
    fn eth1_deposit_block_number(&self, pubkey: &PublicKeyBytes)
        -> Result<Option<u64>, StoreError>;

    /// Produces an unsigned block for `slot`.
    fn produce_block(
        &self,
        slot: Slot,
        randao_reveal: RandaoReveal,
        graffiti: Graffiti,
    ) -> Result<BeaconBlock, BackendError>;

    /// Imports and publishes a signed block, returning its root.
    fn process_block(&self, block: SignedBeaconBlock) -> Result<Hash256, BackendError>;

    /// Produces the `AttestationData` which committee `index` at `slot` should sign.
    fn produce_attestation_data(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<AttestationData, BackendError>;

    /// Verifies and publishes an attestation, returning the root of its `AttestationData`.
    fn process_attestation(&self, attestation: Attestation) -> Result<Hash256, BackendError>;

    /// Verifies and publishes a voluntary exit.
    fn process_voluntary_exit(&self, exit: SignedVoluntaryExit) -> Result<(), BackendError>;
}
