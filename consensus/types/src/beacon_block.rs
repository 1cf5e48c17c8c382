use crate::{Graffiti, Hash256, RandaoReveal, SignatureBytes, Slot};
use serde::{Deserialize, Serialize};

/// An unsigned block skeleton, as produced by the block-building collaborator.
///
/// Only the fields a validator client needs to sign and return are modelled here, the body is
/// opaque to this node's validator-facing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: u64,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub randao_reveal: RandaoReveal,
    pub graffiti: Graffiti,
    /// The serialized block body.
    pub body: Vec<u8>,
}

/// A `BeaconBlock` and a signature from its proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

impl SignedBeaconBlock {
    pub fn slot(&self) -> Slot {
        self.message.slot
    }
}
