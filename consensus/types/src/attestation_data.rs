use crate::{Checkpoint, Hash256, Slot};
use serde::{Deserialize, Serialize};

/// The data upon which an attestation is based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttestationData {
    pub slot: Slot,
    /// Index of the committee within `slot`.
    pub index: u64,

    // LMD GHOST vote
    pub beacon_block_root: Hash256,

    // FFG Vote
    pub source: Checkpoint,
    pub target: Checkpoint,
}
