//! Ethereum 2.0 types used by the validator-facing side of the beacon node.

pub mod attestation;
pub mod attestation_data;
pub mod beacon_block;
pub mod chain_spec;
pub mod checkpoint;
pub mod fixed_bytes;
pub mod fork;
pub mod slot_epoch;
pub mod validator;
pub mod voluntary_exit;

pub use crate::attestation::Attestation;
pub use crate::attestation_data::AttestationData;
pub use crate::beacon_block::{BeaconBlock, SignedBeaconBlock};
pub use crate::chain_spec::{ChainSpec, Config, Domain};
pub use crate::checkpoint::Checkpoint;
pub use crate::fixed_bytes::{
    Graffiti, InvalidLength, PublicKeyBytes, RandaoReveal, SignatureBytes, GRAFFITI_BYTES_LEN,
    PUBLIC_KEY_BYTES_LEN, RANDAO_REVEAL_BYTES_LEN, SIGNATURE_BYTES_LEN,
};
pub use crate::fork::Fork;
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::validator::Validator;
pub use crate::voluntary_exit::{SignedVoluntaryExit, VoluntaryExit};

pub type Hash256 = ethereum_types::H256;
pub type CommitteeIndex = u64;
pub type ValidatorIndex = usize;
