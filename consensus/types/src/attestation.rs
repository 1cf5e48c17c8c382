use crate::{AttestationData, SignatureBytes};
use serde::{Deserialize, Serialize};

/// Details an attestation that can be slashable.
///
/// The signature is carried opaquely, verification belongs to the chain-processing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// One bit per member of the attesting committee, in committee order.
    pub aggregation_bits: Vec<bool>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

impl Attestation {
    /// Returns the number of committee members which signed this attestation.
    pub fn num_set_aggregation_bits(&self) -> usize {
        self.aggregation_bits.iter().filter(|bit| **bit).count()
    }
}
