use std::collections::HashMap;
use types::{ChainSpec, Epoch, Validator};

/// The validators waiting for activation at some epoch, ordered by
/// `(activation_eligibility_epoch, validator_index)`.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ActivationQueue {
    epoch: Epoch,
    /// Zero-based position of each queued validator index.
    positions: HashMap<usize, u64>,
    churn_limit: u64,
}

impl ActivationQueue {
    /// Builds the queue of validators pending activation at `epoch`.
    pub fn new(validators: &[Validator], epoch: Epoch, spec: &ChainSpec) -> Self {
        let mut queue = Vec::new();
        let mut active_count = 0_u64;

        for (index, validator) in validators.iter().enumerate() {
            if validator.is_active_at(epoch) {
                active_count += 1;
            } else if validator.is_pending_activation_at(epoch, spec) {
                queue.push((validator.activation_eligibility_epoch, index));
            }
        }

        queue.sort_unstable();

        let positions = queue
            .into_iter()
            .enumerate()
            .map(|(position, (_, index))| (index, position as u64))
            .collect();

        Self {
            epoch,
            positions,
            churn_limit: spec.get_churn_limit(active_count),
        }
    }

    /// The epoch at which the queue was computed.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Returns the zero-based position of `validator_index` in the queue, if it is queued.
    pub fn position(&self, validator_index: usize) -> Option<u64> {
        self.positions.get(&validator_index).copied()
    }

    /// The maximum number of validators dequeued per epoch.
    pub fn churn_limit(&self) -> u64 {
        self.churn_limit
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
