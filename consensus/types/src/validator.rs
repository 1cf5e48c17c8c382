use crate::{ChainSpec, Epoch, Hash256, PublicKeyBytes};
use serde::{Deserialize, Serialize};

/// Information about a `BeaconChain` validator.
///
/// Any of the four epoch markers may hold `ChainSpec::far_future_epoch`, meaning the marker has not
/// been set yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    /// Returns `true` if the validator is considered active at some epoch.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    /// Returns `true` if the validator is considered exited at some epoch.
    pub fn is_exited_at(&self, epoch: Epoch) -> bool {
        self.exit_epoch <= epoch
    }

    /// Returns `true` if the validator is able to withdraw at some epoch.
    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        epoch >= self.withdrawable_epoch
    }

    /// Returns `true` if the validator has been placed in the activation queue.
    pub fn is_eligible_for_activation_queue(&self, spec: &ChainSpec) -> bool {
        self.activation_eligibility_epoch != spec.far_future_epoch
    }

    /// Returns `true` if the validator is waiting in the activation queue at `epoch`, i.e. it is
    /// eligible but has not been activated by `epoch`.
    pub fn is_pending_activation_at(&self, epoch: Epoch, spec: &ChainSpec) -> bool {
        self.is_eligible_for_activation_queue(spec)
            && (self.activation_epoch == spec.far_future_epoch || epoch < self.activation_epoch)
    }

    /// Returns `true` if an exit has been initiated for the validator.
    pub fn has_initiated_exit(&self, spec: &ChainSpec) -> bool {
        self.exit_epoch != spec.far_future_epoch
    }
}

impl Default for Validator {
    /// Yields a "default" `Validator`. Primarily used for testing.
    fn default() -> Self {
        Self {
            pubkey: PublicKeyBytes::empty(),
            withdrawal_credentials: Hash256::default(),
            effective_balance: u64::MAX,
            slashed: false,
            activation_eligibility_epoch: Epoch::max_value(),
            activation_epoch: Epoch::max_value(),
            exit_epoch: Epoch::max_value(),
            withdrawable_epoch: Epoch::max_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default() {
        let v = Validator::default();

        let epoch = Epoch::new(0);

        assert!(!v.is_active_at(epoch));
        assert!(!v.is_exited_at(epoch));
        assert!(!v.is_withdrawable_at(epoch));
        assert!(!v.slashed);
    }

    #[test]
    fn is_active_at() {
        let epoch = Epoch::new(10);

        let v = Validator {
            activation_epoch: epoch,
            ..Validator::default()
        };

        assert!(!v.is_active_at(epoch - 1));
        assert!(v.is_active_at(epoch));
        assert!(v.is_active_at(epoch + 1));
    }

    #[test]
    fn is_exited_at() {
        let epoch = Epoch::new(10);

        let v = Validator {
            exit_epoch: epoch,
            ..Validator::default()
        };

        assert!(!v.is_exited_at(epoch - 1));
        assert!(v.is_exited_at(epoch));
        assert!(v.is_exited_at(epoch + 1));
    }

    #[test]
    fn pending_activation() {
        let spec = ChainSpec::minimal();
        let v = Validator {
            activation_eligibility_epoch: Epoch::new(2),
            activation_epoch: Epoch::new(5),
            ..Validator::default()
        };

        assert!(v.is_pending_activation_at(Epoch::new(4), &spec));
        assert!(!v.is_pending_activation_at(Epoch::new(5), &spec));
        assert!(!Validator::default().is_pending_activation_at(Epoch::new(0), &spec));
    }
}
