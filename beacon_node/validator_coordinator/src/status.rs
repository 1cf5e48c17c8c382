//! Derives a validator's lifecycle status from its registry record.
//!
//! Everything here is a pure function of its arguments, the same inputs always yield the same
//! response.

use crate::registry::RegistrySnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use types::{ChainSpec, Epoch, PublicKeyBytes, Validator};

/// The lifecycle status of a validator.
///
/// The integer encoding is part of the client protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ValidatorStatus {
    Unknown = 0,
    Deposited = 1,
    Pending = 2,
    Active = 3,
    Exiting = 4,
    Slashing = 5,
    Exited = 6,
}

impl ValidatorStatus {
    /// Returns `true` once a validator has reached `Active`, regardless of whether it has since
    /// started exiting.
    pub fn is_activated(&self) -> bool {
        matches!(
            self,
            ValidatorStatus::Active
                | ValidatorStatus::Exiting
                | ValidatorStatus::Slashing
                | ValidatorStatus::Exited
        )
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl From<ValidatorStatus> for u8 {
    fn from(status: ValidatorStatus) -> u8 {
        status.as_u8()
    }
}

impl TryFrom<u8> for ValidatorStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ValidatorStatus::Unknown),
            1 => Ok(ValidatorStatus::Deposited),
            2 => Ok(ValidatorStatus::Pending),
            3 => Ok(ValidatorStatus::Active),
            4 => Ok(ValidatorStatus::Exiting),
            5 => Ok(ValidatorStatus::Slashing),
            6 => Ok(ValidatorStatus::Exited),
            _ => Err(format!("{} is not a valid validator status.", value)),
        }
    }
}

impl FromStr for ValidatorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(ValidatorStatus::Unknown),
            "deposited" => Ok(ValidatorStatus::Deposited),
            "pending" => Ok(ValidatorStatus::Pending),
            "active" => Ok(ValidatorStatus::Active),
            "exiting" => Ok(ValidatorStatus::Exiting),
            "slashing" => Ok(ValidatorStatus::Slashing),
            "exited" => Ok(ValidatorStatus::Exited),
            _ => Err(format!("{} cannot be parsed as a validator status.", s)),
        }
    }
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorStatus::Unknown => write!(f, "unknown"),
            ValidatorStatus::Deposited => write!(f, "deposited"),
            ValidatorStatus::Pending => write!(f, "pending"),
            ValidatorStatus::Active => write!(f, "active"),
            ValidatorStatus::Exiting => write!(f, "exiting"),
            ValidatorStatus::Slashing => write!(f, "slashing"),
            ValidatorStatus::Exited => write!(f, "exited"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStatusResponse {
    pub status: ValidatorStatus,
    /// The eth1 block containing the validator's deposit, if known.
    pub eth1_deposit_block_number: Option<u64>,
    pub validator_index: Option<u64>,
    /// Only set once the activation epoch is concrete.
    pub activation_epoch: Option<Epoch>,
    /// Zero-based rank in the activation queue, only set for `Pending` validators.
    pub position_in_activation_queue: Option<u64>,
    /// Estimated seconds until the next status transition, zero when no transition is expected.
    pub transition_estimate_seconds: u64,
}

impl ValidatorStatusResponse {
    pub fn unknown() -> Self {
        Self {
            status: ValidatorStatus::Unknown,
            eth1_deposit_block_number: None,
            validator_index: None,
            activation_epoch: None,
            position_in_activation_queue: None,
            transition_estimate_seconds: 0,
        }
    }
}

/// Classifies `validator` at `epoch`.
///
/// Checks run in lifecycle order so that the result never moves backwards as `epoch` increases,
/// with slashing taking precedence over a voluntary exit.
pub fn classify(validator: &Validator, epoch: Epoch, spec: &ChainSpec) -> ValidatorStatus {
    if validator.activation_eligibility_epoch == spec.far_future_epoch {
        ValidatorStatus::Deposited
    } else if validator.activation_epoch == spec.far_future_epoch
        || epoch < validator.activation_epoch
    {
        ValidatorStatus::Pending
    } else if validator.is_withdrawable_at(epoch) {
        ValidatorStatus::Exited
    } else if validator.slashed {
        ValidatorStatus::Slashing
    } else if validator.has_initiated_exit(spec)
        || validator.effective_balance < spec.ejection_balance
    {
        ValidatorStatus::Exiting
    } else {
        ValidatorStatus::Active
    }
}

/// Builds the full status response for a validator in the registry.
///
/// `queue_position` and `churn_limit` describe the activation queue at `epoch` and are only read
/// for `Pending` validators.
pub fn resolve(
    validator: &Validator,
    validator_index: usize,
    epoch: Epoch,
    eth1_deposit_block_number: Option<u64>,
    queue_position: Option<u64>,
    churn_limit: u64,
    spec: &ChainSpec,
) -> ValidatorStatusResponse {
    let status = classify(validator, epoch, spec);

    let position_in_activation_queue = if status == ValidatorStatus::Pending {
        queue_position
    } else {
        None
    };

    let activation_epoch =
        (validator.activation_epoch != spec.far_future_epoch).then_some(validator.activation_epoch);

    let epochs_until_transition = match status {
        ValidatorStatus::Pending => match activation_epoch {
            Some(activation_epoch) => activation_epoch.as_u64().saturating_sub(epoch.as_u64()),
            None => position_in_activation_queue
                .map(|position| {
                    // Dequeued after `position / churn` epochs, activated at the activation-exit
                    // epoch of the epoch it was dequeued in.
                    (position / churn_limit.max(1))
                        .saturating_add(1)
                        .saturating_add(1)
                        .saturating_add(spec.max_seed_lookahead.as_u64())
                })
                .unwrap_or(0),
        },
        ValidatorStatus::Exiting | ValidatorStatus::Slashing => {
            if validator.withdrawable_epoch == spec.far_future_epoch {
                0
            } else {
                validator
                    .withdrawable_epoch
                    .as_u64()
                    .saturating_sub(epoch.as_u64())
            }
        }
        _ => 0,
    };

    ValidatorStatusResponse {
        status,
        eth1_deposit_block_number,
        validator_index: Some(validator_index as u64),
        activation_epoch,
        position_in_activation_queue,
        transition_estimate_seconds: epochs_until_transition
            .saturating_mul(spec.seconds_per_epoch()),
    }
}

/// Resolves the status of `pubkey` against `snapshot`, or against the deposit data alone when the
/// chain has not started or the key is not in the registry.
pub fn resolve_pubkey(
    snapshot: Option<&RegistrySnapshot>,
    pubkey: &PublicKeyBytes,
    eth1_deposit_block_number: Option<u64>,
) -> ValidatorStatusResponse {
    let known = snapshot.and_then(|snapshot| {
        snapshot
            .get_validator_by_pubkey(pubkey)
            .map(|(index, validator)| (snapshot, index, validator))
    });

    match known {
        Some((snapshot, index, validator)) => {
            let epoch = snapshot.current_epoch();
            let queue = snapshot.activation_queue(epoch);
            resolve(
                validator,
                index,
                epoch,
                eth1_deposit_block_number,
                queue.position(index),
                queue.churn_limit(),
                snapshot.spec(),
            )
        }
        None => ValidatorStatusResponse {
            status: if eth1_deposit_block_number.is_some() {
                ValidatorStatus::Deposited
            } else {
                ValidatorStatus::Unknown
            },
            eth1_deposit_block_number,
            ..ValidatorStatusResponse::unknown()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ChainSpec {
        ChainSpec::minimal()
    }

    fn active_from(epoch: u64) -> Validator {
        Validator {
            activation_eligibility_epoch: Epoch::new(0),
            activation_epoch: Epoch::new(epoch),
            effective_balance: spec().max_effective_balance,
            ..Validator::default()
        }
    }

    #[test]
    fn integer_encoding_is_fixed() {
        let all = [
            ValidatorStatus::Unknown,
            ValidatorStatus::Deposited,
            ValidatorStatus::Pending,
            ValidatorStatus::Active,
            ValidatorStatus::Exiting,
            ValidatorStatus::Slashing,
            ValidatorStatus::Exited,
        ];
        for (i, status) in all.iter().enumerate() {
            assert_eq!(status.as_u8() as usize, i);
            assert_eq!(ValidatorStatus::try_from(i as u8), Ok(*status));
            assert_eq!(status.to_string().parse::<ValidatorStatus>(), Ok(*status));
        }
        assert!(ValidatorStatus::try_from(7).is_err());
    }

    #[test]
    fn deposited_until_eligible() {
        let v = Validator::default();
        assert_eq!(
            classify(&v, Epoch::new(0), &spec()),
            ValidatorStatus::Deposited
        );
    }

    #[test]
    fn pending_then_active() {
        let spec = spec();
        let queued = Validator {
            activation_eligibility_epoch: Epoch::new(1),
            ..Validator::default()
        };
        assert_eq!(
            classify(&queued, Epoch::new(3), &spec),
            ValidatorStatus::Pending
        );

        let v = active_from(5);
        assert_eq!(classify(&v, Epoch::new(4), &spec), ValidatorStatus::Pending);
        assert_eq!(classify(&v, Epoch::new(5), &spec), ValidatorStatus::Active);
    }

    #[test]
    fn slashed_then_exited() {
        let spec = spec();
        let v = Validator {
            slashed: true,
            exit_epoch: Epoch::new(100),
            withdrawable_epoch: Epoch::new(200),
            ..active_from(0)
        };

        assert_eq!(
            classify(&v, Epoch::new(150), &spec),
            ValidatorStatus::Slashing
        );
        assert_eq!(classify(&v, Epoch::new(250), &spec), ValidatorStatus::Exited);
    }

    #[test]
    fn exiting_until_withdrawable() {
        let spec = spec();
        let v = Validator {
            exit_epoch: Epoch::new(10),
            withdrawable_epoch: Epoch::new(20),
            ..active_from(0)
        };

        assert_eq!(classify(&v, Epoch::new(5), &spec), ValidatorStatus::Exiting);
        assert_eq!(classify(&v, Epoch::new(15), &spec), ValidatorStatus::Exiting);
        assert_eq!(classify(&v, Epoch::new(20), &spec), ValidatorStatus::Exited);
    }

    #[test]
    fn low_balance_is_exiting() {
        let spec = spec();
        let v = Validator {
            effective_balance: spec.ejection_balance - 1,
            ..active_from(0)
        };
        assert_eq!(classify(&v, Epoch::new(1), &spec), ValidatorStatus::Exiting);
    }

    #[test]
    fn status_never_moves_backwards() {
        let spec = spec();
        let records = vec![
            Validator::default(),
            active_from(3),
            Validator {
                exit_epoch: Epoch::new(8),
                withdrawable_epoch: Epoch::new(12),
                ..active_from(2)
            },
            Validator {
                slashed: true,
                exit_epoch: Epoch::new(6),
                withdrawable_epoch: Epoch::new(14),
                ..active_from(1)
            },
        ];

        for v in &records {
            let mut previous = ValidatorStatus::Unknown;
            for epoch in 0..20 {
                let status = classify(v, Epoch::new(epoch), &spec);
                assert!(status >= previous, "{:?} went {} -> {}", v, previous, status);
                previous = status;
            }
        }
    }

    #[test]
    fn resolve_is_pure() {
        let spec = spec();
        let v = Validator {
            activation_eligibility_epoch: Epoch::new(1),
            ..Validator::default()
        };

        let a = resolve(&v, 7, Epoch::new(4), Some(42), Some(3), 4, &spec);
        let b = resolve(&v, 7, Epoch::new(4), Some(42), Some(3), 4, &spec);
        assert_eq!(a, b);
        assert_eq!(a.status, ValidatorStatus::Pending);
        assert_eq!(a.validator_index, Some(7));
        assert_eq!(a.eth1_deposit_block_number, Some(42));
        assert_eq!(a.position_in_activation_queue, Some(3));
        // Dequeued this epoch, activated after the activation-exit delay.
        assert_eq!(
            a.transition_estimate_seconds,
            (2 + spec.max_seed_lookahead.as_u64()) * spec.seconds_per_epoch()
        );
    }

    #[test]
    fn queue_position_only_for_pending() {
        let spec = spec();
        let response = resolve(&active_from(0), 0, Epoch::new(1), None, Some(0), 4, &spec);
        assert_eq!(response.status, ValidatorStatus::Active);
        assert_eq!(response.position_in_activation_queue, None);
        assert_eq!(response.transition_estimate_seconds, 0);
        assert_eq!(response.activation_epoch, Some(Epoch::new(0)));
    }

    #[test]
    fn unknown_key_uses_deposit_data() {
        let pubkey = PublicKeyBytes::empty();
        assert_eq!(
            resolve_pubkey(None, &pubkey, None).status,
            ValidatorStatus::Unknown
        );

        let deposited = resolve_pubkey(None, &pubkey, Some(9));
        assert_eq!(deposited.status, ValidatorStatus::Deposited);
        assert_eq!(deposited.eth1_deposit_block_number, Some(9));
        assert_eq!(deposited.validator_index, None);
    }
}
