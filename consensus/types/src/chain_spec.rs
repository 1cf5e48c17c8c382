use crate::{Epoch, Fork, Slot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Each of the BLS signature domains.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Domain {
    BeaconProposer,
    BeaconAttester,
    Randao,
    Deposit,
    VoluntaryExit,
}

/// Holds all the "constants" for a BeaconChain.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ChainSpec {
    /*
     * Misc
     */
    pub target_committee_size: u64,
    pub max_committees_per_slot: u64,
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,
    pub shuffle_round_count: u8,

    /*
     *  Gwei values
     */
    pub max_effective_balance: u64,
    pub ejection_balance: u64,
    pub effective_balance_increment: u64,

    /*
     * Initial Values
     */
    pub genesis_slot: Slot,
    pub genesis_fork_version: [u8; 4],
    pub far_future_epoch: Epoch,

    /*
     * Time parameters
     */
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    pub min_seed_lookahead: Epoch,
    pub max_seed_lookahead: Epoch,
    pub min_validator_withdrawability_delay: Epoch,
    pub epochs_per_historical_vector: u64,

    /*
     * Signature domains
     *
     * Use `ChainSpec::get_domain(..)` to combine these with a `Fork`.
     */
    domain_beacon_proposer: u32,
    domain_beacon_attester: u32,
    domain_randao: u32,
    domain_deposit: u32,
    domain_voluntary_exit: u32,
}

impl ChainSpec {
    /// Returns the domain constant (the "tag") for `domain`.
    pub fn get_domain_constant(&self, domain: Domain) -> u32 {
        match domain {
            Domain::BeaconProposer => self.domain_beacon_proposer,
            Domain::BeaconAttester => self.domain_beacon_attester,
            Domain::Randao => self.domain_randao,
            Domain::Deposit => self.domain_deposit,
            Domain::VoluntaryExit => self.domain_voluntary_exit,
        }
    }

    /// Get the domain number that represents the fork meta and signature domain.
    pub fn get_domain(&self, epoch: Epoch, domain: Domain, fork: &Fork) -> u64 {
        Self::compute_domain(
            self.get_domain_constant(domain),
            fork.get_fork_version(epoch),
        )
    }

    /// Mixes an arbitrary domain `tag` with the fork version at `epoch`.
    ///
    /// Tags need not correspond to a `Domain` variant, validator clients may sign in domains this
    /// node does not know about.
    pub fn get_domain_for_tag(&self, epoch: Epoch, tag: u32, fork: &Fork) -> u64 {
        Self::compute_domain(tag, fork.get_fork_version(epoch))
    }

    /// The domain is the little-endian interpretation of `fork_version | domain_constant`.
    pub fn compute_domain(domain_constant: u32, fork_version: [u8; 4]) -> u64 {
        let mut fork_and_domain = [0; 8];
        fork_and_domain[0..4].copy_from_slice(&fork_version);
        fork_and_domain[4..8].copy_from_slice(&domain_constant.to_le_bytes());

        u64::from_le_bytes(fork_and_domain)
    }

    /// Return the number of committees in one epoch for `active_validator_count` validators.
    ///
    /// Always at least one, never more than `max_committees_per_slot * slots_per_epoch`.
    pub fn get_committee_count(&self, active_validator_count: usize) -> u64 {
        let max_committees = self
            .max_committees_per_slot
            .saturating_mul(self.slots_per_epoch)
            .max(1);
        let by_size = (active_validator_count as u64)
            .checked_div(self.target_committee_size)
            .unwrap_or(0);

        by_size.clamp(1, max_committees)
    }

    /// Return the validator churn limit for the state with the given `active_validator_count`.
    pub fn get_churn_limit(&self, active_validator_count: u64) -> u64 {
        std::cmp::max(
            self.min_per_epoch_churn_limit,
            active_validator_count
                .checked_div(self.churn_limit_quotient)
                .unwrap_or(0),
        )
    }

    /// Returns the epoch at which an activation or exit triggered in ``epoch`` takes effect.
    pub fn compute_activation_exit_epoch(&self, epoch: Epoch) -> Epoch {
        epoch + 1 + self.max_seed_lookahead.as_u64()
    }

    pub fn seconds_per_epoch(&self) -> u64 {
        self.seconds_per_slot.saturating_mul(self.slots_per_epoch)
    }

    /// Returns a `ChainSpec` compatible with the Ethereum Foundation specification.
    pub fn mainnet() -> Self {
        Self {
            /*
             * Misc
             */
            target_committee_size: 128,
            max_committees_per_slot: 64,
            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 65_536,
            shuffle_round_count: 90,

            /*
             *  Gwei values
             */
            max_effective_balance: 32_000_000_000,
            ejection_balance: 16_000_000_000,
            effective_balance_increment: 1_000_000_000,

            /*
             * Initial Values
             */
            genesis_slot: Slot::new(0),
            genesis_fork_version: [0; 4],
            far_future_epoch: Epoch::max_value(),

            /*
             * Time parameters
             */
            seconds_per_slot: 12,
            slots_per_epoch: 32,
            min_seed_lookahead: Epoch::new(1),
            max_seed_lookahead: Epoch::new(4),
            min_validator_withdrawability_delay: Epoch::new(256),
            epochs_per_historical_vector: 65_536,

            /*
             * Signature domains
             */
            domain_beacon_proposer: 0,
            domain_beacon_attester: 1,
            domain_randao: 2,
            domain_deposit: 3,
            domain_voluntary_exit: 4,
        }
    }

    /// Ethereum Foundation minimal spec, as defined in the eth2.0-specs repo.
    pub fn minimal() -> Self {
        Self {
            target_committee_size: 4,
            max_committees_per_slot: 4,
            churn_limit_quotient: 32,
            shuffle_round_count: 10,
            genesis_fork_version: [0, 0, 0, 1],
            seconds_per_slot: 6,
            slots_per_epoch: 8,
            epochs_per_historical_vector: 64,
            ..ChainSpec::mainnet()
        }
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Network configuration as it appears in a `config.yaml` file.
///
/// Every field other than `PRESET_BASE` is optional, missing fields inherit the preset's value.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "UPPERCASE")]
pub struct Config {
    #[serde(default = "default_preset_base")]
    pub preset_base: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_committee_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_committees_per_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_per_epoch_churn_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_limit_quotient: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_round_count: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_effective_balance: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ejection_balance: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_fork_version"
    )]
    pub genesis_fork_version: Option<[u8; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_per_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots_per_epoch: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_seed_lookahead: Option<Epoch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_seed_lookahead: Option<Epoch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_validator_withdrawability_delay: Option<Epoch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs_per_historical_vector: Option<u64>,
}

fn default_preset_base() -> String {
    "mainnet".to_string()
}

mod optional_fork_version {
    use crate::fork::fork_version_hex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        version: &Option<[u8; 4]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match version {
            Some(version) => fork_version_hex::serialize(version, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; 4]>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "fork_version_hex")] [u8; 4]);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

impl Config {
    /// Reads a `Config` from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Unable to open config file {:?}: {:?}", path, e))?;
        serde_yaml::from_reader(file)
            .map_err(|e| format!("Unable to parse config file {:?}: {:?}", path, e))
    }

    /// Produces the `Config` which fully describes `spec`.
    pub fn from_chain_spec(spec: &ChainSpec, preset_base: &str) -> Self {
        Self {
            preset_base: preset_base.to_string(),
            target_committee_size: Some(spec.target_committee_size),
            max_committees_per_slot: Some(spec.max_committees_per_slot),
            min_per_epoch_churn_limit: Some(spec.min_per_epoch_churn_limit),
            churn_limit_quotient: Some(spec.churn_limit_quotient),
            shuffle_round_count: Some(spec.shuffle_round_count),
            max_effective_balance: Some(spec.max_effective_balance),
            ejection_balance: Some(spec.ejection_balance),
            genesis_fork_version: Some(spec.genesis_fork_version),
            seconds_per_slot: Some(spec.seconds_per_slot),
            slots_per_epoch: Some(spec.slots_per_epoch),
            min_seed_lookahead: Some(spec.min_seed_lookahead),
            max_seed_lookahead: Some(spec.max_seed_lookahead),
            min_validator_withdrawability_delay: Some(spec.min_validator_withdrawability_delay),
            epochs_per_historical_vector: Some(spec.epochs_per_historical_vector),
        }
    }

    /// Builds a `ChainSpec` from the preset named by `PRESET_BASE`, overridden by every field
    /// present in `self`.
    ///
    /// Returns `None` for an unknown preset or a configuration that cannot produce valid duties
    /// (zero slots per epoch, zero committee size or an empty randao history).
    pub fn apply_to_chain_spec(&self) -> Option<ChainSpec> {
        let base = match self.preset_base.as_str() {
            "mainnet" => ChainSpec::mainnet(),
            "minimal" => ChainSpec::minimal(),
            _ => return None,
        };

        let spec = ChainSpec {
            target_committee_size: self
                .target_committee_size
                .unwrap_or(base.target_committee_size),
            max_committees_per_slot: self
                .max_committees_per_slot
                .unwrap_or(base.max_committees_per_slot),
            min_per_epoch_churn_limit: self
                .min_per_epoch_churn_limit
                .unwrap_or(base.min_per_epoch_churn_limit),
            churn_limit_quotient: self
                .churn_limit_quotient
                .unwrap_or(base.churn_limit_quotient),
            shuffle_round_count: self
                .shuffle_round_count
                .unwrap_or(base.shuffle_round_count),
            max_effective_balance: self
                .max_effective_balance
                .unwrap_or(base.max_effective_balance),
            ejection_balance: self.ejection_balance.unwrap_or(base.ejection_balance),
            genesis_fork_version: self
                .genesis_fork_version
                .unwrap_or(base.genesis_fork_version),
            seconds_per_slot: self.seconds_per_slot.unwrap_or(base.seconds_per_slot),
            slots_per_epoch: self.slots_per_epoch.unwrap_or(base.slots_per_epoch),
            min_seed_lookahead: self.min_seed_lookahead.unwrap_or(base.min_seed_lookahead),
            max_seed_lookahead: self.max_seed_lookahead.unwrap_or(base.max_seed_lookahead),
            min_validator_withdrawability_delay: self
                .min_validator_withdrawability_delay
                .unwrap_or(base.min_validator_withdrawability_delay),
            epochs_per_historical_vector: self
                .epochs_per_historical_vector
                .unwrap_or(base.epochs_per_historical_vector),
            ..base
        };

        if spec.slots_per_epoch == 0
            || spec.target_committee_size == 0
            || spec.epochs_per_historical_vector == 0
        {
            return None;
        }

        Some(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_spec_can_be_constructed() {
        let _ = ChainSpec::mainnet();
    }

    #[test]
    fn committee_count_follows_target_size() {
        let spec = ChainSpec {
            target_committee_size: 5,
            ..ChainSpec::minimal()
        };

        assert_eq!(spec.get_committee_count(0), 1);
        assert_eq!(spec.get_committee_count(4), 1);
        assert_eq!(spec.get_committee_count(10), 2);
        assert_eq!(spec.get_committee_count(11), 2);
        // Capped at `max_committees_per_slot * slots_per_epoch`.
        assert_eq!(spec.get_committee_count(1_000_000), 32);
    }

    #[test]
    fn domain_mixes_fork_version() {
        let spec = ChainSpec::mainnet();
        let fork = Fork {
            previous_version: [0, 0, 0, 0],
            current_version: [1, 0, 0, 0],
            epoch: Epoch::new(10),
        };

        let before = spec.get_domain(Epoch::new(9), Domain::BeaconAttester, &fork);
        let after = spec.get_domain(Epoch::new(10), Domain::BeaconAttester, &fork);

        assert_eq!(before, 1 << 32);
        assert_eq!(after, (1 << 32) + 1);
        assert_eq!(
            spec.get_domain_for_tag(Epoch::new(10), 1, &fork),
            spec.get_domain(Epoch::new(10), Domain::BeaconAttester, &fork)
        );
    }

    #[test]
    fn churn_limit_has_a_floor() {
        let spec = ChainSpec::mainnet();
        assert_eq!(spec.get_churn_limit(0), spec.min_per_epoch_churn_limit);
        assert_eq!(spec.get_churn_limit(65_536 * 10), 10);
    }

    #[test]
    fn config_round_trip() {
        let spec = ChainSpec::minimal();
        let config = Config::from_chain_spec(&spec, "minimal");
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed, config);
        assert_eq!(parsed.apply_to_chain_spec(), Some(spec));
    }

    #[test]
    fn partial_config_inherits_preset() {
        let yaml = "PRESET_BASE: minimal\nTARGET_COMMITTEE_SIZE: 5\nGENESIS_FORK_VERSION: '0x00000042'\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let spec = config.apply_to_chain_spec().unwrap();

        assert_eq!(spec.target_committee_size, 5);
        assert_eq!(spec.genesis_fork_version, [0, 0, 0, 0x42]);
        assert_eq!(spec.slots_per_epoch, ChainSpec::minimal().slots_per_epoch);
    }

    #[test]
    fn rejects_unknown_preset_and_zero_slots() {
        let unknown = Config {
            preset_base: "gnosis".to_string(),
            ..Config::default()
        };
        assert_eq!(unknown.apply_to_chain_spec(), None);

        let zero_slots = Config {
            preset_base: "mainnet".to_string(),
            slots_per_epoch: Some(0),
            ..Config::default()
        };
        assert_eq!(zero_slots.apply_to_chain_spec(), None);
    }
}
