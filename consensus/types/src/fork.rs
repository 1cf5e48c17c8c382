use crate::Epoch;
use serde::{Deserialize, Serialize};

/// Specifies a fork of the `BeaconChain`, to prevent replay attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fork {
    #[serde(with = "fork_version_hex")]
    pub previous_version: [u8; 4],
    #[serde(with = "fork_version_hex")]
    pub current_version: [u8; 4],
    pub epoch: Epoch,
}

impl Fork {
    /// A fork that has only ever had one version.
    pub fn genesis(version: [u8; 4]) -> Self {
        Self {
            previous_version: version,
            current_version: version,
            epoch: Epoch::new(0),
        }
    }

    /// Return the fork version of the given ``epoch``.
    pub fn get_fork_version(&self, epoch: Epoch) -> [u8; 4] {
        if epoch < self.epoch {
            return self.previous_version;
        }
        self.current_version
    }
}

/// Serializes a 4-byte fork version as a `0x`-prefixed hex string.
pub mod fork_version_hex {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(version: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(version)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 4], D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s
            .strip_prefix("0x")
            .ok_or_else(|| D::Error::custom("fork version must be 0x-prefixed"))?;
        let bytes = hex::decode(stripped).map_err(|e| D::Error::custom(format!("{:?}", e)))?;
        if bytes.len() != 4 {
            return Err(D::Error::custom(format!(
                "fork version must be 4 bytes, got {}",
                bytes.len()
            )));
        }
        let mut version = [0; 4];
        version.copy_from_slice(&bytes);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_fork_version() {
        let previous_version = [1; 4];
        let current_version = [2; 4];
        let epoch = Epoch::new(10);

        let fork = Fork {
            previous_version,
            current_version,
            epoch,
        };

        assert_eq!(fork.get_fork_version(epoch - 1), previous_version);
        assert_eq!(fork.get_fork_version(epoch), current_version);
        assert_eq!(fork.get_fork_version(epoch + 1), current_version);
    }

    #[test]
    fn versions_serialize_as_hex() {
        let fork = Fork::genesis([0, 0, 0, 1]);
        let json = serde_json::to_string(&fork).unwrap();
        assert!(json.contains("\"0x00000001\""));
        assert_eq!(serde_json::from_str::<Fork>(&json).unwrap(), fork);
    }
}
