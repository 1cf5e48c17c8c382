use serde::{Deserialize, Serialize};

/// The default number of epochs past the current epoch for which duties may be requested.
pub const DEFAULT_DUTIES_LOOKAHEAD_EPOCHS: u64 = 1;
/// The default number of epoch shufflings kept in memory.
///
/// Each entry holds one index per active validator, roughly 8 bytes each.
pub const DEFAULT_SHUFFLING_CACHE_SIZE: usize = 16;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Requests for epochs later than `current_epoch + duties_lookahead_epochs` are rejected.
    pub duties_lookahead_epochs: u64,
    /// Number of `(state_root, epoch)` shufflings to keep in the LRU cache. Zero is treated as one.
    pub shuffling_cache_size: usize,
    /// Capacity of the channel feeding chain events to the evaluator.
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duties_lookahead_epochs: DEFAULT_DUTIES_LOOKAHEAD_EPOCHS,
            shuffling_cache_size: DEFAULT_SHUFFLING_CACHE_SIZE,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"duties_lookahead_epochs": 2}"#).unwrap();
        assert_eq!(
            config,
            Config {
                duties_lookahead_epochs: 2,
                ..Config::default()
            }
        );
    }
}
