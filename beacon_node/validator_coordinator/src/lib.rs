//! Validator coordination for the beacon node.
//!
//! Tracks the lifecycle status of every registered validator, computes per-epoch proposer and
//! attester duties and streams activation and chain start notifications to validator clients.
//!
//! All client-facing operations are exposed by `CoordinationService`. Chain state is read through
//! the `ChainBackend` trait, implemented by the beacon chain (or `test_utils::TestingBackend`).

mod activation_queue;
mod metrics;
mod subscription;

pub mod activation;
pub mod backend;
pub mod chain_start;
pub mod config;
pub mod duties;
pub mod errors;
pub mod evaluator;
pub mod registry;
pub mod service;
pub mod status;
pub mod test_utils;

pub use activation::{
    ActivationStream, ActivationWatcher, ValidatorActivationResponse, ValidatorActivationStatus,
};
pub use activation_queue::ActivationQueue;
pub use backend::{BackendError, ChainBackend, StoreError};
pub use chain_start::{ChainStartNotifier, ChainStartResponse, ChainStartStream};
pub use config::Config;
pub use duties::{AttestationDuty, Duty, DutyScheduler, EpochShuffling, ShufflingError};
pub use errors::{Code, Error};
pub use evaluator::{ChainEvent, EventSender};
pub use registry::{ChainState, RegistryError, RegistrySnapshot};
pub use service::CoordinationService;
pub use status::{ValidatorStatus, ValidatorStatusResponse};
