use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use types::ChainSpec;
use validator_coordinator::test_utils::{deterministic_pubkey, null_logger, TestingBackend};
use validator_coordinator::{Config, CoordinationService};

/// How long a stream must stay silent to be considered not to have emitted.
pub const SILENCE: Duration = Duration::from_millis(100);
pub const EMISSION_TIMEOUT: Duration = Duration::from_secs(5);

pub type TestService = CoordinationService<TestingBackend>;

pub fn service(backend: Arc<TestingBackend>, spec: ChainSpec) -> TestService {
    CoordinationService::new(backend, Arc::new(spec), Config::default(), null_logger())
}

pub fn key_bytes(index: usize) -> Vec<u8> {
    deterministic_pubkey(index).as_bytes().to_vec()
}

pub fn keys(indices: impl IntoIterator<Item = usize>) -> Vec<Vec<u8>> {
    indices.into_iter().map(key_bytes).collect()
}

pub async fn assert_silent<S: Stream + Unpin>(stream: &mut S) {
    assert!(
        timeout(SILENCE, stream.next()).await.is_err(),
        "stream should not emit"
    );
}

pub async fn next_item<S: Stream + Unpin>(stream: &mut S) -> Option<S::Item> {
    timeout(EMISSION_TIMEOUT, stream.next())
        .await
        .expect("stream should emit or end")
}
