use lazy_static::lazy_static;
pub use lighthouse_metrics::*;

lazy_static! {
    /*
     * Duties
     */
    pub static ref DUTIES_REQUESTS: Result<IntCounter> = try_create_int_counter(
        "validator_coordinator_duties_requests_total",
        "Count of duties requests received"
    );
    pub static ref DUTIES_COMPUTE_TIMES: Result<Histogram> = try_create_histogram(
        "validator_coordinator_duties_compute_seconds",
        "Time taken to compute duties for a single request"
    );
    pub static ref SHUFFLING_CACHE_HITS: Result<IntCounter> = try_create_int_counter(
        "validator_coordinator_shuffling_cache_hits_total",
        "Count of times the shuffling cache fulfils a request"
    );
    pub static ref SHUFFLING_CACHE_MISSES: Result<IntCounter> = try_create_int_counter(
        "validator_coordinator_shuffling_cache_misses_total",
        "Count of times the shuffling cache fails to fulfil a request"
    );

    /*
     * Status
     */
    pub static ref STATUS_REQUESTS: Result<IntCounter> = try_create_int_counter(
        "validator_coordinator_status_requests_total",
        "Count of validator status requests received, one per public key"
    );

    /*
     * Subscriptions
     */
    pub static ref ACTIVATION_SUBSCRIPTIONS: Result<IntGauge> = try_create_int_gauge(
        "validator_coordinator_activation_subscriptions",
        "Number of open activation subscriptions"
    );
    pub static ref CHAIN_START_SUBSCRIPTIONS: Result<IntGauge> = try_create_int_gauge(
        "validator_coordinator_chain_start_subscriptions",
        "Number of open chain start subscriptions"
    );
    pub static ref NOTIFICATIONS_SENT: Result<IntCounterVec> = try_create_int_counter_vec(
        "validator_coordinator_notifications_sent_total",
        "Count of notifications pushed to subscribers",
        &["kind"]
    );

    /*
     * Evaluator
     */
    pub static ref EVALUATOR_PASSES: Result<IntCounter> = try_create_int_counter(
        "validator_coordinator_evaluator_passes_total",
        "Count of chain events handled by the evaluator"
    );
    pub static ref EVALUATOR_PASS_TIMES: Result<Histogram> = try_create_histogram(
        "validator_coordinator_evaluator_pass_seconds",
        "Time taken by the evaluator to handle one chain event"
    );
}
