use crate::common::{key_bytes, keys, service};
use std::sync::Arc;
use types::{ChainSpec, Domain, Epoch, Fork, Validator};
use validator_coordinator::test_utils::{deterministic_pubkey, SnapshotBuilder, TestingBackend};
use validator_coordinator::{Code, ValidatorStatus};

fn slashed_validator() -> Validator {
    Validator {
        pubkey: deterministic_pubkey(0),
        effective_balance: ChainSpec::minimal().max_effective_balance,
        slashed: true,
        activation_eligibility_epoch: Epoch::new(0),
        activation_epoch: Epoch::new(0),
        exit_epoch: Epoch::new(100),
        withdrawable_epoch: Epoch::new(200),
        ..Validator::default()
    }
}

#[test]
fn slashed_validator_is_slashing_then_exited() {
    let spec = ChainSpec::minimal();
    let backend = Arc::new(TestingBackend::with_head(
        SnapshotBuilder::new(spec.clone())
            .validator(slashed_validator())
            .epoch(Epoch::new(150))
            .build(),
    ));
    let service = service(backend.clone(), spec.clone());

    let response = service.validator_status(&key_bytes(0)).unwrap();
    assert_eq!(response.status, ValidatorStatus::Slashing);
    assert_eq!(response.validator_index, Some(0));
    assert_eq!(
        response.transition_estimate_seconds,
        50 * spec.seconds_per_epoch()
    );

    backend.set_head(
        SnapshotBuilder::new(spec)
            .validator(slashed_validator())
            .epoch(Epoch::new(250))
            .build(),
    );
    let response = service.validator_status(&key_bytes(0)).unwrap();
    assert_eq!(response.status, ValidatorStatus::Exited);
    assert_eq!(response.transition_estimate_seconds, 0);
}

#[test]
fn validator_index_round_trip() {
    let spec = ChainSpec::minimal();
    let snapshot = SnapshotBuilder::new(spec.clone())
        .active_validators(32)
        .build();
    let service = service(Arc::new(TestingBackend::with_head(snapshot.clone())), spec);

    for i in [0, 7, 31] {
        let index = service.validator_index(&key_bytes(i)).unwrap();
        let validator = snapshot.get_validator(index as usize).unwrap();
        assert_eq!(validator.pubkey.as_bytes(), &key_bytes(i)[..]);
    }

    let err = service.validator_index(&key_bytes(32)).unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = service.validator_index(&[1, 2, 3]).unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[test]
fn deposit_without_registry_entry() {
    let backend = Arc::new(TestingBackend::new());
    backend.add_deposit(deterministic_pubkey(3), 1_234);
    let service = service(backend, ChainSpec::minimal());

    let deposited = service.validator_status(&key_bytes(3)).unwrap();
    assert_eq!(deposited.status, ValidatorStatus::Deposited);
    assert_eq!(deposited.eth1_deposit_block_number, Some(1_234));
    assert_eq!(deposited.validator_index, None);

    let unknown = service.validator_status(&key_bytes(4)).unwrap();
    assert_eq!(unknown.status, ValidatorStatus::Unknown);
}

#[test]
fn pending_validators_report_queue_position() {
    let spec = ChainSpec::minimal();
    let snapshot = SnapshotBuilder::new(spec.clone())
        .active_validators(4)
        .pending_validators(6)
        .build();
    let service = service(Arc::new(TestingBackend::with_head(snapshot)), spec.clone());

    let responses = service
        .multiple_validator_status(&keys([9, 0, 4, 99]))
        .unwrap();
    assert_eq!(responses.len(), 4);

    assert_eq!(responses[0].status, ValidatorStatus::Pending);
    assert_eq!(responses[0].position_in_activation_queue, Some(5));
    // Six queued validators with a churn limit of four: position five is dequeued next epoch.
    assert_eq!(
        responses[0].transition_estimate_seconds,
        (1 + 2 + spec.max_seed_lookahead.as_u64()) * spec.seconds_per_epoch()
    );

    assert_eq!(responses[1].status, ValidatorStatus::Active);
    assert_eq!(responses[1].position_in_activation_queue, None);

    assert_eq!(responses[2].position_in_activation_queue, Some(0));
    assert_eq!(responses[3].status, ValidatorStatus::Unknown);
}

#[test]
fn status_store_failure_is_internal() {
    let backend = Arc::new(TestingBackend::new());
    backend.set_store_failure(true);
    let service = service(backend, ChainSpec::minimal());

    let err = service.validator_status(&key_bytes(0)).unwrap_err();
    assert_eq!(err.code(), Code::Internal);
}

#[test]
fn domain_data_follows_fork() {
    let spec = ChainSpec::minimal();
    let backend = Arc::new(TestingBackend::new());
    let service = service(backend.clone(), spec.clone());

    let attester = spec.get_domain_constant(Domain::BeaconAttester);
    let pre_genesis = service.domain_data(Epoch::new(0), attester).unwrap();
    assert_eq!(
        pre_genesis,
        ChainSpec::compute_domain(attester, spec.genesis_fork_version)
    );

    let fork = Fork {
        previous_version: spec.genesis_fork_version,
        current_version: [0, 0, 0, 2],
        epoch: Epoch::new(10),
    };
    backend.set_head(
        SnapshotBuilder::new(spec.clone())
            .active_validators(4)
            .fork(fork)
            .build(),
    );

    assert_eq!(service.domain_data(Epoch::new(9), attester).unwrap(), pre_genesis);
    assert_eq!(
        service.domain_data(Epoch::new(10), attester).unwrap(),
        ChainSpec::compute_domain(attester, [0, 0, 0, 2])
    );
    // Tags the node has no name for are still mixed with the fork version.
    assert_eq!(
        service.domain_data(Epoch::new(10), 0x0a).unwrap(),
        ChainSpec::compute_domain(0x0a, [0, 0, 0, 2])
    );
}
