use crate::common::service;
use std::sync::Arc;
use types::{
    Attestation, ChainSpec, Epoch, Graffiti, RandaoReveal, SignatureBytes, SignedBeaconBlock,
    SignedVoluntaryExit, Slot, VoluntaryExit,
};
use validator_coordinator::test_utils::{SnapshotBuilder, TestingBackend};
use validator_coordinator::Code;

fn started(validator_count: usize) -> (Arc<TestingBackend>, crate::common::TestService) {
    let spec = ChainSpec::minimal();
    let backend = Arc::new(TestingBackend::with_head(
        SnapshotBuilder::new(spec.clone())
            .active_validators(validator_count)
            .build(),
    ));
    (backend.clone(), service(backend, spec))
}

#[test]
fn block_production_and_proposal() {
    let (backend, service) = started(8);
    let graffiti = *b"validator coordinator test block";

    let block = service
        .get_block(Slot::new(3), &RandaoReveal::empty().serialize(), &graffiti)
        .unwrap();
    assert_eq!(block.slot, Slot::new(3));
    assert_eq!(block.graffiti, Graffiti::from(graffiti));

    let signed = SignedBeaconBlock {
        message: block,
        signature: SignatureBytes::empty(),
    };
    let root = service.propose_block(signed.clone()).unwrap();
    assert_eq!(root, service.propose_block(signed.clone()).unwrap());
    assert_eq!(backend.processed_blocks(), vec![signed.clone(), signed.clone()]);

    backend.set_reject_submissions(true);
    let err = service.propose_block(signed).unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[test]
fn block_production_validates_input() {
    let (_, service) = started(8);

    let err = service
        .get_block(Slot::new(1), &[0; 31], &[0; 32])
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = service
        .get_block(Slot::new(1), &[0; 32], &[0; 33])
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    // Two epochs ahead with a lookahead of one.
    let err = service
        .get_block(Slot::new(16), &[0; 32], &[0; 32])
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let pre_genesis = crate::common::service(Arc::new(TestingBackend::new()), ChainSpec::minimal());
    let err = pre_genesis
        .get_block(Slot::new(1), &[0; 32], &[0; 32])
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

#[test]
fn attestation_data_checks_committee_index() {
    // 16 validators with a target committee size of 4: 4 committees, one per slot for the first
    // four slots.
    let (_, service) = started(16);

    let data = service.get_attestation_data(Slot::new(2), 0).unwrap();
    assert_eq!(data.slot, Slot::new(2));
    assert_eq!(data.index, 0);
    assert_eq!(data.target.epoch, Epoch::new(0));

    let err = service.get_attestation_data(Slot::new(2), 1).unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = service.get_attestation_data(Slot::new(5), 0).unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[test]
fn attestation_checks_aggregation_bits() {
    let (backend, service) = started(16);
    let data = service.get_attestation_data(Slot::new(1), 0).unwrap();
    let committee_len = service.committees_at_slot(Slot::new(1)).unwrap()[0].len();

    let mut attestation = Attestation {
        aggregation_bits: vec![false; committee_len + 1],
        data,
        signature: SignatureBytes::empty(),
    };
    let err = service.propose_attestation(attestation.clone()).unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert!(backend.processed_attestations().is_empty());

    attestation.aggregation_bits = vec![false; committee_len];
    attestation.aggregation_bits[0] = true;
    service.propose_attestation(attestation.clone()).unwrap();
    assert_eq!(backend.processed_attestations(), vec![attestation.clone()]);

    attestation.data.index = 3;
    let err = service.propose_attestation(attestation).unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[test]
fn exit_requires_known_validator() {
    let (backend, service) = started(4);

    let exit = |validator_index| SignedVoluntaryExit {
        message: VoluntaryExit {
            epoch: Epoch::new(0),
            validator_index,
        },
        signature: SignatureBytes::empty(),
    };

    let err = service.propose_exit(exit(4)).unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    service.propose_exit(exit(3)).unwrap();
    assert_eq!(backend.processed_exits(), vec![exit(3)]);
}
