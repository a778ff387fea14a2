use ckb_types::{bytes::Bytes, prelude::*};
use ickb_builder::ckb_utils::{calculate_fee, serialized_size_in_block, Cell, FeePolicy, TransactionDraft, ValueOracle};
use ickb_builder::deposit::{run_phase_one, DepositRequest};
use ickb_builder::error::Error;
use ickb_builder::ledger::{balance, MIN_CHANGE_CELL_CAPACITY};
use ickb_builder::submit::{SubmitConfig, Submitter};
use ickb_builder::types::{Role, DEFAULT_TX_FEE};

use crate::fixtures::*;

fn draft_paying(lock: &ckb_types::packed::Script, ckb: u64) -> TransactionDraft {
    let mut draft = TransactionDraft::new();
    draft.add_outputs(Role::Funding, [Cell::new(ckb * CKB, lock.clone(), None, Bytes::new())]).unwrap();
    draft
}

#[tokio::test]
async fn balanced_draft_conserves_capacity() {
    let registry = devnet_registry();
    let lock = signer_lock(&registry);
    let collector = VecCollector::new(plain_cells(&lock, 5, 1_000, 0x10));
    let mut draft = draft_paying(&other_lock(&registry), 2_500);

    let result = balance(&mut draft, &lock, &collector, &registry, FeePolicy::default()).await.unwrap();

    assert_eq!(result.fee, DEFAULT_TX_FEE);
    assert_eq!(draft.inputs().len(), 3);
    assert_eq!(draft.input_capacity().unwrap(), draft.output_capacity().unwrap() + result.fee);
    assert_eq!(result.change, Some(500 * CKB - DEFAULT_TX_FEE));
    assert_eq!(draft.roles().last(), Some(&Role::Change));
    let change = draft.outputs().last().unwrap();
    assert_eq!(change.output.lock().as_slice(), lock.as_slice());
    assert!(change.output.type_().to_opt().is_none());
}

#[tokio::test]
async fn rate_fee_covers_the_broadcast_transaction() {
    let registry = ickb_registry();
    let signer = test_signer(&registry);
    let lock = signer_lock(&registry);
    let rpc = FakeRpc::new(header(0xaa, 100, AR_0), genesis());
    let collector = VecCollector::new(plain_cells(&lock, 5, 100_000, 0x10));
    let clock = ManualClock::default();
    let config = SubmitConfig { fee: FeePolicy::Rate(1_000), ..fast_config() };
    let submitter = Submitter::new(&rpc, &collector, &signer, &registry, &clock, config);

    let request = DepositRequest::new(1_000 * CKB, 3).unwrap();
    let (submitted, _) = run_phase_one(&submitter, request, &ValueOracle::default(), true).await.unwrap();

    let tx = rpc.sent()[0].data();
    assert!(!tx.raw().cell_deps().is_empty());
    let required = calculate_fee(serialized_size_in_block(&tx), 1_000).unwrap();
    assert_eq!(submitted.balance.fee, required);

    let input: u64 = collector
        .cells
        .iter()
        .filter(|c| tx.raw().inputs().into_iter().any(|i| i.previous_output().as_slice() == c.out_point.as_slice()))
        .map(|c| c.cell.capacity())
        .sum();
    let output: u64 = tx.raw().outputs().into_iter().map(|o| Unpack::<u64>::unpack(&o.capacity())).sum();
    assert_eq!(input, output + required);
}

#[tokio::test]
async fn exact_draft_is_left_alone() {
    let registry = devnet_registry();
    let lock = signer_lock(&registry);
    let collector = VecCollector::new(Vec::new());
    let mut draft = draft_paying(&other_lock(&registry), 100);
    let mut funding = plain_cells(&lock, 1, 100, 0x10).remove(0);
    funding.cell = Cell::new(100 * CKB + DEFAULT_TX_FEE, lock.clone(), None, Bytes::new());
    draft.add_input(funding);

    let result = balance(&mut draft, &lock, &collector, &registry, FeePolicy::default()).await.unwrap();

    assert_eq!(result.change, None);
    assert_eq!(draft.outputs().len(), 1);
    assert_eq!(collector.queries(), 0);
}

#[tokio::test]
async fn exhausted_collector_is_insufficient_funds() {
    let registry = devnet_registry();
    let lock = signer_lock(&registry);
    let collector = VecCollector::new(plain_cells(&lock, 2, 100, 0x10));
    let mut draft = draft_paying(&other_lock(&registry), 1_000);

    let err = balance(&mut draft, &lock, &collector, &registry, FeePolicy::default()).await.unwrap_err();

    match err {
        Error::InsufficientFunds { required, collected } => {
            assert_eq!(required, 1_000 * CKB + MIN_CHANGE_CELL_CAPACITY + DEFAULT_TX_FEE);
            assert_eq!(collected, 200 * CKB);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    assert!(!draft.roles().contains(&Role::Change));
}

#[tokio::test]
async fn cells_with_data_are_not_spent() {
    let registry = devnet_registry();
    let lock = signer_lock(&registry);
    let mut cells = plain_cells(&lock, 2, 1_000, 0x10);
    cells[0].cell = Cell::new(5_000 * CKB, lock.clone(), None, Bytes::from_static(b"code"));
    let collector = VecCollector::new(cells);
    let mut draft = draft_paying(&other_lock(&registry), 500);

    balance(&mut draft, &lock, &collector, &registry, FeePolicy::default()).await.unwrap();

    assert_eq!(draft.inputs().len(), 1);
    let index: u32 = draft.inputs()[0].out_point.index().unpack();
    assert_eq!(index, 1);
}
