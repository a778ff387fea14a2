use ckb_types::{
    bytes::Bytes,
    packed::{OutPoint, Script},
    prelude::*,
    H256,
};
use ickb_builder::ckb_utils::{ickb_sudt_script, token_amount_from_bytes, Cell, LiveCell, Receipt, ValueOracle};
use ickb_builder::config::{ScriptRegistry, ICKB_DOMAIN_LOGIC};
use ickb_builder::deposit::{build_phase_two, run_phase_two, DepositHandoff};
use ickb_builder::error::Error;
use ickb_builder::submit::Submitter;
use ickb_builder::types::*;

use crate::fixtures::*;

fn receipt_cell(registry: &ScriptRegistry, tx_tag: u8, index: u32, amount: u64, quantity: u64) -> LiveCell {
    LiveCell {
        out_point: OutPoint::new(H256([tx_tag; 32]).pack(), index),
        cell: Cell::new(
            RECEIPT_CELL_CKB * CKB,
            signer_lock(registry),
            Some(registry.script(ICKB_DOMAIN_LOGIC).unwrap()),
            Receipt::new(amount, quantity).to_bytes().unwrap(),
        ),
    }
}

fn owner_cell(registry: &ScriptRegistry, tx_tag: u8, index: u32) -> LiveCell {
    LiveCell {
        out_point: OutPoint::new(H256([tx_tag; 32]).pack(), index),
        cell: Cell::new(OWNER_LOCK_CELL_CKB * CKB, registry.script(ICKB_DOMAIN_LOGIC).unwrap(), None, Bytes::new()),
    }
}

fn lock_of(tx: &ckb_types::packed::Transaction, index: usize) -> Script {
    tx.raw().outputs().get(index).unwrap().lock()
}

#[tokio::test]
async fn receipts_are_redeemed_at_their_block_rate() {
    let registry = ickb_registry();
    let signer = test_signer(&registry);
    let ar = AR_0 * 2;
    let block = header(0xbb, 200, ar);

    let small = receipt_cell(&registry, 0x50, 3, 1_000 * CKB, 3);
    let large = receipt_cell(&registry, 0x51, 0, 300_000 * CKB, 2);
    let owner = owner_cell(&registry, 0x50, 4);
    let mut rpc = FakeRpc::new(header(0xaa, 300, ar), genesis());
    rpc.add_committed(small.clone(), &block);
    rpc.add_committed(large.clone(), &block);
    rpc.add_live(owner.clone());

    let collector = VecCollector::new(plain_cells(&signer_lock(&registry), 2, 1_000, 0x10));
    let clock = ManualClock::default();
    let submitter = Submitter::new(&rpc, &collector, &signer, &registry, &clock, fast_config());
    let handoff = DepositHandoff::new(&[small.out_point.clone(), large.out_point.clone()], &owner.out_point);

    let submitted = run_phase_two(&submitter, &handoff, &ValueOracle::default()).await.unwrap();

    let tx = rpc.sent()[0].data();
    let header_deps = tx.raw().header_deps();
    assert_eq!(header_deps.len(), 1);
    assert_eq!(header_deps.get(0).unwrap().as_slice(), block.hash.as_slice());

    let inputs: Vec<OutPoint> = tx.raw().inputs().into_iter().map(|i| i.previous_output()).collect();
    assert_eq!(inputs[0].as_slice(), small.out_point.as_slice());
    assert_eq!(inputs[1].as_slice(), large.out_point.as_slice());
    assert_eq!(inputs[2].as_slice(), owner.out_point.as_slice());

    let sudt = ickb_sudt_script(&registry).unwrap();
    let tokens = submitted.out_points.get(Role::IckbSudt);
    assert_eq!(tokens.len(), 2);
    let amounts: Vec<u128> = (0..2)
        .map(|i| {
            let output = tx.raw().outputs().get(i).unwrap();
            assert_eq!(output.type_().to_opt().unwrap().as_slice(), sudt.as_slice());
            let capacity: u64 = output.capacity().unpack();
            assert_eq!(capacity, TOKEN_CELL_CKB * CKB);
            assert_eq!(lock_of(&tx, i).as_slice(), signer_lock(&registry).as_slice());
            token_amount_from_bytes(&tx.raw().outputs_data().get(i).unwrap().raw_data()).unwrap()
        })
        .collect();
    // AR doubled halves the value; the large receipt is valued per deposit, then multiplied
    assert_eq!(amounts[0], 3 * 500 * CKB as u128);
    assert_eq!(amounts[1], 2 * 145_000 * CKB as u128);

    // the shared block header is fetched once
    assert_eq!(rpc.calls().iter().filter(|c| **c == "get_header").count(), 1);
}

#[tokio::test]
async fn spent_receipt_is_live_cell_not_found() {
    let registry = ickb_registry();
    let signer = test_signer(&registry);
    let owner = owner_cell(&registry, 0x50, 4);
    let rpc = FakeRpc::new(header(0xaa, 300, AR_0), genesis());
    rpc.add_live(owner.clone());
    let collector = VecCollector::new(plain_cells(&signer_lock(&registry), 2, 1_000, 0x10));
    let clock = ManualClock::default();
    let submitter = Submitter::new(&rpc, &collector, &signer, &registry, &clock, fast_config());

    let spent = OutPoint::new(H256([0x50; 32]).pack(), 3);
    let handoff = DepositHandoff::new(&[spent], &owner.out_point);
    let err = run_phase_two(&submitter, &handoff, &ValueOracle::default()).await.unwrap_err();

    assert!(matches!(err, Error::LiveCellNotFound(ref op) if op.ends_with("-3")));
    assert!(rpc.sent().is_empty());
    assert!(!rpc.calls().contains(&"send_transaction"));
}

#[tokio::test]
async fn spent_owner_cell_is_live_cell_not_found() {
    let registry = ickb_registry();
    let block = header(0xbb, 200, AR_0);
    let receipt = receipt_cell(&registry, 0x50, 3, 1_000 * CKB, 1);
    let mut rpc = FakeRpc::new(header(0xaa, 300, AR_0), genesis());
    rpc.add_committed(receipt.clone(), &block);

    let owner = OutPoint::new(H256([0x50; 32]).pack(), 4);
    let handoff = DepositHandoff::new(&[receipt.out_point], &owner);
    let err = build_phase_two(&handoff, &rpc, &registry, &ValueOracle::default()).await.unwrap_err();

    assert!(matches!(err, Error::LiveCellNotFound(_)));
}

#[tokio::test]
async fn cell_without_receipt_type_is_rejected() {
    let registry = ickb_registry();
    let block = header(0xbb, 200, AR_0);
    let mut not_receipt = receipt_cell(&registry, 0x50, 3, 1_000 * CKB, 1);
    not_receipt.cell = Cell::new(RECEIPT_CELL_CKB * CKB, signer_lock(&registry), None, not_receipt.cell.data.clone());
    let owner = owner_cell(&registry, 0x50, 4);
    let mut rpc = FakeRpc::new(header(0xaa, 300, AR_0), genesis());
    rpc.add_committed(not_receipt.clone(), &block);
    rpc.add_live(owner.clone());

    let handoff = DepositHandoff::new(&[not_receipt.out_point], &owner.out_point);
    let err = build_phase_two(&handoff, &rpc, &registry, &ValueOracle::default()).await.unwrap_err();

    assert!(matches!(err, Error::NotAReceipt(_)));
}

#[tokio::test]
async fn handoff_survives_a_restart() {
    let registry = ickb_registry();
    let block = header(0xbb, 200, AR_0);
    let receipt = receipt_cell(&registry, 0x50, 3, 1_000 * CKB, 1);
    let owner = owner_cell(&registry, 0x50, 4);
    let mut rpc = FakeRpc::new(header(0xaa, 300, AR_0), genesis());
    rpc.add_committed(receipt.clone(), &block);
    rpc.add_live(owner.clone());

    let path = std::env::temp_dir().join(format!("ickb-handoff-{}.json", std::process::id()));
    DepositHandoff::new(&[receipt.out_point.clone()], &owner.out_point).save(&path).unwrap();
    let handoff = DepositHandoff::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let draft = build_phase_two(&handoff, &rpc, &registry, &ValueOracle::default()).await.unwrap();

    assert_eq!(draft.inputs().len(), 2);
    assert_eq!(draft.roles(), &[Role::IckbSudt]);
    assert_eq!(token_amount_from_bytes(&draft.outputs()[0].data).unwrap(), 1_000 * CKB as u128);
}

#[tokio::test]
async fn duplicate_handoff_inputs_are_rejected() {
    let registry = ickb_registry();
    let block = header(0xbb, 200, AR_0);
    let receipt = receipt_cell(&registry, 0x50, 3, 1_000 * CKB, 1);
    let owner = owner_cell(&registry, 0x50, 4);
    let mut rpc = FakeRpc::new(header(0xaa, 300, AR_0), genesis());
    rpc.add_committed(receipt.clone(), &block);
    rpc.add_live(owner.clone());

    let handoff = DepositHandoff::new(&[receipt.out_point.clone(), receipt.out_point.clone()], &owner.out_point);
    let err = build_phase_two(&handoff, &rpc, &registry, &ValueOracle::default()).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateInput(ref op) if op.ends_with("-3")));

    // owner cell given as one of the receipts
    let handoff = DepositHandoff::new(&[receipt.out_point.clone()], &receipt.out_point);
    let err = build_phase_two(&handoff, &rpc, &registry, &ValueOracle::default()).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateInput(_)));
    assert!(rpc.sent().is_empty());
}
