use ckb_types::{
    core::DepType,
    packed::{Transaction, WitnessArgs},
    prelude::*,
};
use ickb_builder::ckb_utils::{pack_receipt, ValueOracle};
use ickb_builder::config::{DAO, ICKB_DOMAIN_LOGIC};
use ickb_builder::deposit::{default_deposit_amount, run_phase_one, DepositRequest};
use ickb_builder::error::Error;
use ickb_builder::submit::Submitter;
use ickb_builder::types::*;

use crate::fixtures::*;

struct Env {
    rpc: FakeRpc,
    collector: VecCollector,
    clock: ManualClock,
    registry: ickb_builder::config::ScriptRegistry,
    signer: ickb_builder::ckb_utils::Secp256k1Signer,
}

fn env(tip_ar: u64) -> Env {
    let registry = ickb_registry();
    let signer = test_signer(&registry);
    let lock = signer_lock(&registry);
    Env {
        rpc: FakeRpc::new(header(0xaa, 100, tip_ar), genesis()),
        collector: VecCollector::new(plain_cells(&lock, 10, 100_000, 0x10)),
        clock: ManualClock::default(),
        registry,
        signer,
    }
}

impl Env {
    fn submitter(&self) -> Submitter<'_> {
        Submitter::new(&self.rpc, &self.collector, &self.signer, &self.registry, &self.clock, fast_config())
    }
}

fn capacity(tx: &Transaction, index: usize) -> u64 {
    tx.raw().outputs().get(index).unwrap().capacity().unpack()
}

#[tokio::test]
async fn quantity_over_limit_fails_before_any_rpc() {
    let env = env(AR_0);
    let request = DepositRequest { amount: 1_000 * CKB, quantity: 62 };

    let err = run_phase_one(&env.submitter(), request, &ValueOracle::default(), true).await.unwrap_err();

    assert!(matches!(err, Error::Limit { value: 62, max: 61, .. }));
    assert!(env.rpc.calls().is_empty());
    assert_eq!(env.collector.queries(), 0);
}

#[tokio::test]
async fn phase_one_emits_deposits_receipt_and_owner_cell() {
    let env = env(AR_0);
    let request = DepositRequest::new(1_000 * CKB, 3).unwrap();

    let (submitted, handoff) = run_phase_one(&env.submitter(), request, &ValueOracle::default(), true).await.unwrap();

    let sent = env.rpc.sent();
    assert_eq!(sent.len(), 1);
    let tx = sent[0].data();
    let outputs = tx.raw().outputs();
    let outputs_data = tx.raw().outputs_data();
    assert_eq!(outputs.len(), 3 + 2 + 1);

    let ickb_logic = env.registry.script(ICKB_DOMAIN_LOGIC).unwrap();
    let dao = env.registry.script(DAO).unwrap();
    for i in 0..3 {
        let deposit = outputs.get(i).unwrap();
        assert_eq!(capacity(&tx, i), 1_082 * CKB);
        assert_eq!(deposit.lock().as_slice(), ickb_logic.as_slice());
        assert_eq!(deposit.type_().to_opt().unwrap().as_slice(), dao.as_slice());
        assert_eq!(outputs_data.get(i).unwrap().raw_data().as_ref(), &[0u8; 8]);
    }

    let receipt = outputs.get(3).unwrap();
    assert_eq!(capacity(&tx, 3), RECEIPT_CELL_CKB * CKB);
    assert_eq!(receipt.lock().as_slice(), signer_lock(&env.registry).as_slice());
    assert_eq!(receipt.type_().to_opt().unwrap().as_slice(), ickb_logic.as_slice());
    let packed = pack_receipt(1_000 * CKB, 3).unwrap();
    assert_eq!(outputs_data.get(3).unwrap().raw_data().as_ref(), &packed.to_le_bytes());

    let owner = outputs.get(4).unwrap();
    assert_eq!(capacity(&tx, 4), OWNER_LOCK_CELL_CKB * CKB);
    assert_eq!(owner.lock().as_slice(), ickb_logic.as_slice());
    assert!(owner.type_().to_opt().is_none());

    // every script resolves through the one dep group
    let deps = tx.raw().cell_deps();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps.get(0).unwrap().out_point().as_slice(), dep_group_out_point().as_slice());
    assert_eq!(deps.get(0).unwrap().dep_type().as_slice(), &[DepType::DepGroup as u8]);

    // funding inputs share one lock: one signature, then empty locks
    let witnesses = tx.witnesses();
    assert_eq!(witnesses.len(), tx.raw().inputs().len());
    let lock_len = |i: usize| {
        let args = WitnessArgs::from_slice(&witnesses.get(i).unwrap().raw_data()).unwrap();
        args.lock().to_opt().unwrap().raw_data().len()
    };
    assert_eq!(lock_len(0), SIGNATURE_SIZE);
    for i in 1..witnesses.len() {
        assert_eq!(lock_len(i), 0);
    }

    let receipts = handoff.receipts();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].tx_hash().as_slice(), submitted.tx_hash.as_slice());
    let receipt_index: u32 = receipts[0].index().unpack();
    let owner_index: u32 = handoff.owner_lock().index().unpack();
    assert_eq!((receipt_index, owner_index), (3, 4));
    assert_eq!(submitted.out_points.get(Role::Deposit).len(), 3);

    assert_eq!(env.rpc.calls(), vec!["get_tip_header", "send_transaction", "get_transaction"]);
}

#[tokio::test]
async fn full_quantity_fits_dao_output_limit() {
    let env = env(AR_0);
    let request = DepositRequest::new(1_000 * CKB, MAX_DEPOSIT_QUANTITY).unwrap();

    let (submitted, _) = run_phase_one(&env.submitter(), request, &ValueOracle::default(), true).await.unwrap();

    assert_eq!(submitted.out_points.get(Role::Deposit).len(), 61);
    assert_eq!(env.rpc.sent()[0].outputs().len(), DAO_OUTPUT_LIMIT);
}

#[tokio::test]
async fn deposit_above_soft_cap_is_refused() {
    let env = env(AR_0);
    let request = DepositRequest::new(200_000 * CKB, 1).unwrap();

    let err = run_phase_one(&env.submitter(), request, &ValueOracle::default(), true).await.unwrap_err();

    assert!(matches!(err, Error::DepositTooLarge { .. }));
    assert!(env.rpc.sent().is_empty());
}

#[tokio::test]
async fn soft_cap_check_can_be_skipped() {
    let env = env(AR_0);
    let request = DepositRequest::new(200_000 * CKB, 1).unwrap();

    run_phase_one(&env.submitter(), request, &ValueOracle::default(), false).await.unwrap();

    assert!(!env.rpc.calls().contains(&"get_tip_header"));
    assert_eq!(env.rpc.sent().len(), 1);
}

#[tokio::test]
async fn default_amount_sits_at_the_soft_cap() {
    let env = env(AR_0 + AR_0 / 10);
    let oracle = ValueOracle::default();

    let amount = default_deposit_amount(&env.rpc, &oracle).await.unwrap();
    assert_eq!(amount as u128, ICKB_SOFT_CAP_PER_DEPOSIT * 11 / 10 + 1);

    let request = DepositRequest::new(amount, 1).unwrap();
    run_phase_one(&env.submitter(), request, &oracle, true).await.unwrap();
    assert_eq!(env.rpc.sent().len(), 1);
}

#[tokio::test]
async fn default_amount_passes_the_check_at_genesis_rate() {
    let env = env(AR_0);
    let oracle = ValueOracle::default();

    let amount = default_deposit_amount(&env.rpc, &oracle).await.unwrap();
    assert_eq!(amount as u128, ICKB_SOFT_CAP_PER_DEPOSIT);

    let request = DepositRequest::new(amount, 1).unwrap();
    run_phase_one(&env.submitter(), request, &oracle, true).await.unwrap();
    assert_eq!(env.rpc.sent().len(), 1);
}
