use std::time::Duration;

use ckb_types::{prelude::*, H256};
use ickb_builder::chain::{wait_for_commit, PollPolicy, TxStatus};
use ickb_builder::error::Error;

use crate::fixtures::*;

fn policy(attempts: u32) -> PollPolicy {
    PollPolicy { interval: Duration::from_millis(1000), attempts }
}

fn rpc(statuses: Vec<TxStatus>, fallback: TxStatus) -> FakeRpc {
    FakeRpc::new(header(0xaa, 10, AR_0), genesis()).with_statuses(statuses, fallback)
}

#[tokio::test]
async fn committed_after_pending_and_proposed() {
    let rpc = rpc(vec![TxStatus::Pending, TxStatus::Proposed], TxStatus::Committed);
    let clock = ManualClock::default();

    wait_for_commit(&rpc, &clock, policy(10), &H256([9u8; 32]).pack()).await.unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_millis(1000); 2]);
    assert_eq!(rpc.calls().len(), 3);
}

#[tokio::test]
async fn unknown_status_is_fatal() {
    let rpc = rpc(vec![TxStatus::Pending, TxStatus::Other("rejected".into())], TxStatus::Committed);
    let clock = ManualClock::default();

    let err = wait_for_commit(&rpc, &clock, policy(10), &H256([9u8; 32]).pack()).await.unwrap_err();

    assert!(matches!(err, Error::UnexpectedState(msg) if msg.contains("rejected")));
    assert_eq!(clock.sleeps().len(), 1);
}

#[tokio::test]
async fn retry_budget_exhaustion_times_out() {
    let rpc = rpc(Vec::new(), TxStatus::Pending);
    let clock = ManualClock::default();

    let err = wait_for_commit(&rpc, &clock, policy(4), &H256([9u8; 32]).pack()).await.unwrap_err();

    assert!(matches!(err, Error::Timeout { attempts: 4, .. }));
    assert_eq!(rpc.calls(), vec!["get_transaction"; 4]);
    // no sleep after the last query
    assert_eq!(clock.sleeps().len(), 3);
}

#[test]
fn default_policy_polls_every_second_for_two_minutes() {
    let policy = PollPolicy::default();
    assert_eq!(policy.interval, Duration::from_secs(1));
    assert_eq!(policy.attempts, 120);
}

#[tokio::test(start_paused = true)]
async fn wait_can_be_cancelled_by_timeout() {
    let rpc = rpc(Vec::new(), TxStatus::Pending);
    let tokio_clock = ickb_builder::chain::TokioClock;
    let hash = H256([9u8; 32]).pack();

    let wait = wait_for_commit(&rpc, &tokio_clock, PollPolicy::default(), &hash);
    let res = tokio::time::timeout(Duration::from_millis(2_500), wait).await;

    assert!(res.is_err());
    assert_eq!(rpc.calls().len(), 3);
}
