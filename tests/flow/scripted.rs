use ledgerbench::context::ContextExchange;
use ledgerbench::ledger::LedgerKind;
use ledgerbench::sequence::compute_sequence;
use ledgerbench::types::{AccountSet, ContractSource, Credential, Invocation, Topology, TxStatus, VmKind};
use ledgerbench::{ClientInstance, ClientOptions};
use serde_json::json;
use std::sync::Arc;

use crate::common::ScriptedLedger;

fn source() -> ContractSource {
    ContractSource {
        vm_kind: VmKind::Hvm,
        abi_raw: "{}".to_string(),
        bytecode: vec![1],
    }
}

async fn deployed_client(ledger: &Arc<ScriptedLedger>, topology: Topology) -> ClientInstance {
    let accounts = AccountSet::from_key_store(vec![Credential("k0".to_string())]);
    let mut client = ClientInstance::connect(ledger.clone(), topology, accounts, ClientOptions::default())
        .await
        .unwrap();
    client.deploy_contract(&source()).await.unwrap();
    client
}

#[tokio::test]
async fn test_sequences_follow_the_slot_formula() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::Ethereum));
    ledger.script().await.nonce = 40;
    let topology = Topology::new(3, 2, 1, 9);
    let mut client = deployed_client(&ledger, topology).await;

    for i in 0..3 {
        client.invoke(Invocation::new("put", vec![json!(i)])).await;
    }

    let script = ledger.script().await;
    let sequences: Vec<Option<u64>> = script.submitted.iter().map(|(sequence, _)| *sequence).collect();
    let expected: Vec<Option<u64>> = (0..3).map(|round| Some(compute_sequence(&topology, 40, round, 1))).collect();
    assert_eq!(sequences, expected);
    assert_eq!(expected, vec![Some(48), Some(57), Some(66)]);
}

#[tokio::test]
async fn test_ledger_ordered_kinds_submit_without_sequence() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::Xuperchain));
    ledger.script().await.nonce = 40;
    let mut client = deployed_client(&ledger, Topology::new(1, 0, 0, 1)).await;

    client.invoke(Invocation::new("put", vec![])).await;

    let script = ledger.script().await;
    assert_eq!(script.submitted, vec![(None, "put".to_string())]);
}

#[tokio::test]
async fn test_undecodable_return_still_confirms() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::FiscoBcos));
    {
        let mut script = ledger.script().await;
        script.receipt_ret = b"not json".to_vec();
        script.write_time = Some(1234);
    }
    let mut client = deployed_client(&ledger, Topology::new(1, 0, 0, 1)).await;

    let sent = client.invoke(Invocation::new("get", vec![])).await;
    let confirmed = client.confirm(sent).await;

    assert_eq!(confirmed.status, TxStatus::Confirm);
    assert!(confirmed.return_values.is_empty());
    assert_eq!(confirmed.write_time, 1234);
}

#[tokio::test]
async fn test_receipt_found_after_a_few_polls() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::FiscoBcos));
    {
        let mut script = ledger.script().await;
        script.receipt_ret = br#"["v"]"#.to_vec();
        script.receipt_delay_polls = 3;
    }
    let mut client = deployed_client(&ledger, Topology::new(1, 0, 0, 1)).await;

    let sent = client.invoke(Invocation::new("get", vec![])).await;
    let confirmed = client.confirm(sent).await;

    assert_eq!(confirmed.status, TxStatus::Confirm);
    assert_eq!(confirmed.return_values, vec![json!("v")]);
    assert_eq!(confirmed.write_time, 0);
    assert_eq!(ledger.script().await.poll_calls, 4);
}

#[tokio::test]
async fn test_receipt_never_found_is_unknown() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::FiscoBcos));
    ledger.script().await.receipt_delay_polls = u32::MAX;
    let mut client = deployed_client(&ledger, Topology::new(1, 0, 0, 1)).await;

    let sent = client.invoke(Invocation::new("get", vec![])).await;
    let unknown = client.confirm(sent).await;

    assert_eq!(unknown.status, TxStatus::Unknown);
    // retry budget of the scripted policy
    assert_eq!(ledger.script().await.poll_calls, 5);
    assert!(unknown.confirm_time > 0);
}

#[tokio::test]
async fn test_empty_correlation_id_is_a_failure() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::Fabric));
    ledger.script().await.id_override = Some(String::new());
    let mut client = deployed_client(&ledger, Topology::new(1, 0, 0, 1)).await;

    let result = client.invoke(Invocation::new("put", vec![])).await;
    assert_eq!(result.status, TxStatus::Failure);

    let unchanged = client.confirm(result.clone()).await;
    assert_eq!(unchanged, result);
    assert_eq!(ledger.script().await.poll_calls, 0);
}

#[tokio::test]
async fn test_rejected_submission_still_consumes_a_round() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::Fabric));
    let mut client = deployed_client(&ledger, Topology::new(1, 0, 0, 1)).await;
    ledger.script().await.reject_submissions = true;

    let result = client.invoke(Invocation::new("put", vec![])).await;
    assert_eq!(result.status, TxStatus::Failure);
    assert_eq!(client.round(), 1);

    ledger.script().await.reject_submissions = false;
    client.invoke(Invocation::new("put", vec![])).await;
    assert_eq!(ledger.script().await.submitted, vec![(Some(1), "put".to_string())]);
}

#[tokio::test]
async fn test_chain_counter_window() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::Hyperchain));
    let client = deployed_client(&ledger, Topology::new(1, 0, 0, 1)).await;
    {
        let mut script = ledger.script().await;
        script.height = 10;
        script.tx_counter = Some(1000);
    }
    let start = client.log_status().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    {
        let mut script = ledger.script().await;
        script.height = 14;
        script.tx_counter = Some(1400);
    }
    let end = client.log_status().await.unwrap();

    let throughput = client.statistic(start, end).await.unwrap();
    assert_eq!(throughput.block_count, 4);
    assert_eq!(throughput.tx_count, 400);
}

#[tokio::test]
async fn test_context_carries_scripted_contract() {
    let ledger = Arc::new(ScriptedLedger::new(LedgerKind::Ethereum));
    let client = deployed_client(&ledger, Topology::new(2, 0, 0, 2)).await;
    let context = client.get_context().unwrap();

    let mut peer = ClientInstance::connect(
        ledger.clone(),
        Topology::new(2, 1, 0, 2),
        AccountSet::from_key_store(vec![Credential("k0".to_string())]),
        ClientOptions::default(),
    )
    .await
    .unwrap();
    peer.set_context(&context).unwrap();

    assert_eq!(peer.contract().map(|c| c.address.as_str()), Some("0xscripted-contract"));
}
