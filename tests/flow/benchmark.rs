use futures::future::join_all;
use ledgerbench::context::ContextExchange;
use ledgerbench::ledger::{LedgerAdapter, LedgerKind, MemoryLedger, MemoryLedgerConfig, RetryPolicy};
use ledgerbench::types::{
    AccountSet, ContractSource, Credential, Invocation, Topology, TxResult, TxStatus, VmKind,
};
use ledgerbench::{ClientInstance, ClientOptions, TransactionLifecycle};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const WORKERS: u64 = 2;
const VMS_PER_WORKER: u64 = 3;
const CAPACITY: u64 = WORKERS * VMS_PER_WORKER;
const OPS_PER_VM: usize = 4;

fn kv_store() -> ContractSource {
    ContractSource {
        vm_kind: VmKind::Evm,
        abi_raw: r#"[{"name":"put","type":"function"},{"name":"get","type":"function"}]"#.to_string(),
        bytecode: vec![0x60, 0x80],
    }
}

fn memory_ledger(kind: LedgerKind) -> Arc<MemoryLedger> {
    let mut policy = kind.policy();
    policy.confirm_retry = RetryPolicy::new(5, Duration::from_millis(1));
    Arc::new(MemoryLedger::new(MemoryLedgerConfig {
        kind,
        policy_override: Some(policy),
        ..MemoryLedgerConfig::default()
    }))
}

fn key_store(ledger: &MemoryLedger) -> AccountSet {
    let credentials: Vec<Credential> = (0..2).map(|_| ledger.new_credential().unwrap()).collect();
    AccountSet::from_key_store(credentials)
}

/// Connects every VM of the run before the deploy, so all observe the same nonce.
async fn connect_vms(ledger: &Arc<MemoryLedger>, accounts: &AccountSet) -> Vec<ClientInstance> {
    let mut clients = Vec::new();
    for worker in 0..WORKERS {
        for vm in 0..VMS_PER_WORKER {
            let topology = Topology::new(WORKERS, worker, vm, CAPACITY);
            let mut client =
                ClientInstance::connect(ledger.clone(), topology, accounts.clone(), ClientOptions::default())
                    .await
                    .unwrap();
            clients.push(client);
        }
    }
    clients
}

#[tokio::test]
async fn test_full_benchmark_round_trip() {
    let ledger = memory_ledger(LedgerKind::Ethereum);
    let accounts = key_store(&ledger);

    let mut coordinator = ClientInstance::connect(
        ledger.clone(),
        Topology::new(WORKERS, 0, 0, CAPACITY),
        accounts.clone(),
        ClientOptions::default(),
    )
    .await
    .unwrap();
    let mut clients = connect_vms(&ledger, &accounts).await;
    assert!(clients.iter().all(|client| client.contract().is_none()));

    coordinator.deploy_contract(&kv_store()).await.unwrap();
    let context = coordinator.get_context().unwrap();
    assert!(!context.is_empty());
    for client in &mut clients {
        client.set_context(&context).unwrap();
    }
    ledger.seal_block().await;
    ledger.seal_block().await;
    let start = coordinator.log_status().await.unwrap();

    let tasks = clients.into_iter().map(|mut client| {
        tokio::spawn(async move {
            let mut results = Vec::new();
            for i in 0..OPS_PER_VM {
                let invocation = Invocation::new("put", vec![json!(format!("k{}", i)), json!(i)]);
                results.push(client.invoke(invocation).await);
            }
            (client, results)
        })
    });
    let finished: Vec<(ClientInstance, Vec<TxResult>)> =
        join_all(tasks).await.into_iter().map(|joined| joined.unwrap()).collect();

    let total = (CAPACITY as usize) * OPS_PER_VM;
    let mut ids = HashSet::new();
    for (_, results) in &finished {
        for result in results {
            assert_eq!(result.status, TxStatus::Success);
            ids.insert(result.correlation_id.clone());
        }
    }
    assert_eq!(ids.len(), total);

    ledger.seal_block().await;
    for (client, results) in finished {
        for result in results {
            let confirmed = client.confirm(result).await;
            assert_eq!(confirmed.status, TxStatus::Confirm);
            assert!(confirmed.confirm_time >= confirmed.send_time);
            assert!(confirmed.write_time > 0);
        }
    }

    // [start, end) covers the block holding every invocation
    ledger.seal_block().await;
    let end = coordinator.log_status().await.unwrap();
    let throughput = coordinator.statistic(start, end).await.unwrap();
    assert_eq!(throughput.block_count, 2);
    assert_eq!(throughput.tx_count, total as u64);
    assert!(throughput.tx_per_sec > 0.0);

    // deploy consumed nonce 0, every invocation one of 1..=24
    let signer = accounts.get("0").unwrap();
    assert_eq!(ledger.pending_nonce(signer).await.unwrap(), total as u64 + 1);
}

#[tokio::test]
async fn test_overlapping_placements_collide_on_the_ledger() {
    let ledger = memory_ledger(LedgerKind::FiscoBcos);
    // worker 0 vm 0 of a two-worker run takes base + 0; a stray submitter reuses it
    let accounts = key_store(&ledger);
    let mut deployer =
        ClientInstance::connect(ledger.clone(), Topology::new(1, 0, 0, 1), accounts.clone(), ClientOptions::default())
            .await
            .unwrap();
    deployer.deploy_contract(&kv_store()).await.unwrap();
    let context = deployer.get_context().unwrap();

    let mut client =
        ClientInstance::connect(ledger.clone(), Topology::new(2, 0, 0, 4), accounts.clone(), ClientOptions::default())
            .await
            .unwrap();
    client.set_context(&context).unwrap();
    let first = client.invoke(Invocation::new("put", vec![json!("a")])).await;
    assert_eq!(first.status, TxStatus::Success);

    let payload = ledgerbench::types::Payload {
        operation: ledgerbench::types::Operation::Invoke(Invocation::new("put", vec![json!("b")])),
        contract: client.contract().cloned(),
        signer: accounts.get("0").unwrap().clone(),
        recipient: None,
        simulate: false,
        gas_price: None,
    };
    let base = ledger.pending_nonce(accounts.get("0").unwrap()).await.unwrap() - 1;
    let lifecycle = TransactionLifecycle::new(ledger.clone());
    let second = lifecycle.submit(Some(base), &payload).await;
    assert_eq!(second.status, TxStatus::Failure);
    assert!(!second.correlation_id.is_valid());
}

#[tokio::test]
async fn test_transfers_confirm_with_raw_return() {
    let ledger = memory_ledger(LedgerKind::Fabric);
    let accounts = key_store(&ledger);
    let options = ClientOptions {
        account: "1".to_string(),
        ..ClientOptions::default()
    };
    let mut client = ClientInstance::connect(ledger.clone(), Topology::new(1, 0, 0, 1), accounts, options)
        .await
        .unwrap();

    let sent = client
        .transfer(ledgerbench::types::Transfer {
            from: "1".to_string(),
            to: "fresh".to_string(),
            amount: 7,
            extra: String::new(),
        })
        .await;
    assert_eq!(sent.status, TxStatus::Success);
    ledger.seal_block().await;
    let result = client.confirm(sent).await;

    assert_eq!(result.status, TxStatus::Confirm);
    assert_eq!(result.return_values, vec![json!("7")]);
    assert!(client.accounts().contains("fresh"));
}
