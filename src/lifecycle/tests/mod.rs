
use std::sync::Arc;
use tokio::time::Duration;

use crate::ledger::{LedgerAdapter, LedgerKind, MemoryLedger, MemoryLedgerConfig, RetryPolicy, VerifyMode};
use crate::lifecycle::TransactionLifecycle;
use crate::types::{Contract, ContractSource, Credential, Invocation, Operation, Payload, Transfer, VmKind};

pub(crate) const FAST_RETRY: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1));

/// A memory ledger of `kind` with short retry budgets, its lifecycle, a deployed
/// contract and the deployer credential
pub(crate) async fn setup(kind: LedgerKind) -> (Arc<MemoryLedger>, TransactionLifecycle, Contract, Credential) {
    let mut policy = kind.policy();
    policy.confirm_retry = FAST_RETRY;
    if let VerifyMode::Lookup(_) = policy.verify {
        policy.verify = VerifyMode::Lookup(FAST_RETRY);
    }
    let ledger = Arc::new(MemoryLedger::new(MemoryLedgerConfig {
        kind,
        policy_override: Some(policy),
        ..MemoryLedgerConfig::default()
    }));
    let signer = ledger.new_credential().expect("credential");
    let source = ContractSource {
        vm_kind: VmKind::Evm,
        abi_raw: "[]".to_string(),
        bytecode: vec![1, 2, 3],
    };
    let contract = ledger.deploy(&source, &signer).await.expect("deploy");
    let lifecycle = TransactionLifecycle::new(ledger.clone());
    (ledger, lifecycle, contract, signer)
}

pub(crate) fn invoke(contract: &Contract, signer: &Credential, func: &str) -> Payload {
    Payload {
        operation: Operation::Invoke(Invocation::new(func, vec![serde_json::json!(1), serde_json::json!("a")])),
        contract: Some(contract.clone()),
        signer: signer.clone(),
        recipient: None,
        simulate: false,
        gas_price: None,
    }
}

pub(crate) fn transfer(signer: &Credential, recipient: &Credential, amount: i64) -> Payload {
    Payload {
        operation: Operation::Transfer(Transfer {
            from: "0".to_string(),
            to: "1".to_string(),
            amount,
            extra: String::new(),
        }),
        contract: None,
        signer: signer.clone(),
        recipient: Some(recipient.clone()),
        simulate: false,
        gas_price: None,
    }
}
