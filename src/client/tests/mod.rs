
use std::sync::Arc;

use crate::client::{ClientInstance, ClientOptions};
use crate::ledger::{LedgerAdapter, LedgerKind, MemoryLedger};
use crate::types::{AccountSet, ContractSource, Credential, Topology, VmKind};

pub(crate) fn evm_source() -> ContractSource {
    ContractSource {
        vm_kind: VmKind::Evm,
        abi_raw: r#"[{"name":"put","type":"function"}]"#.to_string(),
        bytecode: vec![0xfe],
    }
}

/// Key store with accounts "0" and "1"
pub(crate) fn key_store(ledger: &MemoryLedger) -> AccountSet {
    let credentials: Vec<Credential> = (0..2).map(|_| ledger.new_credential().unwrap()).collect();
    AccountSet::from_key_store(credentials)
}

pub(crate) async fn client(
    ledger: &Arc<MemoryLedger>,
    topology: Topology,
    accounts: AccountSet,
) -> ClientInstance {
    ClientInstance::connect(ledger.clone(), topology, accounts, ClientOptions::default())
        .await
        .expect("client should connect")
}

pub(crate) fn ledger(kind: LedgerKind) -> Arc<MemoryLedger> {
    Arc::new(MemoryLedger::with_kind(kind))
}
