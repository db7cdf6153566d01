use async_trait::async_trait;
use ledgerbench::ledger::{LedgerAdapter, LedgerError, LedgerKind, LedgerPolicy, Receipt, RetryPolicy, TxInfo};
use ledgerbench::types::{Contract, ContractSource, CorrelationId, Credential, Payload};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// What the scripted ledger answers
#[derive(Debug, Default)]
pub struct Script {
    /// Every accepted submission: sequence and label
    pub submitted: Vec<(Option<u64>, String)>,
    pub reject_submissions: bool,
    /// Correlation id handed out instead of a generated one
    pub id_override: Option<String>,
    /// Raw return data of every receipt
    pub receipt_ret: Vec<u8>,
    /// Polls that answer "not found" before the receipt shows up
    pub receipt_delay_polls: u32,
    pub poll_calls: u32,
    pub write_time: Option<i64>,
    pub height: u64,
    pub block_tx_counts: HashMap<u64, u64>,
    pub tx_counter: Option<u64>,
    pub nonce: u64,
}

/// Ledger adapter that answers from a script and records what it was asked
pub struct ScriptedLedger {
    policy: LedgerPolicy,
    script: Mutex<Script>,
}

impl ScriptedLedger {
    pub fn new(kind: LedgerKind) -> Self {
        let mut policy = kind.policy();
        policy.confirm_retry = RetryPolicy::new(5, Duration::from_millis(1));
        Self {
            policy,
            script: Mutex::new(Script::default()),
        }
    }

    pub async fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().await
    }
}

#[async_trait]
impl LedgerAdapter for ScriptedLedger {
    fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    async fn build_and_submit(&self, sequence: Option<u64>, payload: &Payload) -> Result<CorrelationId, LedgerError> {
        let mut script = self.script.lock().await;
        if script.reject_submissions {
            return Err(LedgerError::Rejected("scripted rejection".to_string()));
        }
        script.submitted.push((sequence, payload.operation.label().to_string()));
        let id = script
            .id_override
            .clone()
            .unwrap_or_else(|| format!("0xscripted{}", script.submitted.len()));
        Ok(CorrelationId(id))
    }

    async fn poll_receipt(&self, id: &CorrelationId) -> Result<Option<Receipt>, LedgerError> {
        let mut script = self.script.lock().await;
        script.poll_calls += 1;
        if script.poll_calls <= script.receipt_delay_polls {
            return Ok(None);
        }
        Ok(Some(Receipt {
            correlation_id: id.clone(),
            ret: script.receipt_ret.clone(),
            block_height: script.height,
        }))
    }

    async fn query_by_id(&self, id: &CorrelationId) -> Result<TxInfo, LedgerError> {
        let script = self.script.lock().await;
        Ok(TxInfo {
            correlation_id: id.clone(),
            block_height: script.height,
            block_write_time: script.write_time,
        })
    }

    async fn query_height(&self) -> Result<u64, LedgerError> {
        Ok(self.script.lock().await.height)
    }

    async fn block_tx_count(&self, height: u64) -> Result<u64, LedgerError> {
        Ok(self.script.lock().await.block_tx_counts.get(&height).copied().unwrap_or(0))
    }

    async fn query_tx_count(&self) -> Result<Option<u64>, LedgerError> {
        Ok(self.script.lock().await.tx_counter)
    }

    async fn pending_nonce(&self, _signer: &Credential) -> Result<u64, LedgerError> {
        Ok(self.script.lock().await.nonce)
    }

    async fn deploy(&self, source: &ContractSource, _deployer: &Credential) -> Result<Contract, LedgerError> {
        Ok(Contract::new(source.vm_kind, "0xscripted-contract", source.abi_raw.clone()))
    }

    fn prepare_contract(&self, _contract: &Contract) -> Result<(), LedgerError> {
        Ok(())
    }

    fn new_credential(&self) -> Result<Credential, LedgerError> {
        Ok(Credential("scripted-key".to_string()))
    }

    fn decode_return(&self, label: &str, raw: &[u8]) -> Result<Vec<Value>, LedgerError> {
        serde_json::from_slice(raw).map_err(|e| LedgerError::Decode {
            label: label.to_string(),
            reason: e.to_string(),
        })
    }
}
