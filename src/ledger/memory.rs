use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::{LedgerAdapter, LedgerError, LedgerKind, LedgerPolicy, Receipt, TxInfo};
use crate::types::{Contract, ContractSource, CorrelationId, Credential, Operation, Payload, VmKind};
use crate::utils::clock;

const HEX_CHARS: &[u8] = b"abcdef0123456789";

/// Settings of an in-process ledger
#[derive(Debug, Clone)]
pub struct MemoryLedgerConfig {
    /// Ledger family whose conventions the in-process ledger follows
    pub kind: LedgerKind,
    /// Time between two sealed blocks when block production runs
    pub block_interval: Duration,
    /// Maximum transactions per block, 0 for unbounded
    pub max_block_size: usize,
    /// Replaces the preset policy of `kind` (tighter retries in tests)
    pub policy_override: Option<LedgerPolicy>,
}

impl Default for MemoryLedgerConfig {
    fn default() -> Self {
        Self {
            kind: LedgerKind::Ethereum,
            block_interval: Duration::from_millis(100),
            max_block_size: 0,
            policy_override: None,
        }
    }
}

/// A sealed block
#[derive(Debug, Clone)]
struct Block {
    transactions: Vec<CorrelationId>,
    write_time: i64,
}

/// A transaction the ledger accepted
#[derive(Debug, Clone)]
struct TxRecord {
    ret: Vec<u8>,
    /// Height of the including block, `None` while pending
    block_height: Option<u64>,
}

/// The internal state of the MemoryLedger
struct LedgerState {
    /// Sealed blocks, `blocks[0]` is the empty genesis block
    blocks: Vec<Block>,
    /// Accepted transactions waiting for the next block
    pending: Vec<CorrelationId>,
    transactions: HashMap<CorrelationId, TxRecord>,
    /// Sequences already taken, per signer
    used_sequences: HashMap<Credential, HashSet<u64>>,
    /// Lowest sequence no transaction of the signer has used yet
    next_nonce: HashMap<Credential, u64>,
    /// Deployed contracts by address
    contracts: HashMap<String, Contract>,
    /// Number of committed transactions
    tx_counter: u64,
    next_id: u64,
    /// When set, every submission is rejected with this reason
    reject_reason: Option<String>,
    /// When set, every call fails as if the node were down
    unreachable: bool,
}

/// In-process ledger implementing `LedgerAdapter`.
///
/// Deduplicates sequences per signer (a reused sequence is rejected), keeps accepted
/// transactions pending until a block is sealed, and hands out receipts only for
/// sealed transactions. Used by the simulator and by tests; faults can be injected.
pub struct MemoryLedger {
    config: MemoryLedgerConfig,
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(config: MemoryLedgerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LedgerState {
                blocks: vec![Block {
                    transactions: Vec::new(),
                    write_time: clock::now_nanos(),
                }],
                pending: Vec::new(),
                transactions: HashMap::new(),
                used_sequences: HashMap::new(),
                next_nonce: HashMap::new(),
                contracts: HashMap::new(),
                tx_counter: 0,
                next_id: 0,
                reject_reason: None,
                unreachable: false,
            }),
        }
    }

    pub fn with_kind(kind: LedgerKind) -> Self {
        Self::new(MemoryLedgerConfig {
            kind,
            ..MemoryLedgerConfig::default()
        })
    }

    pub fn config(&self) -> &MemoryLedgerConfig {
        &self.config
    }

    /// Seals the pending transactions into a new block and returns its height.
    pub async fn seal_block(&self) -> u64 {
        let mut state = self.state.lock().await;
        let take = if self.config.max_block_size == 0 {
            state.pending.len()
        } else {
            state.pending.len().min(self.config.max_block_size)
        };
        let included: Vec<CorrelationId> = state.pending.drain(..take).collect();
        let height = state.blocks.len() as u64;
        for id in &included {
            if let Some(record) = state.transactions.get_mut(id) {
                record.block_height = Some(height);
            }
        }
        state.tx_counter += included.len() as u64;
        tracing::debug!("Sealed block {} with {} transactions", height, included.len());
        state.blocks.push(Block {
            transactions: included,
            write_time: clock::now_nanos(),
        });
        height
    }

    /// Number of accepted transactions not yet in a block
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Starts sealing a block every `block_interval` while transactions are pending.
    /// Abort the returned handle to stop.
    pub fn start_block_production(self: &Arc<Self>) -> JoinHandle<()> {
        let ledger = Arc::clone(self);
        tokio::spawn(async move {
            // tokio intervals cannot tick at zero
            let mut ticker = interval(ledger.config.block_interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if ledger.pending_count().await > 0 {
                    ledger.seal_block().await;
                }
            }
        })
    }

    /// Rejects every following submission with `reason` (`None` to stop).
    pub async fn reject_submissions(&self, reason: Option<String>) {
        self.state.lock().await.reject_reason = reason;
    }

    /// Makes every following call fail as if the node were unreachable.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    /// Drops every trace of an accepted transaction, as if the ledger lost it.
    pub async fn lose_transaction(&self, id: &CorrelationId) -> bool {
        let mut state = self.state.lock().await;
        state.pending.retain(|pending| pending != id);
        state.transactions.remove(id).is_some()
    }

    fn check_reachable(state: &LedgerState) -> Result<(), LedgerError> {
        if state.unreachable {
            return Err(LedgerError::Unreachable("memory ledger is offline".to_string()));
        }
        Ok(())
    }

    fn next_correlation_id(state: &mut LedgerState) -> CorrelationId {
        let id = state.next_id;
        state.next_id += 1;
        CorrelationId(format!("0x{:016x}{}", id, random_hex(48)))
    }

    /// Reserves `sequence` for `signer`, failing if it was used before.
    fn take_sequence(state: &mut LedgerState, signer: &Credential, sequence: u64) -> Result<(), LedgerError> {
        let used = state.used_sequences.entry(signer.clone()).or_default();
        if !used.insert(sequence) {
            return Err(LedgerError::Rejected(format!("sequence {} already used", sequence)));
        }
        let next = state.next_nonce.entry(signer.clone()).or_insert(0);
        if sequence >= *next {
            *next = sequence.wrapping_add(1);
        }
        Ok(())
    }

    /// Hands out the signer's next unused sequence.
    fn assign_sequence(state: &mut LedgerState, signer: &Credential) -> u64 {
        let mut sequence = state.next_nonce.get(signer).copied().unwrap_or(0);
        let used = state.used_sequences.entry(signer.clone()).or_default();
        while used.contains(&sequence) {
            sequence = sequence.wrapping_add(1);
        }
        used.insert(sequence);
        state.next_nonce.insert(signer.clone(), sequence.wrapping_add(1));
        sequence
    }

    fn execute(state: &LedgerState, payload: &Payload) -> Result<Vec<u8>, LedgerError> {
        if payload.gas_price == Some(0) {
            return Err(LedgerError::Rejected("gas price too low".to_string()));
        }
        match &payload.operation {
            Operation::Invoke(invocation) => {
                let contract = payload
                    .contract
                    .as_ref()
                    .ok_or_else(|| LedgerError::Rejected("invocation without contract".to_string()))?;
                if !state.contracts.contains_key(&contract.address) {
                    return Err(LedgerError::Rejected(format!("no contract at {}", contract.address)));
                }
                serde_json::to_vec(&invocation.args).map_err(|e| LedgerError::Internal(e.to_string()))
            }
            Operation::Transfer(transfer) => {
                if transfer.amount < 0 {
                    return Err(LedgerError::Rejected(format!("negative amount {}", transfer.amount)));
                }
                if payload.recipient.is_none() {
                    return Err(LedgerError::Rejected(format!("unknown recipient {}", transfer.to)));
                }
                Ok(transfer.amount.to_string().into_bytes())
            }
        }
    }
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX_CHARS[rng.gen_range(0..HEX_CHARS.len())] as char)
        .collect()
}

#[async_trait]
impl LedgerAdapter for MemoryLedger {
    fn policy(&self) -> LedgerPolicy {
        self.config
            .policy_override
            .unwrap_or_else(|| self.config.kind.policy())
    }

    async fn build_and_submit(&self, sequence: Option<u64>, payload: &Payload) -> Result<CorrelationId, LedgerError> {
        let mut state = self.state.lock().await;
        Self::check_reachable(&state)?;
        if let Some(reason) = &state.reject_reason {
            return Err(LedgerError::Rejected(reason.clone()));
        }
        let ret = Self::execute(&state, payload)?;
        let id = Self::next_correlation_id(&mut state);

        if payload.simulate {
            // executed but never committed
            let height = state.blocks.len() as u64 - 1;
            state.transactions.insert(id.clone(), TxRecord { ret, block_height: Some(height) });
            return Ok(id);
        }

        match sequence {
            Some(sequence) => Self::take_sequence(&mut state, &payload.signer, sequence)?,
            None => {
                Self::assign_sequence(&mut state, &payload.signer);
            }
        }
        state.transactions.insert(id.clone(), TxRecord { ret, block_height: None });
        state.pending.push(id.clone());
        Ok(id)
    }

    async fn poll_receipt(&self, id: &CorrelationId) -> Result<Option<Receipt>, LedgerError> {
        let state = self.state.lock().await;
        Self::check_reachable(&state)?;
        Ok(state.transactions.get(id).and_then(|record| {
            record.block_height.map(|block_height| Receipt {
                correlation_id: id.clone(),
                ret: record.ret.clone(),
                block_height,
            })
        }))
    }

    async fn query_by_id(&self, id: &CorrelationId) -> Result<TxInfo, LedgerError> {
        let state = self.state.lock().await;
        Self::check_reachable(&state)?;
        let record = state
            .transactions
            .get(id)
            .ok_or_else(|| LedgerError::TransactionNotFound(id.clone()))?;
        let block_height = record
            .block_height
            .ok_or_else(|| LedgerError::TransactionNotFound(id.clone()))?;
        Ok(TxInfo {
            correlation_id: id.clone(),
            block_height,
            block_write_time: state.blocks.get(block_height as usize).map(|block| block.write_time),
        })
    }

    async fn query_height(&self) -> Result<u64, LedgerError> {
        let state = self.state.lock().await;
        Self::check_reachable(&state)?;
        Ok(state.blocks.len() as u64 - 1)
    }

    async fn block_tx_count(&self, height: u64) -> Result<u64, LedgerError> {
        let state = self.state.lock().await;
        Self::check_reachable(&state)?;
        state
            .blocks
            .get(height as usize)
            .map(|block| block.transactions.len() as u64)
            .ok_or(LedgerError::BlockNotFound(height))
    }

    async fn query_tx_count(&self) -> Result<Option<u64>, LedgerError> {
        let state = self.state.lock().await;
        Self::check_reachable(&state)?;
        Ok(Some(state.tx_counter))
    }

    async fn pending_nonce(&self, signer: &Credential) -> Result<u64, LedgerError> {
        let state = self.state.lock().await;
        Self::check_reachable(&state)?;
        Ok(state.next_nonce.get(signer).copied().unwrap_or(0))
    }

    async fn deploy(&self, source: &ContractSource, deployer: &Credential) -> Result<Contract, LedgerError> {
        let mut state = self.state.lock().await;
        Self::check_reachable(&state)?;
        if source.bytecode.is_empty() && matches!(source.vm_kind, VmKind::Evm | VmKind::Fvm) {
            return Err(LedgerError::InvalidContract("empty bytecode".to_string()));
        }
        let address = format!("0x{:040x}", state.contracts.len() as u64 + 1);
        let contract = Contract::new(source.vm_kind, address.clone(), source.abi_raw.clone());
        self.prepare_contract(&contract)?;
        let sequence = Self::assign_sequence(&mut state, deployer);
        state.contracts.insert(address, contract.clone());
        tracing::debug!("Deployed {} contract at {} with sequence {}", contract.vm_kind, contract.address, sequence);
        Ok(contract)
    }

    fn prepare_contract(&self, contract: &Contract) -> Result<(), LedgerError> {
        if contract.address.is_empty() {
            return Err(LedgerError::InvalidContract("empty address".to_string()));
        }
        match contract.vm_kind {
            VmKind::Evm | VmKind::Hvm | VmKind::Fvm => {
                serde_json::from_str::<Value>(&contract.abi_raw)
                    .map(|_| ())
                    .map_err(|e| LedgerError::InvalidContract(format!("cannot parse abi: {}", e)))
            }
            VmKind::Jvm | VmKind::Bvm | VmKind::Kvsql | VmKind::Native => Ok(()),
        }
    }

    fn new_credential(&self) -> Result<Credential, LedgerError> {
        Ok(Credential(random_hex(64)))
    }

    fn decode_return(&self, label: &str, raw: &[u8]) -> Result<Vec<Value>, LedgerError> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice::<Vec<Value>>(raw).map_err(|e| LedgerError::Decode {
            label: label.to_string(),
            reason: e.to_string(),
        })
    }
}
