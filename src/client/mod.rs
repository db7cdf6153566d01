use std::sync::Arc;
use thiserror::Error;

use crate::context::{ContextError, ContextExchange, ContextMessage};
use crate::ledger::{LedgerAdapter, LedgerError, LedgerPolicy};
use crate::lifecycle::TransactionLifecycle;
use crate::sequence::SequenceAllocator;
use crate::statistics::{self, StatisticsError, StatisticsWindow};
use crate::types::{
    AccountSet, Contract, ContractSource, Credential, Invocation, Operation, Payload, StatisticSample,
    Throughput, Topology, TopologyError, Transfer, TxResult, BUILTIN_TRANSFER_LABEL,
};
use crate::utils::clock;

pub mod options;
pub use options::{ClientOptions, OptionsError};

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("Invalid options: {0}")]
    Options(#[from] OptionsError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
    #[error("Statistics error: {0}")]
    Statistics(#[from] StatisticsError),
    #[error("Unknown account: {0}")]
    UnknownAccount(String),
}

/// One VM's client: its place in the run, its private sequence allocator and the
/// contract and accounts it works with.
///
/// Owned by exactly one VM task. Only the adapter behind it is shared.
pub struct ClientInstance {
    topology: Topology,
    adapter: Arc<dyn LedgerAdapter>,
    policy: LedgerPolicy,
    lifecycle: TransactionLifecycle,
    allocator: SequenceAllocator,
    options: ClientOptions,
    contract: Option<Contract>,
    accounts: AccountSet,
}

impl ClientInstance {
    /// Validates the placement and options, then observes the signing account's
    /// nonce once. Every allocated sequence derives from that observation.
    pub async fn connect(
        adapter: Arc<dyn LedgerAdapter>,
        topology: Topology,
        accounts: AccountSet,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        topology.validate()?;
        options.validate()?;
        let policy = adapter.policy();
        let signer = accounts
            .get(&options.account)
            .ok_or_else(|| ClientError::UnknownAccount(options.account.clone()))?;
        let base_nonce = if policy.uses_client_sequence {
            adapter.pending_nonce(signer).await?
        } else {
            0
        };
        tracing::debug!(
            "Client worker {}/{} vm {} starts at nonce {}",
            topology.worker_index, topology.worker_count, topology.vm_index, base_nonce
        );
        Ok(Self {
            topology,
            lifecycle: TransactionLifecycle::new(Arc::clone(&adapter)),
            adapter,
            policy,
            allocator: SequenceAllocator::new(topology, base_nonce),
            options,
            contract: None,
            accounts,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    pub fn contract(&self) -> Option<&Contract> {
        self.contract.as_ref()
    }

    pub fn accounts(&self) -> &AccountSet {
        &self.accounts
    }

    /// Sequences handed out by the allocator so far
    pub fn round(&self) -> u64 {
        self.allocator.round()
    }

    /// Replaces the options after validating them.
    pub fn set_options(&mut self, options: ClientOptions) -> Result<(), ClientError> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    /// Deploys `source` signed by the configured account and keeps the handle.
    pub async fn deploy_contract(&mut self, source: &ContractSource) -> Result<Contract, ClientError> {
        let deployer = self.signer()?.clone();
        let contract = self.adapter.deploy(source, &deployer).await?;
        tracing::info!("Deployed {} contract at {}", contract.vm_kind, contract.address);
        self.contract = Some(contract.clone());
        Ok(contract)
    }

    /// Calls a function of the current contract.
    pub async fn invoke(&mut self, invocation: Invocation) -> TxResult {
        let Some(contract) = self.contract.clone() else {
            tracing::warn!("Cannot invoke {}: no contract deployed or received", invocation.func);
            return Self::rejected(&invocation.func);
        };
        let signer = match self.signer() {
            Ok(signer) => signer.clone(),
            Err(e) => {
                tracing::warn!("Cannot invoke {}: {}", invocation.func, e);
                return Self::rejected(&invocation.func);
            }
        };
        let sequence = self.next_sequence(self.policy.invoke_offset);
        let payload = Payload {
            operation: Operation::Invoke(invocation),
            contract: Some(contract),
            signer,
            recipient: None,
            simulate: self.options.simulate,
            gas_price: self.options.gas_price,
        };
        self.send(sequence, &payload).await
    }

    /// Moves `amount` between two named accounts, creating either account if it
    /// is not known yet.
    pub async fn transfer(&mut self, transfer: Transfer) -> TxResult {
        let accounts = match (self.ensure_account(&transfer.from), self.ensure_account(&transfer.to)) {
            (Ok(from), Ok(to)) => (from, to),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Cannot transfer from {} to {}: {}", transfer.from, transfer.to, e);
                return Self::rejected(BUILTIN_TRANSFER_LABEL);
            }
        };
        let sequence = self.next_sequence(self.policy.transfer_offset);
        let payload = Payload {
            operation: Operation::Transfer(transfer),
            contract: None,
            signer: accounts.0,
            recipient: Some(accounts.1),
            simulate: self.options.simulate,
            gas_price: self.options.gas_price,
        };
        self.send(sequence, &payload).await
    }

    pub async fn confirm(&self, result: TxResult) -> TxResult {
        self.lifecycle.confirm(result).await
    }

    pub async fn verify(&self, result: TxResult) -> TxResult {
        self.lifecycle.verify(result).await
    }

    /// Current height and time, for the start or end of a measured window.
    pub async fn log_status(&self) -> Result<StatisticSample, ClientError> {
        Ok(statistics::sample(self.adapter.as_ref()).await?)
    }

    /// Throughput between two samples taken with `log_status`.
    pub async fn statistic(&self, from: StatisticSample, to: StatisticSample) -> Result<Throughput, ClientError> {
        StatisticsWindow::new(from, to)
            .compute(self.adapter.as_ref())
            .await
            .map_err(|e| {
                tracing::error!("Statistics over {}..{} failed: {}", from.height, to.height, e);
                ClientError::from(e)
            })
    }

    async fn send(&self, sequence: Option<u64>, payload: &Payload) -> TxResult {
        let result = self.lifecycle.submit(sequence, payload).await;
        if self.options.confirm {
            self.lifecycle.confirm(result).await
        } else {
            result
        }
    }

    /// Sequence for the next submission: the override if set, otherwise the
    /// allocator's next value for ledgers that take client sequences.
    fn next_sequence(&mut self, offset: u64) -> Option<u64> {
        if let Some(nonce) = self.options.fixed_nonce() {
            return Some(nonce);
        }
        if self.policy.uses_client_sequence {
            Some(self.allocator.next_sequence(offset))
        } else {
            None
        }
    }

    fn signer(&self) -> Result<&Credential, ClientError> {
        self.accounts
            .get(&self.options.account)
            .ok_or_else(|| ClientError::UnknownAccount(self.options.account.clone()))
    }

    fn ensure_account(&mut self, name: &str) -> Result<Credential, LedgerError> {
        if let Some(credential) = self.accounts.get(name) {
            return Ok(credential.clone());
        }
        let credential = self.adapter.new_credential()?;
        tracing::debug!("Created account {}", name);
        self.accounts.insert(name, credential.clone());
        Ok(credential)
    }

    fn rejected(label: &str) -> TxResult {
        let now = clock::now_nanos();
        TxResult::failed(label, now, now)
    }
}

impl ContextExchange for ClientInstance {
    /// The current contract, if any, and every known account.
    fn get_context(&self) -> Result<String, ContextError> {
        ContextMessage::new(self.contract.clone(), self.accounts.clone()).encode()
    }

    fn set_context(&mut self, message: &str) -> Result<(), ContextError> {
        let received = match ContextMessage::decode(message) {
            Ok(Some(received)) => received,
            Ok(None) => {
                tracing::info!("Prepare nothing");
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Cannot apply context: {}", e);
                return Err(e);
            }
        };
        received.prepare(self.adapter.as_ref())?;
        received.apply_to(&mut self.contract, &mut self.accounts);
        Ok(())
    }
}
