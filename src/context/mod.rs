//! Hand-off of a client instance's shared state (deployed contract, accounts)
//! from a coordinator to the instances of every worker.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{LedgerAdapter, LedgerError};
use crate::types::{AccountSet, Contract};


/// Wire value meaning "no context to apply"
pub const NO_CONTEXT: &str = "";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Malformed context message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Failed to serialize context: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("Contract rejected by the ledger adapter: {0}")]
    Rejected(#[from] LedgerError),
}

/// `{contract: {vm, addr, abi}, accounts: {name: credential}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<Contract>,
    #[serde(default)]
    pub accounts: AccountSet,
}

impl ContextMessage {
    pub fn new(contract: Option<Contract>, accounts: AccountSet) -> Self {
        Self { contract, accounts }
    }

    pub fn is_empty(&self) -> bool {
        self.contract.is_none() && self.accounts.is_empty()
    }

    /// Encodes the message; an empty message encodes to `NO_CONTEXT`.
    pub fn encode(&self) -> Result<String, ContextError> {
        if self.is_empty() {
            return Ok(NO_CONTEXT.to_string());
        }
        serde_json::to_string(self).map_err(ContextError::Serialization)
    }

    /// Parses a message; `NO_CONTEXT` yields `None`.
    pub fn decode(message: &str) -> Result<Option<Self>, ContextError> {
        if message.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(message)
            .map(Some)
            .map_err(ContextError::Malformed)
    }

    /// Lets the adapter check the carried contract before anything is applied.
    pub fn prepare(&self, adapter: &dyn LedgerAdapter) -> Result<(), ContextError> {
        if let Some(contract) = &self.contract {
            adapter.prepare_contract(contract)?;
        }
        Ok(())
    }

    /// Overwrites `contract` when the message carries one and merges the accounts.
    pub fn apply_to(self, contract: &mut Option<Contract>, accounts: &mut AccountSet) {
        if let Some(received) = self.contract {
            *contract = Some(received);
        }
        accounts.merge(self.accounts);
    }
}

/// State exchange between instances of one benchmark run
pub trait ContextExchange {
    /// Serializes the shared state. Callable any number of times.
    fn get_context(&self) -> Result<String, ContextError>;

    /// Applies a message from `get_context`.
    ///
    /// `NO_CONTEXT` is a no-op. On error the instance is left exactly as it was.
    fn set_context(&mut self, message: &str) -> Result<(), ContextError>;
}
