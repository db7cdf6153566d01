use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DEFAULT_ACCOUNT;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Account name must not be empty")]
    EmptyAccount,
    #[error("Nonce override must be -1 (disabled) or a non-negative sequence, got {0}")]
    InvalidNonce(i64),
}

/// Per-instance behaviour switches, checked once when they are installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Confirm every operation right after submitting it
    pub confirm: bool,
    /// Ask the ledger to execute without committing
    pub simulate: bool,
    /// Account signing invocations
    pub account: String,
    /// Fixed sequence for every call when `>= 0`, bypassing the allocator
    pub nonce: i64,
    pub gas_price: Option<u64>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            confirm: false,
            simulate: false,
            account: DEFAULT_ACCOUNT.to_string(),
            nonce: -1,
            gas_price: None,
        }
    }
}

impl ClientOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.account.is_empty() {
            return Err(OptionsError::EmptyAccount);
        }
        if self.nonce < -1 {
            return Err(OptionsError::InvalidNonce(self.nonce));
        }
        Ok(())
    }

    /// The nonce override, if enabled
    pub fn fixed_nonce(&self) -> Option<u64> {
        u64::try_from(self.nonce).ok()
    }
}
