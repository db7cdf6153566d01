use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Contract, Credential, BUILTIN_TRANSFER_LABEL};

/// A contract call requested by a benchmark script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn new(func: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            func: func.into(),
            args,
        }
    }
}

/// A value transfer between two named accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: i64,
    #[serde(default)]
    pub extra: String,
}

/// One logical operation issued by a VM
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Invoke(Invocation),
    Transfer(Transfer),
}

impl Operation {
    /// Label the resulting `TxResult` carries
    pub fn label(&self) -> &str {
        match self {
            Operation::Invoke(invocation) => &invocation.func,
            Operation::Transfer(_) => BUILTIN_TRANSFER_LABEL,
        }
    }
}

/// Everything an adapter needs to build, sign and submit one transaction.
///
/// Encoding and signing happen inside the adapter; the core only assembles this.
#[derive(Debug, Clone)]
pub struct Payload {
    pub operation: Operation,
    /// Target of an invocation; `None` for transfers
    pub contract: Option<Contract>,
    pub signer: Credential,
    /// Credential of the receiving account of a transfer
    pub recipient: Option<Credential>,
    /// Ask the ledger to execute without committing
    pub simulate: bool,
    pub gas_price: Option<u64>,
}
