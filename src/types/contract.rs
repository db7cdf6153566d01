use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution environment a contract was deployed to
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmKind {
    Evm,
    Jvm,
    Hvm,
    Bvm,
    Kvsql,
    Fvm,
    /// Ledger-native code (chaincode, native contracts)
    Native,
}

impl fmt::Display for VmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VmKind::Evm => "evm",
            VmKind::Jvm => "jvm",
            VmKind::Hvm => "hvm",
            VmKind::Bvm => "bvm",
            VmKind::Kvsql => "kvsql",
            VmKind::Fvm => "fvm",
            VmKind::Native => "native",
        };
        write!(f, "{}", name)
    }
}

/// Handle to a deployed contract.
///
/// Opaque outside the ledger adapter. Never modified after deployment; other
/// instances only ever receive copies of it.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(rename = "vm")]
    pub vm_kind: VmKind,
    #[serde(rename = "addr")]
    pub address: String,
    #[serde(rename = "abi", default)]
    pub abi_raw: String,
}

impl Contract {
    pub fn new(vm_kind: VmKind, address: impl Into<String>, abi_raw: impl Into<String>) -> Self {
        Self {
            vm_kind,
            address: address.into(),
            abi_raw: abi_raw.into(),
        }
    }
}

/// What the adapter needs to deploy a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSource {
    pub vm_kind: VmKind,
    pub abi_raw: String,
    pub bytecode: Vec<u8>,
}
