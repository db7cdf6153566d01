pub mod account;
pub mod contract;
pub mod operation;
pub mod result;
pub mod statistic;
pub mod topology;

pub use account::{AccountSet, Credential, DEFAULT_ACCOUNT};
pub use contract::{Contract, ContractSource, VmKind};
pub use operation::{Invocation, Operation, Payload, Transfer};
pub use result::{
    CorrelationId, Stage, TxResult, TxStatus, BUILTIN_TRANSFER_LABEL, INVALID_CORRELATION_ID,
    INVALID_LABEL,
};
pub use statistic::{StatisticSample, Throughput};
pub use topology::{Topology, TopologyError};
