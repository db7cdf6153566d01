use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the account used when an operation names none
pub const DEFAULT_ACCOUNT: &str = "0";

/// Serialized signing credential (key store JSON, PEM, ...). Opaque to the core.
#[derive(Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(pub String);

// Keep key material out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

/// Logical account names mapped to their signing credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountSet {
    accounts: BTreeMap<String, Credential>,
}

impl AccountSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads accounts in key-store order, naming them "0", "1", ...
    pub fn from_key_store<I>(credentials: I) -> Self
    where
        I: IntoIterator<Item = Credential>,
    {
        let accounts = credentials
            .into_iter()
            .enumerate()
            .map(|(i, credential)| (i.to_string(), credential))
            .collect();
        Self { accounts }
    }

    pub fn get(&self, name: &str) -> Option<&Credential> {
        self.accounts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, credential: Credential) -> Option<Credential> {
        self.accounts.insert(name.into(), credential)
    }

    /// Adds every account of `other`, overwriting entries with the same name.
    /// Entries only present here are kept.
    pub fn merge(&mut self, other: AccountSet) {
        self.accounts.extend(other.accounts);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }
}
