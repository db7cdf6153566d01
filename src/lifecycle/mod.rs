//! Drives one operation through Built → Sent → (Confirm | Unknown | Failure).

use serde_json::Value;
use std::sync::Arc;

use crate::ledger::{poll_with_retry, LedgerAdapter, LedgerError, VerifyMode};
use crate::types::{Payload, TxResult, TxStatus, BUILTIN_TRANSFER_LABEL};
use crate::utils::clock;

#[cfg(test)]
mod tests;

/// Submission and confirmation of single transactions against one adapter.
///
/// Never fails: every adapter error ends up as a `TxStatus` on the returned result.
#[derive(Clone)]
pub struct TransactionLifecycle {
    adapter: Arc<dyn LedgerAdapter>,
}

impl TransactionLifecycle {
    pub fn new(adapter: Arc<dyn LedgerAdapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<dyn LedgerAdapter> {
        &self.adapter
    }

    /// Builds and submits `payload` tagged with `sequence`.
    pub async fn submit(&self, sequence: Option<u64>, payload: &Payload) -> TxResult {
        let label = payload.operation.label().to_string();
        let build_time = clock::now_nanos();
        let submitted = self.adapter.build_and_submit(sequence, payload).await;
        let send_time = clock::now_nanos();
        match submitted {
            Ok(id) if id.is_valid() => TxResult::sent(label, id, build_time, send_time),
            Ok(id) => {
                tracing::warn!("{} submission returned unusable id '{}'", label, id);
                TxResult::failed(label, build_time, send_time)
            }
            Err(e) => {
                tracing::warn!("{} submission failed: {}", label, e);
                TxResult::failed(label, build_time, send_time)
            }
        }
    }

    /// Polls for the receipt of a freshly sent transaction.
    ///
    /// Results that are not confirmable come back unchanged, so calling this twice
    /// is harmless.
    pub async fn confirm(&self, mut result: TxResult) -> TxResult {
        if !result.is_confirmable() {
            return result;
        }
        let policy = self.adapter.policy();
        let id = result.correlation_id.clone();
        let polled = poll_with_retry(policy.confirm_retry, || self.adapter.poll_receipt(&id)).await;
        result.confirm_time = clock::now_nanos();

        let receipt = match polled {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                tracing::warn!("Transaction {} not found after {} attempts", id, policy.confirm_retry.max_attempts);
                result.status = TxStatus::Unknown;
                return result;
            }
            Err(e) => {
                tracing::warn!("Query of transaction {} failed: {}", id, e);
                result.status = TxStatus::Unknown;
                return result;
            }
        };

        result.status = TxStatus::Confirm;
        if result.label == BUILTIN_TRANSFER_LABEL {
            result.return_values = vec![Value::String(String::from_utf8_lossy(&receipt.ret).into_owned())];
        } else {
            match self.adapter.decode_return(&result.label, &receipt.ret) {
                Ok(values) => result.return_values = values,
                Err(e) => tracing::warn!("Confirmed {} but could not decode its return: {}", id, e),
            }
        }

        match self.adapter.query_by_id(&id).await {
            Ok(info) => {
                if let Some(write_time) = info.block_write_time {
                    result.write_time = write_time;
                }
            }
            Err(e) => tracing::debug!("No write time for {}: {}", id, e),
        }
        result
    }

    /// Post-submission check. Behaves like `confirm` unless the adapter declares a
    /// separate lookup step, which then gets its own bounded retry budget.
    pub async fn verify(&self, mut result: TxResult) -> TxResult {
        let retry = match self.adapter.policy().verify {
            VerifyMode::SameAsConfirm => return self.confirm(result).await,
            VerifyMode::Lookup(retry) => retry,
        };
        if !result.is_confirmable() {
            return result;
        }
        let id = result.correlation_id.clone();
        let found = poll_with_retry(retry, || async {
            match self.adapter.query_by_id(&id).await {
                Ok(info) => Ok(Some(info)),
                Err(LedgerError::TransactionNotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await;
        result.confirm_time = clock::now_nanos();

        match found {
            Ok(Some(info)) => {
                result.status = TxStatus::Confirm;
                if let Some(write_time) = info.block_write_time {
                    result.write_time = write_time;
                }
            }
            Ok(None) => {
                tracing::warn!("Transaction {} could not be verified after {} attempts", id, retry.max_attempts);
                result.status = TxStatus::Unknown;
            }
            Err(e) => {
                tracing::warn!("Verification of {} failed: {}", id, e);
                result.status = TxStatus::Unknown;
            }
        }
        result
    }
}
