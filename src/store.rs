//! Durable transaction store and the day-bucketed queue store.
//!
//! The traits are the whole contract the payout coordinator relies on. The
//! in-memory implementations back the tests and the simulation binary; a real
//! deployment puts a SQL table behind [`PayoutStore`] and a Redis-style hash
//! behind [`QueueStore`].
//!
//! The durable store owns the "one active request per client" rule. The
//! coordinator's existence check is only a fast path in front of it.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transaction::{PayoutStatus, PayoutTransaction};
use crate::types::{ClientId, TransactionId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("client {0} already has an active payout request")]
    UniqueViolation(ClientId),

    #[error("record {0} not found")]
    NotFound(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Fields a transaction update may touch. `None` leaves the column alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub status: Option<PayoutStatus>,
    pub remarks: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl TransactionUpdate {
    pub fn status(status: PayoutStatus, updated_at: NaiveDateTime) -> Self {
        Self {
            status: Some(status),
            remarks: None,
            updated_at,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    /// True when the client has a Pending or Process transaction.
    async fn check_existing_payout_request(&self, client_id: &ClientId) -> Result<bool, StoreError>;

    /// Must reject a second active transaction for the same client with
    /// [`StoreError::UniqueViolation`].
    async fn insert_transaction(&self, transaction: &PayoutTransaction) -> Result<(), StoreError>;

    async fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<PayoutTransaction>, StoreError>;

    async fn update_transaction(
        &self,
        transaction_id: &TransactionId,
        update: TransactionUpdate,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Returns whether the field existed.
    async fn hdelete(&self, key: &str, field: &str) -> Result<bool, StoreError>;
}

/// Transactions keyed by id, with uniqueness of active requests enforced on insert.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPayoutStore {
    transactions: Arc<RwLock<HashMap<TransactionId, PayoutTransaction>>>,
}

impl InMemoryPayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stands in for the downstream settlement job.
    pub async fn mark_proceeded(&self, transaction_id: &TransactionId, at: NaiveDateTime) -> Result<(), StoreError> {
        self.update_transaction(transaction_id, TransactionUpdate::status(PayoutStatus::Proceed, at))
            .await
    }

    pub async fn transactions_for(&self, client_id: &ClientId) -> Vec<PayoutTransaction> {
        let transactions = self.transactions.read().await;
        let mut found: Vec<PayoutTransaction> = transactions
            .values()
            .filter(|tx| &tx.client_id == client_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        found
    }
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn check_existing_payout_request(&self, client_id: &ClientId) -> Result<bool, StoreError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .any(|tx| &tx.client_id == client_id && tx.status.is_active()))
    }

    async fn insert_transaction(&self, transaction: &PayoutTransaction) -> Result<(), StoreError> {
        // check and insert under one write lock, like a partial unique index
        let mut transactions = self.transactions.write().await;

        if transaction.status.is_active()
            && transactions
                .values()
                .any(|tx| tx.client_id == transaction.client_id && tx.status.is_active())
        {
            return Err(StoreError::UniqueViolation(transaction.client_id.clone()));
        }
        if transactions.contains_key(&transaction.transaction_id) {
            return Err(StoreError::Backend(format!(
                "duplicate transaction id {}",
                transaction.transaction_id
            )));
        }

        transactions.insert(transaction.transaction_id.clone(), transaction.clone());
        Ok(())
    }

    async fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<PayoutTransaction>, StoreError> {
        Ok(self.transactions.read().await.get(transaction_id).cloned())
    }

    async fn update_transaction(
        &self,
        transaction_id: &TransactionId,
        update: TransactionUpdate,
    ) -> Result<(), StoreError> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(transaction_id)
            .ok_or_else(|| StoreError::NotFound(transaction_id.to_string()))?;

        if let Some(status) = update.status {
            tx.status = status;
        }
        if let Some(remarks) = update.remarks {
            tx.remarks = remarks;
        }
        tx.updated_at = update.updated_at;
        Ok(())
    }
}

/// Plain string keys plus hashes, the subset of a Redis keyspace the queue needs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueueStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    hashes: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: &str, value: &str) {
        self.values.write().await.insert(key.to_string(), value.to_string());
    }

    pub async fn hget(&self, key: &str, field: &str) -> Option<String> {
        let hashes = self.hashes.read().await;
        hashes.get(key).and_then(|hash| hash.get(field)).cloned()
    }

    pub async fn hlen(&self, key: &str) -> usize {
        self.hashes.read().await.get(key).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.hashes
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hdelete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut hashes = self.hashes.write().await;
        let Some(hash) = hashes.get_mut(key) else {
            return Ok(false);
        };
        let existed = hash.remove(field).is_some();
        if hash.is_empty() {
            hashes.remove(key);
        }
        Ok(existed)
    }
}
