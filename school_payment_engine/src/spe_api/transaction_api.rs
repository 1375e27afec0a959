use std::fmt::Debug;

use log::*;

use crate::{
    db_types::OrderId,
    order_objects::{TransactionPage, TransactionQuery, TransactionRecord},
    spe_api::errors::PaymentEngineError,
    traits::TransactionQueries,
};

/// Read-only views over the joined order and status records.
pub struct TransactionApi<B> {
    db: B,
}

impl<B> Debug for TransactionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionApi")
    }
}

impl<B> TransactionApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> TransactionApi<B>
where B: TransactionQueries
{
    pub async fn transactions(&self, query: &TransactionQuery) -> Result<TransactionPage, PaymentEngineError> {
        let (items, total) = self.db.fetch_transactions(query).await?;
        trace!("🗃️ Transaction query returned {} of {total} records", items.len());
        Ok(TransactionPage::new(items, query, total))
    }

    /// The stored snapshot of a single transaction. The gateway is not consulted.
    pub async fn transaction(&self, order_id: &OrderId) -> Result<TransactionRecord, PaymentEngineError> {
        self.db
            .fetch_transaction(order_id)
            .await?
            .ok_or_else(|| PaymentEngineError::OrderNotFound(order_id.to_string()))
    }
}
