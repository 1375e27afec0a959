use crate::{
    db_types::OrderId,
    order_objects::{TransactionQuery, TransactionRecord},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait TransactionQueries: Clone {
    /// Returns one page of the filtered, sorted join of orders and their status, along with the total number of
    /// records matching the filter (across all pages).
    async fn fetch_transactions(&self, query: &TransactionQuery)
        -> Result<(Vec<TransactionRecord>, u64), StoreError>;

    async fn fetch_transaction(&self, order_id: &OrderId) -> Result<Option<TransactionRecord>, StoreError>;
}
