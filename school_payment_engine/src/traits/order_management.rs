use crate::{
    db_types::{Order, OrderId, OrderStatus},
    traits::StoreError,
};

/// Storage for orders and their (single, mutable) status record.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Stores a new order together with its initial status in a single atomic step. Either both records become
    /// visible, or neither does.
    ///
    /// Fails with [`StoreError::OrderAlreadyExists`] if the order id is already taken.
    async fn insert_order(&self, order: &Order, status: &OrderStatus) -> Result<(), StoreError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Looks up an order by either our own `order_id` or the gateway's collection request id. If both match
    /// (different) orders, the `order_id` match wins.
    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>, StoreError>;

    /// Records the gateway's collection request id against the order. This does not touch any of the fields governed
    /// by the transition policy, and does not bump the version.
    async fn attach_gateway_request(
        &self,
        order_id: &OrderId,
        gateway_request_id: &str,
    ) -> Result<OrderStatus, StoreError>;

    /// Overwrites the policy-governed fields of the status record for `status.order_id`, but only if the stored
    /// version is still `expected_version`. On success, the version is incremented and the stored record is returned.
    ///
    /// Returns `None` when another writer got there first. Callers should re-read and re-evaluate.
    async fn compare_and_swap_status(
        &self,
        status: &OrderStatus,
        expected_version: i64,
    ) -> Result<Option<OrderStatus>, StoreError>;
}
