//! `SqliteDatabase` is a concrete implementation of a school payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the storage traits defined in the
//! [`traits`](crate::traits) module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, notifications, order_status, orders, transactions};
use crate::{
    db_types::{NewNotification, NotificationLogEntry, NotificationUpdate, Order, OrderId, OrderStatus},
    order_objects::{TransactionQuery, TransactionRecord},
    traits::{NotificationLog, OrderManagement, StoreError, TransactionQueries},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: &Order, status: &OrderStatus) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        orders::insert_order(order, &mut tx).await?;
        order_status::insert_status(status, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} and its initial status have been saved", order.order_id);
        Ok(())
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let status = order_status::fetch_status(order_id, &mut conn).await?;
        Ok(status)
    }

    async fn attach_gateway_request(
        &self,
        order_id: &OrderId,
        gateway_request_id: &str,
    ) -> Result<OrderStatus, StoreError> {
        let mut tx = self.pool.begin().await?;
        let status = order_status::attach_gateway_request(order_id, gateway_request_id, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Order {order_id} linked to gateway request {gateway_request_id}");
        Ok(status)
    }

    async fn compare_and_swap_status(
        &self,
        status: &OrderStatus,
        expected_version: i64,
    ) -> Result<Option<OrderStatus>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = order_status::compare_and_swap(status, expected_version, &mut tx).await?;
        tx.commit().await?;
        Ok(updated)
    }
}

impl NotificationLog for SqliteDatabase {
    async fn insert_notification(&self, notification: &NewNotification) -> Result<NotificationLogEntry, StoreError> {
        let mut tx = self.pool.begin().await?;
        let entry = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn update_notification(&self, update: &NotificationUpdate) -> Result<NotificationLogEntry, StoreError> {
        let mut tx = self.pool.begin().await?;
        let entry = notifications::update_notification(update, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Notification {} is now {}", entry.notification_id, entry.processing_state);
        Ok(entry)
    }

    async fn fetch_notification(&self, notification_id: &str) -> Result<Option<NotificationLogEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let entry = notifications::fetch_notification(notification_id, &mut conn).await?;
        Ok(entry)
    }

    async fn fetch_notifications_for_review(&self) -> Result<Vec<NotificationLogEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let entries = notifications::fetch_flagged_for_review(&mut conn).await?;
        Ok(entries)
    }
}

impl TransactionQueries for SqliteDatabase {
    async fn fetch_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<(Vec<TransactionRecord>, u64), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = transactions::fetch_transactions(query, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_transaction(&self, order_id: &OrderId) -> Result<Option<TransactionRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let record = transactions::fetch_transaction(order_id, &mut conn).await?;
        Ok(record)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `SPG_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
