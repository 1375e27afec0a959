use crate::{
    db_types::{NewNotification, NotificationLogEntry, NotificationUpdate},
    traits::StoreError,
};

/// The audit trail of inbound gateway notifications. Entries are created once, updated in place, and never deleted.
#[allow(async_fn_in_trait)]
pub trait NotificationLog: Clone {
    async fn insert_notification(&self, notification: &NewNotification) -> Result<NotificationLogEntry, StoreError>;

    async fn update_notification(&self, update: &NotificationUpdate) -> Result<NotificationLogEntry, StoreError>;

    async fn fetch_notification(&self, notification_id: &str) -> Result<Option<NotificationLogEntry>, StoreError>;

    /// All entries that have been flagged for manual review, oldest first.
    async fn fetch_notifications_for_review(&self) -> Result<Vec<NotificationLogEntry>, StoreError>;
}
