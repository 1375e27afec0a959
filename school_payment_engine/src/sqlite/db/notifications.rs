use sqlx::SqliteConnection;

use crate::{
    db_types::{NewNotification, NotificationLogEntry, NotificationUpdate},
    sqlite::SqliteDatabaseError,
};

pub async fn insert_notification(
    notification: &NewNotification,
    conn: &mut SqliteConnection,
) -> Result<NotificationLogEntry, SqliteDatabaseError> {
    sqlx::query_as(
        r#"
            INSERT INTO notification_log (notification_id, raw_payload, remote_addr, received_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(&notification.notification_id)
    .bind(&notification.raw_payload)
    .bind(notification.remote_addr.as_deref())
    .bind(notification.received_at)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        if SqliteDatabaseError::is_unique_violation(&e) {
            SqliteDatabaseError::DuplicateNotification(notification.notification_id.clone())
        } else {
            SqliteDatabaseError::DriverError(e)
        }
    })?
    .into_iter()
    .next()
    .ok_or_else(|| SqliteDatabaseError::DriverError(sqlx::Error::RowNotFound))
}

/// Moves the entry to a new processing state. Fields that are `None` in the update keep their stored values, and
/// a review flag, once raised, stays raised.
pub async fn update_notification(
    update: &NotificationUpdate,
    conn: &mut SqliteConnection,
) -> Result<NotificationLogEntry, SqliteDatabaseError> {
    let entry: Option<NotificationLogEntry> = sqlx::query_as(
        r#"
            UPDATE notification_log SET
                processing_state = $1,
                order_id = COALESCE($2, order_id),
                error_message = COALESCE($3, error_message),
                needs_review = (needs_review OR $4),
                processed_at = COALESCE($5, processed_at)
            WHERE notification_id = $6
            RETURNING *;
        "#,
    )
    .bind(update.processing_state)
    .bind(update.order_id.as_ref().map(|id| id.as_str()))
    .bind(update.error_message.as_deref())
    .bind(update.needs_review)
    .bind(update.processed_at)
    .bind(&update.notification_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    entry.ok_or_else(|| SqliteDatabaseError::NotificationNotFound(update.notification_id.clone()))
}

pub async fn fetch_notification(
    notification_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<NotificationLogEntry>, sqlx::Error> {
    let entry = sqlx::query_as("SELECT * FROM notification_log WHERE notification_id = $1")
        .bind(notification_id)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

pub async fn fetch_flagged_for_review(conn: &mut SqliteConnection) -> Result<Vec<NotificationLogEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM notification_log WHERE needs_review = TRUE ORDER BY received_at, id")
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
