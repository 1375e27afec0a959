use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, OrderStatus},
    sqlite::SqliteDatabaseError,
};

/// Inserts the initial status record for an order. Not atomic on its own; see [`super::orders::insert_order`].
pub async fn insert_status(status: &OrderStatus, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO order_status (
                order_id,
                order_amount,
                transaction_amount,
                payment_mode,
                payment_details,
                bank_reference,
                payment_message,
                status,
                error_message,
                gateway_request_id,
                last_updated_at,
                source_of_last_update,
                version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13);
        "#,
    )
    .bind(status.order_id.as_str())
    .bind(status.order_amount)
    .bind(status.transaction_amount)
    .bind(&status.payment_mode)
    .bind(&status.payment_details)
    .bind(&status.bank_reference)
    .bind(&status.payment_message)
    .bind(status.status)
    .bind(&status.error_message)
    .bind(status.gateway_request_id.as_deref())
    .bind(status.last_updated_at)
    .bind(status.source_of_last_update)
    .bind(status.version)
    .execute(conn)
    .await
    .map_err(|e| {
        if SqliteDatabaseError::is_unique_violation(&e) {
            SqliteDatabaseError::DuplicateOrder(status.order_id.clone())
        } else {
            SqliteDatabaseError::DriverError(e)
        }
    })?;
    Ok(())
}

pub async fn fetch_status(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<OrderStatus>, sqlx::Error> {
    let status = sqlx::query_as("SELECT * FROM order_status WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(status)
}

pub async fn attach_gateway_request(
    order_id: &OrderId,
    gateway_request_id: &str,
    conn: &mut SqliteConnection,
) -> Result<OrderStatus, SqliteDatabaseError> {
    let status: Option<OrderStatus> =
        sqlx::query_as("UPDATE order_status SET gateway_request_id = $1 WHERE order_id = $2 RETURNING *")
            .bind(gateway_request_id)
            .bind(order_id.as_str())
            .fetch_all(conn)
            .await?
            .into_iter()
            .next();
    status.ok_or_else(|| SqliteDatabaseError::OrderNotFound(order_id.clone()))
}

/// Writes the policy-governed fields of `status`, provided the stored version is still `expected_version`.
///
/// The check and the write happen in a single statement, so no other writer can slip in between them. Returns `None`
/// if the version did not match (or the row does not exist).
///
/// `RETURNING` rows are always drained with `fetch_all`. SQLite only finishes (and, outside a transaction, commits) the
/// statement once it has been stepped to the end.
pub async fn compare_and_swap(
    status: &OrderStatus,
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderStatus>, sqlx::Error> {
    let updated: Option<OrderStatus> = sqlx::query_as(
        r#"
            UPDATE order_status SET
                transaction_amount = $1,
                payment_mode = $2,
                payment_details = $3,
                bank_reference = $4,
                payment_message = $5,
                status = $6,
                error_message = $7,
                last_updated_at = $8,
                source_of_last_update = $9,
                version = version + 1
            WHERE order_id = $10 AND version = $11
            RETURNING *;
        "#,
    )
    .bind(status.transaction_amount)
    .bind(&status.payment_mode)
    .bind(&status.payment_details)
    .bind(&status.bank_reference)
    .bind(&status.payment_message)
    .bind(status.status)
    .bind(&status.error_message)
    .bind(status.last_updated_at)
    .bind(status.source_of_last_update)
    .bind(status.order_id.as_str())
    .bind(expected_version)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    if updated.is_none() {
        trace!("🗃️ [{}] Version {expected_version} is no longer current", status.order_id);
    }
    Ok(updated)
}
