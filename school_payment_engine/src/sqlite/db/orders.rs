use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderId},
    sqlite::SqliteDatabaseError,
};

/// Inserts a new order using the given connection. This is not atomic on its own. Embed the call in a transaction
/// alongside [`super::order_status::insert_status`] and pass `&mut tx` as the connection.
pub async fn insert_order(order: &Order, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO orders (
                order_id,
                school_id,
                trustee_id,
                student_name,
                student_id,
                student_email,
                gateway_name,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.school_id)
    .bind(&order.trustee_id)
    .bind(&order.student_info.name)
    .bind(&order.student_info.external_id)
    .bind(&order.student_info.email)
    .bind(&order.gateway_name)
    .bind(order.created_at)
    .execute(conn)
    .await
    .map_err(|e| {
        if SqliteDatabaseError::is_unique_violation(&e) {
            SqliteDatabaseError::DuplicateOrder(order.order_id.clone())
        } else {
            SqliteDatabaseError::DriverError(e)
        }
    })?;
    debug!("📝️ Order [{}] inserted", order.order_id);
    Ok(())
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the order whose `order_id` or gateway collection request id matches `reference`.
/// If the two match different orders, the one matching the `order_id` is returned.
pub async fn fetch_order_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            SELECT o.* FROM orders o
            LEFT JOIN order_status s ON s.order_id = o.order_id
            WHERE o.order_id = $1 OR s.gateway_request_id = $1
            ORDER BY (o.order_id = $1) DESC
            LIMIT 1
        "#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
