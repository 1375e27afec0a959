use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::OrderId,
    order_objects::{TransactionQuery, TransactionRecord},
};

const SELECT_TRANSACTIONS: &str = r#"
    SELECT
        o.order_id,
        o.school_id,
        o.trustee_id,
        o.gateway_name,
        o.student_name,
        o.student_id,
        o.student_email,
        s.order_amount,
        s.transaction_amount,
        s.status,
        s.payment_mode,
        s.payment_details,
        s.bank_reference,
        s.payment_message,
        s.error_message,
        s.gateway_request_id,
        o.created_at,
        s.last_updated_at,
        s.source_of_last_update
    FROM orders o
    JOIN order_status s ON s.order_id = o.order_id
"#;

const COUNT_TRANSACTIONS: &str = r#"
    SELECT COUNT(*) FROM orders o
    JOIN order_status s ON s.order_id = o.order_id
"#;

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &TransactionQuery) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = query.status {
        builder.push(" AND s.status = ");
        builder.push_bind(status);
    }
    if let Some(school_id) = &query.school_id {
        builder.push(" AND o.school_id = ");
        builder.push_bind(school_id.clone());
    }
    if let Some(from) = query.date_from {
        builder.push(" AND s.last_updated_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = query.date_to {
        builder.push(" AND s.last_updated_at <= ");
        builder.push_bind(to);
    }
}

/// Fetches one page of the filtered, sorted transaction list, along with the total number of matching records.
///
/// Ties on the sort column are broken on `order_id` (in the same direction), so that pages never overlap or skip.
pub async fn fetch_transactions(
    query: &TransactionQuery,
    conn: &mut SqliteConnection,
) -> Result<(Vec<TransactionRecord>, u64), sqlx::Error> {
    let mut count = QueryBuilder::new(COUNT_TRANSACTIONS);
    push_filters(&mut count, query);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new(SELECT_TRANSACTIONS);
    push_filters(&mut builder, query);
    let dir = query.order.sql();
    builder.push(format!(" ORDER BY {} {dir}, o.order_id {dir}", query.sort.column()));
    builder.push(" LIMIT ");
    builder.push_bind(i64::from(query.limit));
    builder.push(" OFFSET ");
    #[allow(clippy::cast_possible_wrap)]
    builder.push_bind(query.offset() as i64);
    let items = builder.build_query_as::<TransactionRecord>().fetch_all(conn).await?;
    #[allow(clippy::cast_sign_loss)]
    Ok((items, total.max(0) as u64))
}

pub async fn fetch_transaction(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<TransactionRecord>, sqlx::Error> {
    let mut builder = QueryBuilder::new(SELECT_TRANSACTIONS);
    builder.push(" WHERE o.order_id = ");
    builder.push_bind(order_id.as_str());
    let record = builder.build_query_as::<TransactionRecord>().fetch_optional(conn).await?;
    Ok(record)
}
