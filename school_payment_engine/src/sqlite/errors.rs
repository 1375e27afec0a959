use thiserror::Error;

use crate::{db_types::OrderId, traits::StoreError};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Cannot insert duplicate order {0}")]
    DuplicateOrder(OrderId),
    #[error("Cannot insert duplicate notification {0}")]
    DuplicateNotification(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Notification {0} does not exist")]
    NotificationNotFound(String),
}

impl SqliteDatabaseError {
    /// True if the underlying driver error is a violated UNIQUE (or PRIMARY KEY) constraint.
    pub fn is_unique_violation(e: &sqlx::Error) -> bool {
        e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false)
    }
}

impl From<SqliteDatabaseError> for StoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DriverError(e) => StoreError::DatabaseError(e.to_string()),
            SqliteDatabaseError::DuplicateOrder(id) => StoreError::OrderAlreadyExists(id),
            SqliteDatabaseError::DuplicateNotification(id) => StoreError::NotificationAlreadyExists(id),
            SqliteDatabaseError::OrderNotFound(id) => StoreError::OrderNotFound(id),
            SqliteDatabaseError::NotificationNotFound(id) => StoreError::NotificationNotFound(id),
        }
    }
}
