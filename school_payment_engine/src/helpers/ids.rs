use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::OrderId;

pub const ORDER_ID_PREFIX: &str = "ORD";
pub const NOTIFICATION_ID_PREFIX: &str = "WH";

const SUFFIX_LEN: usize = 9;

fn random_suffix() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(SUFFIX_LEN).map(|c| char::from(c).to_ascii_lowercase()).collect()
}

/// `ORD_<unix millis>_<9 random lowercase alphanumerics>`
pub fn new_order_id(now: DateTime<Utc>) -> OrderId {
    OrderId(format!("{ORDER_ID_PREFIX}_{}_{}", now.timestamp_millis(), random_suffix()))
}

/// `WH_<unix millis>_<9 random lowercase alphanumerics>`
pub fn new_notification_id(now: DateTime<Utc>) -> String {
    format!("{NOTIFICATION_ID_PREFIX}_{}_{}", now.timestamp_millis(), random_suffix())
}
