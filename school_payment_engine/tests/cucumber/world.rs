use std::collections::HashMap;

use cucumber::World;
use school_payment_engine::{db_types::OrderId, webhook_objects::WebhookReceipt, PaymentEngineError};

use crate::support::TestSystem;

#[derive(Default, Debug, World)]
pub struct PaymentWorld {
    pub system: Option<TestSystem>,
    /// Orders created during the scenario, by the label the scenario gave them
    pub orders: HashMap<String, OrderId>,
    pub last_webhook: Option<Result<WebhookReceipt, PaymentEngineError>>,
}

impl PaymentWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("System not initialised. Did you forget 'Given a fresh install'?")
    }

    pub fn order(&self, label: &str) -> &OrderId {
        self.orders.get(label).unwrap_or_else(|| panic!("No order has been created with label {label}"))
    }
}
