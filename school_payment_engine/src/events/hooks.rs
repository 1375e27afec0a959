use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, IntegrityAnomalyEvent, OrderStatusChangedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub integrity_anomaly_producer: Vec<EventProducer<IntegrityAnomalyEvent>>,
}

impl EventProducers {
    pub async fn publish_status_changed(&self, event: OrderStatusChangedEvent) {
        for emitter in &self.status_changed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_integrity_anomaly(&self, event: IntegrityAnomalyEvent) {
        for emitter in &self.integrity_anomaly_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_integrity_anomaly: Option<EventHandler<IntegrityAnomalyEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_integrity_anomaly = hooks.on_integrity_anomaly.map(|f| EventHandler::new(buffer_size, f));
        Self { on_status_changed, on_integrity_anomaly }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_integrity_anomaly {
            result.integrity_anomaly_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_integrity_anomaly {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_integrity_anomaly: Option<Handler<IntegrityAnomalyEvent>>,
}

impl EventHooks {
    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_integrity_anomaly<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(IntegrityAnomalyEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_integrity_anomaly = Some(Arc::new(f));
        self
    }
}
