use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHub, EventPublisher, HookFn, LifecycleEvent};

/// The publisher handles the lifecycle engine holds. Cloneable; publishing fans out to every registered hub.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub lifecycle: Vec<EventPublisher<LifecycleEvent>>,
}

impl EventProducers {
    pub async fn publish(&self, event: LifecycleEvent) {
        for publisher in &self.lifecycle {
            publisher.publish(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_lifecycle: Option<EventHub<LifecycleEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_lifecycle = hooks.on_lifecycle.map(|f| EventHub::new(buffer_size, f));
        Self { on_lifecycle }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(hub) = &self.on_lifecycle {
            result.lifecycle.push(hub.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(hub) = self.on_lifecycle {
            tokio::spawn(async move {
                hub.run().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_lifecycle: Option<HookFn<LifecycleEvent>>,
}

impl EventHooks {
    pub fn on_lifecycle<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(LifecycleEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_lifecycle = Some(Arc::new(f));
        self
    }
}
