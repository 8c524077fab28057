mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHub, EventPublisher, HookFn};
pub use event_types::LifecycleEvent;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
