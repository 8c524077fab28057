//! Stateless pub-sub plumbing for lifecycle events.
//!
//! An [`EventHub`] owns one hook function and an mpsc inbox; any number of [`EventPublisher`] handles feed it.
//! Hooks receive only the event itself, with no view of engine state, but they may be async, and each
//! invocation runs on its own task so a slow subscriber never stalls the lifecycle engine.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::*;
use tokio::sync::mpsc;

pub type HookFn<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHub<E: Send + Sync + 'static> {
    inbox: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    hook: HookFn<E>,
}

impl<E: Send + Sync + 'static> EventHub<E> {
    pub fn new(buffer_size: usize, hook: HookFn<E>) -> Self {
        let (sender, inbox) = mpsc::channel(buffer_size);
        Self { inbox, sender, hook }
    }

    pub fn subscribe(&self) -> EventPublisher<E> {
        EventPublisher::new(self.sender.clone())
    }

    /// Consumes events until every publisher has been dropped, then waits for in-flight hook invocations to
    /// finish before returning.
    pub async fn run(mut self) {
        debug!("📬️ Event hub running");
        // the hub's own sender would keep the channel open forever
        drop(self.sender);
        let in_flight = Arc::new(AtomicI64::new(0));
        while let Some(event) = self.inbox.recv().await {
            trace!("📬️ Dispatching event to hook");
            let hook = Arc::clone(&self.hook);
            let gauge = Arc::clone(&in_flight);
            gauge.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                (hook)(event).await;
                gauge.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while in_flight.load(Ordering::SeqCst) > 0 {
            trace!("📬️ Waiting for {} hook invocations to finish", in_flight.load(Ordering::SeqCst));
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
        debug!("📬️ Event hub has shut down");
    }
}

#[derive(Clone)]
pub struct EventPublisher<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventPublisher<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Best-effort, at-most-once delivery. A closed or saturated hub is logged and forgotten; lifecycle
    /// transitions never fail because nobody is listening.
    pub async fn publish(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to publish event: {e}");
        }
    }
}
