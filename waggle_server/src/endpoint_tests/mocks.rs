//! Collaborator doubles for endpoint tests. The engine traits require `Clone`, so these are plain hand-rolled
//! fakes sharing state through an `Arc`.
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
    Mutex,
};

use serde_json::Value;
use waggle_engine::{CaptureOutcome, CaptureStatus, PaymentProcessor, ProcessorError, PushGateway};
use wgl_common::Cents;

#[derive(Clone, Default)]
pub struct TestProcessor {
    decline: Arc<AtomicBool>,
    captured_tags: Arc<Mutex<Vec<String>>>,
}

impl TestProcessor {
    pub fn decline_captures(&self) {
        self.decline.store(true, Ordering::SeqCst);
    }

    pub fn capture_count(&self) -> usize {
        self.captured_tags.lock().unwrap().len()
    }
}

impl PaymentProcessor for TestProcessor {
    async fn capture_with_split(
        &self,
        _customer_ref: &str,
        _amount: Cents,
        _payee_account_ref: &str,
        _fee: Cents,
        tag: &str,
    ) -> Result<CaptureOutcome, ProcessorError> {
        let charge_ref = format!("ch_{tag}");
        let mut tags = self.captured_tags.lock().unwrap();
        if tags.iter().any(|t| t == tag) {
            return Ok(CaptureOutcome { status: CaptureStatus::Succeeded, charge_ref });
        }
        if self.decline.load(Ordering::SeqCst) {
            return Ok(CaptureOutcome { status: CaptureStatus::Declined, charge_ref });
        }
        tags.push(tag.to_string());
        Ok(CaptureOutcome { status: CaptureStatus::Succeeded, charge_ref })
    }

    async fn find_transfer_by_group(&self, tag: &str) -> Result<Option<String>, ProcessorError> {
        let captured = self.captured_tags.lock().unwrap().iter().any(|t| t == tag);
        Ok(captured.then(|| format!("tr_{tag}")))
    }

    async fn reverse_transfer(&self, _transfer_ref: &str, _amount: Cents, _tag: &str) -> Result<(), ProcessorError> {
        Ok(())
    }

    async fn refund_charge(&self, _charge_ref: &str, _amount: Cents, _tag: &str) -> Result<(), ProcessorError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct TestPusher {
    pushes: Arc<AtomicUsize>,
}

impl TestPusher {
    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl PushGateway for TestPusher {
    async fn push_message(&self, _device_token: &str, _title: &str, _body: &str, _data: Value) -> bool {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        true
    }
}
