//! In-memory collaborator doubles: a scriptable payment processor and a push gateway that records what it sent.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
    },
};

use serde_json::Value;
use waggle_engine::{CaptureOutcome, CaptureStatus, PaymentProcessor, ProcessorError, PushGateway};
use wgl_common::Cents;

#[derive(Debug, Clone)]
pub struct CaptureRecord {
    pub customer_ref: String,
    pub amount: Cents,
    pub payee_ref: String,
    pub fee: Cents,
    pub tag: String,
}

#[derive(Debug, Default)]
pub struct ProcessorState {
    pub decline: bool,
    pub offline: bool,
    pub captures: Vec<CaptureRecord>,
    /// transfer-group tag → transfer ref
    pub transfers: HashMap<String, String>,
    pub reversals: Vec<(String, Cents)>,
    pub refunds: Vec<(String, Cents)>,
}

#[derive(Clone, Default)]
pub struct TestProcessor {
    state: Arc<Mutex<ProcessorState>>,
}

impl TestProcessor {
    pub fn decline_captures(&self) {
        self.state.lock().unwrap().decline = true;
    }

    pub fn go_offline(&self) {
        self.state.lock().unwrap().offline = true;
    }

    pub fn captures(&self) -> Vec<CaptureRecord> {
        self.state.lock().unwrap().captures.clone()
    }

    pub fn reversals(&self) -> Vec<(String, Cents)> {
        self.state.lock().unwrap().reversals.clone()
    }

    pub fn refunds(&self) -> Vec<(String, Cents)> {
        self.state.lock().unwrap().refunds.clone()
    }

    /// Drops the transfer record for a tag, simulating a payout the processor cannot find.
    pub fn forget_transfer(&self, tag: &str) {
        self.state.lock().unwrap().transfers.remove(tag);
    }
}

impl PaymentProcessor for TestProcessor {
    async fn capture_with_split(
        &self,
        customer_ref: &str,
        amount: Cents,
        payee_account_ref: &str,
        fee: Cents,
        tag: &str,
    ) -> Result<CaptureOutcome, ProcessorError> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(ProcessorError::Unavailable("processor offline".into()));
        }
        let charge_ref = format!("ch_{tag}");
        // a repeated tag replays the original outcome instead of capturing again
        if state.captures.iter().any(|c| c.tag == tag) {
            return Ok(CaptureOutcome { status: CaptureStatus::Succeeded, charge_ref });
        }
        if state.decline {
            return Ok(CaptureOutcome { status: CaptureStatus::Declined, charge_ref });
        }
        state.captures.push(CaptureRecord {
            customer_ref: customer_ref.to_string(),
            amount,
            payee_ref: payee_account_ref.to_string(),
            fee,
            tag: tag.to_string(),
        });
        state.transfers.insert(tag.to_string(), format!("tr_{tag}"));
        Ok(CaptureOutcome { status: CaptureStatus::Succeeded, charge_ref })
    }

    async fn find_transfer_by_group(&self, tag: &str) -> Result<Option<String>, ProcessorError> {
        Ok(self.state.lock().unwrap().transfers.get(tag).cloned())
    }

    async fn reverse_transfer(
        &self,
        transfer_ref: &str,
        amount: Cents,
        _tag: &str,
    ) -> Result<(), ProcessorError> {
        self.state.lock().unwrap().reversals.push((transfer_ref.to_string(), amount));
        Ok(())
    }

    async fn refund_charge(&self, charge_ref: &str, amount: Cents, _tag: &str) -> Result<(), ProcessorError> {
        self.state.lock().unwrap().refunds.push((charge_ref.to_string(), amount));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PushRecord {
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

#[derive(Clone, Default)]
pub struct TestPusher {
    fail: Arc<AtomicBool>,
    pushed: Arc<Mutex<Vec<PushRecord>>>,
}

impl TestPusher {
    pub fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn pushed(&self) -> Vec<PushRecord> {
        self.pushed.lock().unwrap().clone()
    }
}

impl PushGateway for TestPusher {
    async fn push_message(&self, device_token: &str, title: &str, body: &str, data: Value) -> bool {
        if self.fail.load(Ordering::SeqCst) {
            return false;
        }
        self.pushed.lock().unwrap().push(PushRecord {
            device_token: device_token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data,
        });
        true
    }
}
