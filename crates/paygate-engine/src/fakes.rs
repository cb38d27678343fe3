//! Fake collaborators for tests.
//!
//! Each fake is constructed fresh per test, records every call it receives
//! and can be told to fail the next call of a given operation. There is no
//! shared state between instances.

use async_trait::async_trait;
use dashmap::DashMap;
use paygate_core::{
    AuditEntry, AuditKind, CreatePaymentRequest, CreatedPaymentLink, GatewayPaymentState,
    LedgerTransaction, Money,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::adapters::memory::{MemoryAttendees, MemoryLedger};
use crate::clock::FixedClock;
use crate::engine::Collaborators;
use crate::error::{AttendeeError, AuditError, GatewayError, LedgerError, NotifyError};
use crate::traits::{
    Attendee, AttendeeClient, AuditLog, GatewayClient, LedgerClient, NotificationClient,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// --- gateway ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Create,
    Query,
    Delete,
}

#[derive(Default)]
pub struct FakeGateway {
    payments: DashMap<String, GatewayPaymentState>,
    faults: Mutex<HashMap<GatewayOp, GatewayError>>,
    calls: Mutex<Vec<(GatewayOp, String)>>,
    created: Mutex<Vec<CreatePaymentRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the payment the gateway reports for `state.trans_id`.
    pub fn insert(&self, state: GatewayPaymentState) {
        self.payments.insert(state.trans_id.clone(), state);
    }

    pub fn fail_next(&self, op: GatewayOp, err: GatewayError) {
        lock(&self.faults).insert(op, err);
    }

    pub fn calls(&self) -> Vec<(GatewayOp, String)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, op: GatewayOp) -> usize {
        lock(&self.calls).iter().filter(|(o, _)| *o == op).count()
    }

    pub fn created_requests(&self) -> Vec<CreatePaymentRequest> {
        lock(&self.created).clone()
    }

    fn enter(&self, op: GatewayOp, id: &str) -> Result<(), GatewayError> {
        lock(&self.calls).push((op, id.to_string()));
        match lock(&self.faults).remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn create_payment_link(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatedPaymentLink, GatewayError> {
        self.enter(GatewayOp::Create, &request.trans_id)?;
        lock(&self.created).push(request.clone());
        let pay_id = format!("fake-{}", self.payments.len() + 1);
        self.insert(GatewayPaymentState {
            pay_id: pay_id.clone(),
            trans_id: request.trans_id.clone(),
            status: "CREATED".into(),
            response_code: String::new(),
            response_description: String::new(),
            amount: Money::new(request.amount.value, request.amount.currency.clone()),
            captured: None,
            payment_method: String::new(),
        });
        Ok(CreatedPaymentLink {
            pay_id,
            link: format!("http://localhost:1111/some/paylink/{}", request.trans_id),
        })
    }

    async fn query_payment_link(
        &self,
        reference_id: &str,
    ) -> Result<GatewayPaymentState, GatewayError> {
        self.enter(GatewayOp::Query, reference_id)?;
        self.payments
            .get(reference_id)
            .map(|s| s.clone())
            .ok_or_else(|| GatewayError::NotFound(reference_id.to_string()))
    }

    async fn delete_payment_link(
        &self,
        reference_id: &str,
        _amount: &Money,
    ) -> Result<(), GatewayError> {
        self.enter(GatewayOp::Delete, reference_id)?;
        self.payments
            .remove(reference_id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(reference_id.to_string()))
    }

    fn gateway_id(&self) -> &str {
        "gw-fake"
    }
}

// --- ledger -----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    Get,
    Add,
    Update,
}

#[derive(Default)]
pub struct FakeLedger {
    inner: MemoryLedger,
    faults: Mutex<HashMap<LedgerOp, LedgerError>>,
    calls: Mutex<Vec<(LedgerOp, String)>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tx: LedgerTransaction) {
        self.inner.insert(tx);
    }

    pub fn get(&self, reference_id: &str) -> Option<LedgerTransaction> {
        self.inner.get(reference_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn fail_next(&self, op: LedgerOp, err: LedgerError) {
        lock(&self.faults).insert(op, err);
    }

    pub fn calls(&self) -> Vec<(LedgerOp, String)> {
        lock(&self.calls).clone()
    }

    /// Number of add and update calls.
    pub fn writes(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(op, _)| *op != LedgerOp::Get)
            .count()
    }

    fn enter(&self, op: LedgerOp, id: &str) -> Result<(), LedgerError> {
        lock(&self.calls).push((op, id.to_string()));
        match lock(&self.faults).remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn get_transaction_by_reference_id(
        &self,
        reference_id: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        self.enter(LedgerOp::Get, reference_id)?;
        self.inner.get_transaction_by_reference_id(reference_id).await
    }

    async fn add_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        self.enter(LedgerOp::Add, &tx.id)?;
        self.inner.add_transaction(tx).await
    }

    async fn update_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        self.enter(LedgerOp::Update, &tx.id)?;
        self.inner.update_transaction(tx).await
    }
}

// --- notifications ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub operation: String,
    pub reference_id: String,
    pub status: String,
}

#[derive(Default)]
pub struct FakeNotifier {
    calls: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Every attempted notification, including failed ones.
    pub fn calls(&self) -> Vec<Notification> {
        lock(&self.calls).clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|n| n.status.clone()).collect()
    }
}

#[async_trait]
impl NotificationClient for FakeNotifier {
    async fn notify(
        &self,
        operation: &str,
        reference_id: &str,
        status: &str,
    ) -> Result<(), NotifyError> {
        lock(&self.calls).push(Notification {
            operation: operation.to_string(),
            reference_id: reference_id.to_string(),
            status: status.to_string(),
        });
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(NotifyError("mail service unavailable".into()));
        }
        Ok(())
    }
}

// --- audit ------------------------------------------------------------------

#[derive(Default)]
pub struct FakeAudit {
    entries: Mutex<Vec<AuditEntry>>,
    fail: AtomicBool,
}

impl FakeAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Successfully written entries, in order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        lock(&self.entries).clone()
    }

    pub fn kinds(&self) -> Vec<AuditKind> {
        lock(&self.entries).iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: AuditKind) -> usize {
        lock(&self.entries).iter().filter(|e| e.kind == kind).count()
    }

    /// Entries other than raw payload dumps.
    pub fn decision_count(&self) -> usize {
        lock(&self.entries).iter().filter(|e| e.is_decision()).count()
    }
}

#[async_trait]
impl AuditLog for FakeAudit {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(AuditError("audit store unavailable".into()));
        }
        lock(&self.entries).push(entry);
        Ok(())
    }
}

// --- attendees --------------------------------------------------------------

#[derive(Default)]
pub struct FakeAttendees {
    inner: MemoryAttendees,
    fault: Mutex<Option<AttendeeError>>,
    calls: Mutex<Vec<u32>>,
}

impl FakeAttendees {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, attendee: Attendee) {
        self.inner.insert(attendee);
    }

    pub fn fail_next(&self, err: AttendeeError) {
        *lock(&self.fault) = Some(err);
    }

    pub fn calls(&self) -> Vec<u32> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl AttendeeClient for FakeAttendees {
    async fn get_attendee(&self, debitor_id: u32) -> Result<Attendee, AttendeeError> {
        lock(&self.calls).push(debitor_id);
        if let Some(err) = lock(&self.fault).take() {
            return Err(err);
        }
        self.inner.get_attendee(debitor_id).await
    }
}

// --- bundle -----------------------------------------------------------------

/// One fresh fake per collaborator, with handles kept for inspection.
pub struct Fakes {
    pub gateway: Arc<FakeGateway>,
    pub ledger: Arc<FakeLedger>,
    pub notifier: Arc<FakeNotifier>,
    pub audit: Arc<FakeAudit>,
    pub attendees: Arc<FakeAttendees>,
    pub clock: Arc<FixedClock>,
}

impl Fakes {
    pub fn new(today: chrono::NaiveDate) -> Self {
        Self {
            gateway: Arc::new(FakeGateway::new()),
            ledger: Arc::new(FakeLedger::new()),
            notifier: Arc::new(FakeNotifier::new()),
            audit: Arc::new(FakeAudit::new()),
            attendees: Arc::new(FakeAttendees::new()),
            clock: Arc::new(FixedClock(today)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            gateway: self.gateway.clone(),
            ledger: self.ledger.clone(),
            notifier: self.notifier.clone(),
            audit: self.audit.clone(),
            attendees: self.attendees.clone(),
            clock: self.clock.clone(),
        }
    }
}
