use async_trait::async_trait;
use dashmap::DashMap;
use paygate_core::{AuditEntry, LedgerTransaction};
use std::sync::Mutex;

use crate::error::{AttendeeError, AuditError, LedgerError, NotifyError};
use crate::traits::{Attendee, AttendeeClient, AuditLog, LedgerClient, NotificationClient};

/// Ledger held in process memory, keyed by reference id.
///
/// Stands in for the payment service in local deployments.
#[derive(Default)]
pub struct MemoryLedger {
    transactions: DashMap<String, LedgerTransaction>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tx: LedgerTransaction) {
        self.transactions.insert(tx.id.clone(), tx);
    }

    pub fn get(&self, reference_id: &str) -> Option<LedgerTransaction> {
        self.transactions.get(reference_id).map(|t| t.clone())
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn get_transaction_by_reference_id(
        &self,
        reference_id: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        self.get(reference_id)
            .ok_or_else(|| LedgerError::NotFound(reference_id.to_string()))
    }

    async fn add_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        if self.transactions.contains_key(&tx.id) {
            return Err(LedgerError::Downstream(format!(
                "transaction {} already exists",
                tx.id
            )));
        }
        tracing::debug!(reference_id = %tx.id, status = %tx.status, "Ledger transaction added");
        self.insert(tx.clone());
        Ok(())
    }

    async fn update_transaction(&self, tx: &LedgerTransaction) -> Result<(), LedgerError> {
        let mut existing = self
            .transactions
            .get_mut(&tx.id)
            .ok_or_else(|| LedgerError::NotFound(tx.id.clone()))?;
        *existing = tx.clone();
        tracing::debug!(reference_id = %tx.id, status = %tx.status, "Ledger transaction updated");
        Ok(())
    }
}

/// Audit entries kept in memory, in append order.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn for_reference(&self, reference_id: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.reference_id == reference_id)
            .collect()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AuditError(e.to_string()))?;
        entries.push(entry);
        Ok(())
    }
}

/// Attendee directory held in memory.
///
/// Debitors without a seeded contact get a placeholder address so payment
/// links can be created on a node with no attendee service.
#[derive(Default)]
pub struct MemoryAttendees {
    attendees: DashMap<u32, Attendee>,
}

impl MemoryAttendees {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, attendee: Attendee) {
        self.attendees.insert(attendee.id, attendee);
    }
}

#[async_trait]
impl AttendeeClient for MemoryAttendees {
    async fn get_attendee(&self, debitor_id: u32) -> Result<Attendee, AttendeeError> {
        let attendee = match self.attendees.get(&debitor_id) {
            Some(known) => known.clone(),
            None => Attendee {
                id: debitor_id,
                email: format!("debitor-{}@localhost", debitor_id),
                language: "en-US".into(),
            },
        };
        Ok(attendee)
    }
}

/// Escalations that only go to the log. Used when no mail service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationClient for LogNotifier {
    async fn notify(
        &self,
        operation: &str,
        reference_id: &str,
        status: &str,
    ) -> Result<(), NotifyError> {
        tracing::warn!(operation, reference_id, status, "escalation (no mail service configured)");
        Ok(())
    }
}
