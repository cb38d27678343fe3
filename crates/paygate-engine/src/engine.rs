//! The reconciliation engine.
//!
//! One decision procedure with two entry points: [`ReconciliationEngine::handle_webhook`]
//! (push, untrusted) and [`ReconciliationEngine::check_payment_status`] (pull,
//! operator triggered). They differ only in where the canonical gateway state
//! comes from. Every branch writes to the audit trail before returning.
//!
//! There is no locking per reference id. Duplicate deliveries are safe
//! because a transaction that is already `valid` is never written again.

use std::sync::Arc;

use paygate_core::reference::{debitor_id_of, has_tenant_prefix};
use paygate_core::types::{
    is_recognized_status, is_settled_status, RESPONSE_CODE_OK, STATUS_UNKNOWN,
};
use paygate_core::{
    GatewayPaymentState, LedgerAmount, LedgerTransaction, Money, NormalizedWebhook,
    PaymentMethod, PaymentSummary, ReconcileConfig, RequestContext, TransactionStatus,
    TransactionType, WebhookEvent,
};

use crate::clock::Clock;
use crate::error::{GatewayError, LedgerError, ReconcileError};
use crate::trail::DecisionTrail;
use crate::traits::{AttendeeClient, AuditLog, GatewayClient, LedgerClient, NotificationClient};

/// Every collaborator the engine and the orchestrator need, injected once.
#[derive(Clone)]
pub struct Collaborators {
    pub gateway: Arc<dyn GatewayClient>,
    pub ledger: Arc<dyn LedgerClient>,
    pub notifier: Arc<dyn NotificationClient>,
    pub audit: Arc<dyn AuditLog>,
    pub attendees: Arc<dyn AttendeeClient>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    pub fn trail(&self) -> DecisionTrail {
        DecisionTrail::new(self.audit.clone(), self.notifier.clone())
    }
}

/// Why a reconciliation finished without touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Reference id belongs to another tenant.
    TenantMismatch,
    /// Gateway status is not one we reconcile.
    UnsupportedStatus(String),
    /// Informational webhook event.
    Notice(String),
    /// Webhook event type we do not handle.
    UnexpectedEvent(String),
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Ignored(IgnoreReason),
    /// No ledger transaction existed; a `pending` one was created for review.
    Recovered,
    /// No ledger transaction existed and the debitor could not be determined.
    Unattributable,
    /// The ledger transaction had already left the updatable states.
    AlreadySettled { status: TransactionStatus },
    Updated {
        status: TransactionStatus,
        amount_mismatch: bool,
        status_unsettled: bool,
    },
}

impl Decision {
    /// Outcomes the caller of a status check should see as a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadySettled { .. }
                | Self::Updated {
                    amount_mismatch: true,
                    ..
                }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub reference_id: String,
    pub decision: Decision,
    /// Flattened gateway payment, when the gateway was asked.
    pub payment: Option<PaymentSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Webhook,
    StatusCheck,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::StatusCheck => "status-check",
        }
    }
}

/// Gateway state the decision is based on.
struct Canonical {
    reference_id: String,
    pay_id: String,
    status: String,
    /// Gateway response code. `None` when the gateway was not asked.
    response_code: Option<String>,
    /// Verified amount: what the gateway actually captured. `None` when the
    /// gateway could not be asked.
    amount: Option<Money>,
    /// Amount to book during recovery when nothing was captured: the ordered
    /// amount when verified, the webhook's claim otherwise.
    ordered: Money,
    payment: Option<PaymentSummary>,
}

impl Canonical {
    fn verified(reference_id: &str, state: GatewayPaymentState) -> Self {
        let payment = PaymentSummary::from_state(reference_id, &state);
        let captured = Money::new(state.captured.unwrap_or(0), state.amount.currency.clone());
        Self {
            reference_id: reference_id.to_string(),
            pay_id: state.pay_id,
            status: state.status,
            response_code: Some(state.response_code),
            amount: Some(captured),
            ordered: state.amount,
            payment: Some(payment),
        }
    }

    /// Webhook claim taken as is.
    fn claimed(event: &WebhookEvent, status: &str, amount: Option<Money>) -> Self {
        Self {
            reference_id: event.trans_id.clone(),
            pay_id: event.pay_id.clone(),
            status: status.to_string(),
            response_code: None,
            amount,
            ordered: event.amount.clone(),
            payment: None,
        }
    }

    /// Whether the gateway reports the payment as fully processed.
    fn is_settled(&self) -> bool {
        is_settled_status(&self.status)
            && self
                .response_code
                .as_deref()
                .map_or(true, |code| code == RESPONSE_CODE_OK)
    }
}

pub struct ReconciliationEngine {
    gateway: Arc<dyn GatewayClient>,
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn Clock>,
    trail: DecisionTrail,
    config: ReconcileConfig,
}

impl ReconciliationEngine {
    pub fn new(collaborators: &Collaborators, config: ReconcileConfig) -> Self {
        tracing::info!(
            gateway_id = collaborators.gateway.gateway_id(),
            gateway_configured = config.gateway_configured,
            tenant_prefix = %config.tenant_prefix,
            "Reconciliation engine ready"
        );
        Self {
            gateway: collaborators.gateway.clone(),
            ledger: collaborators.ledger.clone(),
            clock: collaborators.clock.clone(),
            trail: collaborators.trail(),
            config,
        }
    }

    /// Write the unparsed webhook body as a raw audit entry.
    pub async fn log_raw_webhook(&self, ctx: &RequestContext, body: &str) {
        tracing::info!(request_id = %ctx.request_id, body, "webhook received");
        self.trail.raw(ctx, "", "webhook body", body).await;
    }

    /// Dispatch a normalized webhook.
    pub async fn handle_normalized(
        &self,
        ctx: &RequestContext,
        webhook: NormalizedWebhook,
    ) -> Result<Reconciliation, ReconcileError> {
        match webhook {
            NormalizedWebhook::Payment(event) => self.handle_webhook(ctx, event).await,
            NormalizedWebhook::Notice {
                event,
                reference_id,
                api_id,
                details,
            } => {
                tracing::info!(
                    request_id = %ctx.request_id,
                    event = %event,
                    reference_id = %reference_id,
                    "webhook notice"
                );
                self.trail
                    .success(
                        ctx,
                        &reference_id,
                        &api_id,
                        &format!("webhook event {} received", event),
                        details,
                    )
                    .await;
                Ok(Reconciliation {
                    reference_id,
                    decision: Decision::Ignored(IgnoreReason::Notice(event)),
                    payment: None,
                })
            }
            NormalizedWebhook::Unexpected { event, webhook_id } => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    event = %event,
                    webhook_id = %webhook_id,
                    "unexpected webhook event"
                );
                self.trail
                    .error(
                        ctx,
                        "",
                        &webhook_id,
                        &format!("unexpected webhook event {}", event),
                        format!("webhook id {}", webhook_id),
                    )
                    .await;
                self.trail
                    .escalate(ctx, Trigger::Webhook.as_str(), &webhook_id, "unexpected-event")
                    .await;
                Ok(Reconciliation {
                    reference_id: String::new(),
                    decision: Decision::Ignored(IgnoreReason::UnexpectedEvent(event)),
                    payment: None,
                })
            }
        }
    }

    /// Push path: a gateway notification claims a payment happened.
    pub async fn handle_webhook(
        &self,
        ctx: &RequestContext,
        event: WebhookEvent,
    ) -> Result<Reconciliation, ReconcileError> {
        let reference_id = event.trans_id.clone();
        tracing::info!(
            request_id = %ctx.request_id,
            reference_id = %reference_id,
            pay_id = %event.pay_id,
            status = %event.status,
            "Handling webhook"
        );

        if let Some(ignored) = self
            .tenant_gate(ctx, Trigger::Webhook, &reference_id, &event.pay_id)
            .await
        {
            return Ok(ignored);
        }

        let canonical = if !self.config.gateway_configured {
            // no gateway to ask, the notification is all we have
            Canonical::claimed(&event, &event.status, Some(event.amount.clone()))
        } else {
            match self.gateway.query_payment_link(&reference_id).await {
                Ok(state) => Canonical::verified(&reference_id, state),
                Err(e) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        reference_id = %reference_id,
                        error = %e,
                        "could not verify webhook with gateway, continuing unverified"
                    );
                    self.trail
                        .warning(
                            ctx,
                            &reference_id,
                            &event.pay_id,
                            "webhook could not be verified with gateway",
                            e.to_string(),
                        )
                        .await;
                    self.trail
                        .escalate(
                            ctx,
                            Trigger::Webhook.as_str(),
                            &reference_id,
                            "gateway-query-err",
                        )
                        .await;
                    Canonical::claimed(&event, STATUS_UNKNOWN, None)
                }
            }
        };

        // a verified status overrides the claim
        let gate_status = if canonical.status == STATUS_UNKNOWN {
            event.status.as_str()
        } else {
            canonical.status.as_str()
        };
        if let Some(ignored) = self
            .status_gate(ctx, Trigger::Webhook, &canonical, gate_status)
            .await
        {
            return Ok(ignored);
        }

        self.reconcile_ledger(ctx, Trigger::Webhook, canonical).await
    }

    /// Pull path: re-query the gateway and reconcile the ledger against it.
    pub async fn check_payment_status(
        &self,
        ctx: &RequestContext,
        reference_id: &str,
    ) -> Result<Reconciliation, ReconcileError> {
        tracing::info!(request_id = %ctx.request_id, reference_id, "Checking payment status");

        if let Some(ignored) = self
            .tenant_gate(ctx, Trigger::StatusCheck, reference_id, "")
            .await
        {
            return Ok(ignored);
        }

        if !self.config.gateway_configured {
            self.trail
                .error(
                    ctx,
                    reference_id,
                    "",
                    "status check impossible, no gateway configured",
                    "",
                )
                .await;
            self.trail
                .escalate(
                    ctx,
                    Trigger::StatusCheck.as_str(),
                    reference_id,
                    "gateway-not-configured",
                )
                .await;
            return Err(GatewayError::NotConfigured.into());
        }

        let state = match self.gateway.query_payment_link(reference_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    reference_id,
                    error = %e,
                    "gateway query failed"
                );
                self.trail
                    .error(ctx, reference_id, "", "failed to query gateway", e.to_string())
                    .await;
                if !matches!(e, GatewayError::NotFound(_)) {
                    self.trail
                        .escalate(
                            ctx,
                            Trigger::StatusCheck.as_str(),
                            reference_id,
                            "gateway-query-err",
                        )
                        .await;
                }
                return Err(e.into());
            }
        };

        let canonical = Canonical::verified(reference_id, state);

        if let Some(ignored) = self
            .status_gate(ctx, Trigger::StatusCheck, &canonical, &canonical.status)
            .await
        {
            return Ok(ignored);
        }

        self.reconcile_ledger(ctx, Trigger::StatusCheck, canonical).await
    }

    async fn tenant_gate(
        &self,
        ctx: &RequestContext,
        trigger: Trigger,
        reference_id: &str,
        api_id: &str,
    ) -> Option<Reconciliation> {
        if has_tenant_prefix(reference_id, &self.config.tenant_prefix) {
            return None;
        }
        tracing::warn!(
            request_id = %ctx.request_id,
            reference_id,
            tenant_prefix = %self.config.tenant_prefix,
            "reference id belongs to another tenant, ignoring"
        );
        self.trail
            .error(
                ctx,
                reference_id,
                api_id,
                "reference id prefix mismatch",
                format!("expected prefix {}", self.config.tenant_prefix),
            )
            .await;
        self.trail
            .escalate(ctx, trigger.as_str(), reference_id, "ref-id-prefix-mismatch")
            .await;
        Some(Reconciliation {
            reference_id: reference_id.to_string(),
            decision: Decision::Ignored(IgnoreReason::TenantMismatch),
            payment: None,
        })
    }

    async fn status_gate(
        &self,
        ctx: &RequestContext,
        trigger: Trigger,
        canonical: &Canonical,
        status: &str,
    ) -> Option<Reconciliation> {
        if is_recognized_status(status) {
            return None;
        }
        tracing::warn!(
            request_id = %ctx.request_id,
            reference_id = %canonical.reference_id,
            status,
            "unexpected payment status, ignoring"
        );
        self.trail
            .error(
                ctx,
                &canonical.reference_id,
                &canonical.pay_id,
                "unexpected payment status",
                format!("status {}", status),
            )
            .await;
        self.trail
            .escalate(
                ctx,
                trigger.as_str(),
                &canonical.reference_id,
                &format!("unexpected-status-{}", status),
            )
            .await;
        Some(Reconciliation {
            reference_id: canonical.reference_id.clone(),
            decision: Decision::Ignored(IgnoreReason::UnsupportedStatus(status.to_string())),
            payment: canonical.payment.clone(),
        })
    }

    async fn reconcile_ledger(
        &self,
        ctx: &RequestContext,
        trigger: Trigger,
        canonical: Canonical,
    ) -> Result<Reconciliation, ReconcileError> {
        match self
            .ledger
            .get_transaction_by_reference_id(&canonical.reference_id)
            .await
        {
            Ok(tx) => self.update(ctx, trigger, canonical, tx).await,
            Err(LedgerError::NotFound(_)) => self.recover(ctx, trigger, canonical).await,
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    reference_id = %canonical.reference_id,
                    error = %e,
                    "failed to read ledger transaction"
                );
                self.trail
                    .error(
                        ctx,
                        &canonical.reference_id,
                        &canonical.pay_id,
                        "failed to read ledger transaction",
                        e.to_string(),
                    )
                    .await;
                self.trail
                    .escalate(ctx, trigger.as_str(), &canonical.reference_id, "ledger-read-err")
                    .await;
                Err(e.into())
            }
        }
    }

    /// No ledger transaction exists: create a pending one for manual review,
    /// but only if the debitor can be read from the reference id.
    async fn recover(
        &self,
        ctx: &RequestContext,
        trigger: Trigger,
        canonical: Canonical,
    ) -> Result<Reconciliation, ReconcileError> {
        let reference_id = canonical.reference_id.clone();

        let debitor_id = match debitor_id_of(&reference_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    reference_id = %reference_id,
                    error = %e,
                    "cannot attribute payment"
                );
                self.trail
                    .error(
                        ctx,
                        &reference_id,
                        &canonical.pay_id,
                        "no transaction and could not parse debitor id, nothing created",
                        e.to_string(),
                    )
                    .await;
                self.trail
                    .escalate(ctx, trigger.as_str(), &reference_id, "parse-refid-err")
                    .await;
                return Ok(Reconciliation {
                    reference_id,
                    decision: Decision::Unattributable,
                    payment: canonical.payment,
                });
            }
        };

        let amount = match &canonical.amount {
            Some(captured) if captured.value > 0 => captured.clone(),
            _ => canonical.ordered.clone(),
        };
        let today = self.clock.today();
        let tx = LedgerTransaction {
            id: reference_id.clone(),
            debitor_id,
            kind: TransactionType::Payment,
            method: PaymentMethod::Credit,
            amount: LedgerAmount {
                gross_cent: amount.value,
                currency: amount.currency.clone(),
                vat_rate: self.config.default_vat_rate,
            },
            comment: format!("CC paymentId {} (auto created, needs review)", canonical.pay_id),
            status: TransactionStatus::Pending,
            effective_date: today,
            due_date: today,
        };

        if let Err(e) = self.ledger.add_transaction(&tx).await {
            tracing::error!(
                request_id = %ctx.request_id,
                reference_id = %reference_id,
                error = %e,
                "failed to create missing transaction"
            );
            self.trail
                .error(
                    ctx,
                    &reference_id,
                    &canonical.pay_id,
                    "failed to create missing transaction",
                    e.to_string(),
                )
                .await;
            self.trail
                .escalate(ctx, trigger.as_str(), &reference_id, "create-missing-err")
                .await;
            return Err(e.into());
        }

        tracing::warn!(
            request_id = %ctx.request_id,
            reference_id = %reference_id,
            debitor_id,
            amount = %amount,
            "created missing transaction in pending state"
        );
        self.trail
            .warning(
                ctx,
                &reference_id,
                &canonical.pay_id,
                "created missing transaction, needs review",
                format!("debitor {}, amount {}", debitor_id, amount),
            )
            .await;
        self.trail
            .escalate(
                ctx,
                trigger.as_str(),
                &reference_id,
                "create-missing-pending-success (needs review)",
            )
            .await;
        Ok(Reconciliation {
            reference_id,
            decision: Decision::Recovered,
            payment: canonical.payment,
        })
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        trigger: Trigger,
        canonical: Canonical,
        mut tx: LedgerTransaction,
    ) -> Result<Reconciliation, ReconcileError> {
        let reference_id = canonical.reference_id.clone();
        let api_id = canonical.pay_id.clone();

        if !tx.status.is_updatable() {
            tracing::info!(
                request_id = %ctx.request_id,
                reference_id = %reference_id,
                ledger_status = %tx.status,
                gateway_status = %canonical.status,
                "transaction already settled, not updating"
            );
            self.trail
                .warning(
                    ctx,
                    &reference_id,
                    &api_id,
                    "aborting update, transaction already settled",
                    format!(
                        "ledger status {}, gateway status {}",
                        tx.status, canonical.status
                    ),
                )
                .await;
            self.trail
                .escalate(ctx, trigger.as_str(), &reference_id, "abort-update-for-valid")
                .await;
            return Ok(Reconciliation {
                reference_id,
                decision: Decision::AlreadySettled { status: tx.status },
                payment: canonical.payment,
            });
        }

        let mut amount_mismatch = false;
        if let Some(verified) = &canonical.amount {
            if !tx.amount.matches(verified) {
                amount_mismatch = true;
                let details = format!(
                    "ledger {} {}, gateway {}",
                    tx.amount.gross_cent, tx.amount.currency, verified
                );
                tracing::warn!(
                    request_id = %ctx.request_id,
                    reference_id = %reference_id,
                    details = %details,
                    "amount mismatch"
                );
                self.trail
                    .warning(
                        ctx,
                        &reference_id,
                        &api_id,
                        "amount or currency differs, keeping pending",
                        details,
                    )
                    .await;
                self.trail
                    .escalate(
                        ctx,
                        trigger.as_str(),
                        &reference_id,
                        "amount-difference-kept-pending-please-check",
                    )
                    .await;
                // nothing captured yet is no amount to correct to
                if verified.value > 0 {
                    tx.amount.gross_cent = verified.value;
                    tx.amount.currency = verified.currency.clone();
                }
            }
        }

        let status_unsettled = !canonical.is_settled();
        if status_unsettled {
            tracing::warn!(
                request_id = %ctx.request_id,
                reference_id = %reference_id,
                status = %canonical.status,
                "gateway status not settled"
            );
            self.trail
                .warning(
                    ctx,
                    &reference_id,
                    &api_id,
                    "gateway status not OK, keeping pending",
                    format!(
                        "status {}, response code {}",
                        canonical.status,
                        canonical.response_code.as_deref().unwrap_or("-")
                    ),
                )
                .await;
            self.trail
                .escalate(
                    ctx,
                    trigger.as_str(),
                    &reference_id,
                    "upstream-status-not-OK-kept-pending-please-check",
                )
                .await;
        }

        tx.status = if amount_mismatch || status_unsettled {
            TransactionStatus::Pending
        } else {
            TransactionStatus::Valid
        };
        tx.effective_date = self.clock.today();
        tx.append_comment(&format!(
            "CC paymentId {} - status {}",
            canonical.pay_id, canonical.status
        ));

        if let Err(e) = self.ledger.update_transaction(&tx).await {
            tracing::error!(
                request_id = %ctx.request_id,
                reference_id = %reference_id,
                error = %e,
                "failed to update ledger transaction"
            );
            self.trail
                .error(ctx, &reference_id, &api_id, "failed to update transaction", e.to_string())
                .await;
            self.trail
                .escalate(ctx, trigger.as_str(), &reference_id, "update-tx-err")
                .await;
            return Err(e.into());
        }

        tracing::info!(
            request_id = %ctx.request_id,
            reference_id = %reference_id,
            status = %tx.status,
            "ledger transaction updated"
        );
        self.trail
            .success(
                ctx,
                &reference_id,
                &api_id,
                "transaction updated",
                format!(
                    "status {}, amount {} {}, effective {}",
                    tx.status,
                    tx.amount.gross_cent,
                    tx.amount.currency,
                    tx.effective_date.format("%Y-%m-%d")
                ),
            )
            .await;

        Ok(Reconciliation {
            reference_id,
            decision: Decision::Updated {
                status: tx.status,
                amount_mismatch,
                status_unsettled,
            },
            payment: canonical.payment,
        })
    }
}
