use std::sync::Arc;

use paygate_core::{AuditEntry, AuditKind, RequestContext};

use crate::traits::{AuditLog, NotificationClient};

/// Audit log plus escalation channel.
///
/// Both are best effort: failures are logged and swallowed so that neither
/// can change a decision or trigger another escalation.
#[derive(Clone)]
pub struct DecisionTrail {
    audit: Arc<dyn AuditLog>,
    notifier: Arc<dyn NotificationClient>,
}

impl DecisionTrail {
    pub fn new(audit: Arc<dyn AuditLog>, notifier: Arc<dyn NotificationClient>) -> Self {
        Self { audit, notifier }
    }

    pub async fn record(
        &self,
        ctx: &RequestContext,
        kind: AuditKind,
        reference_id: &str,
        api_id: &str,
        message: &str,
        details: impl Into<String>,
    ) {
        let entry = AuditEntry::new(ctx, kind, reference_id, api_id, message, details);
        if let Err(e) = self.audit.append(entry).await {
            tracing::error!(
                request_id = %ctx.request_id,
                reference_id,
                kind = %kind,
                error = %e,
                "failed to write audit entry"
            );
        }
    }

    pub async fn raw(&self, ctx: &RequestContext, reference_id: &str, message: &str, details: impl Into<String>) {
        self.record(ctx, AuditKind::Raw, reference_id, "", message, details).await;
    }

    pub async fn success(
        &self,
        ctx: &RequestContext,
        reference_id: &str,
        api_id: &str,
        message: &str,
        details: impl Into<String>,
    ) {
        self.record(ctx, AuditKind::Success, reference_id, api_id, message, details)
            .await;
    }

    pub async fn warning(
        &self,
        ctx: &RequestContext,
        reference_id: &str,
        api_id: &str,
        message: &str,
        details: impl Into<String>,
    ) {
        self.record(ctx, AuditKind::Warning, reference_id, api_id, message, details)
            .await;
    }

    pub async fn error(
        &self,
        ctx: &RequestContext,
        reference_id: &str,
        api_id: &str,
        message: &str,
        details: impl Into<String>,
    ) {
        self.record(ctx, AuditKind::Error, reference_id, api_id, message, details)
            .await;
    }

    /// Send an escalation mail. Never fails.
    pub async fn escalate(&self, ctx: &RequestContext, operation: &str, reference_id: &str, status: &str) {
        tracing::warn!(
            request_id = %ctx.request_id,
            operation,
            reference_id,
            status,
            "escalating to operators"
        );
        if let Err(e) = self.notifier.notify(operation, reference_id, status).await {
            tracing::error!(
                request_id = %ctx.request_id,
                operation,
                reference_id,
                error = %e,
                "failed to send escalation mail"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeAudit, FakeNotifier};

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let audit = Arc::new(FakeAudit::new());
        let notifier = Arc::new(FakeNotifier::new());
        let trail = DecisionTrail::new(audit.clone(), notifier.clone());
        let ctx = RequestContext::with_request_id("req-1");

        audit.fail_next();
        notifier.fail_next();
        trail.error(&ctx, "REF", "", "boom", "").await;
        trail.escalate(&ctx, "webhook", "REF", "update-tx-err").await;

        // the notifier records the failed attempt, the audit log does not
        assert_eq!(audit.entries().len(), 0);
        assert_eq!(notifier.calls().len(), 1);

        trail.success(&ctx, "REF", "pay-1", "ok", "").await;
        let entries = audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].request_id, "req-1");
    }
}
