use std::sync::Arc;

use paygate_core::paylink::{build_create_request, validate_request};
use paygate_core::{
    FieldErrors, PaymentLink, PaymentLinkRequest, PaymentSummary, ReconcileConfig,
    RequestContext,
};

use crate::engine::Collaborators;
use crate::error::ReconcileError;
use crate::trail::DecisionTrail;
use crate::traits::{AttendeeClient, GatewayClient};

const OPERATION: &str = "paylink";

/// Creates, inspects and cancels payment links at the gateway.
pub struct PaymentLinkOrchestrator {
    gateway: Arc<dyn GatewayClient>,
    attendees: Arc<dyn AttendeeClient>,
    trail: DecisionTrail,
    config: ReconcileConfig,
}

impl PaymentLinkOrchestrator {
    pub fn new(collaborators: &Collaborators, config: ReconcileConfig) -> Self {
        Self {
            gateway: collaborators.gateway.clone(),
            attendees: collaborators.attendees.clone(),
            trail: collaborators.trail(),
            config,
        }
    }

    /// Pure validation; `None` means the request is acceptable.
    pub fn validate_request(&self, data: &PaymentLinkRequest) -> Option<FieldErrors> {
        validate_request(data, &self.config.tenant_prefix)
    }

    pub async fn create_payment_link(
        &self,
        ctx: &RequestContext,
        data: &PaymentLinkRequest,
    ) -> Result<PaymentLink, ReconcileError> {
        if let Some(errs) = self.validate_request(data) {
            let fields: Vec<&str> = errs.fields().collect();
            return Err(ReconcileError::Validation(format!(
                "invalid fields: {}",
                fields.join(", ")
            )));
        }
        let reference_id = data.reference_id.as_str();
        let debitor_id = u32::try_from(data.debitor_id)
            .map_err(|e| ReconcileError::Validation(format!("debitor_id: {}", e)))?;

        let attendee = match self.attendees.get_attendee(debitor_id).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    reference_id,
                    debitor_id,
                    error = %e,
                    "attendee lookup failed"
                );
                let err = ReconcileError::from(e);
                self.fail(ctx, reference_id, "", "failed to look up attendee", &err, "attendee-lookup-err")
                    .await;
                return Err(err);
            }
        };

        let request = build_create_request(data, &attendee.email, &attendee.language, &self.config);
        let created = match self.gateway.create_payment_link(&request).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    reference_id,
                    error = %e,
                    "gateway refused payment link"
                );
                let err = ReconcileError::from(e);
                self.fail(ctx, reference_id, "", "failed to create payment link", &err, "create-paylink-err")
                    .await;
                return Err(err);
            }
        };

        tracing::info!(
            request_id = %ctx.request_id,
            reference_id,
            pay_id = %created.pay_id,
            amount = request.amount.value,
            "Payment link created"
        );
        self.trail
            .success(
                ctx,
                reference_id,
                &created.pay_id,
                "payment link created",
                created.link.clone(),
            )
            .await;

        Ok(PaymentLink::from_created(data, created.link, &self.config))
    }

    pub async fn get_payment(
        &self,
        ctx: &RequestContext,
        reference_id: &str,
    ) -> Result<PaymentSummary, ReconcileError> {
        match self.gateway.query_payment_link(reference_id).await {
            Ok(state) => {
                let summary = PaymentSummary::from_state(reference_id, &state);
                self.trail
                    .success(
                        ctx,
                        reference_id,
                        &summary.id,
                        "payment queried",
                        format!("status {}, paid {} {}", summary.status, summary.amount_paid, summary.currency),
                    )
                    .await;
                Ok(summary)
            }
            Err(e) => {
                let err = ReconcileError::from(e);
                self.fail(ctx, reference_id, "", "failed to query payment", &err, "query-paylink-err")
                    .await;
                Err(err)
            }
        }
    }

    /// Cancel a payment link. The open amount is read from the gateway first.
    pub async fn cancel_payment_link(
        &self,
        ctx: &RequestContext,
        reference_id: &str,
    ) -> Result<(), ReconcileError> {
        let state = match self.gateway.query_payment_link(reference_id).await {
            Ok(s) => s,
            Err(e) => {
                let err = ReconcileError::from(e);
                self.fail(ctx, reference_id, "", "failed to query payment before cancel", &err, "cancel-paylink-err")
                    .await;
                return Err(err);
            }
        };

        if let Err(e) = self
            .gateway
            .delete_payment_link(reference_id, &state.amount)
            .await
        {
            let err = ReconcileError::from(e);
            self.fail(ctx, reference_id, &state.pay_id, "failed to cancel payment link", &err, "cancel-paylink-err")
                .await;
            return Err(err);
        }

        tracing::info!(
            request_id = %ctx.request_id,
            reference_id,
            pay_id = %state.pay_id,
            "Payment link cancelled"
        );
        self.trail
            .success(ctx, reference_id, &state.pay_id, "payment link cancelled", state.amount.to_string())
            .await;
        Ok(())
    }

    async fn fail(
        &self,
        ctx: &RequestContext,
        reference_id: &str,
        api_id: &str,
        message: &str,
        err: &ReconcileError,
        status: &str,
    ) {
        self.trail
            .error(ctx, reference_id, api_id, message, err.to_string())
            .await;
        if err.is_escalated() {
            self.trail.escalate(ctx, OPERATION, reference_id, status).await;
        }
    }
}
