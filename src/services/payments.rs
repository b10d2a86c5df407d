use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::order::ActiveModel as OrderActiveModel,
    errors::{OrderError, ServiceError},
    models::order::{
        annotate_verification, BankTransferInstructions, LineItem, OrderStatus, PaymentMethod,
    },
    services::{
        lifecycle::OrderLifecycle,
        orders::OrderView,
        pricing::{price_checkout, CheckoutRequest, PricingPolicy},
    },
};

/// One selectable payment method for the checkout page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub method: PaymentMethod,
    #[schema(example = "Bank Transfer")]
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankTransferInstructions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptions {
    pub options: Vec<PaymentOption>,
    pub lead_time_hours: i64,
}

/// A PENDING order awaiting payment confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
    #[schema(example = "Pending payment order created.")]
    pub message: String,
    pub order_id: i32,
    pub order_code: String,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "634.00")]
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub delivery_date: DateTime<Utc>,
    pub items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankTransferInstructions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    #[schema(example = "Order confirmed successfully.")]
    pub message: String,
    pub order_id: i32,
    pub order_code: String,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "634.00")]
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub email_sent: bool,
    pub sms_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBankTransferRequest {
    pub verified: bool,
    #[serde(default)]
    #[validate(length(max = 500, message = "Notes are limited to 500 characters"))]
    pub notes: Option<String>,
}

/// Service for the two-step payment flow and bank-transfer verification
#[derive(Clone)]
pub struct PaymentService {
    lifecycle: Arc<OrderLifecycle>,
    policy: PricingPolicy,
}

impl PaymentService {
    pub fn new(lifecycle: Arc<OrderLifecycle>, policy: PricingPolicy) -> Self {
        Self { lifecycle, policy }
    }

    /// Payment methods offered at checkout, with the bank account for transfers.
    pub fn payment_options(&self) -> PaymentOptions {
        PaymentOptions {
            options: vec![
                PaymentOption {
                    method: PaymentMethod::CashOnDelivery,
                    label: PaymentMethod::CashOnDelivery.label().to_string(),
                    description: "Pay in cash when your order is delivered.".to_string(),
                    bank_details: None,
                },
                PaymentOption {
                    method: PaymentMethod::BankTransfer,
                    label: PaymentMethod::BankTransfer.label().to_string(),
                    description: "Transfer the total to our account and share the transfer reference.".to_string(),
                    bank_details: Some(self.policy.bank_details.clone()),
                },
            ],
            lead_time_hours: self.policy.lead_time.num_hours(),
        }
    }

    /// Records a PENDING order without notifying the customer.
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    pub async fn create_payment(
        &self,
        request: CheckoutRequest,
    ) -> Result<PendingPayment, ServiceError> {
        let draft = price_checkout(request, &self.policy, Utc::now())?;
        let items = draft.items.clone();
        let order = self.lifecycle.reserve_order(draft).await?;

        let bank_details = match order.payment_method {
            PaymentMethod::BankTransfer => Some(self.policy.bank_details.clone()),
            PaymentMethod::CashOnDelivery => None,
        };

        Ok(PendingPayment {
            message: "Pending payment order created.".to_string(),
            order_id: order.id,
            order_code: order.order_code,
            status: order.status,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            delivery_date: order.delivery_date,
            items,
            bank_details,
        })
    }

    /// Confirms payment for an order and sends the confirmation.
    ///
    /// Bank transfers become PAID, cash orders CONFIRMED. Confirming again re-runs the
    /// same transition and re-sends notifications.
    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: i32,
    ) -> Result<PaymentConfirmation, ServiceError> {
        let existing = self.lifecycle.find_order(order_id).await?;
        let status = existing.payment_method.confirmed_status();

        let mut active: OrderActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let transitioned = active.update(self.lifecycle.db()).await.map_err(|e| {
            error!(error = %e, order_id, "Failed to confirm order payment");
            ServiceError::DatabaseError(e)
        })?;

        let order = self.lifecycle.realize_order(transitioned).await?;
        counter!("foodie_payments_confirmed_total", 1, "payment_method" => order.payment_method.to_string());
        info!(order_id, order_code = %order.order_code, status = %order.status, "Payment confirmed");

        Ok(PaymentConfirmation {
            message: "Order confirmed successfully.".to_string(),
            order_id: order.id,
            order_code: order.order_code,
            status: order.status,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            email_sent: order.email_sent,
            sms_sent: order.sms_sent,
        })
    }

    /// Records an admin's verification of a bank transfer.
    ///
    /// A positive verification marks the order PAID; a negative one only records the note.
    #[instrument(skip(self, request), fields(verified = request.verified))]
    pub async fn verify_bank_transfer(
        &self,
        order_id: i32,
        request: VerifyBankTransferRequest,
    ) -> Result<OrderView, ServiceError> {
        let existing = self.lifecycle.find_order(order_id).await?;
        if existing.payment_method != PaymentMethod::BankTransfer {
            return Err(OrderError::NotBankTransfer.into());
        }

        let now = Utc::now();
        let details = annotate_verification(
            existing.payment_details.clone(),
            request.verified,
            request.notes,
            now,
        );

        let mut active: OrderActiveModel = existing.into();
        active.payment_details = Set(Some(details));
        if request.verified {
            active.status = Set(OrderStatus::Paid);
        }
        active.updated_at = Set(now);

        let updated = active.update(self.lifecycle.db()).await.map_err(|e| {
            error!(error = %e, order_id, "Failed to record bank transfer verification");
            ServiceError::DatabaseError(e)
        })?;

        counter!("foodie_bank_transfers_reviewed_total", 1, "verified" => request.verified.to_string());
        info!(order_id, status = %updated.status, "Bank transfer verification recorded");
        Ok(updated.into())
    }
}
