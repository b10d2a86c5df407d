use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
    errors::ServiceError,
    models::order::{OrderStatus, PaymentMethod},
    notifications::ConfirmationSnapshot,
    services::{
        lifecycle::OrderLifecycle,
        pricing::{price_checkout, CheckoutRequest, PricingPolicy},
    },
};

/// Full order record as returned to administrators.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: i32,
    #[schema(example = "FOOD-2025-00042")]
    pub order_code: String,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub delivery_date: DateTime<Utc>,
    pub special_instructions: Option<String>,
    #[schema(value_type = Object)]
    pub items: Value,
    #[schema(value_type = String, example = "634.00")]
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub payment_receipt_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub payment_details: Option<Value>,
    pub status: OrderStatus,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order::Model> for OrderView {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            order_code: model.order_code,
            customer_name: model.customer_name,
            email: model.email,
            phone: model.phone,
            address: model.address,
            delivery_date: model.delivery_date,
            special_instructions: model.special_instructions,
            items: model.items,
            total_amount: model.total_amount,
            payment_method: model.payment_method,
            payment_reference: model.payment_reference,
            payment_receipt_url: model.payment_receipt_url,
            payment_details: model.payment_details,
            status: model.status,
            email_sent: model.email_sent,
            sms_sent: model.sms_sent,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Result of placing an order through the direct checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacement {
    #[schema(example = "Order placed successfully.")]
    pub message: String,
    pub order_id: i32,
    pub order_code: String,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "634.00")]
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub delivery_date: DateTime<Utc>,
    pub email_sent: bool,
    pub sms_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Optional filter for the order listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct OrderListQuery {
    /// Only return orders in this status (PENDING, CONFIRMED or PAID)
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResendOutcome {
    #[schema(example = "Confirmation email sent.")]
    pub message: String,
    pub order_code: String,
    pub email_sent: bool,
}

/// Service for the direct order flow and order administration
#[derive(Clone)]
pub struct OrderService {
    lifecycle: Arc<OrderLifecycle>,
    policy: PricingPolicy,
}

impl OrderService {
    pub fn new(lifecycle: Arc<OrderLifecycle>, policy: PricingPolicy) -> Self {
        Self { lifecycle, policy }
    }

    /// Prices, persists and confirms an order in one call.
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    pub async fn create_order(
        &self,
        request: CheckoutRequest,
    ) -> Result<OrderPlacement, ServiceError> {
        let draft = price_checkout(request, &self.policy, Utc::now())?;
        let reserved = self.lifecycle.reserve_order(draft).await?;
        let order = self.lifecycle.realize_order(reserved).await?;

        info!(order_id = order.id, order_code = %order.order_code, "Order placed");
        Ok(OrderPlacement {
            message: "Order placed successfully.".to_string(),
            order_id: order.id,
            order_code: order.order_code,
            status: order.status,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            delivery_date: order.delivery_date,
            email_sent: order.email_sent,
            sms_sent: order.sms_sent,
        })
    }

    /// Lists orders newest first, optionally restricted to one status.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let orders = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(self.lifecycle.db())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list orders");
                ServiceError::DatabaseError(e)
            })?;

        Ok(orders.into_iter().map(OrderView::from).collect())
    }

    /// Sets an order's status without any transition checks.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: i32,
        status: OrderStatus,
    ) -> Result<OrderView, ServiceError> {
        let existing = self.lifecycle.find_order(order_id).await?;
        let previous = existing.status;

        let mut active: OrderActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.lifecycle.db()).await.map_err(|e| {
            error!(error = %e, order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id, from = %previous, to = %status, "Order status updated");
        Ok(updated.into())
    }

    /// Re-sends the confirmation email built from the stored order.
    ///
    /// On failure the stored `email_sent` flag is left as it was.
    #[instrument(skip(self))]
    pub async fn resend_confirmation(&self, order_id: i32) -> Result<ResendOutcome, ServiceError> {
        let existing = self.lifecycle.find_order(order_id).await?;
        let snapshot = ConfirmationSnapshot::from(&existing);

        if !self
            .lifecycle
            .dispatcher()
            .send_email(&existing.email, &snapshot)
            .await
        {
            warn!(order_id, order_code = %existing.order_code, "Confirmation resend failed");
            return Err(ServiceError::ExternalServiceError(
                "Failed to send confirmation email.".to_string(),
            ));
        }

        let order_code = existing.order_code.clone();
        let mut active: OrderActiveModel = existing.into();
        active.email_sent = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(self.lifecycle.db()).await.map_err(|e| {
            error!(error = %e, order_id, "Failed to record resent confirmation");
            ServiceError::DatabaseError(e)
        })?;

        Ok(ResendOutcome {
            message: "Confirmation email sent.".to_string(),
            order_code,
            email_sent: true,
        })
    }
}
