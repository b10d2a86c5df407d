use chrono::{Datelike, Utc};
use metrics::counter;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
    errors::{OrderError, ServiceError},
    models::order::OrderStatus,
    notifications::{ConfirmationDispatcher, ConfirmationSnapshot},
    services::pricing::OrderDraft,
};

/// Prefix of the throwaway code an order carries before its id is known.
pub const PLACEHOLDER_CODE_PREFIX: &str = "TMP-";

/// Public order code: `FOOD-<year>-<id>`, the id zero-padded to at least five digits.
pub fn order_code(year: i32, id: i32) -> String {
    format!("FOOD-{}-{:05}", year, id)
}

fn placeholder_code() -> String {
    format!("{}{}", PLACEHOLDER_CODE_PREFIX, Uuid::new_v4().simple())
}

/// Shared order persistence steps used by both the order and payment flows.
#[derive(Clone)]
pub struct OrderLifecycle {
    db_pool: Arc<DbPool>,
    dispatcher: ConfirmationDispatcher,
}

impl OrderLifecycle {
    pub fn new(db_pool: Arc<DbPool>, dispatcher: ConfirmationDispatcher) -> Self {
        Self {
            db_pool,
            dispatcher,
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.db_pool
    }

    pub fn dispatcher(&self) -> &ConfirmationDispatcher {
        &self.dispatcher
    }

    /// Persists a PENDING order and assigns its public code.
    ///
    /// The row is inserted under a placeholder code, then rewritten to the final code derived
    /// from the generated id, inside one transaction. No committed row ever holds a placeholder.
    #[instrument(skip(self, draft), fields(email = %draft.email, payment_method = %draft.payment_method))]
    pub async fn reserve_order(&self, draft: OrderDraft) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let items = serde_json::to_value(&draft.items)?;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let pending = OrderActiveModel {
            order_code: Set(placeholder_code()),
            customer_name: Set(draft.customer_name),
            email: Set(draft.email),
            phone: Set(draft.phone),
            address: Set(draft.address),
            delivery_date: Set(draft.delivery_date),
            special_instructions: Set(draft.special_instructions),
            items: Set(items),
            total_amount: Set(draft.total_amount),
            payment_method: Set(draft.payment_method),
            payment_reference: Set(draft.payment_reference),
            payment_receipt_url: Set(draft.payment_receipt_url),
            payment_details: Set(draft.payment_details),
            status: Set(OrderStatus::Pending),
            email_sent: Set(false),
            sms_sent: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = pending.insert(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to insert pending order");
            ServiceError::DatabaseError(e)
        })?;

        let code = order_code(inserted.created_at.year(), inserted.id);
        let mut coded: OrderActiveModel = inserted.into();
        coded.order_code = Set(code.clone());
        let reserved = coded.update(&txn).await.map_err(|e| {
            error!(error = %e, order_code = %code, "Failed to assign order code");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_code = %code, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        counter!("foodie_orders_created_total", 1, "payment_method" => reserved.payment_method.to_string());
        info!(order_id = reserved.id, order_code = %reserved.order_code, "Order reserved");
        Ok(reserved)
    }

    /// Sends the confirmation email (and SMS when a phone is on file) and records which went out.
    #[instrument(skip(self, order), fields(order_id = order.id, order_code = %order.order_code))]
    pub async fn realize_order(&self, order: order::Model) -> Result<order::Model, ServiceError> {
        let snapshot = ConfirmationSnapshot::from(&order);
        let outcome = self
            .dispatcher
            .dispatch(&snapshot, &order.email, order.sms_recipient())
            .await;

        let order_id = order.id;
        let mut flags: OrderActiveModel = order.into();
        flags.email_sent = Set(outcome.email_sent);
        flags.sms_sent = Set(outcome.sms_sent);
        flags.updated_at = Set(Utc::now());

        let updated = flags.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, order_id, "Failed to record notification flags");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            email_sent = updated.email_sent,
            sms_sent = updated.sms_sent,
            "Order confirmation dispatched"
        );
        Ok(updated)
    }

    pub async fn find_order(&self, order_id: i32) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id, "Failed to load order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or(ServiceError::Order(OrderError::NotFound))
    }
}
