use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::order::{OrderStatus, PaymentMethod};

/// The `orders` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `FOOD-YYYY-NNNNN` once the creating transaction commits.
    #[sea_orm(unique)]
    pub order_code: String,

    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    pub delivery_date: DateTime<Utc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub special_instructions: Option<String>,

    /// Priced line items, stored as a JSON array.
    pub items: Json,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_amount: Decimal,

    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub payment_receipt_url: Option<String>,
    pub payment_details: Option<Json>,

    pub status: OrderStatus,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Phone number to text, if the customer left a usable one.
    pub fn sms_recipient(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}
