use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

/// Lifecycle status of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

/// How the customer settles the order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "CASH_ON_DELIVERY")]
    CashOnDelivery,
    #[sea_orm(string_value = "BANK_TRANSFER")]
    BankTransfer,
}

impl PaymentMethod {
    /// Customer-facing name used in confirmations.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
            PaymentMethod::BankTransfer => "Bank Transfer",
        }
    }

    pub fn requires_reference(&self) -> bool {
        matches!(self, PaymentMethod::BankTransfer)
    }

    /// Status an order moves to once its payment is confirmed.
    pub fn confirmed_status(&self) -> OrderStatus {
        match self {
            PaymentMethod::BankTransfer => OrderStatus::Paid,
            PaymentMethod::CashOnDelivery => OrderStatus::Confirmed,
        }
    }
}

/// A priced cart line as persisted on the order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl LineItem {
    /// Reads the stored items column, skipping entries that are not well-formed line items.
    pub fn from_stored(items: &Value) -> Vec<LineItem> {
        items
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.is_object())
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Receiving account for bank transfers, loaded from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub reference_instruction: String,
}

impl Default for BankDetails {
    fn default() -> Self {
        Self {
            bank_name: "Foodie National Bank".to_string(),
            account_name: "Foodie Foods Pvt Ltd".to_string(),
            account_number: "002233445566".to_string(),
            reference_instruction: "Use your Order ID as transfer reference".to_string(),
        }
    }
}

/// Bank details as shown to customers and snapshotted onto bank-transfer orders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BankTransferInstructions {
    #[schema(example = "Foodie National Bank")]
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub reference_instruction: String,
}

impl From<&BankDetails> for BankTransferInstructions {
    fn from(details: &BankDetails) -> Self {
        Self {
            bank_name: details.bank_name.clone(),
            account_name: details.account_name.clone(),
            account_number: details.account_number.clone(),
            reference_instruction: details.reference_instruction.clone(),
        }
    }
}

/// Merges an admin verification note into the stored payment details.
///
/// Existing keys survive; `verified`, `notes` and `verifiedAt` are overwritten.
/// A missing or non-object record is replaced by a fresh object.
pub fn annotate_verification(
    existing: Option<Value>,
    verified: bool,
    notes: Option<String>,
    verified_at: DateTime<Utc>,
) -> Value {
    let mut record = match existing {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    record.insert("verified".to_string(), json!(verified));
    record.insert("notes".to_string(), json!(notes));
    record.insert("verifiedAt".to_string(), json!(verified_at.to_rfc3339()));
    Value::Object(record)
}
