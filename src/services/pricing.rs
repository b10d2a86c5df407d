//! Cart pricing and checkout validation.
//!
//! Everything here is pure: callers pass in the clock and the checkout policy,
//! so the rules can be exercised without a database.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::OrderError;
use crate::models::order::{BankTransferInstructions, LineItem, PaymentMethod};

/// One cart line as submitted by the storefront.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[schema(example = 3)]
    pub menu_item_id: i64,
    #[schema(example = "Paneer Tikka")]
    pub name: String,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(value_type = f64, example = 249.5)]
    pub unit_price: Decimal,
}

/// Cart items arrive either as a JSON array or as that array encoded in a string
/// (multipart checkouts send it that way).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ItemsPayload {
    Lines(Vec<CartLine>),
    Encoded(String),
}

impl ItemsPayload {
    pub fn into_lines(self) -> Result<Vec<CartLine>, OrderError> {
        match self {
            ItemsPayload::Lines(lines) => Ok(lines),
            ItemsPayload::Encoded(raw) => {
                serde_json::from_str(&raw).map_err(|_| OrderError::InvalidItemsPayload)
            }
        }
    }
}

/// Checkout form shared by the direct order flow and the payment flow.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 2, message = "Customer name must be at least 2 characters"))]
    pub customer_name: String,

    #[serde(deserialize_with = "trimmed_lowercase")]
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(min = 7, message = "Phone number must be at least 7 characters"))]
    pub phone: Option<String>,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 5, message = "Delivery address must be at least 5 characters"))]
    pub address: String,

    pub delivery_date: DateTime<Utc>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 500, message = "Special instructions are limited to 500 characters"))]
    pub special_instructions: Option<String>,

    pub items: ItemsPayload,

    pub payment_method: PaymentMethod,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 120, message = "Payment reference is limited to 120 characters"))]
    pub payment_reference: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2048, message = "Receipt URL is too long"))]
    pub payment_receipt_url: Option<String>,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

fn trimmed_lowercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.trim().to_lowercase())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Checkout rules that come from configuration.
#[derive(Clone, Debug)]
pub struct PricingPolicy {
    pub lead_time: Duration,
    pub bank_details: BankTransferInstructions,
}

impl PricingPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            lead_time: config.lead_time(),
            bank_details: BankTransferInstructions::from(&config.bank),
        }
    }
}

/// A fully validated and priced order, ready to be persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub delivery_date: DateTime<Utc>,
    pub special_instructions: Option<String>,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub payment_receipt_url: Option<String>,
    pub payment_details: Option<Value>,
}

/// Largest amount the `orders.total_amount` column (12 digits, 2 decimals) can hold.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// `quantity * unit_price`, rounded half away from zero to cents.
///
/// Returns `None` when the product does not fit in a `Decimal`.
pub fn line_subtotal(quantity: i32, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .map(|exact| exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Prices every cart line and returns the lines with their cart total.
///
/// Client-supplied subtotals are never trusted; each one is recomputed here.
pub fn price_lines(lines: &[CartLine]) -> Result<(Vec<LineItem>, Decimal), OrderError> {
    let mut priced = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        let position = index + 1;
        if line.menu_item_id <= 0 {
            return Err(OrderError::InvalidLineItem(format!(
                "item {} has an invalid menu item id",
                position
            )));
        }
        if line.name.trim().is_empty() {
            return Err(OrderError::InvalidLineItem(format!(
                "item {} is missing a name",
                position
            )));
        }
        if line.quantity < 1 {
            return Err(OrderError::InvalidLineItem(format!(
                "item {} must have a quantity of at least 1",
                position
            )));
        }
        let subtotal = line_subtotal(line.quantity, line.unit_price)
            .filter(|subtotal| subtotal.abs() <= MAX_ORDER_TOTAL)
            .ok_or(OrderError::AmountTooLarge(MAX_ORDER_TOTAL))?;
        priced.push(LineItem {
            menu_item_id: line.menu_item_id,
            name: line.name.trim().to_string(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal,
        });
    }

    let total = priced
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.subtotal))
        .filter(|total| *total <= MAX_ORDER_TOTAL)
        .ok_or(OrderError::AmountTooLarge(MAX_ORDER_TOTAL))?;
    if total <= Decimal::ZERO {
        return Err(OrderError::EmptyOrder);
    }

    if let Some(position) = priced
        .iter()
        .position(|item| item.unit_price <= Decimal::ZERO)
    {
        return Err(OrderError::InvalidLineItem(format!(
            "item {} must have a positive unit price",
            position + 1
        )));
    }

    Ok((priced, total))
}

/// Delivery must be at least `lead_time` after `now`; exactly on the boundary is accepted.
pub fn check_lead_time(
    delivery_date: DateTime<Utc>,
    now: DateTime<Utc>,
    lead_time: Duration,
) -> Result<(), OrderError> {
    if delivery_date - now < lead_time {
        return Err(OrderError::LeadTime(lead_time.num_hours()));
    }
    Ok(())
}

/// Validates the priced checkout against the business rules and produces an order draft.
pub fn price_checkout(
    request: CheckoutRequest,
    policy: &PricingPolicy,
    now: DateTime<Utc>,
) -> Result<OrderDraft, OrderError> {
    let lines = request.items.into_lines()?;
    let (items, total_amount) = price_lines(&lines)?;

    check_lead_time(request.delivery_date, now, policy.lead_time)?;

    let payment_reference = request.payment_reference;
    if request.payment_method.requires_reference() && payment_reference.is_none() {
        return Err(OrderError::PaymentReferenceRequired);
    }

    let payment_details = match request.payment_method {
        PaymentMethod::BankTransfer => serde_json::to_value(&policy.bank_details).ok(),
        PaymentMethod::CashOnDelivery => None,
    };

    Ok(OrderDraft {
        customer_name: request.customer_name.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        phone: request.phone,
        address: request.address.trim().to_string(),
        delivery_date: request.delivery_date,
        special_instructions: request.special_instructions,
        items,
        total_amount,
        payment_method: request.payment_method,
        payment_reference,
        payment_receipt_url: request.payment_receipt_url,
        payment_details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::BankDetails;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn policy() -> PricingPolicy {
        PricingPolicy {
            lead_time: Duration::hours(24),
            bank_details: BankTransferInstructions::from(&BankDetails::default()),
        }
    }

    fn line(id: i64, quantity: i32, unit_price: Decimal) -> CartLine {
        CartLine {
            menu_item_id: id,
            name: format!("Dish {}", id),
            quantity,
            unit_price,
        }
    }

    fn request(now: DateTime<Utc>) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "  Asha Rao ".into(),
            email: "Asha.Rao@Example.COM".into(),
            phone: Some("9876543210".into()),
            address: "12 MG Road, Bengaluru".into(),
            delivery_date: now + Duration::hours(48),
            special_instructions: None,
            items: ItemsPayload::Lines(vec![line(1, 2, dec!(12.50)), line(2, 1, dec!(4.99))]),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_reference: None,
            payment_receipt_url: None,
        }
    }

    #[test]
    fn totals_are_recomputed_from_lines() {
        let (items, total) =
            price_lines(&[line(1, 2, dec!(12.50)), line(2, 1, dec!(4.99))]).unwrap();
        assert_eq!(items[0].subtotal, dec!(25.00));
        assert_eq!(items[1].subtotal, dec!(4.99));
        assert_eq!(total, dec!(29.99));
    }

    #[test]
    fn subtotal_rounds_half_away_from_zero() {
        assert_eq!(line_subtotal(3, dec!(0.335)), Some(dec!(1.01)));
        assert_eq!(line_subtotal(1, dec!(0.125)), Some(dec!(0.13)));
    }

    #[test]
    fn max_order_total_matches_column_width() {
        assert_eq!(MAX_ORDER_TOTAL, dec!(9999999999.99));
    }

    #[test]
    fn subtotal_overflow_is_reported() {
        assert_eq!(line_subtotal(100, Decimal::MAX), None);
    }

    #[test]
    fn huge_single_line_is_rejected() {
        let unit_price = Decimal::from_str_exact("10000000000000000000000000000").unwrap();
        assert_matches!(
            price_lines(&[line(1, 100, unit_price)]),
            Err(OrderError::AmountTooLarge(_))
        );
    }

    #[test]
    fn line_beyond_column_width_is_rejected() {
        assert_matches!(
            price_lines(&[line(1, 2, dec!(5000000000))]),
            Err(OrderError::AmountTooLarge(_))
        );
    }

    #[test]
    fn lines_whose_sum_overflows_are_rejected() {
        let lines = [line(1, 1, dec!(9000000000)), line(2, 1, dec!(9000000000))];
        assert_matches!(price_lines(&lines), Err(OrderError::AmountTooLarge(_)));
    }

    #[test]
    fn total_at_column_limit_is_accepted() {
        let (_, total) = price_lines(&[line(1, 1, dec!(9999999999.99))]).unwrap();
        assert_eq!(total, MAX_ORDER_TOTAL);
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert_matches!(price_lines(&[]), Err(OrderError::EmptyOrder));
    }

    #[test]
    fn zero_priced_cart_is_rejected_as_empty() {
        assert_matches!(
            price_lines(&[line(1, 2, dec!(0))]),
            Err(OrderError::EmptyOrder)
        );
    }

    #[test]
    fn zero_priced_line_in_paid_cart_is_invalid() {
        assert_matches!(
            price_lines(&[line(1, 1, dec!(5)), line(2, 1, dec!(0))]),
            Err(OrderError::InvalidLineItem(_))
        );
    }

    #[rstest]
    #[case(0, dec!(5))]
    #[case(-1, dec!(5))]
    fn non_positive_quantity_is_invalid(#[case] quantity: i32, #[case] price: Decimal) {
        assert_matches!(
            price_lines(&[line(1, quantity, price)]),
            Err(OrderError::InvalidLineItem(_))
        );
    }

    #[rstest]
    #[case(Duration::hours(24), true)]
    #[case(Duration::hours(24) + Duration::seconds(1), true)]
    #[case(Duration::hours(23) + Duration::minutes(59), false)]
    #[case(Duration::hours(-1), false)]
    fn lead_time_boundary(#[case] ahead: Duration, #[case] accepted: bool) {
        let now = Utc::now();
        let result = check_lead_time(now + ahead, now, Duration::hours(24));
        assert_eq!(result.is_ok(), accepted);
        if !accepted {
            assert_eq!(result, Err(OrderError::LeadTime(24)));
        }
    }

    #[test]
    fn checkout_normalizes_customer_fields() {
        let now = Utc::now();
        let draft = price_checkout(request(now), &policy(), now).unwrap();
        assert_eq!(draft.customer_name, "Asha Rao");
        assert_eq!(draft.email, "asha.rao@example.com");
        assert_eq!(draft.total_amount, dec!(29.99));
        assert!(draft.payment_details.is_none());
    }

    #[test]
    fn bank_transfer_requires_reference() {
        let now = Utc::now();
        let mut req = request(now);
        req.payment_method = PaymentMethod::BankTransfer;
        assert_matches!(
            price_checkout(req, &policy(), now),
            Err(OrderError::PaymentReferenceRequired)
        );
    }

    #[test]
    fn bank_transfer_snapshots_bank_details() {
        let now = Utc::now();
        let mut req = request(now);
        req.payment_method = PaymentMethod::BankTransfer;
        req.payment_reference = Some("UTR123456".into());
        let draft = price_checkout(req, &policy(), now).unwrap();
        let details = draft.payment_details.unwrap();
        assert_eq!(details["bankName"], "Foodie National Bank");
        assert_eq!(details["accountNumber"], "002233445566");
        assert_eq!(draft.payment_reference.as_deref(), Some("UTR123456"));
    }

    #[test]
    fn encoded_items_are_decoded() {
        let now = Utc::now();
        let mut req = request(now);
        req.items = ItemsPayload::Encoded(
            json!([{"menuItemId": 7, "name": "Lassi", "quantity": 3, "unitPrice": 2.5}]).to_string(),
        );
        let draft = price_checkout(req, &policy(), now).unwrap();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.total_amount, dec!(7.50));
    }

    #[test]
    fn malformed_encoded_items_are_rejected() {
        let now = Utc::now();
        let mut req = request(now);
        req.items = ItemsPayload::Encoded("[{not json".into());
        assert_matches!(
            price_checkout(req, &policy(), now),
            Err(OrderError::InvalidItemsPayload)
        );
    }

    #[test]
    fn request_deserializes_blank_optionals_as_missing() {
        let body = json!({
            "customerName": "Asha",
            "email": "asha@example.com",
            "phone": "   ",
            "address": "12 MG Road",
            "deliveryDate": "2030-01-01T10:00:00Z",
            "items": [{"menuItemId": 1, "name": "Samosa", "quantity": 1, "unitPrice": 3}],
            "paymentMethod": "BANK_TRANSFER",
            "paymentReference": ""
        });
        let req: CheckoutRequest = serde_json::from_value(body).unwrap();
        assert!(req.phone.is_none());
        assert!(req.payment_reference.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn request_trims_fields_before_validation() {
        let body = json!({
            "customerName": "  A ",
            "email": " Asha@Example.com ",
            "address": "  12 MG Road  ",
            "deliveryDate": "2030-01-01T10:00:00Z",
            "items": [{"menuItemId": 1, "name": "Samosa", "quantity": 1, "unitPrice": 3}],
            "paymentMethod": "CASH_ON_DELIVERY"
        });
        let req: CheckoutRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.email, "asha@example.com");
        assert_eq!(req.address, "12 MG Road");
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_name"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn field_rules_are_enforced() {
        let now = Utc::now();
        let mut req = request(now);
        req.customer_name = "A".into();
        req.email = "not-an-email".into();
        req.phone = Some("123".into());
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("phone"));
    }
}
