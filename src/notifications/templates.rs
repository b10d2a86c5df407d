use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::entities::order;
use crate::models::order::{LineItem, PaymentMethod};

/// The order fields a confirmation needs, detached from persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfirmationSnapshot {
    pub order_code: String,
    pub customer_name: String,
    pub delivery_address: String,
    pub delivery_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub items: Vec<LineItem>,
}

impl From<&order::Model> for ConfirmationSnapshot {
    fn from(model: &order::Model) -> Self {
        Self {
            order_code: model.order_code.clone(),
            customer_name: model.customer_name.clone(),
            delivery_address: model.address.clone(),
            delivery_date: model.delivery_date,
            payment_method: model.payment_method,
            total_amount: model.total_amount,
            items: LineItem::from_stored(&model.items),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn money(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}

fn delivery_slot(date: DateTime<Utc>) -> String {
    date.format("%d %b %Y, %H:%M UTC").to_string()
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn confirmation_subject(order_code: &str) -> String {
    format!("Foodie Pre-Order Confirmation ({})", order_code)
}

/// Renders the confirmation email in both HTML and plain-text form.
pub fn build_confirmation_email(snapshot: &ConfirmationSnapshot) -> ConfirmationEmail {
    let slot = delivery_slot(snapshot.delivery_date);
    let method = snapshot.payment_method.label();

    let rows: String = snapshot
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:right\">{}</td><td style=\"text-align:right\">{}</td></tr>",
                escape_html(&item.name),
                item.quantity,
                money(item.unit_price),
                money(item.subtotal)
            )
        })
        .collect();

    let html = format!(
        concat!(
            "<div style=\"font-family:Arial,sans-serif;color:#222\">",
            "<h2>Thanks for your pre-order, {name}!</h2>",
            "<p><strong>Order ID:</strong> {code}</p>",
            "<p><strong>Delivery:</strong> {address} on {slot}</p>",
            "<p><strong>Payment method:</strong> {method}</p>",
            "<table style=\"border-collapse:collapse;width:100%\">",
            "<thead><tr><th align=\"left\">Item</th><th>Qty</th><th align=\"right\">Price</th><th align=\"right\">Subtotal</th></tr></thead>",
            "<tbody>{rows}</tbody>",
            "</table>",
            "<p style=\"font-size:16px\"><strong>Total: {total}</strong></p>",
            "</div>"
        ),
        name = escape_html(&snapshot.customer_name),
        code = escape_html(&snapshot.order_code),
        address = escape_html(&snapshot.delivery_address),
        slot = slot,
        method = method,
        rows = rows,
        total = money(snapshot.total_amount),
    );

    let mut text = vec![
        format!("Thanks for your pre-order, {}!", snapshot.customer_name),
        format!("Order ID: {}", snapshot.order_code),
        format!("Delivery: {} on {}", snapshot.delivery_address, slot),
        format!("Payment method: {}", method),
        String::new(),
        "Items:".to_string(),
    ];
    text.extend(snapshot.items.iter().map(|item| {
        format!(
            "- {} x{} @ {} = {}",
            item.name,
            item.quantity,
            money(item.unit_price),
            money(item.subtotal)
        )
    }));
    text.push(String::new());
    text.push(format!("Total: {}", money(snapshot.total_amount)));

    ConfirmationEmail {
        subject: confirmation_subject(&snapshot.order_code),
        html,
        text: text.join("\n"),
    }
}

pub fn build_confirmation_sms(snapshot: &ConfirmationSnapshot) -> String {
    format!(
        "Foodie order {} confirmed. Total {}.",
        snapshot.order_code,
        money(snapshot.total_amount)
    )
}
