pub mod templates;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use templates::{
    build_confirmation_email, build_confirmation_sms, ConfirmationEmail, ConfirmationSnapshot,
};

/// Longest message excerpt written to logs.
const PREVIEW_CHARS: usize = 120;

/// Acknowledgement returned by a delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub delivered: bool,
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Outbound email and SMS delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<DeliveryReceipt, NotificationError>;

    async fn send_sms(&self, phone: &str, message: &str)
        -> Result<DeliveryReceipt, NotificationError>;
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

/// Gateway that records deliveries in the structured log instead of calling a provider.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationGateway;

#[async_trait]
impl NotificationGateway for LoggingNotificationGateway {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        _html: &str,
        text: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        info!(
            event = "order.email.sent",
            to = %to,
            subject = %subject,
            preview = %preview(text),
            "Confirmation email dispatched"
        );
        Ok(DeliveryReceipt { delivered: true })
    }

    async fn send_sms(
        &self,
        phone: &str,
        message: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        info!(
            event = "order.sms.sent",
            to = %phone,
            preview = %preview(message),
            "Confirmation SMS dispatched"
        );
        Ok(DeliveryReceipt { delivered: true })
    }
}

/// Which channels accepted a confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub email_sent: bool,
    pub sms_sent: bool,
}

/// Sends order confirmations over a gateway, bounding each attempt by a timeout.
///
/// Delivery problems never surface as errors here; they collapse to `false`.
#[derive(Clone)]
pub struct ConfirmationDispatcher {
    gateway: Arc<dyn NotificationGateway>,
    timeout: Duration,
}

impl ConfirmationDispatcher {
    pub fn new(gateway: Arc<dyn NotificationGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    fn settle(
        &self,
        channel: &'static str,
        order_code: &str,
        result: Result<Result<DeliveryReceipt, NotificationError>, tokio::time::error::Elapsed>,
    ) -> bool {
        let outcome = match result {
            Ok(Ok(receipt)) => Ok(receipt.delivered),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(NotificationError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(delivered) => {
                if delivered {
                    counter!("foodie_notifications_delivered_total", 1, "channel" => channel);
                } else {
                    warn!(channel, order_code, "Gateway declined confirmation");
                    counter!("foodie_notifications_failed_total", 1, "channel" => channel);
                }
                delivered
            }
            Err(err) => {
                warn!(channel, order_code, error = %err, "Confirmation delivery failed");
                counter!("foodie_notifications_failed_total", 1, "channel" => channel);
                false
            }
        }
    }

    #[instrument(skip(self, snapshot), fields(order_code = %snapshot.order_code))]
    pub async fn send_email(&self, to: &str, snapshot: &ConfirmationSnapshot) -> bool {
        let email = build_confirmation_email(snapshot);
        let result = tokio::time::timeout(
            self.timeout,
            self.gateway
                .send_email(to, &email.subject, &email.html, &email.text),
        )
        .await;
        self.settle("email", &snapshot.order_code, result)
    }

    #[instrument(skip(self, snapshot), fields(order_code = %snapshot.order_code))]
    pub async fn send_sms(&self, phone: &str, snapshot: &ConfirmationSnapshot) -> bool {
        let message = build_confirmation_sms(snapshot);
        let result =
            tokio::time::timeout(self.timeout, self.gateway.send_sms(phone, &message)).await;
        self.settle("sms", &snapshot.order_code, result)
    }

    /// Emails the customer and, when a phone number is given, texts them too.
    pub async fn dispatch(
        &self,
        snapshot: &ConfirmationSnapshot,
        email: &str,
        phone: Option<&str>,
    ) -> DeliveryOutcome {
        let email_sent = self.send_email(email, snapshot).await;
        let sms_sent = match phone {
            Some(phone) => self.send_sms(phone, snapshot).await,
            None => false,
        };
        DeliveryOutcome {
            email_sent,
            sms_sent,
        }
    }
}
