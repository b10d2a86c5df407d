use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Foodie Pre-Order API",
        version = "0.1.0",
        description = r#"
# Foodie Pre-Order API

Order and payment lifecycle for scheduled food deliveries.

## Flows

- **Direct checkout**: `POST /api/orders` prices the cart, stores the order and sends the confirmation.
- **Two-step payment**: `POST /api/payment/create` stores a PENDING order, `POST /api/payment/confirm/{id}` confirms it and notifies the customer.
- **Bank transfers**: administrators record the transfer check with `POST /api/orders/{id}/payment/verify`.

## Authentication

Administrative endpoints require a JWT with the `ADMIN` role:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

```json
{
  "error": "Bad Request",
  "message": "Delivery must be scheduled at least 24 hours in advance.",
  "timestamp": "2025-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Checkout and order administration"),
        (name = "payments", description = "Two-step payment flow")
    ),
    paths(
        crate::handlers::orders::payment_options,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::send_confirmation,
        crate::handlers::orders::verify_bank_transfer,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::confirm_payment,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::services::pricing::CheckoutRequest,
            crate::services::pricing::CartLine,
            crate::services::orders::OrderView,
            crate::services::orders::OrderPlacement,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::services::orders::ResendOutcome,
            crate::services::payments::PaymentOptions,
            crate::services::payments::PaymentOption,
            crate::services::payments::PendingPayment,
            crate::services::payments::PaymentConfirmation,
            crate::services::payments::VerifyBankTransferRequest,
            crate::models::order::OrderStatus,
            crate::models::order::PaymentMethod,
            crate::models::order::LineItem,
            crate::models::order::BankTransferInstructions,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
