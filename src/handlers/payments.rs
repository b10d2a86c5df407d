use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use tracing::info;

use super::common::{json_body, parse_order_id, validate_request};
use crate::{
    errors::ServiceError,
    services::{
        payments::{PaymentConfirmation, PendingPayment},
        pricing::CheckoutRequest,
    },
    ApiResponse, AppState,
};

/// Creates the router for the two-step payment flow
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_payment))
        .route("/confirm/:id", post(confirm_payment))
}

/// Create a PENDING order awaiting payment
#[utoipa::path(
    post,
    path = "/api/payment/create",
    summary = "Create pending payment order",
    description = "Price the cart and persist a PENDING order without notifying the customer",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Pending order created", body = ApiResponse<PendingPayment>),
        (status = 400, description = "Invalid cart, lead time or payment details", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PendingPayment>>), ServiceError> {
    let request = json_body(payload)?;
    if let Err(response) = validate_request(&request) {
        return Ok(response);
    }

    let pending = state.services.payment.create_payment(request).await?;
    info!(order_id = pending.order_id, order_code = %pending.order_code, "Pending payment order created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(pending))))
}

/// Confirm payment and send the confirmation
#[utoipa::path(
    post,
    path = "/api/payment/confirm/{id}",
    summary = "Confirm payment",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order confirmed", body = ApiResponse<PaymentConfirmation>),
        (status = 400, description = "Invalid order id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PaymentConfirmation>>, ServiceError> {
    let order_id = parse_order_id(&id)?;
    let confirmation = state.services.payment.confirm_payment(order_id).await?;
    Ok(Json(ApiResponse::success(confirmation)))
}
