use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use std::str::FromStr;
use tracing::info;

use super::common::{json_body, parse_order_id, validate_request};
use crate::{
    auth::AdminUser,
    errors::ServiceError,
    models::order::OrderStatus,
    services::{
        orders::{OrderListQuery, OrderPlacement, OrderView, ResendOutcome, UpdateOrderStatusRequest},
        payments::{PaymentOptions, VerifyBankTransferRequest},
        pricing::CheckoutRequest,
    },
    ApiResponse, AppState,
};

/// Creates the router for order endpoints
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/payment/options", get(payment_options))
        .route("/:id", put(update_order_status))
        .route("/:id/send-confirmation", post(send_confirmation))
        .route("/:id/payment/verify", post(verify_bank_transfer))
}

fn parse_status_filter(raw: Option<String>) -> Result<Option<OrderStatus>, ServiceError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => OrderStatus::from_str(value).map(Some).map_err(|_| {
            ServiceError::BadRequest(format!(
                "Unknown order status: {}. Expected PENDING, CONFIRMED or PAID.",
                value
            ))
        }),
    }
}

/// Payment methods accepted at checkout
#[utoipa::path(
    get,
    path = "/api/orders/payment/options",
    summary = "Get payment options",
    description = "List accepted payment methods, bank account details and the booking lead time",
    responses(
        (status = 200, description = "Payment options", body = ApiResponse<PaymentOptions>)
    ),
    tag = "orders"
)]
pub async fn payment_options(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PaymentOptions>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.payment.payment_options(),
    )))
}

/// Place an order and send the confirmation
#[utoipa::path(
    post,
    path = "/api/orders",
    summary = "Create order",
    description = "Price the cart, persist the order with its public code and notify the customer",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderPlacement>),
        (status = 400, description = "Invalid cart, lead time or payment details", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OrderPlacement>>), ServiceError> {
    let request = json_body(payload)?;
    if let Err(response) = validate_request(&request) {
        return Ok(response);
    }

    let placement = state.services.order.create_order(request).await?;
    info!(order_id = placement.order_id, order_code = %placement.order_code, "Order created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(placement))))
}

/// List orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders",
    summary = "List orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders", body = ApiResponse<Vec<OrderView>>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ServiceError> {
    let status = parse_status_filter(query.status)?;
    let orders = state.services.order.list_orders(status).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Overwrite an order's status
#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    summary = "Update order status",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderView>),
        (status = 400, description = "Invalid id or status", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderView>>, ServiceError> {
    let order_id = parse_order_id(&id)?;
    let request = json_body(payload)?;

    let order = state
        .services
        .order
        .update_status(order_id, request.status)
        .await?;
    info!(order_id, status = %order.status, admin = %admin.user_id, "Order status changed by admin");

    Ok(Json(ApiResponse::success(order)))
}

/// Re-send the confirmation email for an order
#[utoipa::path(
    post,
    path = "/api/orders/{id}/send-confirmation",
    summary = "Resend confirmation email",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Confirmation sent", body = ApiResponse<ResendOutcome>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Email delivery failed", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn send_confirmation(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResendOutcome>>, ServiceError> {
    let order_id = parse_order_id(&id)?;
    let outcome = state.services.order.resend_confirmation(order_id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Record the outcome of checking a bank transfer
#[utoipa::path(
    post,
    path = "/api/orders/{id}/payment/verify",
    summary = "Verify bank transfer",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = VerifyBankTransferRequest,
    responses(
        (status = 200, description = "Verification recorded", body = ApiResponse<OrderView>),
        (status = 400, description = "Not a bank transfer order", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn verify_bank_transfer(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<VerifyBankTransferRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OrderView>>), ServiceError> {
    let order_id = parse_order_id(&id)?;
    let request = json_body(payload)?;
    if let Err(response) = validate_request(&request) {
        return Ok(response);
    }

    let verified = request.verified;
    let order = state
        .services
        .payment
        .verify_bank_transfer(order_id, request)
        .await?;
    info!(order_id, verified, admin = %admin.user_id, "Bank transfer reviewed");

    Ok((StatusCode::OK, Json(ApiResponse::success(order))))
}
