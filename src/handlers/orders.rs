use std::collections::HashSet;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthUser;
use crate::repositories::NewOrder;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub schedule_id: i32,
    pub payment_id: i32,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub seat_codes: Vec<String>,
}

impl CreateOrderRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.seat_codes.is_empty() {
            return Err(AppError::ValidationError(
                "seat_codes must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for code in &self.seat_codes {
            if !seen.insert(code.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate seat code '{}' in request",
                    code
                )));
            }
        }

        if self.fullname.trim().is_empty() {
            return Err(AppError::ValidationError("fullname is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(AppError::ValidationError("email is not valid".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::ValidationError("phone is required".to_string()));
        }

        Ok(())
    }
}

#[derive(Deserialize)]
pub struct ScheduleQuery {
    pub movie_id: i32,
}

#[derive(Deserialize)]
pub struct SeatQuery {
    pub schedule_id: i32,
}

/// A body axum could not deserialize is a client error, reported through the
/// standard error envelope rather than axum's plain-text rejection.
fn reject_body(rejection: JsonRejection) -> AppError {
    AppError::ValidationError(format!("Invalid request body: {}", rejection.body_text()))
}

pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(reject_body)?;
    request.validate()?;

    let order = state
        .orders
        .create_order(NewOrder {
            user_id,
            schedule_id: request.schedule_id,
            payment_id: request.payment_id,
            fullname: request.fullname,
            email: request.email,
            phone: request.phone,
            seat_codes: request.seat_codes,
        })
        .await?;

    tracing::info!(order_id = order.id, seats = order.seats.len(), "order committed");

    Ok(created(
        json!({
            "order_id": order.id,
            "qr_code": order.qr_code,
            "seats": order.seats,
        }),
        "Order created successfully",
    )
    .into_response())
}

pub async fn available_seats(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SeatQuery>,
) -> Result<Response, AppError> {
    let seats = state.orders.available_seats(query.schedule_id).await?;
    Ok(success(seats, "Get available seats successfully").into_response())
}

pub async fn schedules(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ScheduleQuery>,
) -> Result<Response, AppError> {
    let schedules = state.orders.schedules_by_movie(query.movie_id).await?;
    Ok(success(schedules, "Get schedules successfully").into_response())
}

pub async fn order_detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let detail = state.orders.order_detail(id).await?;
    Ok(success(detail, "Get order detail successfully").into_response())
}

pub async fn order_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, AppError> {
    let history = state.orders.order_history(user_id).await?;
    Ok(success(history, "Get order history successfully").into_response())
}

pub async fn payments(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Response, AppError> {
    let payments = state.orders.payments().await?;
    Ok(success(payments, "Get payment methods successfully").into_response())
}

pub async fn cinemas(State(state): State<AppState>, _user: AuthUser) -> Result<Response, AppError> {
    let cinemas = state.orders.cinemas().await?;
    Ok(success(cinemas, "Get cinemas successfully").into_response())
}

pub async fn locations(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Response, AppError> {
    let locations = state.orders.locations().await?;
    Ok(success(locations, "Get locations successfully").into_response())
}

pub async fn times(State(state): State<AppState>, _user: AuthUser) -> Result<Response, AppError> {
    let times = state.orders.times().await?;
    Ok(success(times, "Get times successfully").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateOrderRequest {
        CreateOrderRequest {
            schedule_id: 8,
            payment_id: 2,
            fullname: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+440000000000".to_string(),
            seat_codes: vec!["A1".to_string(), "A2".to_string()],
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(base_request().validate().is_ok());
    }

    #[test]
    fn test_empty_seat_codes_rejected() {
        let mut request = base_request();
        request.seat_codes.clear();
        let err = request.validate().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_duplicate_seat_codes_rejected() {
        let mut request = base_request();
        request.seat_codes = vec!["A1".to_string(), "A1".to_string()];
        let err = request.validate().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_malformed_email_rejected() {
        let mut request = base_request();
        request.email = "not-an-email".to_string();
        assert!(request.validate().is_err());
    }

    #[tokio::test]
    async fn test_body_missing_field_yields_400_envelope() {
        use axum::body::Body;
        use axum::extract::FromRequest;
        use axum::http::{Request, StatusCode};

        // Well-formed JSON without seat_codes must come back as a 400 through
        // the error envelope, not axum's default 422 rejection.
        let body = r#"{"schedule_id":8,"payment_id":2,"fullname":"Ada Lovelace","email":"ada@example.com","phone":"+440000000000"}"#;
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let rejection = Json::<CreateOrderRequest>::from_request(request, &())
            .await
            .unwrap_err();

        let err = reject_body(rejection);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_json_body_yields_400_envelope() {
        use axum::body::Body;
        use axum::extract::FromRequest;
        use axum::http::{Request, StatusCode};

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let rejection = Json::<CreateOrderRequest>::from_request(request, &())
            .await
            .unwrap_err();

        assert_eq!(reject_body(rejection).into_response().status(), StatusCode::BAD_REQUEST);
    }
}
