use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use delite_core::{Booking, BookingConfirmation};
use delite_order::BookingRequest;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub message: &'static str,
    pub booking: BookingConfirmation,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/{reference_id}", get(get_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let Json(req) = payload?;

    let booking = state.coordinator.create_booking(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking created successfully",
            booking: booking.confirmation(),
        }),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(reference_id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    state
        .bookings
        .find_by_reference(&reference_id)
        .await
        .map_err(|e| AppError::internal("Error fetching booking", e))?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))
}
