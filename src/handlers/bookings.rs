//! Public "pay at reception" booking endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries::{self, NewBooking};
use crate::errors::AppError;
use crate::services::booking_rules::{self, BookingInput};
use crate::services::phone;
use crate::state::AppState;

const RECEPTION_NOTE: &str = "Public booking - Pay at Reception";

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub booking_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration: Option<i64>,
    pub amount: Option<i64>,
    pub notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let now = Utc::now();

    // Rate limit by email before any validation, mirroring the checkout
    // widget's behavior of keying attempts on the address typed so far.
    let limiter_key = body.email.as_deref().unwrap_or("unknown").to_string();
    {
        let mut limiter = state.booking_attempts.lock().unwrap();
        if let Err(retry_after) = limiter.try_acquire(&limiter_key, now) {
            return Err(AppError::RateLimited {
                message: "too many booking attempts with this email, please try again later"
                    .to_string(),
                retry_after,
            });
        }
    }

    let phone_raw = body
        .phone
        .as_deref()
        .ok_or_else(|| AppError::Validation("phone number is required".to_string()))?;
    let validation =
        phone::validate_phone(phone_raw).map_err(|e| AppError::Validation(e.to_string()))?;
    if let Some(warning) = &validation.warning {
        tracing::warn!(email = ?body.email, warning = %warning, "phone validation warning");
    }
    let normalized_phone = validation
        .normalized
        .unwrap_or_else(|| phone_raw.trim().to_string());

    let input = BookingInput {
        customer_name: body.customer_name.as_deref(),
        email: body.email.as_deref(),
        booking_type: body.booking_type.as_deref(),
        date: body.date.as_deref(),
        time: body.time.as_deref(),
        duration: body.duration,
        amount: body.amount,
    };
    let validated = booking_rules::validate(&input, state.config.hourly_rate, now.date_naive())
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let email = body.email.as_deref().unwrap_or_default();
    let customer_name = body.customer_name.as_deref().unwrap_or_default();
    let notes = body.notes.as_deref().unwrap_or(RECEPTION_NOTE);

    let booking_id = {
        let db = state.db.lock().unwrap();

        // Duplicate check and insert run under the same connection lock; the
        // partial unique index backstops the invariant at the storage layer.
        if queries::find_duplicate_booking(&db, email, &validated.date, validated.booking_type)? {
            return Err(AppError::Conflict(
                "a booking already exists for this email, date, and type".to_string(),
            ));
        }

        queries::insert_booking(
            &db,
            &NewBooking {
                customer_name,
                email,
                phone: Some(&normalized_phone),
                booking_type: validated.booking_type,
                date: validated.date,
                time: validated.time.as_deref(),
                duration: validated.duration,
                amount: validated.amount,
                status: crate::models::BookingStatus::Pending,
                notes: Some(notes),
                provider_order_id: None,
            },
        )
        .map_err(|e| {
            if queries::is_unique_violation(&e) {
                AppError::Conflict(
                    "a booking already exists for this email, date, and type".to_string(),
                )
            } else {
                AppError::Internal(e)
            }
        })?
    };

    tracing::info!(booking_id, email = %email, "reception booking created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Booking created successfully. Please pay at reception.",
            "booking": {
                "id": booking_id,
                "customer_name": customer_name,
                "email": email,
                "phone": normalized_phone,
                "booking_type": validated.booking_type.as_str(),
                "date": validated.date.format("%Y-%m-%d").to_string(),
                "time": validated.time,
                "duration": validated.duration,
                "amount": validated.amount,
                "status": "pending",
                "notes": notes,
            }
        })),
    ))
}
