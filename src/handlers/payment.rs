//! Card checkout: runs the provider handshake, tags a pending booking with
//! the provider's order id, then hands the hosted URL back to the browser.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;

use crate::db::queries::{self, NewBooking};
use crate::errors::AppError;
use crate::models::{BookingStatus, BookingType};
use crate::services::booking_rules::parse_slot_time;
use crate::services::payments::CheckoutRequest;
use crate::services::phone;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub booking_type: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub booking_description: Option<String>,
}

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(name), Some(email), Some(phone_raw), Some(booking_type_str), Some(amount_cents)) = (
        body.name.as_deref().filter(|s| !s.trim().is_empty()),
        body.email.as_deref().filter(|s| !s.trim().is_empty()),
        body.phone.as_deref().filter(|s| !s.trim().is_empty()),
        body.booking_type.as_deref().filter(|s| !s.trim().is_empty()),
        body.amount_cents,
    ) else {
        return Err(AppError::Validation(
            "name, email, phone, booking type, and amount are required".to_string(),
        ));
    };

    if amount_cents <= 0 {
        return Err(AppError::Validation(
            "amount must be greater than 0".to_string(),
        ));
    }

    let booking_type = BookingType::parse(booking_type_str)
        .ok_or_else(|| AppError::Validation("invalid booking type".to_string()))?;

    let validation =
        phone::validate_phone(phone_raw).map_err(|e| AppError::Validation(e.to_string()))?;
    if let Some(warning) = &validation.warning {
        tracing::warn!(email = %email, warning = %warning, "phone validation warning");
    }
    let normalized_phone = validation
        .normalized
        .unwrap_or_else(|| phone_raw.trim().to_string());

    let date = match body.start_date.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::Validation("invalid start date, use YYYY-MM-DD".to_string()))?,
        None => Utc::now().date_naive(),
    };

    let start = body.start_time.as_deref().and_then(parse_checkout_time);
    let end = body.end_time.as_deref().and_then(parse_checkout_time);
    let time = start.map(|t| t.format("%H:%M").to_string());
    // The checkout widget sends a start/end pair instead of a duration.
    let duration = match (start, end) {
        (Some(start), Some(end)) if end > start => {
            Some((end - start).num_hours()).filter(|d| *d > 0)
        }
        _ => None,
    };

    // Reject duplicates before the handshake so an aborted checkout never
    // reaches the provider.
    {
        let db = state.db.lock().unwrap();
        if queries::find_duplicate_booking(&db, email, &date, booking_type)? {
            return Err(AppError::Conflict(
                "a booking already exists for this email, date, and type".to_string(),
            ));
        }
    }

    let description = body
        .booking_description
        .clone()
        .unwrap_or_else(|| booking_type.display_name().to_string());

    let session = state
        .payments
        .create_checkout(&CheckoutRequest {
            customer_name: name.to_string(),
            email: email.to_string(),
            phone: normalized_phone.clone(),
            booking_type,
            amount_cents,
            currency: body.currency.clone().unwrap_or_else(|| state.config.currency.clone()),
            description: description.clone(),
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, email = %email, "payment handshake failed");
            AppError::Upstream(e.to_string())
        })?;

    let booking_id = {
        let db = state.db.lock().unwrap();
        queries::insert_booking(
            &db,
            &NewBooking {
                customer_name: name,
                email,
                phone: Some(&normalized_phone),
                booking_type,
                date,
                time: time.as_deref(),
                duration,
                amount: amount_cents / 100,
                status: BookingStatus::Pending,
                notes: Some(&description),
                provider_order_id: Some(&session.order_id),
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

    tracing::info!(
        booking_id,
        order_id = %session.order_id,
        "checkout created, awaiting webhook"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "payment_url": session.payment_url,
        "order_id": session.order_id,
        "payment_key": session.payment_key,
    })))
}

/// The picker sends either a bare `HH:MM` or a full ISO datetime.
fn parse_checkout_time(s: &str) -> Option<NaiveTime> {
    parse_slot_time(s)
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.time()))
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.time())
        })
}
