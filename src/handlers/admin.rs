//! Authenticated admin dashboard API: bookings, orders, stats, reports.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Days, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingFilter, NewBooking, NewOrder, OrderFilter};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, BookingType, OrderType};
use crate::services::{auth, phone};
use crate::services::auth::Claims;
use crate::state::AppState;

const DEFAULT_ORDER_PRICE: i64 = 10;
const MEMBERSHIP_WINDOW_DAYS: u64 = 30;

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Claims, AppError> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = header.strip_prefix("Bearer ").filter(|t| !t.is_empty());

    match token {
        None => Err(AppError::Unauthorized("access token required".to_string())),
        Some(token) => {
            auth::verify_token(token, &state.config.jwt_secret).ok_or(AppError::Forbidden)
        }
    }
}

// ── Authentication ──

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let now = Utc::now();
    let client = super::client_key(&headers);

    {
        let mut limiter = state.login_attempts.lock().unwrap();
        if let Err(retry_after) = limiter.check(&client, now) {
            return Err(AppError::RateLimited {
                message: "too many login attempts, please try again later".to_string(),
                retry_after,
            });
        }
    }

    let (Some(username), Some(password)) = (body.username.as_deref(), body.password.as_deref())
    else {
        return Err(AppError::Validation(
            "username and password required".to_string(),
        ));
    };

    let user = {
        let db = state.db.lock().unwrap();
        queries::get_admin_by_username(&db, username)?
    };

    let user = match user {
        Some(user) if auth::verify_password(password, &user.password_hash) => user,
        _ => {
            let mut limiter = state.login_attempts.lock().unwrap();
            limiter.record_failure(&client, now);
            tracing::warn!(username = %username, client = %client, "failed admin login");
            return Err(AppError::Unauthorized("invalid credentials".to_string()));
        }
    };

    {
        let mut limiter = state.login_attempts.lock().unwrap();
        limiter.clear(&client);
    }

    let token = auth::issue_token(&user, &state.config.jwt_secret, now)?;
    tracing::info!(username = %user.username, "admin login");

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        },
    }))
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = require_admin(&state, &headers)?;
    Ok(Json(serde_json::json!({ "user": claims })))
}

// ── Bookings ──

#[derive(Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub day: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub search: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&state, &headers)?;

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::list_bookings(
            &db,
            &BookingFilter {
                status: query.status.as_deref(),
                day: query.day.as_deref(),
                month: query.month.as_deref(),
                year: query.year.as_deref(),
                search: query.search.as_deref(),
            },
        )?
    };

    Ok(Json(bookings))
}

#[derive(Deserialize)]
pub struct AdminCreateBookingRequest {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub booking_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration: Option<i64>,
    pub amount: Option<i64>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Front-desk entry of walk-ins and phone reservations. Looser than the
/// public endpoint: past dates and arbitrary amounts are allowed, the
/// remaining shape rules still apply.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AdminCreateBookingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let (Some(customer_name), Some(email), Some(booking_type_str), Some(date_str), Some(amount)) = (
        body.customer_name.as_deref().filter(|s| !s.trim().is_empty()),
        body.email.as_deref().filter(|s| !s.trim().is_empty()),
        body.booking_type.as_deref().filter(|s| !s.trim().is_empty()),
        body.date.as_deref().filter(|s| !s.trim().is_empty()),
        body.amount,
    ) else {
        return Err(AppError::Validation("missing required fields".to_string()));
    };

    let booking_type = BookingType::parse(booking_type_str)
        .ok_or_else(|| AppError::Validation("invalid booking type".to_string()))?;
    let date = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("invalid date format, use YYYY-MM-DD".to_string()))?;

    let normalized_phone = match body.phone.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => {
            let validation =
                phone::validate_phone(raw).map_err(|e| AppError::Validation(e.to_string()))?;
            if let Some(warning) = &validation.warning {
                tracing::warn!(email = %email, warning = %warning, "phone validation warning");
            }
            Some(validation.normalized.unwrap_or_else(|| raw.trim().to_string()))
        }
        None => None,
    };

    let (time, duration) = if booking_type == BookingType::PrivateHourly {
        let (Some(time_str), Some(duration)) = (body.time.as_deref(), body.duration) else {
            return Err(AppError::Validation(
                "time and duration are required for private room bookings".to_string(),
            ));
        };
        let start = crate::services::booking_rules::parse_slot_time(time_str)
            .ok_or_else(|| AppError::Validation("invalid time format, use HH:MM (24-hour)".to_string()))?;
        (Some(start.format("%H:%M").to_string()), Some(duration))
    } else {
        (None, None)
    };

    let status = match body.status.as_deref() {
        None => BookingStatus::Pending,
        Some(s) => {
            BookingStatus::parse(s).ok_or_else(|| AppError::Validation("invalid status".to_string()))?
        }
    };

    let booking_id = {
        let db = state.db.lock().unwrap();

        if status != BookingStatus::Cancelled
            && queries::find_duplicate_booking(&db, email, &date, booking_type)?
        {
            return Err(AppError::Conflict(
                "a booking already exists for this email, date, and type".to_string(),
            ));
        }

        queries::insert_booking(
            &db,
            &NewBooking {
                customer_name,
                email,
                phone: normalized_phone.as_deref(),
                booking_type,
                date,
                time: time.as_deref(),
                duration,
                amount,
                status,
                notes: body.notes.as_deref(),
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

    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking(&db, booking_id)?
    };

    Ok(Json(serde_json::json!({
        "message": "Booking added successfully",
        "booking": booking,
    })))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let status = body
        .status
        .as_deref()
        .and_then(BookingStatus::parse)
        .ok_or_else(|| AppError::Validation("invalid status".to_string()))?;

    let updated = {
        let db = state.db.lock().unwrap();
        queries::update_booking_status(&db, id, status)?
    };

    if !updated {
        return Err(AppError::NotFound("booking not found".to_string()));
    }

    tracing::info!(booking_id = id, status = status.as_str(), "booking status updated");
    Ok(Json(serde_json::json!({
        "message": "Booking status updated successfully"
    })))
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let deleted = {
        let db = state.db.lock().unwrap();
        queries::delete_booking(&db, id)?
    };

    if !deleted {
        return Err(AppError::NotFound("booking not found".to_string()));
    }

    tracing::info!(booking_id = id, "booking deleted");
    Ok(Json(serde_json::json!({
        "message": "Booking deleted successfully"
    })))
}

// ── Orders ──

#[derive(Deserialize)]
pub struct OrderListQuery {
    pub booking_id: Option<i64>,
    pub day: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub booking_id: i64,
    pub order_type: String,
    pub quantity: i64,
    pub price: i64,
    pub notes: Option<String>,
    pub created_at: String,
    pub customer_name: Option<String>,
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let orders = {
        let db = state.db.lock().unwrap();
        queries::list_orders(
            &db,
            &OrderFilter {
                booking_id: query.booking_id,
                day: query.day.as_deref(),
                month: query.month.as_deref(),
                year: query.year.as_deref(),
            },
        )?
    };

    let response: Vec<OrderResponse> = orders
        .into_iter()
        .map(|record| OrderResponse {
            id: record.order.id,
            booking_id: record.order.booking_id,
            order_type: record.order.order_type.as_str().to_string(),
            quantity: record.order.quantity,
            price: record.order.price,
            notes: record.order.notes,
            created_at: record
                .order
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            customer_name: record.customer_name,
        })
        .collect();

    // Per-booking lookups expect an envelope, the dashboard table takes the
    // bare array.
    if query.booking_id.is_some() {
        Ok(Json(serde_json::json!({ "orders": response })))
    } else {
        Ok(Json(serde_json::json!(response)))
    }
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub booking_id: Option<i64>,
    pub order_type: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<i64>,
    pub notes: Option<String>,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let (Some(booking_id), Some(order_type_str), Some(quantity)) =
        (body.booking_id, body.order_type.as_deref(), body.quantity)
    else {
        return Err(AppError::Validation(
            "booking id, order type, and quantity are required".to_string(),
        ));
    };

    let order_type = OrderType::parse(order_type_str).ok_or_else(|| {
        AppError::Validation("order type must be either \"beverage\" or \"water\"".to_string())
    })?;

    if quantity < 1 {
        return Err(AppError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }

    let price = body.price.unwrap_or(DEFAULT_ORDER_PRICE);

    let order_id = {
        let db = state.db.lock().unwrap();

        if !queries::booking_exists(&db, booking_id)? {
            return Err(AppError::NotFound("booking not found".to_string()));
        }

        queries::insert_order(
            &db,
            &NewOrder {
                booking_id,
                order_type,
                quantity,
                price,
                notes: body.notes.as_deref(),
            },
        )?
    };

    tracing::info!(order_id, booking_id, "order added");

    Ok(Json(serde_json::json!({
        "message": "Order added successfully",
        "order": {
            "id": order_id,
            "booking_id": booking_id,
            "order_type": order_type.as_str(),
            "quantity": quantity,
            "price": price,
            "notes": body.notes,
        }
    })))
}

pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let deleted = {
        let db = state.db.lock().unwrap();
        queries::delete_order(&db, id)?
    };

    if !deleted {
        return Err(AppError::NotFound("order not found".to_string()));
    }

    Ok(Json(serde_json::json!({
        "message": "Order deleted successfully"
    })))
}

// ── Stats & reports ──

pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let stats = {
        let db = state.db.lock().unwrap();
        queries::get_stats(&db)?
    };

    Ok(Json(serde_json::json!({
        "bookings": {
            "total": stats.total,
            "pending": stats.pending,
            "confirmed": stats.confirmed,
            "revenue": stats.revenue,
        }
    })))
}

pub async fn reports(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let reports = {
        let db = state.db.lock().unwrap();
        queries::get_reports(&db, Utc::now().date_naive())?
    };

    let booking_types: Vec<serde_json::Value> = reports
        .booking_types
        .iter()
        .map(|t| serde_json::json!({ "booking_type": t.booking_type, "count": t.count }))
        .collect();

    Ok(Json(serde_json::json!({
        "reports": {
            "monthlyRevenue": reports.monthly_revenue,
            "lastMonthRevenue": reports.last_month_revenue,
            "bookingTypes": booking_types,
        }
    })))
}

#[derive(Deserialize)]
pub struct MembershipQuery {
    pub search: Option<String>,
}

pub async fn memberships(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MembershipQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&state, &headers)?;

    let cutoff = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(MEMBERSHIP_WINDOW_DAYS))
        .unwrap_or_else(|| Utc::now().date_naive());

    let memberships = {
        let db = state.db.lock().unwrap();
        queries::list_memberships(&db, query.search.as_deref(), cutoff)?
    };

    Ok(Json(memberships))
}
