use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post, put};
use axum::Router;
use chrono::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use circle_api::config::AppConfig;
use circle_api::db;
use circle_api::handlers;
use circle_api::services::auth;
use circle_api::services::payments::paymob::PaymobGateway;
use circle_api::services::rate_limit::{LoginLimiter, SlidingWindowLimiter};
use circle_api::state::AppState;

const MAX_LOGIN_ATTEMPTS: u32 = 5;
const LOGIN_LOCKOUT_MINUTES: i64 = 15;
const MAX_BOOKINGS_PER_EMAIL: usize = 5;
const BOOKING_WINDOW_HOURS: i64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    if config.paymob_api_key.is_empty() || config.paymob_integration_id.is_empty() {
        tracing::warn!(
            "PAYMOB_API_KEY / PAYMOB_INTEGRATION_ID not set, card checkout will not work"
        );
    }

    let conn = db::init_db(&config.database_url)?;

    if config.admin_username.is_empty() || config.admin_password.is_empty() {
        tracing::warn!("ADMIN_USERNAME / ADMIN_PASSWORD not set, skipping admin seeding");
    } else {
        let hash = auth::hash_password(&config.admin_password)?;
        let created =
            db::queries::seed_admin(&conn, &config.admin_username, &hash, &config.admin_email)?;
        if created {
            tracing::info!(username = %config.admin_username, "admin user created");
        }
    }

    let payments = PaymobGateway::new(&config);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments: Box::new(payments),
        login_attempts: Mutex::new(LoginLimiter::new(
            MAX_LOGIN_ATTEMPTS,
            Duration::minutes(LOGIN_LOCKOUT_MINUTES),
        )),
        booking_attempts: Mutex::new(SlidingWindowLimiter::new(
            MAX_BOOKINGS_PER_EMAIL,
            Duration::hours(BOOKING_WINDOW_HOURS),
        )),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/create-payment", post(handlers::payment::create_payment))
        .route("/api/paymob-webhook", post(handlers::webhook::payment_webhook))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/admin/login", post(handlers::admin::login))
        .route("/api/admin/verify", get(handlers::admin::verify))
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route("/api/admin/bookings", post(handlers::admin::create_booking))
        .route(
            "/api/admin/bookings/:id/status",
            put(handlers::admin::update_booking_status),
        )
        .route(
            "/api/admin/bookings/:id",
            delete(handlers::admin::delete_booking),
        )
        .route("/api/admin/orders", get(handlers::admin::list_orders))
        .route("/api/admin/orders", post(handlers::admin::create_order))
        .route("/api/admin/orders/:id", delete(handlers::admin::delete_order))
        .route("/api/admin/stats", get(handlers::admin::stats))
        .route("/api/admin/reports", get(handlers::admin::reports))
        .route("/api/admin/memberships", get(handlers::admin::memberships))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
