use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::payments::PaymentProvider;
use crate::services::rate_limit::{LoginLimiter, SlidingWindowLimiter};

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentProvider>,
    pub login_attempts: Mutex<LoginLimiter>,
    pub booking_attempts: Mutex<SlidingWindowLimiter>,
}
