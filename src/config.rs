use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Public origin used to build the payment redirect URLs.
    pub public_base_url: String,
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    pub admin_email: String,
    pub paymob_api_key: String,
    pub paymob_integration_id: String,
    pub paymob_hmac_secret: String,
    pub paymob_base_url: String,
    pub currency: String,
    /// Private room rate per hour, in display units.
    pub hourly_rate: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "circle.db".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "changeme".to_string()),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_default(),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_default(),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            paymob_api_key: env::var("PAYMOB_API_KEY").unwrap_or_default(),
            paymob_integration_id: env::var("PAYMOB_INTEGRATION_ID").unwrap_or_default(),
            paymob_hmac_secret: env::var("PAYMOB_HMAC_SECRET").unwrap_or_default(),
            paymob_base_url: env::var("PAYMOB_BASE_URL")
                .unwrap_or_else(|_| "https://accept.paymob.com".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "EGP".to_string()),
            hourly_rate: env::var("PRIVATE_HOURLY_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(150),
        }
    }
}
