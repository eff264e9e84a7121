pub mod auth;
pub mod booking_rules;
pub mod payments;
pub mod phone;
pub mod rate_limit;
