//! Payment provider callback. Verifies the HMAC signature when a secret is
//! configured, then applies the outcome to the booking tagged with the
//! provider's order id. Must stay idempotent: the provider retries.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer};
use sha2::Sha256;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    #[serde(deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    pub hmac: Option<String>,
}

/// Signature covers amount_cents, order_id, success, and transaction_id, in
/// that order, HMAC-SHA256 hex over the concatenated values.
pub fn callback_signature(callback: &PaymentCallback, secret: &str) -> String {
    let message = format!(
        "{}{}{}{}",
        callback.amount_cents.unwrap_or(0),
        callback.order_id,
        callback.success,
        callback.transaction_id.as_deref().unwrap_or(""),
    );

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Json(callback): Json<PaymentCallback>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.config.paymob_hmac_secret.is_empty() {
        let provided = callback
            .hmac
            .as_deref()
            .ok_or_else(|| AppError::Validation("missing HMAC signature".to_string()))?;
        let expected = callback_signature(&callback, &state.config.paymob_hmac_secret);
        if !constant_time_eq(provided, &expected) {
            tracing::warn!(order_id = %callback.order_id, "webhook signature mismatch");
            return Err(AppError::Validation("invalid HMAC signature".to_string()));
        }
    }

    let status = if callback.success {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Cancelled
    };

    let updated = {
        let db = state.db.lock().unwrap();
        queries::apply_payment_outcome(
            &db,
            &callback.order_id,
            status,
            callback.transaction_id.as_deref(),
        )?
    };

    if updated == 0 {
        // Unknown order ids get acknowledged so the provider stops retrying;
        // there is nothing to roll back.
        tracing::warn!(order_id = %callback.order_id, "webhook for unknown order");
    } else {
        tracing::info!(
            order_id = %callback.order_id,
            status = status.as_str(),
            "payment outcome applied"
        );
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolIsh {
        Bool(bool),
        Str(String),
        Num(i64),
    }

    Ok(match BoolIsh::deserialize(deserializer)? {
        BoolIsh::Bool(b) => b,
        BoolIsh::Str(s) => s.eq_ignore_ascii_case("true") || s == "1",
        BoolIsh::Num(n) => n != 0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringIsh {
        Str(String),
        Num(i64),
    }

    Ok(match StringIsh::deserialize(deserializer)? {
        StringIsh::Str(s) => s,
        StringIsh::Num(n) => n.to_string(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringIsh {
        Str(String),
        Num(i64),
    }

    Ok(
        match Option::<StringIsh>::deserialize(deserializer)? {
            Some(StringIsh::Str(s)) => Some(s),
            Some(StringIsh::Num(n)) => Some(n.to_string()),
            None => None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_stable() {
        let callback = PaymentCallback {
            success: true,
            order_id: "9001".to_string(),
            transaction_id: Some("txn-1".to_string()),
            amount_cents: Some(45000),
            hmac: None,
        };
        let a = callback_signature(&callback, "secret");
        let b = callback_signature(&callback, "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_depends_on_fields_and_secret() {
        let callback = PaymentCallback {
            success: true,
            order_id: "9001".to_string(),
            transaction_id: None,
            amount_cents: Some(45000),
            hmac: None,
        };
        let baseline = callback_signature(&callback, "secret");

        let failed = PaymentCallback {
            success: false,
            ..clone_callback(&callback)
        };
        assert_ne!(baseline, callback_signature(&failed, "secret"));
        assert_ne!(baseline, callback_signature(&callback, "other"));
    }

    #[test]
    fn test_lenient_parsing() {
        let callback: PaymentCallback = serde_json::from_str(
            r#"{"success": "true", "order_id": 9001, "transaction_id": 77}"#,
        )
        .unwrap();
        assert!(callback.success);
        assert_eq!(callback.order_id, "9001");
        assert_eq!(callback.transaction_id.as_deref(), Some("77"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }

    fn clone_callback(c: &PaymentCallback) -> PaymentCallback {
        PaymentCallback {
            success: c.success,
            order_id: c.order_id.clone(),
            transaction_id: c.transaction_id.clone(),
            amount_cents: c.amount_cents,
            hmac: c.hmac.clone(),
        }
    }
}
