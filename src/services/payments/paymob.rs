//! Paymob hosted-checkout handshake: auth token, then order, then payment
//! key, then the hosted URL. Strictly sequential; the first non-success
//! response aborts the whole sequence with the provider's message intact.

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{CheckoutRequest, CheckoutSession, PaymentProvider};
use crate::config::AppConfig;

pub struct PaymobGateway {
    api_key: String,
    integration_id: String,
    base_url: String,
    success_url: String,
    failure_url: String,
    client: reqwest::Client,
}

impl PaymobGateway {
    pub fn new(config: &AppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        Self {
            api_key: config.paymob_api_key.clone(),
            integration_id: config.paymob_integration_id.clone(),
            base_url: config.paymob_base_url.trim_end_matches('/').to_string(),
            success_url: format!("{}/pages/payment-result.html?success=true", config.public_base_url),
            failure_url: format!("{}/pages/payment-result.html?success=false", config.public_base_url),
            client,
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
        step: &str,
    ) -> anyhow::Result<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{step} request failed"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("failed to read {step} response"))?;

        if !status.is_success() {
            anyhow::bail!("{step} failed: {status} - {text}");
        }

        serde_json::from_str(&text).with_context(|| format!("failed to parse {step} response"))
    }
}

#[async_trait]
impl PaymentProvider for PaymobGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        let integration_id: i64 = self
            .integration_id
            .parse()
            .context("PAYMOB_INTEGRATION_ID must be numeric")?;

        let auth: AuthResponse = self
            .post_json(
                "/api/auth/tokens",
                &AuthRequest {
                    api_key: &self.api_key,
                },
                "paymob authentication",
            )
            .await?;
        tracing::debug!("paymob auth token received");

        let order: OrderResponse = self
            .post_json(
                "/api/ecommerce/orders",
                &OrderRequest {
                    auth_token: &auth.token,
                    delivery_needed: false,
                    amount_cents: request.amount_cents,
                    currency: &request.currency,
                    items: vec![OrderItem {
                        name: request.booking_type.display_name(),
                        amount_cents: request.amount_cents,
                        description: &request.description,
                        quantity: 1,
                    }],
                },
                "paymob order creation",
            )
            .await?;
        tracing::info!(order_id = order.id, "paymob order created");

        let (first_name, last_name) = split_name(&request.customer_name);
        let key: PaymentKeyResponse = self
            .post_json(
                "/api/acceptance/payment_keys",
                &PaymentKeyRequest {
                    auth_token: &auth.token,
                    amount_cents: request.amount_cents,
                    expiration: 3600,
                    order_id: order.id,
                    billing_data: BillingData {
                        first_name,
                        last_name,
                        email: &request.email,
                        phone_number: &request.phone,
                        country: "EG",
                        apartment: "NA",
                        floor: "NA",
                        street: "NA",
                        building: "NA",
                        shipping_method: "NA",
                        postal_code: "NA",
                        city: "NA",
                        state: "NA",
                    },
                    currency: &request.currency,
                    integration_id,
                    lock_order_when_paid: false,
                    success_url: &self.success_url,
                    failure_url: &self.failure_url,
                },
                "paymob payment key creation",
            )
            .await?;

        Ok(CheckoutSession {
            payment_url: format!(
                "{}/api/acceptance/payments/pay?token={}",
                self.base_url, key.token
            ),
            order_id: order.id.to_string(),
            payment_key: key.token,
        })
    }
}

fn split_name(name: &str) -> (&str, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or(name);
    let rest: Vec<&str> = parts.collect();
    (first, rest.join(" "))
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Serialize)]
struct OrderItem<'a> {
    name: &'a str,
    amount_cents: i64,
    description: &'a str,
    quantity: u32,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    auth_token: &'a str,
    delivery_needed: bool,
    amount_cents: i64,
    currency: &'a str,
    items: Vec<OrderItem<'a>>,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: i64,
}

#[derive(Serialize)]
struct BillingData<'a> {
    first_name: &'a str,
    last_name: String,
    email: &'a str,
    phone_number: &'a str,
    country: &'a str,
    apartment: &'a str,
    floor: &'a str,
    street: &'a str,
    building: &'a str,
    shipping_method: &'a str,
    postal_code: &'a str,
    city: &'a str,
    state: &'a str,
}

#[derive(Serialize)]
struct PaymentKeyRequest<'a> {
    auth_token: &'a str,
    amount_cents: i64,
    expiration: u32,
    order_id: i64,
    billing_data: BillingData<'a>,
    currency: &'a str,
    integration_id: i64,
    lock_order_when_paid: bool,
    success_url: &'a str,
    failure_url: &'a str,
}

#[derive(Deserialize)]
struct PaymentKeyResponse {
    token: String,
}
