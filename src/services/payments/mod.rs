pub mod paymob;

use async_trait::async_trait;

use crate::models::BookingType;

/// Everything the provider needs to produce a hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub email: String,
    /// E.164 where derivable.
    pub phone: String,
    pub booking_type: BookingType,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Where to redirect the customer.
    pub payment_url: String,
    /// Provider-assigned order id, stored for webhook correlation.
    pub order_id: String,
    pub payment_key: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession>;
}
