use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Ancillary purchase attached to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub booking_id: i64,
    pub order_type: OrderType,
    pub quantity: i64,
    pub price: i64,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Beverage,
    Water,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Beverage => "beverage",
            OrderType::Water => "water",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beverage" => Some(OrderType::Beverage),
            "water" => Some(OrderType::Water),
            _ => None,
        }
    }
}
