use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub booking_type: BookingType,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub duration: Option<i64>,
    pub amount: i64,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub provider_order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    SharedDaily,
    SharedMonthly,
    PrivateHourly,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::SharedDaily => "shared_daily",
            BookingType::SharedMonthly => "shared_monthly",
            BookingType::PrivateHourly => "private_hourly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shared_daily" => Some(BookingType::SharedDaily),
            "shared_monthly" => Some(BookingType::SharedMonthly),
            "private_hourly" => Some(BookingType::PrivateHourly),
            _ => None,
        }
    }

    /// Line-item name shown on the hosted checkout page.
    pub fn display_name(&self) -> &'static str {
        match self {
            BookingType::SharedDaily => "Daily Pass",
            BookingType::SharedMonthly => "Monthly Membership",
            BookingType::PrivateHourly => "Private Room",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Pending,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}
