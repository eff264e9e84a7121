//! Server-side booking rules, applied before anything touches the database.
//! Failures are client-facing reasons, never internal errors.

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};

use crate::models::BookingType;

/// Private room bookings may not end inside the overnight closed window.
const CLOSED_WINDOW_START_HOUR: u32 = 2;
const CLOSED_WINDOW_END_HOUR: u32 = 9;

const MIN_PRIVATE_HOURS: i64 = 1;
const MAX_PRIVATE_HOURS: i64 = 10;

#[derive(Debug, Default)]
pub struct BookingInput<'a> {
    pub customer_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub booking_type: Option<&'a str>,
    pub date: Option<&'a str>,
    pub time: Option<&'a str>,
    pub duration: Option<i64>,
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub booking_type: BookingType,
    pub date: NaiveDate,
    /// Zero-padded `HH:MM`, private rooms only.
    pub time: Option<String>,
    pub duration: Option<i64>,
    pub amount: i64,
}

#[derive(Debug, PartialEq)]
pub enum BookingRuleError {
    MissingFields,
    InvalidEmail,
    InvalidDate,
    PastDate,
    UnknownBookingType,
    NonPositiveAmount,
    MissingTimeOrDuration,
    InvalidTimeFormat,
    DurationOutOfRange,
    EndsInClosedWindow,
    AmountMismatch { expected: i64, rate: i64, duration: i64 },
}

impl std::fmt::Display for BookingRuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingRuleError::MissingFields => write!(
                f,
                "customer name, email, booking type, date, and amount are required"
            ),
            BookingRuleError::InvalidEmail => write!(f, "invalid email format"),
            BookingRuleError::InvalidDate => write!(f, "invalid date format, use YYYY-MM-DD"),
            BookingRuleError::PastDate => write!(f, "cannot book for past dates"),
            BookingRuleError::UnknownBookingType => write!(f, "invalid booking type"),
            BookingRuleError::NonPositiveAmount => write!(f, "amount must be greater than 0"),
            BookingRuleError::MissingTimeOrDuration => write!(
                f,
                "time and duration are required for private room bookings"
            ),
            BookingRuleError::InvalidTimeFormat => {
                write!(f, "invalid time format, use HH:MM (24-hour)")
            }
            BookingRuleError::DurationOutOfRange => write!(
                f,
                "duration must be between {MIN_PRIVATE_HOURS} and {MAX_PRIVATE_HOURS} hours \
                 for private room bookings"
            ),
            BookingRuleError::EndsInClosedWindow => write!(
                f,
                "private room bookings cannot end between 2 AM and 9 AM"
            ),
            BookingRuleError::AmountMismatch {
                expected,
                rate,
                duration,
            } => write!(
                f,
                "amount for private room should be {expected} L.E. ({rate} x {duration} hours)"
            ),
        }
    }
}

/// Validates a booking request against the business rules. `today` is
/// injected so the past-date rule is testable without the wall clock.
pub fn validate(
    input: &BookingInput,
    hourly_rate: i64,
    today: NaiveDate,
) -> Result<ValidatedBooking, BookingRuleError> {
    non_empty(input.customer_name).ok_or(BookingRuleError::MissingFields)?;
    let email = non_empty(input.email).ok_or(BookingRuleError::MissingFields)?;
    let booking_type_str = non_empty(input.booking_type).ok_or(BookingRuleError::MissingFields)?;
    let date_str = non_empty(input.date).ok_or(BookingRuleError::MissingFields)?;
    let amount = input.amount.ok_or(BookingRuleError::MissingFields)?;

    if !is_plausible_email(email) {
        return Err(BookingRuleError::InvalidEmail);
    }

    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| BookingRuleError::InvalidDate)?;
    if date < today {
        return Err(BookingRuleError::PastDate);
    }

    let booking_type =
        BookingType::parse(booking_type_str).ok_or(BookingRuleError::UnknownBookingType)?;

    if amount <= 0 {
        return Err(BookingRuleError::NonPositiveAmount);
    }

    if booking_type != BookingType::PrivateHourly {
        // Shared passes carry no time slot.
        return Ok(ValidatedBooking {
            booking_type,
            date,
            time: None,
            duration: None,
            amount,
        });
    }

    let time_str = non_empty(input.time).ok_or(BookingRuleError::MissingTimeOrDuration)?;
    let duration = input
        .duration
        .ok_or(BookingRuleError::MissingTimeOrDuration)?;

    let start = parse_slot_time(time_str).ok_or(BookingRuleError::InvalidTimeFormat)?;

    if !(MIN_PRIVATE_HOURS..=MAX_PRIVATE_HOURS).contains(&duration) {
        return Err(BookingRuleError::DurationOutOfRange);
    }

    // NaiveTime addition wraps at midnight, which is exactly what an
    // overnight slot needs.
    let end = start + Duration::hours(duration);
    if (CLOSED_WINDOW_START_HOUR..CLOSED_WINDOW_END_HOUR).contains(&end.hour()) {
        return Err(BookingRuleError::EndsInClosedWindow);
    }

    let expected = hourly_rate * duration;
    if amount != expected {
        return Err(BookingRuleError::AmountMismatch {
            expected,
            rate: hourly_rate,
            duration,
        });
    }

    Ok(ValidatedBooking {
        booking_type,
        date,
        time: Some(start.format("%H:%M").to_string()),
        duration: Some(duration),
        amount,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts `H:MM` or `HH:MM`, 24-hour.
pub fn parse_slot_time(s: &str) -> Option<NaiveTime> {
    let (hours, minutes) = s.split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    let h: u32 = hours.parse().ok()?;
    let m: u32 = minutes.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
