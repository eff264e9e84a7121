use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{AdminUser, Booking, BookingStatus, BookingType, Order, OrderType};

const BOOKING_COLUMNS: &str = "id, customer_name, email, phone, booking_type, date, time, \
     duration, amount, status, notes, provider_order_id, transaction_id, created_at, updated_at";

// ── Admin users ──

pub fn seed_admin(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    email: &str,
) -> anyhow::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO admin_users (username, password_hash, email, role)
         VALUES (?1, ?2, ?3, 'admin')",
        params![username, password_hash, email],
    )?;
    Ok(inserted > 0)
}

pub fn get_admin_by_username(
    conn: &Connection,
    username: &str,
) -> anyhow::Result<Option<AdminUser>> {
    let result = conn.query_row(
        "SELECT id, username, password_hash, email, role, created_at
         FROM admin_users WHERE username = ?1",
        params![username],
        |row| {
            let created_at_str: String = row.get(5)?;
            Ok(AdminUser {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                email: row.get(3)?,
                role: row.get(4)?,
                created_at: parse_timestamp(&created_at_str),
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Bookings ──

pub struct NewBooking<'a> {
    pub customer_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub booking_type: BookingType,
    pub date: NaiveDate,
    pub time: Option<&'a str>,
    pub duration: Option<i64>,
    pub amount: i64,
    pub status: BookingStatus,
    pub notes: Option<&'a str>,
    pub provider_order_id: Option<&'a str>,
}

pub fn insert_booking(conn: &Connection, booking: &NewBooking) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO bookings (customer_name, email, phone, booking_type, date, time,
                               duration, amount, status, notes, provider_order_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.customer_name,
            booking.email,
            booking.phone,
            booking.booking_type.as_str(),
            booking.date.format("%Y-%m-%d").to_string(),
            booking.time,
            booking.duration,
            booking.amount,
            booking.status.as_str(),
            booking.notes,
            booking.provider_order_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// True when an insert failed on the partial unique index over
/// non-cancelled (email, date, booking_type) rows or the provider order key.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(f, _))
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub fn find_duplicate_booking(
    conn: &Connection,
    email: &str,
    date: &NaiveDate,
    booking_type: BookingType,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE email = ?1 AND date = ?2 AND booking_type = ?3 AND status != 'cancelled'",
        params![
            email,
            date.format("%Y-%m-%d").to_string(),
            booking_type.as_str()
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[derive(Default)]
pub struct BookingFilter<'a> {
    pub status: Option<&'a str>,
    pub day: Option<&'a str>,
    pub month: Option<&'a str>,
    pub year: Option<&'a str>,
    pub search: Option<&'a str>,
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        params_vec.push(Box::new(status.to_string()));
    }

    // Day/month/year combine the way the dashboard sends them: a full triple
    // is an exact date match, otherwise the most specific pair wins.
    if let (Some(day), Some(month), Some(year)) = (filter.day, filter.month, filter.year) {
        sql.push_str(" AND date = ?");
        params_vec.push(Box::new(format!("{year}-{month:0>2}-{day:0>2}")));
    } else if let (Some(month), Some(year)) = (filter.month, filter.year) {
        sql.push_str(" AND strftime('%m', date) = ? AND strftime('%Y', date) = ?");
        params_vec.push(Box::new(format!("{month:0>2}")));
        params_vec.push(Box::new(year.to_string()));
    } else if let Some(year) = filter.year {
        sql.push_str(" AND strftime('%Y', date) = ?");
        params_vec.push(Box::new(year.to_string()));
    } else if let Some(month) = filter.month {
        sql.push_str(" AND strftime('%m', date) = ?");
        params_vec.push(Box::new(format!("{month:0>2}")));
    } else if let Some(day) = filter.day {
        sql.push_str(" AND strftime('%d', date) = ?");
        params_vec.push(Box::new(format!("{day:0>2}")));
    }

    if let Some(search) = filter.search {
        sql.push_str(" AND (customer_name LIKE ? OR email LIKE ? OR phone LIKE ?)");
        let pattern = format!("%{search}%");
        params_vec.push(Box::new(pattern.clone()));
        params_vec.push(Box::new(pattern.clone()));
        params_vec.push(Box::new(pattern));
    }

    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking(conn: &Connection, id: i64) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn booking_exists(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: i64,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Applies a webhook outcome to the booking tagged with the provider's order
/// id. Safe to call repeatedly with the same outcome.
pub fn apply_payment_outcome(
    conn: &Connection,
    provider_order_id: &str,
    status: BookingStatus,
    transaction_id: Option<&str>,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1,
             transaction_id = COALESCE(?2, transaction_id),
             updated_at = datetime('now')
         WHERE provider_order_id = ?3",
        params![status.as_str(), transaction_id, provider_order_id],
    )?;
    Ok(count)
}

pub fn list_memberships(
    conn: &Connection,
    search: Option<&str>,
    cutoff: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE booking_type = 'shared_monthly' AND status = 'confirmed' AND date >= ?"
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(cutoff.format("%Y-%m-%d").to_string())];

    if let Some(search) = search {
        sql.push_str(" AND (customer_name LIKE ? OR email LIKE ? OR phone LIKE ?)");
        let pattern = format!("%{search}%");
        params_vec.push(Box::new(pattern.clone()));
        params_vec.push(Box::new(pattern.clone()));
        params_vec.push(Box::new(pattern));
    }

    sql.push_str(" ORDER BY date DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: i64 = row.get(0)?;
    let customer_name: String = row.get(1)?;
    let email: String = row.get(2)?;
    let phone: Option<String> = row.get(3)?;
    let booking_type_str: String = row.get(4)?;
    let date_str: String = row.get(5)?;
    let time: Option<String> = row.get(6)?;
    let duration: Option<i64> = row.get(7)?;
    let amount: i64 = row.get(8)?;
    let status_str: String = row.get(9)?;
    let notes: Option<String> = row.get(10)?;
    let provider_order_id: Option<String> = row.get(11)?;
    let transaction_id: Option<String> = row.get(12)?;
    let created_at_str: String = row.get(13)?;
    let updated_at_str: String = row.get(14)?;

    let booking_type = BookingType::parse(&booking_type_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking type in row {id}: {booking_type_str}"))?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("malformed date in row {id}: {date_str}"))?;

    Ok(Booking {
        id,
        customer_name,
        email,
        phone,
        booking_type,
        date,
        time,
        duration,
        amount,
        status: BookingStatus::from_str(&status_str),
        notes,
        provider_order_id,
        transaction_id,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

// ── Orders ──

pub struct NewOrder<'a> {
    pub booking_id: i64,
    pub order_type: OrderType,
    pub quantity: i64,
    pub price: i64,
    pub notes: Option<&'a str>,
}

pub fn insert_order(conn: &Connection, order: &NewOrder) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO orders (booking_id, order_type, quantity, price, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            order.booking_id,
            order.order_type.as_str(),
            order.quantity,
            order.price,
            order.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_order(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub struct OrderWithCustomer {
    pub order: Order,
    pub customer_name: Option<String>,
}

#[derive(Default)]
pub struct OrderFilter<'a> {
    pub booking_id: Option<i64>,
    pub day: Option<&'a str>,
    pub month: Option<&'a str>,
    pub year: Option<&'a str>,
}

pub fn list_orders(
    conn: &Connection,
    filter: &OrderFilter,
) -> anyhow::Result<Vec<OrderWithCustomer>> {
    let mut sql = String::from(
        "SELECT o.id, o.booking_id, o.order_type, o.quantity, o.price, o.notes, o.created_at,
                b.customer_name
         FROM orders o
         LEFT JOIN bookings b ON o.booking_id = b.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(booking_id) = filter.booking_id {
        sql.push_str(" AND o.booking_id = ?");
        params_vec.push(Box::new(booking_id));
    }

    if let (Some(day), Some(month), Some(year)) = (filter.day, filter.month, filter.year) {
        sql.push_str(" AND DATE(o.created_at) = ?");
        params_vec.push(Box::new(format!("{year}-{month:0>2}-{day:0>2}")));
    } else if let (Some(month), Some(year)) = (filter.month, filter.year) {
        sql.push_str(" AND strftime('%m', o.created_at) = ? AND strftime('%Y', o.created_at) = ?");
        params_vec.push(Box::new(format!("{month:0>2}")));
        params_vec.push(Box::new(year.to_string()));
    } else if let Some(year) = filter.year {
        sql.push_str(" AND strftime('%Y', o.created_at) = ?");
        params_vec.push(Box::new(year.to_string()));
    } else if let Some(month) = filter.month {
        sql.push_str(" AND strftime('%m', o.created_at) = ?");
        params_vec.push(Box::new(format!("{month:0>2}")));
    } else if let Some(day) = filter.day {
        sql.push_str(" AND strftime('%d', o.created_at) = ?");
        params_vec.push(Box::new(format!("{day:0>2}")));
    }

    sql.push_str(" ORDER BY o.created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let order_type_str: String = row.get(2)?;
        let created_at_str: String = row.get(6)?;
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            order_type_str,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, Option<String>>(5)?,
            created_at_str,
            row.get::<_, Option<String>>(7)?,
        ))
    })?;

    let mut orders = vec![];
    for row in rows {
        let (id, booking_id, order_type_str, quantity, price, notes, created_at_str, customer) =
            row?;
        let order_type = OrderType::parse(&order_type_str)
            .ok_or_else(|| anyhow::anyhow!("unknown order type in row {id}: {order_type_str}"))?;
        orders.push(OrderWithCustomer {
            order: Order {
                id,
                booking_id,
                order_type,
                quantity,
                price,
                notes,
                created_at: parse_timestamp(&created_at_str),
            },
            customer_name: customer,
        });
    }
    Ok(orders)
}

// ── Stats & reports ──

pub struct BookingStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub revenue: i64,
}

pub fn get_stats(conn: &Connection) -> anyhow::Result<BookingStats> {
    let (total, pending, confirmed, booking_revenue): (i64, i64, i64, i64) = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'confirmed' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'confirmed' THEN amount ELSE 0 END), 0)
         FROM bookings",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    let orders_revenue: i64 = conn.query_row(
        "SELECT COALESCE(SUM(quantity * price), 0) FROM orders",
        [],
        |row| row.get(0),
    )?;

    Ok(BookingStats {
        total,
        pending,
        confirmed,
        revenue: booking_revenue + orders_revenue,
    })
}

pub struct BookingTypeCount {
    pub booking_type: String,
    pub count: i64,
}

pub struct Reports {
    pub monthly_revenue: i64,
    pub last_month_revenue: i64,
    pub booking_types: Vec<BookingTypeCount>,
}

pub fn get_reports(conn: &Connection, today: NaiveDate) -> anyhow::Result<Reports> {
    let month = today.format("%m").to_string();
    let year = today.format("%Y").to_string();

    // Last day of the previous month, which carries the right month/year pair
    // across the January boundary.
    let prior = today.with_day(1).unwrap_or(today) - chrono::Days::new(1);
    let last_month = prior.format("%m").to_string();
    let last_month_year = prior.format("%Y").to_string();

    let monthly_revenue = confirmed_revenue_for(conn, &month, &year)?;
    let last_month_revenue = confirmed_revenue_for(conn, &last_month, &last_month_year)?;

    let mut stmt =
        conn.prepare("SELECT booking_type, COUNT(*) FROM bookings GROUP BY booking_type")?;
    let rows = stmt.query_map([], |row| {
        Ok(BookingTypeCount {
            booking_type: row.get(0)?,
            count: row.get(1)?,
        })
    })?;

    let mut booking_types = vec![];
    for row in rows {
        booking_types.push(row?);
    }

    Ok(Reports {
        monthly_revenue,
        last_month_revenue,
        booking_types,
    })
}

fn confirmed_revenue_for(conn: &Connection, month: &str, year: &str) -> anyhow::Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM bookings
         WHERE status = 'confirmed' AND strftime('%m', date) = ?1 AND strftime('%Y', date) = ?2",
        params![month, year],
        |row| row.get(0),
    )?;
    Ok(total)
}

fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc())
}
