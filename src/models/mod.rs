pub mod admin;
pub mod booking;
pub mod order;

pub use admin::AdminUser;
pub use booking::{Booking, BookingStatus, BookingType};
pub use order::{Order, OrderType};
