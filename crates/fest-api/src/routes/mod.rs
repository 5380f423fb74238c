//! # API Route Modules
//!
//! - `registrations`: public self-service registration.
//! - `admin`: admin login plus the review console (list, fetch, approve,
//!   reject), behind `admin_auth_middleware` except for login.
//! - `entry`: gate-side scan validation, public but rate-limited.

pub mod admin;
pub mod entry;
pub mod registrations;
