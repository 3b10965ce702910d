#![allow(unused_imports)]

//! Database models split into separate files.
//! This module re-exports individual model modules so existing imports like
//! `use crate::db::models::*;` continue to work.

pub mod availability;
pub mod booking;
pub mod booking_session;
pub mod news;
pub mod pricing;
pub mod user;

// Re-export all types at the `crate::db::models` namespace for backward compatibility.
pub use self::availability::*;
pub use self::booking::*;
pub use self::booking_session::*;
pub use self::news::*;
pub use self::pricing::*;
pub use self::user::*;
