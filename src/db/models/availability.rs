use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One availability window of a host.
///
/// Either `day_of_week` is set (recurring weekly window, 0 = Sunday … 6 =
/// Saturday) or `date` is set (one specific calendar date). `start_time` and
/// `end_time` are "HH:MM" labels with `start_time < end_time`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HostAvailability {
    pub id: String,
    pub host_id: String,
    pub day_of_week: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateHostAvailability {
    pub day_of_week: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
}
