use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::dto::UserStats;

pub const STATS_FAILURE_MESSAGE: &str = "Failed to fetch user statistics";

/// View-model of the dashboard. It starts in `Loading` and settles exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DashboardState {
    #[default]
    Loading,
    Error(String),
    Loaded(UserStats),
}

impl DashboardState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, DashboardState::Loading)
    }

    /// Applies the outcome of the stats fetch. Returns `false` and leaves the
    /// state alone once it has settled.
    pub fn resolve<E>(&mut self, result: Result<UserStats, E>) -> bool {
        if self.is_settled() {
            return false;
        }
        *self = match result {
            Ok(stats) => DashboardState::Loaded(stats),
            Err(_) => DashboardState::Error(STATS_FAILURE_MESSAGE.to_string()),
        };
        true
    }
}

pub fn format_balance(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount.abs())
    }
}

/// Calendar date of `timestamp` in `tz`, as `M/D/YYYY`.
pub fn format_activity_date<Tz>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.with_timezone(tz).format("%-m/%-d/%Y").to_string()
}
