use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::activity::ActivityEntry;

pub const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub id: Uuid,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ActivityEntry> for RecentActivity {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action.clone(),
            timestamp: entry.timestamp,
        }
    }
}

/// What the order-data collaborator knows about a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderSummary {
    pub total_orders: u64,
    pub account_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_orders: u64,
    pub recent_activity: Vec<RecentActivity>,
    pub account_balance: Decimal,
}

impl UserStats {
    /// Newest entries first, capped at [`RECENT_ACTIVITY_LIMIT`].
    pub fn derive(activity_log: &[ActivityEntry], orders: OrderSummary) -> Self {
        let recent_activity = activity_log
            .iter()
            .rev()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(RecentActivity::from)
            .collect();

        Self {
            total_orders: orders.total_orders,
            recent_activity,
            account_balance: orders.account_balance,
        }
    }
}
