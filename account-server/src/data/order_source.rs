use std::str::FromStr;

use async_trait::async_trait;
use bson::{Bson, doc};
use futures_util::TryStreamExt;
use mongodb::{Collection, Database};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, warn};

use crate::domain::error::DomainError;
use crate::domain::stats::OrderSummary;
use crate::domain::user::UserId;

pub const ORDERS_COLLECTION: &str = "orders";

/// Read-only view of the order data owned by another system.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn summary_for(&self, user_id: &UserId) -> Result<OrderSummary, DomainError>;
}

#[derive(Debug, Deserialize)]
struct OrderAmount {
    #[serde(default)]
    amount: Option<Bson>,
}

fn amount_to_decimal(amount: &Bson) -> Option<Decimal> {
    match amount {
        Bson::String(s) => Decimal::from_str(s).ok(),
        Bson::Int32(n) => Some(Decimal::from(*n)),
        Bson::Int64(n) => Some(Decimal::from(*n)),
        Bson::Double(f) => Decimal::from_f64_retain(*f).map(|d| d.round_dp(2)),
        _ => None,
    }
}

/// Fails instead of wrapping when the stored amounts exceed `Decimal` range.
pub fn sum_amounts<'a>(amounts: impl IntoIterator<Item = &'a Bson>) -> Result<Decimal, DomainError> {
    let mut total = Decimal::ZERO;
    for amount in amounts {
        let Some(value) = amount_to_decimal(amount) else {
            warn!(?amount, "ignoring order with unreadable amount");
            continue;
        };
        total = total
            .checked_add(value)
            .ok_or_else(|| DomainError::Internal("order amounts overflow the balance".into()))?;
    }
    Ok(total)
}

#[derive(Clone)]
pub struct MongoOrderSource {
    orders: Collection<OrderAmount>,
}

impl MongoOrderSource {
    pub fn new(database: &Database) -> Self {
        Self {
            orders: database.collection(ORDERS_COLLECTION),
        }
    }
}

#[async_trait]
impl OrderSource for MongoOrderSource {
    async fn summary_for(&self, user_id: &UserId) -> Result<OrderSummary, DomainError> {
        let orders: Vec<OrderAmount> = self
            .orders
            .find(doc! { "userId": user_id.as_str() })
            .projection(doc! { "_id": 0, "amount": 1 })
            .await
            .map_err(|e| {
                error!("failed to query orders for {}: {}", user_id, e);
                DomainError::from(e)
            })?
            .try_collect()
            .await
            .map_err(|e| {
                error!("failed to read orders for {}: {}", user_id, e);
                DomainError::from(e)
            })?;

        let account_balance = sum_amounts(orders.iter().filter_map(|order| order.amount.as_ref()))
            .inspect_err(|e| error!("failed to total orders for {}: {}", user_id, e))?;

        Ok(OrderSummary {
            total_orders: orders.len() as u64,
            account_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_mixed_amount_encodings() {
        let amounts = [
            Bson::String("10.25".into()),
            Bson::Int32(5),
            Bson::Int64(85),
            Bson::Double(0.25),
        ];
        assert_eq!(sum_amounts(&amounts).unwrap(), Decimal::new(10050, 2));
    }

    #[test]
    fn skips_unreadable_amounts() {
        let amounts = [Bson::String("n/a".into()), Bson::Null, Bson::String("1.5".into())];
        assert_eq!(sum_amounts(&amounts).unwrap(), Decimal::new(15, 1));
    }

    #[test]
    fn overflowing_balance_is_an_error() {
        let amounts = [
            Bson::String("79228162514264337593543950335".into()),
            Bson::Int32(1),
        ];
        let err = sum_amounts(&amounts).unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
