// 📈 Holding - a position inside an investment account

use super::{timestamp_to_utc, EntityKind, Reconcilable};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub source_id: String,

    /// When the source first reported the position (epoch seconds)
    pub created: i64,

    pub currency: Option<String>,
    pub cost_basis: Option<BigDecimal>,
    pub description: Option<String>,
    pub market_value: Option<BigDecimal>,
    pub purchase_price: Option<BigDecimal>,
    pub shares: Option<BigDecimal>,
    pub symbol: Option<String>,
}

impl Holding {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.created)
    }

    /// Market value minus cost basis, when both are known
    pub fn unrealized_gain(&self) -> Option<BigDecimal> {
        match (&self.market_value, &self.cost_basis) {
            (Some(value), Some(basis)) => Some(value - basis),
            _ => None,
        }
    }
}

impl Reconcilable for Holding {
    const KIND: EntityKind = EntityKind::Holding;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn sort_timestamp(&self) -> i64 {
        self.created
    }

    fn hashed_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "created": self.created,
            "currency": self.currency,
            "cost_basis": self.cost_basis,
            "description": self.description,
            "market_value": self.market_value,
            "purchase_price": self.purchase_price,
            "shares": self.shares,
            "symbol": self.symbol,
        })
    }
}
